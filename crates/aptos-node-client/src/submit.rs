//! Transaction submission: build, sign, submit, await finality

use std::time::Duration;

use aptlend_core::{Error, TxError};
use aptos_tx::{EntryFunctionPayload, TransactionSigner, TxOptions, UserTransactionRequest};
use serde::Serialize;

use crate::{NodeClient, TransactionStatus};

/// Result of one submission attempt. Failures are data, not panics: the
/// caller decides how to present them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubmitOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Committed transaction JSON as reported by the node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmitOutcome {
    fn failed(hash: Option<String>, response: Option<serde_json::Value>, error: String) -> Self {
        Self {
            success: false,
            hash,
            response,
            error: Some(error),
        }
    }
}

/// Sign and submit an entry-function call, then wait for it to commit.
///
/// Never retries. Any failure is reported in the outcome with the
/// underlying message; an on-chain abort carries the node's `vm_status`.
pub async fn submit_transaction(
    client: &NodeClient,
    signer: &dyn TransactionSigner,
    payload: EntryFunctionPayload,
    options: &TxOptions,
) -> SubmitOutcome {
    let function = payload.function.clone();
    let sender = signer.address();

    let hash = match sign_and_submit(client, signer, payload, options).await {
        Ok(hash) => hash,
        Err(e) => {
            tracing::warn!(function = %function, sender = %sender, error = %e, "Submission failed");
            return SubmitOutcome::failed(None, None, e.to_string());
        }
    };

    tracing::info!(function = %function, hash = %hash, "Transaction submitted");

    // Wait no longer than the transaction can live on the node
    let max_wait = Duration::from_secs(options.expiration_secs);
    let committed = match client.wait_for_transaction(&hash, max_wait).await {
        Ok(tx) => tx,
        Err(e) => {
            tracing::warn!(hash = %hash, error = %e, "Failed waiting for transaction");
            return SubmitOutcome::failed(Some(hash), None, e.to_string());
        }
    };

    match TransactionStatus::from_json(&committed) {
        TransactionStatus::Committed { success: true, .. } => SubmitOutcome {
            success: true,
            hash: Some(hash),
            response: Some(committed),
            error: None,
        },
        TransactionStatus::Committed { vm_status, .. } => {
            tracing::warn!(hash = %hash, vm_status = %vm_status, "Transaction failed on chain");
            SubmitOutcome::failed(Some(hash), Some(committed), vm_status)
        }
        TransactionStatus::Pending => SubmitOutcome::failed(
            Some(hash.clone()),
            None,
            TxError::ConfirmationTimeout { hash }.to_string(),
        ),
    }
}

async fn sign_and_submit(
    client: &NodeClient,
    signer: &dyn TransactionSigner,
    payload: EntryFunctionPayload,
    options: &TxOptions,
) -> Result<String, Error> {
    let sender = signer.address();
    let sequence_number = client.sequence_number(sender.as_str()).await?;

    let request = UserTransactionRequest::new(sender.as_str(), sequence_number, payload, options);
    let message = client.encode_submission(&request).await?;
    let signature = signer.sign(&message).await?;

    let pending = client.submit(&request.with_signature(signature.into())).await?;
    pending["hash"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            TxError::SubmissionFailed {
                message: "node response carried no transaction hash".to_string(),
            }
            .into()
        })
}
