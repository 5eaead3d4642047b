//! Lending Actions
//!
//! Contract writes driven by the connected wallet: validate the user's form,
//! build the payload, sign and submit it, then refresh the poller so the
//! views reflect the committed change.
//!
//! Every action checks the wallet session first, so an unconnected user gets
//! `WalletError::NotConnected` before any network call is made.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use aptlend_core::{ContractError, Error};
use aptos_node_client::{submit_transaction, NodeClient, SubmitOutcome};
use aptos_tx::{EntryFunctionPayload, TxOptions};
use serde::{Deserialize, Serialize};
use wallet_session::WalletSession;

use crate::calculator;
use crate::constants::{DEFAULT_COLLATERAL_PERCENT, MAX_DURATION_DAYS};
use crate::poller::ContractPoller;
use crate::state::{LoanOffer, LoanStatus};
use crate::tx_builder::{self, CreateOfferParams, RequestLoanParams, TxContext};

// =============================================================================
// Forms
// =============================================================================

/// Lender's offer form, values as typed by the user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateOfferForm {
    /// Human amount, e.g. `"250.5"`
    pub amount: String,
    /// Percent, e.g. `"7.5"`
    pub interest_rate: String,
    pub duration_days: String,
    /// Percent; 150 when left empty
    #[serde(default)]
    pub collateral_ratio: Option<String>,
}

impl CreateOfferForm {
    pub fn validate(&self, decimals: u8) -> Result<CreateOfferParams, ContractError> {
        if self.amount.trim().is_empty()
            || self.interest_rate.trim().is_empty()
            || self.duration_days.trim().is_empty()
        {
            return Err(invalid_argument("Please fill in all fields."));
        }

        let amount = calculator::parse_amount(&self.amount, decimals)?;
        if amount == 0 {
            return Err(ContractError::InvalidAmount {
                message: "Please enter a valid loan amount.".to_string(),
            });
        }
        let interest_rate = calculator::parse_interest_bps(&self.interest_rate)?;

        let duration_days = match self.duration_days.trim().parse::<u64>() {
            Ok(days) if (1..=MAX_DURATION_DAYS).contains(&days) => days,
            _ => {
                return Err(invalid_argument(format!(
                    "Loan duration must be between 1 and {} days.",
                    MAX_DURATION_DAYS
                )))
            }
        };

        let collateral_ratio = match self.collateral_ratio.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_COLLATERAL_PERCENT,
            Some(ratio) => match ratio.parse::<u64>() {
                Ok(r) if r > 0 => r,
                _ => return Err(invalid_argument("Please enter a valid collateral ratio.")),
            },
        };

        Ok(CreateOfferParams {
            amount,
            interest_rate,
            duration_days,
            collateral_ratio,
        })
    }
}

/// Borrower's request form against one offer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoanRequestForm {
    pub amount: String,
    /// Human collateral amount; 150% of the loan when left empty
    #[serde(default)]
    pub collateral: String,
    #[serde(default)]
    pub borrower_doc_hash: String,
}

impl LoanRequestForm {
    pub fn validate(&self, offer: &LoanOffer, decimals: u8) -> Result<RequestLoanParams, ContractError> {
        let amount = match calculator::parse_amount(&self.amount, decimals) {
            Ok(a) if a > 0 => a,
            _ => {
                return Err(ContractError::InvalidAmount {
                    message: "Please enter a valid loan amount.".to_string(),
                })
            }
        };

        let collateral_amount = if self.collateral.trim().is_empty() {
            None
        } else {
            match calculator::parse_amount(&self.collateral, decimals) {
                Ok(c) if c > 0 => Some(c),
                _ => {
                    return Err(ContractError::InvalidAmount {
                        message: "Please enter a valid collateral amount.".to_string(),
                    })
                }
            }
        };

        if !offer.is_open() {
            return Err(ContractError::ActionNotAllowed {
                reason: format!("offer {} is {}", offer.offer_id, offer.status.as_str()),
            });
        }
        if offer.amount > 0 && amount > offer.amount {
            return Err(ContractError::InvalidAmount {
                message: format!(
                    "Requested amount exceeds the offer ({} available).",
                    calculator::format_amount_display(offer.amount, decimals)
                ),
            });
        }

        Ok(RequestLoanParams {
            lender: offer.lender.clone(),
            offer_id: offer.offer_id.clone(),
            amount,
            collateral_amount,
            collateral_value: None,
            borrower_doc_hash: self.borrower_doc_hash.trim().to_string(),
        })
    }
}

fn invalid_argument(message: impl Into<String>) -> ContractError {
    ContractError::InvalidArgument {
        message: message.into(),
    }
}

// =============================================================================
// In-flight guards
// =============================================================================

/// Keys of actions currently being submitted, e.g. `approve:7`
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    /// Claim `key`, failing if the same action is already running.
    /// The claim is released when the guard drops.
    pub fn begin(&self, key: impl Into<String>) -> Result<InFlightGuard, ContractError> {
        let key = key.into();
        if !self.lock().insert(key.clone()) {
            return Err(ContractError::ActionNotAllowed {
                reason: format!("{} is already in progress", key),
            });
        }
        Ok(InFlightGuard {
            keys: self.keys.clone(),
            key,
        })
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.keys.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub struct InFlightGuard {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

// =============================================================================
// Actions
// =============================================================================

#[derive(Clone)]
pub struct LendingActions {
    session: WalletSession,
    client: NodeClient,
    ctx: TxContext,
    poller: ContractPoller,
    options: TxOptions,
    in_flight: InFlight,
}

impl LendingActions {
    pub fn new(
        session: WalletSession,
        client: NodeClient,
        ctx: TxContext,
        poller: ContractPoller,
    ) -> Self {
        Self {
            session,
            client,
            ctx,
            poller,
            options: TxOptions::default(),
            in_flight: InFlight::default(),
        }
    }

    pub fn with_options(mut self, options: TxOptions) -> Self {
        self.options = options;
        self
    }

    pub fn context(&self) -> &TxContext {
        &self.ctx
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    pub async fn create_offer(&self, form: &CreateOfferForm) -> Result<SubmitOutcome, Error> {
        self.session.ensure_connected()?;
        let params = form.validate(self.ctx.asset.decimals)?;
        let payload = tx_builder::create_offer(&self.ctx, &params)?;
        self.execute("create_offer".to_string(), payload).await
    }

    pub async fn cancel_offer(&self, offer_id: &str) -> Result<SubmitOutcome, Error> {
        self.session.ensure_connected()?;
        let payload = tx_builder::cancel_offer(&self.ctx, offer_id)?;
        self.execute(format!("cancel:{}", offer_id), payload).await
    }

    /// Request a loan against an offer known to the poller
    pub async fn request_loan(
        &self,
        offer_id: &str,
        form: &LoanRequestForm,
    ) -> Result<SubmitOutcome, Error> {
        self.session.ensure_connected()?;
        let offer = self
            .poller
            .get_loan_offers(None)
            .into_iter()
            .find(|o| o.offer_id == offer_id)
            .ok_or_else(|| ContractError::OfferNotFound {
                offer_id: offer_id.to_string(),
            })?;
        let params = form.validate(&offer, self.ctx.asset.decimals)?;
        let payload = tx_builder::request_loan(&self.ctx, &params)?;
        self.execute(format!("request:{}", offer_id), payload).await
    }

    pub async fn approve_loan(&self, request_id: &str) -> Result<SubmitOutcome, Error> {
        self.session.ensure_connected()?;
        self.check_transition(request_id, LoanStatus::Approved)?;
        let payload = tx_builder::approve_loan(&self.ctx, request_id)?;
        self.execute(format!("approve:{}", request_id), payload).await
    }

    pub async fn reject_loan(&self, request_id: &str) -> Result<SubmitOutcome, Error> {
        self.session.ensure_connected()?;
        self.check_transition(request_id, LoanStatus::Rejected)?;
        let payload = tx_builder::reject_loan(&self.ctx, request_id)?;
        self.execute(format!("reject:{}", request_id), payload).await
    }

    pub async fn repay_loan(&self, request_id: &str) -> Result<SubmitOutcome, Error> {
        self.session.ensure_connected()?;
        self.check_transition(request_id, LoanStatus::Repaid)?;
        let payload = tx_builder::repay_loan(&self.ctx, request_id)?;
        self.execute(format!("repay:{}", request_id), payload).await
    }

    /// Refuse moves the last snapshot already rules out. Unknown requests
    /// pass: the snapshot may simply be older than the request.
    fn check_transition(&self, request_id: &str, next: LoanStatus) -> Result<(), ContractError> {
        let state = self.poller.state();
        match state.loans.get(request_id) {
            Some(loan) if !loan.status.can_transition_to(next) => {
                Err(ContractError::ActionNotAllowed {
                    reason: format!(
                        "loan request {} is {} and cannot become {}",
                        request_id,
                        loan.status.as_str(),
                        next.as_str()
                    ),
                })
            }
            _ => Ok(()),
        }
    }

    async fn execute(&self, key: String, payload: EntryFunctionPayload) -> Result<SubmitOutcome, Error> {
        let _guard = self.in_flight.begin(key.clone())?;
        let signer = self.session.signer()?;

        tracing::debug!(action = %key, function = %payload.function, "Submitting lending action");
        let outcome = submit_transaction(&self.client, signer.as_ref(), payload, &self.options).await;

        if outcome.success {
            self.poller.refresh().await;
        } else {
            tracing::warn!(
                action = %key,
                error = outcome.error.as_deref().unwrap_or("unknown"),
                "Lending action failed"
            );
        }
        Ok(outcome)
    }
}
