//! Lending Transaction Builder
//!
//! Pure functions shaping entry-function payloads for the lending module.
//! No network or wallet access: the result is handed to a signer or
//! returned to an external wallet as-is.
//!
//! Argument order is positional and must match the Move signatures:
//! - `create_offer<Coin>(amount, interest_rate, duration, collateral_ratio)`
//! - `cancel_offer<Coin>(offer_id)`
//! - `request_loan<Coin, Collateral>(lender, offer_id, amount,
//!   collateral_amount, collateral_value, borrower_doc_hash)`
//! - `approve_loan<Coin>(request_id)`, `reject_loan<Coin>(request_id)`,
//!   `repay_loan<Coin>(request_id)`

use aptlend_core::{AccountAddress, AppConfig, AssetConfig, ContractConfig, ContractError};
use aptos_tx::EntryFunctionPayload;
use serde::{Deserialize, Serialize};

use crate::calculator;
use crate::constants::entry;

/// Where the lending module lives and which coin it lends
#[derive(Debug, Clone)]
pub struct TxContext {
    pub contract: ContractConfig,
    pub asset: AssetConfig,
}

impl TxContext {
    pub fn new(contract: ContractConfig, asset: AssetConfig) -> Self {
        Self { contract, asset }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.contract.clone(), config.asset.clone())
    }

    fn payload(&self, entry_function: &str) -> EntryFunctionPayload {
        EntryFunctionPayload::new(self.contract.qualified(entry_function))
    }
}

/// Lender's new offer, amounts already in atomic units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOfferParams {
    pub amount: u64,
    /// Basis points
    pub interest_rate: u64,
    pub duration_days: u64,
    /// Percent of the loan the borrower must post as collateral
    pub collateral_ratio: u64,
}

/// Borrower's request against an offer, amounts already in atomic units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLoanParams {
    pub lender: String,
    pub offer_id: String,
    pub amount: u64,
    /// Defaults to 150% of `amount`
    #[serde(default)]
    pub collateral_amount: Option<u64>,
    /// Defaults to `collateral_amount` (collateral is USDC-denominated)
    #[serde(default)]
    pub collateral_value: Option<u64>,
    #[serde(default)]
    pub borrower_doc_hash: String,
}

fn require_id(kind: &str, id: &str) -> Result<u64, ContractError> {
    id.trim()
        .parse::<u64>()
        .map_err(|_| ContractError::InvalidArgument {
            message: format!("{} must be a non-negative integer, got '{}'", kind, id),
        })
}

fn require_positive(kind: &str, amount: u64) -> Result<(), ContractError> {
    if amount == 0 {
        return Err(ContractError::InvalidAmount {
            message: format!("{} must be greater than zero", kind),
        });
    }
    Ok(())
}

pub fn create_offer(
    ctx: &TxContext,
    params: &CreateOfferParams,
) -> Result<EntryFunctionPayload, ContractError> {
    require_positive("offer amount", params.amount)?;

    Ok(ctx
        .payload(entry::CREATE_OFFER)
        .type_arg(&ctx.asset.coin_type)
        .u64_arg(params.amount)
        .u64_arg(params.interest_rate)
        .u64_arg(params.duration_days)
        .u64_arg(params.collateral_ratio))
}

pub fn cancel_offer(ctx: &TxContext, offer_id: &str) -> Result<EntryFunctionPayload, ContractError> {
    let id = require_id("offer_id", offer_id)?;
    Ok(ctx
        .payload(entry::CANCEL_OFFER)
        .type_arg(&ctx.asset.coin_type)
        .u64_arg(id))
}

pub fn request_loan(
    ctx: &TxContext,
    params: &RequestLoanParams,
) -> Result<EntryFunctionPayload, ContractError> {
    let lender = AccountAddress::parse(&params.lender).map_err(|e| {
        ContractError::InvalidArgument {
            message: format!("lender: {}", e),
        }
    })?;
    let offer_id = require_id("offer_id", &params.offer_id)?;
    require_positive("loan amount", params.amount)?;

    let collateral_amount = params
        .collateral_amount
        .unwrap_or_else(|| calculator::default_collateral(params.amount));
    let collateral_value = params.collateral_value.unwrap_or(collateral_amount);

    Ok(ctx
        .payload(entry::REQUEST_LOAN)
        // Loan coin and collateral coin are both the lent stable coin
        .type_arg(&ctx.asset.coin_type)
        .type_arg(&ctx.asset.coin_type)
        .address_arg(lender.to_string())
        .u64_arg(offer_id)
        .u64_arg(params.amount)
        .u64_arg(collateral_amount)
        .u64_arg(collateral_value)
        .string_arg(&params.borrower_doc_hash))
}

fn request_action(
    ctx: &TxContext,
    entry_function: &str,
    request_id: &str,
) -> Result<EntryFunctionPayload, ContractError> {
    let id = require_id("request_id", request_id)?;
    Ok(ctx
        .payload(entry_function)
        .type_arg(&ctx.asset.coin_type)
        .u64_arg(id))
}

pub fn approve_loan(ctx: &TxContext, request_id: &str) -> Result<EntryFunctionPayload, ContractError> {
    request_action(ctx, entry::APPROVE_LOAN, request_id)
}

pub fn reject_loan(ctx: &TxContext, request_id: &str) -> Result<EntryFunctionPayload, ContractError> {
    request_action(ctx, entry::REJECT_LOAN, request_id)
}

pub fn repay_loan(ctx: &TxContext, request_id: &str) -> Result<EntryFunctionPayload, ContractError> {
    request_action(ctx, entry::REPAY_LOAN, request_id)
}
