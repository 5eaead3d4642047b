//! Lending Contract Constants
//!
//! Resource, entry-function and status identifiers of the deployed Move
//! module. Addresses and coin types are configuration, see
//! `aptlend_core::config`.

/// Resources published under the contract address
pub mod resources {
    pub const OFFERS: &str = "Offers";
    pub const LOANS: &str = "Loans";
    pub const PLATFORM_CONFIG: &str = "PlatformConfig";
    /// Value type of the `loan_requests` table
    pub const LOAN_REQUEST: &str = "LoanRequest";
    /// Key type of the `loan_requests` table
    pub const LOAN_REQUEST_KEY_TYPE: &str = "u64";
}

/// Public entry functions of the module
pub mod entry {
    pub const CREATE_OFFER: &str = "create_offer";
    pub const CANCEL_OFFER: &str = "cancel_offer";
    pub const REQUEST_LOAN: &str = "request_loan";
    pub const APPROVE_LOAN: &str = "approve_loan";
    pub const REJECT_LOAN: &str = "reject_loan";
    pub const REPAY_LOAN: &str = "repay_loan";
}

/// On-chain numeric status codes
pub mod status_codes {
    pub const OFFER_OPEN: u64 = 0;
    pub const OFFER_FULFILLED: u64 = 1;
    pub const OFFER_CANCELLED: u64 = 2;

    pub const LOAN_PENDING: u64 = 0;
    pub const LOAN_APPROVED: u64 = 1;
    pub const LOAN_REPAID: u64 = 2;
    pub const LOAN_DEFAULTED: u64 = 3;
    pub const LOAN_REJECTED: u64 = 4;
}

/// Basis points in 100%
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Collateral a borrower posts when none is given, as percent of the loan
pub const DEFAULT_COLLATERAL_PERCENT: u64 = 150;

/// Longest loan duration the forms accept
pub const MAX_DURATION_DAYS: u64 = 3_650;
