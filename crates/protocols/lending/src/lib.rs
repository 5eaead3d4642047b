//! Peer-to-peer USDC Lending Client
//!
//! Client side of the `lending` Move module: lenders publish offers with an
//! interest rate, duration and collateral ratio; borrowers request loans
//! against them and lenders approve or reject.
//!
//! # Layout
//!
//! - `state` / `fetch`: ledger records, normalization and reads
//! - `poller`: the periodically refreshed contract snapshot
//! - `calculator` / `tx_builder`: amount math and entry-function payloads
//! - `actions`: wallet-signed contract writes
//! - `views`: dashboards derived from a snapshot

pub mod actions;
pub mod calculator;
pub mod constants;
pub mod fetch;
pub mod poller;
pub mod state;
pub mod tx_builder;
pub mod views;

// Re-exports
pub use actions::{CreateOfferForm, InFlight, LendingActions, LoanRequestForm};
pub use calculator::*;
pub use fetch::*;
pub use poller::{ContractPoller, DEFAULT_POLL_INTERVAL};
pub use state::*;
pub use tx_builder::{CreateOfferParams, RequestLoanParams, TxContext};
pub use views::{status_label, status_tone, BorrowerDashboard, LenderDashboard, StatusTone};
