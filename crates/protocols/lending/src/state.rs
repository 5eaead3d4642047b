//! Lending State Types
//!
//! Offers and loan requests as read from the contract, plus the snapshot the
//! poller maintains. Raw ledger records pass through a single normalization
//! step so everything downstream works with fully defaulted values.

use std::collections::BTreeMap;

use aptlend_core::{addresses_match, AccountAddress, ContractError};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::status_codes;

// =============================================================================
// Statuses
// =============================================================================

/// Lifecycle of a loan offer: `open → {fulfilled, cancelled}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Open,
    Fulfilled,
    Cancelled,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Fulfilled => "fulfilled",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            status_codes::OFFER_OPEN => Some(Self::Open),
            status_codes::OFFER_FULFILLED => Some(Self::Fulfilled),
            status_codes::OFFER_CANCELLED => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Accepts a status name in any case, or the contract's numeric code
    pub fn from_json(value: &Value) -> Option<Self> {
        if let Some(code) = json_u64(value) {
            return Self::from_code(code);
        }
        match value.as_str()?.trim().to_ascii_lowercase().as_str() {
            "open" => Some(Self::Open),
            "fulfilled" => Some(Self::Fulfilled),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: OfferStatus) -> bool {
        matches!(
            (self, next),
            (Self::Open, Self::Fulfilled) | (Self::Open, Self::Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Open)
    }
}

/// Lifecycle of a loan request:
/// `pending → {approved, rejected}`, `approved → {repaid, defaulted}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
    Repaid,
    Defaulted,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Repaid => "repaid",
            Self::Defaulted => "defaulted",
        }
    }

    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            status_codes::LOAN_PENDING => Some(Self::Pending),
            status_codes::LOAN_APPROVED => Some(Self::Approved),
            status_codes::LOAN_REPAID => Some(Self::Repaid),
            status_codes::LOAN_DEFAULTED => Some(Self::Defaulted),
            status_codes::LOAN_REJECTED => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Accepts a status name in any case, or the contract's numeric code
    pub fn from_json(value: &Value) -> Option<Self> {
        if let Some(code) = json_u64(value) {
            return Self::from_code(code);
        }
        match value.as_str()?.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "repaid" => Some(Self::Repaid),
            "defaulted" => Some(Self::Defaulted),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: LoanStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Approved, Self::Repaid)
                | (Self::Approved, Self::Defaulted)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Repaid | Self::Defaulted)
    }
}

// =============================================================================
// Normalized records
// =============================================================================

/// A lender's standing offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanOffer {
    pub offer_id: String,
    pub lender: String,
    /// Atomic USDC units
    pub amount: u64,
    /// Basis points
    pub interest_rate: u64,
    pub duration_days: u64,
    pub status: OfferStatus,
    pub created_at: String,
    pub updated_at: String,
    pub borrower_details_hash: String,
    pub collateral_details_hash: String,
}

impl LoanOffer {
    pub fn is_open(&self) -> bool {
        self.status == OfferStatus::Open
    }
}

/// A borrower's request against an offer; once approved it is the loan itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRequest {
    pub request_id: String,
    pub offer_id: String,
    pub borrower: String,
    pub lender: String,
    /// Atomic USDC units
    pub loan_amount: u64,
    /// Basis points
    pub interest_rate: u64,
    pub loan_duration_days: u64,
    pub status: LoanStatus,
    pub collateral_amount: u64,
    pub collateral_value: u64,
    pub created_at: String,
    pub updated_at: String,
    pub approved_at: Option<String>,
    pub repaid_at: Option<String>,
    pub liquidated_at: Option<String>,
    pub borrower_details_hash: String,
    pub collateral_details_hash: String,
}

impl LoanRequest {
    /// Approved and not yet settled
    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Approved
    }
}

// =============================================================================
// Raw records (normalization boundary)
// =============================================================================

/// Offer record exactly as the ledger returned it. Every field may be
/// missing or carry an unexpected JSON type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLoanOffer {
    pub offer_id: Option<Value>,
    pub lender: Option<Value>,
    pub amount: Option<Value>,
    pub interest_rate: Option<Value>,
    pub duration_days: Option<Value>,
    pub status: Option<Value>,
    pub created_at: Option<Value>,
    pub updated_at: Option<Value>,
    pub borrower_details_hash: Option<Value>,
    pub collateral_details_hash: Option<Value>,
}

impl RawLoanOffer {
    /// Anything that is not an object yields an all-missing record
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    /// Key the record should be stored under when it arrives without one
    pub fn embedded_id(&self) -> Option<String> {
        self.offer_id.as_ref().and_then(json_string)
    }

    pub fn normalize(self, key: &str, fetched_at: &str) -> LoanOffer {
        LoanOffer {
            offer_id: key.to_string(),
            lender: opt_address(&self.lender),
            amount: opt_u64(&self.amount),
            interest_rate: opt_u64(&self.interest_rate),
            duration_days: opt_u64(&self.duration_days),
            status: self
                .status
                .as_ref()
                .and_then(OfferStatus::from_json)
                .unwrap_or(OfferStatus::Open),
            created_at: opt_timestamp(&self.created_at).unwrap_or_else(|| fetched_at.to_string()),
            updated_at: opt_timestamp(&self.updated_at).unwrap_or_else(|| fetched_at.to_string()),
            borrower_details_hash: opt_string(&self.borrower_details_hash),
            collateral_details_hash: opt_string(&self.collateral_details_hash),
        }
    }
}

/// Loan request record exactly as the ledger returned it
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLoanRequest {
    pub request_id: Option<Value>,
    pub offer_id: Option<Value>,
    pub borrower: Option<Value>,
    pub lender: Option<Value>,
    pub loan_amount: Option<Value>,
    pub interest_rate: Option<Value>,
    pub loan_duration_days: Option<Value>,
    pub status: Option<Value>,
    pub collateral_amount: Option<Value>,
    pub collateral_value: Option<Value>,
    pub created_at: Option<Value>,
    pub updated_at: Option<Value>,
    pub approved_at: Option<Value>,
    pub repaid_at: Option<Value>,
    pub liquidated_at: Option<Value>,
    pub borrower_details_hash: Option<Value>,
    pub collateral_details_hash: Option<Value>,
}

impl RawLoanRequest {
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn embedded_id(&self) -> Option<String> {
        self.request_id.as_ref().and_then(json_string)
    }

    pub fn normalize(self, key: &str, fetched_at: &str) -> LoanRequest {
        LoanRequest {
            request_id: key.to_string(),
            offer_id: opt_string(&self.offer_id),
            borrower: opt_address(&self.borrower),
            lender: opt_address(&self.lender),
            loan_amount: opt_u64(&self.loan_amount),
            interest_rate: opt_u64(&self.interest_rate),
            loan_duration_days: opt_u64(&self.loan_duration_days),
            status: self
                .status
                .as_ref()
                .and_then(LoanStatus::from_json)
                .unwrap_or(LoanStatus::Pending),
            collateral_amount: opt_u64(&self.collateral_amount),
            collateral_value: opt_u64(&self.collateral_value),
            created_at: opt_timestamp(&self.created_at).unwrap_or_else(|| fetched_at.to_string()),
            updated_at: opt_timestamp(&self.updated_at).unwrap_or_else(|| fetched_at.to_string()),
            approved_at: opt_timestamp(&self.approved_at),
            repaid_at: opt_timestamp(&self.repaid_at),
            liquidated_at: opt_timestamp(&self.liquidated_at),
            borrower_details_hash: opt_string(&self.borrower_details_hash),
            collateral_details_hash: opt_string(&self.collateral_details_hash),
        }
    }
}

/// Unwrap a Move `Option<T>` (`{"vec": [x]}` / `{"vec": []}`)
fn unwrap_move_option(value: &Value) -> Option<&Value> {
    match value.get("vec") {
        Some(Value::Array(items)) => items.first(),
        _ => Some(value),
    }
}

/// `u64` from a JSON number or decimal string
pub fn json_u64(value: &Value) -> Option<u64> {
    match unwrap_move_option(value)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.floor() as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Non-empty string from a JSON string or number
pub fn json_string(value: &Value) -> Option<String> {
    match unwrap_move_option(value)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn opt_u64(value: &Option<Value>) -> u64 {
    value.as_ref().and_then(json_u64).unwrap_or(0)
}

fn opt_string(value: &Option<Value>) -> String {
    value.as_ref().and_then(json_string).unwrap_or_default()
}

/// Addresses are stored in canonical short form when they parse as one
fn opt_address(value: &Option<Value>) -> String {
    let raw = opt_string(value);
    AccountAddress::parse(&raw)
        .map(|a| a.to_string())
        .unwrap_or(raw)
}

/// Timestamp as RFC 3339. Numeric values are unix seconds; zero and empty
/// values count as unset.
fn opt_timestamp(value: &Option<Value>) -> Option<String> {
    let value = value.as_ref()?;
    if let Some(secs) = json_u64(value) {
        if secs == 0 {
            return None;
        }
        return DateTime::<Utc>::from_timestamp(secs as i64, 0)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true));
    }
    json_string(value)
}

// =============================================================================
// Platform config
// =============================================================================

/// `PlatformConfig` resource: request counter and the request table handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformConfig {
    pub total_requests: u64,
    pub loan_requests_handle: String,
}

impl PlatformConfig {
    pub fn from_resource(data: &Value) -> Result<Self, ContractError> {
        let decode_err = |message: &str| ContractError::Decode {
            resource: "PlatformConfig".to_string(),
            message: message.to_string(),
        };

        let total_requests = data
            .get("total_requests")
            .and_then(json_u64)
            .ok_or_else(|| decode_err("missing total_requests"))?;
        let loan_requests_handle = data
            .get("loan_requests")
            .and_then(|t| t.get("handle"))
            .and_then(json_string)
            .ok_or_else(|| decode_err("missing loan_requests.handle"))?;

        Ok(Self {
            total_requests,
            loan_requests_handle,
        })
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Poller snapshot of the contract
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContractState {
    pub offers: BTreeMap<String, LoanOffer>,
    pub loans: BTreeMap<String, LoanRequest>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Numeric ids ascending, then any non-numeric ids in lexical order
fn id_order(id: &str) -> (bool, u64, String) {
    match id.parse::<u64>() {
        Ok(n) => (false, n, String::new()),
        Err(_) => (true, 0, id.to_string()),
    }
}

/// Offers, optionally only those of `lender` (an empty filter matches all)
pub fn filter_offers(state: &ContractState, lender: Option<&str>) -> Vec<LoanOffer> {
    let lender = lender.filter(|l| !l.is_empty());
    let mut offers: Vec<LoanOffer> = state
        .offers
        .values()
        .filter(|o| lender.map_or(true, |l| addresses_match(&o.lender, l)))
        .cloned()
        .collect();
    offers.sort_by_key(|o| id_order(&o.offer_id));
    offers
}

/// Loan requests, optionally narrowed by borrower and offer (both must match)
pub fn filter_requests(
    state: &ContractState,
    borrower: Option<&str>,
    offer_id: Option<&str>,
) -> Vec<LoanRequest> {
    let borrower = borrower.filter(|b| !b.is_empty());
    let offer_id = offer_id.filter(|id| !id.is_empty());
    let mut loans: Vec<LoanRequest> = state
        .loans
        .values()
        .filter(|r| borrower.map_or(true, |b| addresses_match(&r.borrower, b)))
        .filter(|r| offer_id.map_or(true, |id| r.offer_id == id))
        .cloned()
        .collect();
    loans.sort_by_key(|r| id_order(&r.request_id));
    loans
}

/// Requests where `address` is the borrower; empty without an address
pub fn my_loans(state: &ContractState, address: Option<&str>) -> Vec<LoanRequest> {
    match address {
        Some(a) if !a.is_empty() => filter_requests(state, Some(a), None),
        _ => Vec::new(),
    }
}

/// Requests where `address` is either borrower or lender
pub fn user_loans(state: &ContractState, address: &str) -> Vec<LoanRequest> {
    let mut loans: Vec<LoanRequest> = state
        .loans
        .values()
        .filter(|r| addresses_match(&r.borrower, address) || addresses_match(&r.lender, address))
        .cloned()
        .collect();
    loans.sort_by_key(|r| id_order(&r.request_id));
    loans
}

/// Pending requests against offers made by `lender`
pub fn pending_requests_for_lender(state: &ContractState, lender: &str) -> Vec<LoanRequest> {
    let mut loans: Vec<LoanRequest> = state
        .loans
        .values()
        .filter(|r| r.status == LoanStatus::Pending)
        .filter(|r| {
            addresses_match(&r.lender, lender)
                || state
                    .offers
                    .get(&r.offer_id)
                    .is_some_and(|o| addresses_match(&o.lender, lender))
        })
        .cloned()
        .collect();
    loans.sort_by_key(|r| id_order(&r.request_id));
    loans
}

/// Requests whose `offer_id` names no known offer
pub fn orphaned_requests(state: &ContractState) -> Vec<LoanRequest> {
    let mut loans: Vec<LoanRequest> = state
        .loans
        .values()
        .filter(|r| !state.offers.contains_key(&r.offer_id))
        .cloned()
        .collect();
    loans.sort_by_key(|r| id_order(&r.request_id));
    loans
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FETCHED: &str = "2024-05-01T00:00:00Z";

    fn offer(id: &str, lender: &str) -> LoanOffer {
        RawLoanOffer::from_value(&json!({ "lender": lender, "amount": "1000000" }))
            .normalize(id, FETCHED)
    }

    fn request(id: &str, offer_id: &str, borrower: &str) -> LoanRequest {
        RawLoanRequest::from_value(&json!({
            "offer_id": offer_id,
            "borrower": borrower,
            "lender": "0x123",
        }))
        .normalize(id, FETCHED)
    }

    fn sample_state() -> ContractState {
        let mut state = ContractState::default();
        state.offers.insert("1".into(), offer("1", "0x123"));
        state.offers.insert("2".into(), offer("2", "0x789"));
        state.loans.insert("5".into(), request("5", "1", "0x456"));
        state.loans.insert("6".into(), request("6", "2", "0xabc"));
        state
    }

    #[test]
    fn test_offer_normalization_defaults() {
        let offer = RawLoanOffer::from_value(&json!({ "lender": "0x0123" })).normalize("3", FETCHED);

        assert_eq!(offer.offer_id, "3");
        assert_eq!(offer.lender, "0x123");
        assert_eq!(offer.amount, 0);
        assert_eq!(offer.interest_rate, 0);
        assert_eq!(offer.status, OfferStatus::Open);
        assert_eq!(offer.created_at, FETCHED);
        assert_eq!(offer.updated_at, FETCHED);
        assert_eq!(offer.borrower_details_hash, "");
    }

    #[test]
    fn test_request_normalization_mixed_encodings() {
        let loan = RawLoanRequest::from_value(&json!({
            "offer_id": 4,
            "borrower": "0x456",
            "loan_amount": "2500000",
            "interest_rate": 750,
            "status": 1,
            "collateral_amount": "3750000",
            "created_at": "1700000000",
            "approved_at": {"vec": ["1700000600"]},
            "repaid_at": {"vec": []},
            "borrower_details_hash": "ipfs_hash_borrower_1"
        }))
        .normalize("9", FETCHED);

        assert_eq!(loan.request_id, "9");
        assert_eq!(loan.offer_id, "4");
        assert_eq!(loan.loan_amount, 2_500_000);
        assert_eq!(loan.interest_rate, 750);
        assert_eq!(loan.status, LoanStatus::Approved);
        assert_eq!(loan.collateral_value, 0);
        assert_eq!(loan.created_at, "2023-11-14T22:13:20Z");
        assert_eq!(loan.approved_at.as_deref(), Some("2023-11-14T22:23:20Z"));
        assert_eq!(loan.repaid_at, None);
        assert_eq!(loan.liquidated_at, None);
        assert_eq!(loan.updated_at, FETCHED);
    }

    #[test]
    fn test_malformed_record_is_absorbed() {
        let loan = RawLoanRequest::from_value(&json!("garbage")).normalize("1", FETCHED);
        assert_eq!(loan.status, LoanStatus::Pending);
        assert_eq!(loan.borrower, "");

        let offer = RawLoanOffer::from_value(&json!({
            "amount": [1, 2],
            "status": "exploded"
        }))
        .normalize("2", FETCHED);
        assert_eq!(offer.amount, 0);
        assert_eq!(offer.status, OfferStatus::Open);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(OfferStatus::from_json(&json!("Cancelled")), Some(OfferStatus::Cancelled));
        assert_eq!(OfferStatus::from_json(&json!(1)), Some(OfferStatus::Fulfilled));
        assert_eq!(LoanStatus::from_json(&json!("4")), Some(LoanStatus::Rejected));
        assert_eq!(LoanStatus::from_json(&json!(3)), Some(LoanStatus::Defaulted));
        assert_eq!(LoanStatus::from_json(&json!(9)), None);
    }

    #[test]
    fn test_status_transitions() {
        assert!(OfferStatus::Open.can_transition_to(OfferStatus::Cancelled));
        assert!(!OfferStatus::Cancelled.can_transition_to(OfferStatus::Open));
        assert!(LoanStatus::Pending.can_transition_to(LoanStatus::Approved));
        assert!(LoanStatus::Approved.can_transition_to(LoanStatus::Repaid));
        assert!(!LoanStatus::Pending.can_transition_to(LoanStatus::Repaid));
        assert!(!LoanStatus::Rejected.can_transition_to(LoanStatus::Approved));
        assert!(LoanStatus::Defaulted.is_terminal());
        assert!(!LoanStatus::Approved.is_terminal());
        assert!(OfferStatus::Fulfilled.is_terminal());
    }

    #[test]
    fn test_filter_offers_by_lender() {
        let state = sample_state();
        let offers = filter_offers(&state, Some("0x123"));
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].offer_id, "1");

        assert_eq!(filter_offers(&state, None).len(), 2);
        assert_eq!(filter_offers(&state, Some("0x0123")).len(), 1);
    }

    #[test]
    fn test_filter_requests() {
        let state = sample_state();
        let loans = filter_requests(&state, Some("0x456"), None);
        assert_eq!(loans.len(), 1);
        assert_eq!(loans[0].request_id, "5");

        assert_eq!(filter_requests(&state, None, Some("2")).len(), 1);
        assert!(filter_requests(&state, Some("0x456"), Some("2")).is_empty());
    }

    #[test]
    fn test_my_loans() {
        let state = sample_state();
        let mine = my_loans(&state, Some("0x456"));
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].request_id, "5");
        assert!(my_loans(&state, None).is_empty());
        assert!(my_loans(&state, Some("")).is_empty());
    }

    #[test]
    fn test_user_and_lender_views() {
        let state = sample_state();
        // 0x123 is lender on both requests
        assert_eq!(user_loans(&state, "0x123").len(), 2);
        assert_eq!(pending_requests_for_lender(&state, "0x123").len(), 2);
        assert_eq!(pending_requests_for_lender(&state, "0x789").len(), 1);
        assert!(orphaned_requests(&state).is_empty());
    }

    #[test]
    fn test_orphaned_requests() {
        let mut state = sample_state();
        state.loans.insert("7".into(), request("7", "99", "0x456"));
        let orphans = orphaned_requests(&state);
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].request_id, "7");
    }

    #[test]
    fn test_numeric_id_ordering() {
        let mut state = ContractState::default();
        for id in ["10", "2", "1"] {
            state.offers.insert(id.into(), offer(id, "0x1"));
        }
        let ids: Vec<String> = filter_offers(&state, None)
            .into_iter()
            .map(|o| o.offer_id)
            .collect();
        assert_eq!(ids, vec!["1", "2", "10"]);
    }

    #[test]
    fn test_platform_config() {
        let config = PlatformConfig::from_resource(&json!({
            "total_requests": "3",
            "loan_requests": {"handle": "0xfeed"}
        }))
        .unwrap();
        assert_eq!(config.total_requests, 3);
        assert_eq!(config.loan_requests_handle, "0xfeed");

        assert!(PlatformConfig::from_resource(&json!({"total_requests": 1})).is_err());
    }
}
