//! Dashboard views derived from a contract snapshot

use aptlend_core::addresses_match;
use serde::Serialize;

use crate::calculator;
use crate::state::{self, ContractState, LoanOffer, LoanRequest, LoanStatus};

/// Colour family a UI should use for a status chip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTone {
    Primary,
    Success,
    Error,
    Default,
    Warning,
}

impl StatusTone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Success => "success",
            Self::Error => "error",
            Self::Default => "default",
            Self::Warning => "warning",
        }
    }
}

pub fn status_tone(status: &str) -> StatusTone {
    match status.to_ascii_lowercase().as_str() {
        "pending" => StatusTone::Primary,
        "approved" => StatusTone::Success,
        "rejected" => StatusTone::Error,
        "repaid" => StatusTone::Default,
        "defaulted" => StatusTone::Warning,
        _ => StatusTone::Default,
    }
}

/// `"pending"` → `"Pending"`
pub fn status_label(status: &str) -> String {
    let mut chars = status.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Everything a lender sees about their own book
#[derive(Debug, Clone, Serialize)]
pub struct LenderDashboard {
    pub lender: String,
    pub offers: Vec<LoanOffer>,
    pub pending_requests: Vec<LoanRequest>,
    pub active_loans: Vec<LoanRequest>,
    /// Sum of open offer amounts
    pub total_offered: u64,
    /// Principal currently out on approved loans
    pub total_lent: u64,
    /// Interest the active loans will pay at maturity
    pub expected_interest: u64,
}

impl LenderDashboard {
    pub fn build(state: &ContractState, lender: &str) -> Self {
        let offers = state::filter_offers(state, Some(lender));
        let pending_requests = state::pending_requests_for_lender(state, lender);
        let active_loans: Vec<LoanRequest> = state::user_loans(state, lender)
            .into_iter()
            .filter(|r| r.status == LoanStatus::Approved && addresses_match(&r.lender, lender))
            .collect();

        let total_offered = offers
            .iter()
            .filter(|o| o.is_open())
            .fold(0u64, |acc, o| acc.saturating_add(o.amount));
        let total_lent = active_loans
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.loan_amount));
        let expected_interest = active_loans.iter().fold(0u64, |acc, r| {
            acc.saturating_add(calculator::interest_due(r.loan_amount, r.interest_rate))
        });

        Self {
            lender: lender.to_string(),
            offers,
            pending_requests,
            active_loans,
            total_offered,
            total_lent,
            expected_interest,
        }
    }
}

/// What a borrower can take and what they owe
#[derive(Debug, Clone, Serialize)]
pub struct BorrowerDashboard {
    pub borrower: String,
    /// Open offers from other lenders
    pub available_offers: Vec<LoanOffer>,
    pub my_requests: Vec<LoanRequest>,
    pub active_loans: Vec<LoanRequest>,
    pub outstanding_principal: u64,
    /// Principal plus interest across active loans
    pub amount_due: u64,
}

impl BorrowerDashboard {
    pub fn build(state: &ContractState, borrower: &str) -> Self {
        let available_offers: Vec<LoanOffer> = state::filter_offers(state, None)
            .into_iter()
            .filter(|o| o.is_open() && !addresses_match(&o.lender, borrower))
            .collect();
        let my_requests = state::my_loans(state, Some(borrower));
        let active_loans: Vec<LoanRequest> = my_requests
            .iter()
            .filter(|r| r.status == LoanStatus::Approved)
            .cloned()
            .collect();

        let outstanding_principal = active_loans
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.loan_amount));
        let amount_due = active_loans.iter().fold(0u64, |acc, r| {
            acc.saturating_add(calculator::total_repayment(r.loan_amount, r.interest_rate))
        });

        Self {
            borrower: borrower.to_string(),
            available_offers,
            my_requests,
            active_loans,
            outstanding_principal,
            amount_due,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{RawLoanOffer, RawLoanRequest};
    use serde_json::json;

    fn state() -> ContractState {
        let mut state = ContractState::default();
        for (id, raw) in [
            ("1", json!({"lender": "0x123", "amount": "100000000", "status": 0})),
            ("2", json!({"lender": "0x123", "amount": "50000000", "status": 2})),
            ("3", json!({"lender": "0x999", "amount": "70000000", "status": 0})),
        ] {
            state.offers.insert(
                id.to_string(),
                RawLoanOffer::from_value(&raw).normalize(id, "2024-05-01T00:00:00Z"),
            );
        }
        for (id, raw) in [
            ("10", json!({"offer_id": "1", "borrower": "0x456", "lender": "0x123", "loan_amount": "20000000", "interest_rate": "500", "status": 1})),
            ("11", json!({"offer_id": "1", "borrower": "0x789", "lender": "0x123", "loan_amount": "10000000", "status": 0})),
            ("12", json!({"offer_id": "3", "borrower": "0x456", "lender": "0x999", "loan_amount": "5000000", "status": 0})),
        ] {
            state.loans.insert(
                id.to_string(),
                RawLoanRequest::from_value(&raw).normalize(id, "2024-05-01T00:00:00Z"),
            );
        }
        state
    }

    #[test]
    fn test_status_helpers() {
        assert_eq!(status_label("pending"), "Pending");
        assert_eq!(status_label(""), "");
        assert_eq!(status_tone("pending"), StatusTone::Primary);
        assert_eq!(status_tone("approved"), StatusTone::Success);
        assert_eq!(status_tone("rejected"), StatusTone::Error);
        assert_eq!(status_tone("repaid"), StatusTone::Default);
        assert_eq!(status_tone("defaulted"), StatusTone::Warning);
        assert_eq!(status_tone("something-else"), StatusTone::Default);
    }

    #[test]
    fn test_lender_dashboard() {
        let dashboard = LenderDashboard::build(&state(), "0x0123");
        assert_eq!(dashboard.offers.len(), 2);
        assert_eq!(dashboard.total_offered, 100_000_000);
        assert_eq!(dashboard.pending_requests.len(), 1);
        assert_eq!(dashboard.pending_requests[0].request_id, "11");
        assert_eq!(dashboard.active_loans.len(), 1);
        assert_eq!(dashboard.total_lent, 20_000_000);
        assert_eq!(dashboard.expected_interest, 1_000_000);
    }

    #[test]
    fn test_borrower_dashboard() {
        let dashboard = BorrowerDashboard::build(&state(), "0x456");
        let offer_ids: Vec<_> = dashboard
            .available_offers
            .iter()
            .map(|o| o.offer_id.as_str())
            .collect();
        assert_eq!(offer_ids, vec!["1", "3"]);
        assert_eq!(dashboard.my_requests.len(), 2);
        assert_eq!(dashboard.active_loans.len(), 1);
        assert_eq!(dashboard.outstanding_principal, 20_000_000);
        assert_eq!(dashboard.amount_due, 21_000_000);

        // A lender does not see their own offers as available
        let lender_view = BorrowerDashboard::build(&state(), "0x123");
        assert_eq!(lender_view.available_offers.len(), 1);
    }
}
