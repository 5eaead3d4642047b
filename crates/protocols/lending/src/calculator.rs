//! Lending Calculator
//!
//! Pure math for amounts, interest and collateral. No I/O.
//!
//! Amounts are parsed from decimal strings digit by digit instead of through
//! floating point, so `"0.29"` is exactly 290_000 atomic units.

use aptlend_core::constants::USDC_DECIMALS;
use aptlend_core::ContractError;

use crate::constants::{BPS_DENOMINATOR, DEFAULT_COLLATERAL_PERCENT};

fn invalid(message: impl Into<String>) -> ContractError {
    ContractError::InvalidAmount {
        message: message.into(),
    }
}

/// Convert a human decimal string to atomic units at `decimals` scale.
///
/// Extra fractional digits are truncated (floor toward zero). Empty,
/// negative and non-numeric input is rejected.
pub fn parse_amount(input: &str, decimals: u8) -> Result<u64, ContractError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid("amount is empty"));
    }
    if trimmed.starts_with('-') {
        return Err(invalid(format!("negative amount '{}'", trimmed)));
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid(format!("'{}' is not a number", trimmed)));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid(format!("'{}' is not a number", trimmed)));
    }

    let scale = 10u64
        .checked_pow(decimals as u32)
        .ok_or_else(|| invalid(format!("unsupported decimals {}", decimals)))?;

    let whole_units: u64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u64>()
            .map_err(|_| invalid(format!("'{}' is too large", trimmed)))?
    };

    let kept: String = fraction.chars().take(decimals as usize).collect();
    let fraction_units: u64 = if kept.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", kept, width = decimals as usize);
        padded
            .parse::<u64>()
            .map_err(|_| invalid(format!("'{}' is not a number", trimmed)))?
    };

    whole_units
        .checked_mul(scale)
        .and_then(|w| w.checked_add(fraction_units))
        .ok_or_else(|| invalid(format!("'{}' is too large", trimmed)))
}

/// Human USDC string to atomic units (6 decimals)
pub fn parse_usdc(input: &str) -> Result<u64, ContractError> {
    parse_amount(input, USDC_DECIMALS)
}

/// Atomic units to a human value at `decimals` scale
pub fn format_amount(atomic: u64, decimals: u8) -> f64 {
    atomic as f64 / 10f64.powi(decimals as i32)
}

/// Atomic USDC to a human value: `format_usdc(500_000) == 0.5`
pub fn format_usdc(atomic: u64) -> f64 {
    format_amount(atomic, USDC_DECIMALS)
}

/// Exact decimal rendering with at least two fractional digits
/// (`1_500_000` → `"1.50"`, `1_234_567` → `"1.234567"`).
pub fn format_amount_display(atomic: u64, decimals: u8) -> String {
    if decimals == 0 {
        return format!("{}.00", atomic);
    }
    let scale = 10u64.pow(decimals as u32);
    let whole = atomic / scale;
    let fraction = format!("{:0>width$}", atomic % scale, width = decimals as usize);
    let mut fraction = fraction.trim_end_matches('0').to_string();
    while fraction.len() < 2 {
        fraction.push('0');
    }
    format!("{}.{}", whole, fraction)
}

pub fn format_usdc_display(atomic: u64) -> String {
    format_amount_display(atomic, USDC_DECIMALS)
}

/// Percent string to basis points, floored: `"7.5"` → 750
pub fn parse_interest_bps(percent: &str) -> Result<u64, ContractError> {
    parse_amount(percent, 2)
}

/// Basis points to percent: 750 → 7.5
pub fn interest_rate_percent(bps: u64) -> f64 {
    bps as f64 / 100.0
}

/// Interest owed on `principal` at a flat `bps` rate, floored
pub fn interest_due(principal: u64, bps: u64) -> u64 {
    let due = principal as u128 * bps as u128 / BPS_DENOMINATOR as u128;
    due.min(u64::MAX as u128) as u64
}

/// Principal plus flat interest
pub fn total_repayment(principal: u64, bps: u64) -> u64 {
    principal.saturating_add(interest_due(principal, bps))
}

/// Collateral posted when the borrower gives none: 150% of the loan, floored
pub fn default_collateral(loan_amount: u64) -> u64 {
    let collateral = loan_amount as u128 * DEFAULT_COLLATERAL_PERCENT as u128 / 100;
    collateral.min(u64::MAX as u128) as u64
}

/// Collateral as a percentage of the loan, `None` for a zero loan
pub fn collateral_ratio_percent(collateral: u64, loan_amount: u64) -> Option<f64> {
    if loan_amount == 0 {
        return None;
    }
    Some(collateral as f64 * 100.0 / loan_amount as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_usdc() {
        assert_eq!(parse_usdc("100").unwrap(), 100_000_000);
        assert_eq!(parse_usdc("0.5").unwrap(), 500_000);
        assert_eq!(parse_usdc(" 12.25 ").unwrap(), 12_250_000);
        assert_eq!(parse_usdc(".5").unwrap(), 500_000);
        assert_eq!(parse_usdc("5.").unwrap(), 5_000_000);
        // Float-unfriendly value stays exact
        assert_eq!(parse_usdc("0.29").unwrap(), 290_000);
    }

    #[test]
    fn test_parse_usdc_truncates_extra_digits() {
        assert_eq!(parse_usdc("1.2345678").unwrap(), 1_234_567);
        assert_eq!(parse_usdc("0.0000009").unwrap(), 0);
    }

    #[test]
    fn test_parse_usdc_rejects_bad_input() {
        assert!(parse_usdc("").is_err());
        assert!(parse_usdc("   ").is_err());
        assert!(parse_usdc("-1").is_err());
        assert!(parse_usdc("abc").is_err());
        assert!(parse_usdc("1.2.3").is_err());
        assert!(parse_usdc(".").is_err());
        assert!(parse_usdc("1e6").is_err());
        assert!(parse_usdc("99999999999999999999").is_err());
    }

    #[test]
    fn test_format_usdc() {
        assert_eq!(format_usdc(1_000_000), 1.0);
        assert_eq!(format_usdc(500_000), 0.5);
        assert_eq!(format_usdc(0), 0.0);
    }

    #[test]
    fn test_format_then_parse_is_identity_on_atomic_units() {
        for atomic in [0u64, 1, 290_000, 500_000, 1_000_000, 1_234_567, 987_654_321_000] {
            let human = format_usdc(atomic).to_string();
            assert_eq!(parse_usdc(&human).unwrap(), atomic, "round trip of {}", human);
        }
    }

    #[test]
    fn test_format_usdc_display() {
        assert_eq!(format_usdc_display(1_500_000), "1.50");
        assert_eq!(format_usdc_display(1_000_000), "1.00");
        assert_eq!(format_usdc_display(1_234_567), "1.234567");
        assert_eq!(format_usdc_display(10), "0.00001");
    }

    #[test]
    fn test_interest() {
        assert_eq!(parse_interest_bps("7.5").unwrap(), 750);
        assert_eq!(parse_interest_bps("5").unwrap(), 500);
        assert_eq!(parse_interest_bps("0.129").unwrap(), 12);
        assert_eq!(interest_rate_percent(750), 7.5);

        // 100 USDC at 7.5% flat
        assert_eq!(interest_due(100_000_000, 750), 7_500_000);
        assert_eq!(total_repayment(100_000_000, 750), 107_500_000);
        assert_eq!(interest_due(3, 5000), 1);
    }

    #[test]
    fn test_default_collateral() {
        assert_eq!(default_collateral(100_000_000), 150_000_000);
        assert_eq!(default_collateral(3), 4);
        assert_eq!(default_collateral(u64::MAX), u64::MAX);
        assert_eq!(collateral_ratio_percent(150, 100), Some(150.0));
        assert_eq!(collateral_ratio_percent(150, 0), None);
    }
}
