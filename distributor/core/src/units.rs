// Copyright (c) 2024 The Botho Foundation

//! Native currency amounts.
//!
//! Amounts are carried as integers in the smallest unit. One BTH is
//! 10^18 units, so 100 BTH already exceeds `u64::MAX` and `u128` is used
//! throughout.

use crate::error::DistributorError;

/// An amount in the smallest currency unit.
pub type Amount = u128;

/// Fractional digits of one coin.
pub const DECIMALS: usize = 18;

/// Units per whole coin.
pub const UNITS_PER_BTH: Amount = 1_000_000_000_000_000_000;

/// Convert a whole number of coins into units.
pub const fn bth(coins: u64) -> Amount {
    coins as Amount * UNITS_PER_BTH
}

/// Format an amount as a decimal coin string, e.g. `"7.5 BTH"`.
pub fn format_amount(units: Amount) -> String {
    let whole = units / UNITS_PER_BTH;
    let frac = units % UNITS_PER_BTH;
    if frac == 0 {
        return format!("{} BTH", whole);
    }
    let digits = format!("{:0width$}", frac, width = DECIMALS);
    format!("{}.{} BTH", whole, digits.trim_end_matches('0'))
}

/// Parse a decimal coin string (optionally suffixed with `BTH`) into units.
///
/// Parsing is exact: no floating point is involved, and more than
/// [`DECIMALS`] fractional digits is an error rather than a rounding.
pub fn parse_amount(input: &str) -> Result<Amount, DistributorError> {
    let invalid = |reason: &str| DistributorError::InvalidAmount(format!("{:?}: {}", input, reason));

    let value = input.trim().trim_end_matches("BTH").trim();
    if value.is_empty() {
        return Err(invalid("empty"));
    }
    if value.starts_with('-') {
        return Err(invalid("amount cannot be negative"));
    }

    let (whole, frac) = match value.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (value, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid("no digits"));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("not a decimal number"));
    }
    if frac.len() > DECIMALS {
        return Err(invalid("too many fractional digits"));
    }

    let whole_units = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<Amount>()
            .map_err(|_| invalid("out of range"))?
            .checked_mul(UNITS_PER_BTH)
            .ok_or_else(|| invalid("out of range"))?
    };
    let frac_units = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = DECIMALS);
        padded.parse::<Amount>().map_err(|_| invalid("out of range"))?
    };

    whole_units
        .checked_add(frac_units)
        .ok_or_else(|| invalid("out of range"))
}
