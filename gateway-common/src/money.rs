use rust_decimal::Decimal;

pub const DECIMAL_PLACES: u32 = 2;
pub const MAX_DIGITS: u32 = 18;

/// Rounds to the gateway's fixed scale (two decimal places). Amounts are
/// validated positive by the caller; this only normalizes scale.
pub fn normalize(amount: Decimal) -> Decimal {
    amount.round_dp(DECIMAL_PLACES)
}

pub fn is_positive(amount: Decimal) -> bool {
    amount > Decimal::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn normalize_rounds_to_two_places() {
        let amount = Decimal::from_str("10.005").unwrap();
        assert_eq!(normalize(amount), Decimal::from_str("10.01").unwrap());
    }

    #[test]
    fn rejects_non_positive() {
        assert!(!is_positive(Decimal::ZERO));
        assert!(!is_positive(Decimal::from_str("-1").unwrap()));
        assert!(is_positive(Decimal::from_str("0.01").unwrap()));
    }
}
