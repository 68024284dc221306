use bigdecimal::{BigDecimal, RoundingMode};

/// Round a monetary value to two decimal places, half-up.
pub fn round_money(value: BigDecimal) -> BigDecimal {
    value.with_scale_round(2, RoundingMode::HalfUp)
}

pub fn zero() -> BigDecimal {
    BigDecimal::from(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn rounds_half_up() {
        let v = BigDecimal::from_str("10.005").unwrap();
        assert_eq!(round_money(v), BigDecimal::from_str("10.01").unwrap());
    }

    #[test]
    fn keeps_exact_values() {
        let v = BigDecimal::from_str("100").unwrap();
        assert_eq!(round_money(v), BigDecimal::from_str("100.00").unwrap());
    }
}
