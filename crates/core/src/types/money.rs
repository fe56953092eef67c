//! Type-safe money representation using decimal arithmetic.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// A monetary amount with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (e.g., rupees, not paise).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// The amount in the currency's minor unit (paise, cents), rounded.
    ///
    /// Payment gateways take integer minor units on the wire; `123.455`
    /// becomes `12346`.
    #[must_use]
    pub fn minor_units(&self) -> i64 {
        (self.amount * Decimal::from(100))
            .round()
            .to_i64()
            .unwrap_or(i64::MAX)
    }

    /// Format for display (e.g., "₹1999.00").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency_code.symbol(), self.amount)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// The currency symbol for display.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::INR => "\u{20b9}",
            Self::USD => "$",
            Self::EUR => "\u{20ac}",
            Self::GBP => "\u{a3}",
        }
    }

    /// The ISO 4217 code as a string.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INR" => Ok(Self::INR),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            _ => Err(format!("unsupported currency code: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_units_whole_amount() {
        let money = Money::new(Decimal::from(1999), CurrencyCode::INR);
        assert_eq!(money.minor_units(), 199_900);
    }

    #[test]
    fn test_minor_units_rounds_fractional_paise() {
        let money = Money::new(Decimal::new(123_455, 3), CurrencyCode::INR);
        assert_eq!(money.minor_units(), 12346);
    }

    #[test]
    fn test_display_uses_symbol() {
        let money = Money::new(Decimal::new(495, 1), CurrencyCode::USD);
        assert_eq!(money.display(), "$49.50");
    }

    #[test]
    fn test_currency_round_trip() {
        let code: CurrencyCode = "INR".parse().expect("valid code");
        assert_eq!(code, CurrencyCode::INR);
        assert_eq!(code.code(), "INR");
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
