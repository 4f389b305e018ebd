//! Price value object
//!
//! Prices are fixed-point decimals. Two prices are equal when their numeric
//! values are equal, regardless of scale (`19.99 == 19.990`, `19.90 == 19.9`).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("Price value is empty")]
    Empty,

    #[error("Invalid price '{value}'")]
    Invalid { value: String },

    #[error("Negative price '{value}' is not allowed")]
    Negative { value: String },
}

/// Fixed-point product price
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Creates a price from a decimal value
    ///
    /// # Errors
    /// Returns error if the value is negative
    pub fn new(value: Decimal) -> Result<Self, PriceError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(PriceError::Negative {
                value: value.to_string(),
            });
        }
        Ok(Self(value))
    }

    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Canonical storage form without trailing zeros (`19.990` -> `19.99`)
    #[must_use]
    pub fn normalized(&self) -> String {
        self.0.normalize().to_string()
    }

    /// Parses a retailer display string such as `"29,95 TND"` or `"$1,299.00"`.
    ///
    /// Separator rules:
    /// - both `.` and `,` present: the last one is the decimal separator
    /// - a single `.` is a decimal separator
    /// - a single `,` followed by exactly three digits is a thousands separator,
    ///   otherwise it is the decimal separator
    /// - a separator repeated more than once is a thousands separator
    ///
    /// Returns `None` when the text carries no digits.
    #[must_use]
    pub fn parse_display(text: &str) -> Option<Self> {
        let kept: String = text
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',' || c.is_whitespace())
            .filter(|c| !c.is_whitespace())
            .collect();
        let kept = kept.trim_end_matches(['.', ',']);
        if kept.is_empty() {
            return None;
        }

        let dots = kept.matches('.').count();
        let commas = kept.matches(',').count();

        let decimal_separator = match (dots, commas) {
            (0, 0) => None,
            (_, 0) if dots > 1 => None,
            (0, _) if commas > 1 => None,
            (1, 0) => Some('.'),
            (0, 1) => {
                let digits_after = kept.rsplit(',').next().map_or(0, str::len);
                if digits_after == 3 { None } else { Some(',') }
            }
            _ => kept.chars().rev().find(|c| *c == '.' || *c == ','),
        };

        let mut canonical = String::with_capacity(kept.len());
        let last_separator_index = decimal_separator.and_then(|sep| kept.rfind(sep));
        for (index, c) in kept.char_indices() {
            if c.is_ascii_digit() {
                canonical.push(c);
            } else if Some(index) == last_separator_index {
                canonical.push('.');
            }
        }

        Decimal::from_str(&canonical).ok().and_then(|d| Self::new(d).ok())
    }
}

impl FromStr for Price {
    type Err = PriceError;

    /// Strict parser for canonical decimal strings (`"19.99"`), as stored in the database
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PriceError::Empty);
        }
        let value = Decimal::from_str(trimmed).map_err(|_| PriceError::Invalid {
            value: trimmed.to_string(),
        })?;
        Self::new(value)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normalized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn price(s: &str) -> Price {
        s.parse().unwrap()
    }

    #[rstest]
    #[case("19.99", "19.990", true)]
    #[case("19.90", "19.9", true)]
    #[case("19.99", "29.99", false)]
    #[case("0", "0.00", true)]
    #[case("100", "100.01", false)]
    fn test_numeric_equality(#[case] left: &str, #[case] right: &str, #[case] equal: bool) {
        assert_eq!(price(left) == price(right), equal);
    }

    #[test]
    fn test_normalized_storage_form() {
        assert_eq!(price("19.990").normalized(), "19.99");
        assert_eq!(price("20.00").normalized(), "20");
        assert_eq!(price("19.99").to_string(), "19.99");
    }

    #[test]
    fn test_strict_parser_rejects_display_text() {
        assert_eq!("".parse::<Price>(), Err(PriceError::Empty));
        assert!(matches!("29,95 TND".parse::<Price>(), Err(PriceError::Invalid { .. })));
        assert!(matches!("-1".parse::<Price>(), Err(PriceError::Negative { .. })));
    }

    #[rstest]
    #[case("29,95 TND", "29.95")]
    #[case("TND 45.900", "45.9")]
    #[case("$1,299.00", "1299")]
    #[case("1.299,00 €", "1299")]
    #[case("1,299", "1299")]
    #[case("19.99", "19.99")]
    #[case("EUR 7", "7")]
    #[case("1 299,50 €", "1299.5")]
    fn test_parse_display(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(Price::parse_display(text), Some(price(expected)));
    }

    #[test]
    fn test_parse_display_without_digits() {
        assert_eq!(Price::parse_display("Sold out"), None);
        assert_eq!(Price::parse_display(""), None);
    }
}
