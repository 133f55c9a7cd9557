//! Monetary amounts in minor units and their display formatting.
//!
//! The commerce backend reports every price and total as an integer amount in
//! the currency's smallest unit (cents for USD) together with a lower-case
//! ISO 4217 code. Decimal conversion goes through `rust_decimal` so that no
//! floating point rounding leaks into displayed prices.

use core::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// ISO 4217 currency code, normalised to upper case.
///
/// Serialises in lower case, which is what the backend expects on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Create a currency code from any casing (`"usd"`, `"USD"`).
    #[must_use]
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_ascii_uppercase())
    }

    /// The upper-case code, e.g. `"USD"`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display symbol, if the currency has a well-known one.
    #[must_use]
    pub fn symbol(&self) -> Option<&'static str> {
        match self.0.as_str() {
            "USD" => Some("$"),
            "CAD" => Some("CA$"),
            "AUD" => Some("A$"),
            "EUR" => Some("€"),
            "GBP" => Some("£"),
            "JPY" => Some("¥"),
            "KRW" => Some("₩"),
            "INR" => Some("₹"),
            _ => None,
        }
    }

    /// Number of decimal places in the minor unit.
    #[must_use]
    pub fn exponent(&self) -> u32 {
        match self.0.as_str() {
            "JPY" | "KRW" | "VND" | "CLP" | "ISK" => 0,
            _ => 2,
        }
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self("USD".to_owned())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CurrencyCode {
    fn from(code: String) -> Self {
        Self::new(&code)
    }
}

impl From<&str> for CurrencyCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0.to_ascii_lowercase()
    }
}

/// An amount of money in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's smallest unit (e.g. cents).
    pub amount: i64,
    /// Currency of the amount.
    pub currency_code: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: i64, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// The amount in major units (`1234` USD cents → `12.34`).
    #[must_use]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.amount, self.currency_code.exponent())
    }

    /// Format for display, e.g. `"$1,234.50"` or `"12.00 CHF"`.
    #[must_use]
    pub fn display(&self) -> String {
        let magnitude = self.to_decimal().abs().to_string();
        let (whole, fraction) = magnitude
            .split_once('.')
            .map_or((magnitude.as_str(), None), |(w, f)| (w, Some(f)));

        let mut number = group_thousands(whole);
        if let Some(fraction) = fraction {
            number.push('.');
            number.push_str(fraction);
        }

        let sign = if self.amount < 0 { "-" } else { "" };
        match self.currency_code.symbol() {
            Some(symbol) => format!("{sign}{symbol}{number}"),
            None => format!("{sign}{number} {}", self.currency_code),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Format a minor-unit amount in the given currency.
///
/// ```
/// use mystery_box_core::format_amount;
///
/// assert_eq!(format_amount(1234, "usd"), "$12.34");
/// assert_eq!(format_amount(500, "jpy"), "¥500");
/// ```
#[must_use]
pub fn format_amount(amount: i64, currency_code: &str) -> String {
    Money::new(amount, CurrencyCode::new(currency_code)).display()
}

/// Format a price range, collapsing to a single price when both ends match.
#[must_use]
pub fn format_price_range(min: &Money, max: &Money) -> String {
    if min == max {
        min.display()
    } else {
        format!("{} – {}", min.display(), max.display())
    }
}

/// Convert a major-unit amount (as typed in a price filter) into minor units.
///
/// Returns `None` if the result does not fit in an `i64`.
#[must_use]
pub fn major_to_minor(amount: Decimal, currency_code: &CurrencyCode) -> Option<i64> {
    let scale = Decimal::from(10_i64.checked_pow(currency_code.exponent())?);
    amount.checked_mul(scale)?.round().to_i64()
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount_usd() {
        assert_eq!(format_amount(1234, "usd"), "$12.34");
        assert_eq!(format_amount(1200, "USD"), "$12.00");
        assert_eq!(format_amount(5, "usd"), "$0.05");
        assert_eq!(format_amount(0, "usd"), "$0.00");
    }

    #[test]
    fn test_format_amount_groups_thousands() {
        assert_eq!(format_amount(123_456_789, "usd"), "$1,234,567.89");
        assert_eq!(format_amount(100_000, "eur"), "€1,000.00");
    }

    #[test]
    fn test_format_amount_negative() {
        assert_eq!(format_amount(-1234, "gbp"), "-£12.34");
    }

    #[test]
    fn test_format_amount_zero_decimal_currency() {
        assert_eq!(format_amount(1500, "jpy"), "¥1,500");
    }

    #[test]
    fn test_format_amount_unknown_currency() {
        assert_eq!(format_amount(1999, "chf"), "19.99 CHF");
    }

    #[test]
    fn test_format_price_range() {
        let low = Money::new(1000, CurrencyCode::new("usd"));
        let high = Money::new(2500, CurrencyCode::new("usd"));
        assert_eq!(format_price_range(&low, &low), "$10.00");
        assert_eq!(format_price_range(&low, &high), "$10.00 – $25.00");
    }

    #[test]
    fn test_major_to_minor() {
        let usd = CurrencyCode::new("usd");
        assert_eq!(major_to_minor(Decimal::new(1999, 2), &usd), Some(1999));
        assert_eq!(major_to_minor(Decimal::from(50), &usd), Some(5000));

        let jpy = CurrencyCode::new("jpy");
        assert_eq!(major_to_minor(Decimal::from(700), &jpy), Some(700));
    }

    #[test]
    fn test_currency_code_wire_format() {
        let code: CurrencyCode = serde_json::from_str("\"eur\"").unwrap();
        assert_eq!(code.as_str(), "EUR");
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"eur\"");
    }
}
