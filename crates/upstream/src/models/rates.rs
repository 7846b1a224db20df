use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::errors::UpstreamError;

/// Snapshot of daily exchange rates against the settlement currency.
///
/// A table is built once by the rate provider and shared read-only
/// afterwards; a refresh replaces the whole table.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateTable {
    /// Publication date reported by the provider
    date: Option<NaiveDate>,
    /// Settlement-currency units per one unit of the keyed currency
    rates: HashMap<String, Decimal>,
}

impl RateTable {
    /// Build a table from `(code, rate)` pairs. Codes are stored uppercase.
    pub fn new<I, S>(date: Option<NaiveDate>, rates: I) -> Self
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: AsRef<str>,
    {
        Self {
            date,
            rates: rates
                .into_iter()
                .map(|(code, rate)| (code.as_ref().trim().to_uppercase(), rate))
                .collect(),
        }
    }

    /// Table with no rates, used when the provider cannot be reached.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rate for `code`, matched case-insensitively.
    pub fn rate(&self, code: &str) -> Option<Decimal> {
        self.rates.get(&code.trim().to_uppercase()).copied()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Currency codes in the table, sorted.
    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.rates.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }
}

/// Parse a published rate such as `"92,5058"` or `"92.5058"`.
///
/// Both `,` and `.` are accepted as the fractional separator. Non-positive
/// values are rejected since they cannot be divided by.
pub fn parse_rate_value(code: &str, raw: &str) -> Result<Decimal, UpstreamError> {
    let invalid = || UpstreamError::InvalidRate {
        code: code.to_string(),
        value: raw.to_string(),
    };

    let normalized = raw.trim().replace(',', ".");
    let rate = Decimal::from_str(&normalized).map_err(|_| invalid())?;
    if rate <= Decimal::ZERO {
        return Err(invalid());
    }
    Ok(rate)
}
