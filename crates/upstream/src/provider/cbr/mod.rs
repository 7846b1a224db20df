//! Central Bank of Russia daily rates implementation.
//!
//! Reads the `XML_daily.asp` feed:
//!
//! ```text
//! <?xml version="1.0" encoding="windows-1251"?>
//! <ValCurs Date="02.10.2024" name="Foreign Currency Market">
//!     <Valute ID="R01235">
//!         <NumCode>840</NumCode>
//!         <CharCode>USD</CharCode>
//!         <Nominal>1</Nominal>
//!         <Name>...</Name>
//!         <Value>92,7126</Value>
//!     </Valute>
//!     ...
//! </ValCurs>
//! ```
//!
//! Rates are quoted in roubles per `Nominal` units, so the per-unit rate is
//! `Value / Nominal`. The body is decoded with the charset named in the XML
//! declaration before parsing.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use encoding_rs::{Encoding, UTF_8};
use log::{debug, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::UpstreamError;
use crate::models::{parse_rate_value, RateTable};
use crate::provider::RateProvider;

pub const DEFAULT_DAILY_URL: &str = "https://www.cbr.ru/scripts/XML_daily.asp";
const PROVIDER_ID: &str = "CBR";

// ============================================================================
// API Response Structures
// ============================================================================

/// Root element of the daily feed
#[derive(Debug, Deserialize)]
struct ValCurs {
    /// Publication date, dd.mm.yyyy
    #[serde(rename = "@Date", default)]
    date: Option<String>,
    #[serde(rename = "Valute", default)]
    valutes: Vec<Valute>,
}

/// One currency row
#[derive(Debug, Deserialize)]
struct Valute {
    #[serde(rename = "CharCode")]
    char_code: String,
    #[serde(rename = "Nominal", default)]
    nominal: Option<String>,
    #[serde(rename = "Value")]
    value: String,
    // Note: ID, NumCode, Name, VunitRate exist but are not used
}

fn malformed(message: impl Into<String>) -> UpstreamError {
    UpstreamError::MalformedResponse {
        provider: PROVIDER_ID.to_string(),
        message: message.into(),
    }
}

/// Charset named in the XML declaration, UTF-8 when absent or unknown.
fn declared_encoding(bytes: &[u8]) -> &'static Encoding {
    let head = &bytes[..bytes.len().min(128)];
    let Some(end) = head.windows(2).position(|w| w == b"?>") else {
        return UTF_8;
    };
    let declaration = String::from_utf8_lossy(&head[..end]);

    declaration
        .split_once("encoding=")
        .and_then(|(_, rest)| {
            let quote = rest.chars().next()?;
            let rest = rest.strip_prefix(quote)?;
            rest.split(quote).next()
        })
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .unwrap_or(UTF_8)
}

/// Decode a raw feed body into a rate table.
pub(crate) fn parse_daily_rates(bytes: &[u8]) -> Result<RateTable, UpstreamError> {
    let encoding = declared_encoding(bytes);
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        warn!(
            "CBR feed contained bytes invalid for {}, replaced",
            encoding.name()
        );
    }

    let feed: ValCurs = quick_xml::de::from_str(&text).map_err(|e| malformed(e.to_string()))?;
    if feed.valutes.is_empty() {
        return Err(malformed("feed contains no Valute rows"));
    }

    let date = feed
        .date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%d.%m.%Y").ok());

    let mut rates = Vec::with_capacity(feed.valutes.len());
    for valute in &feed.valutes {
        match row_rate(valute) {
            Ok(rate) => rates.push((valute.char_code.as_str(), rate)),
            Err(e) => warn!("Skipping CBR row: {}", e),
        }
    }

    if rates.is_empty() {
        return Err(malformed("no Valute row has a usable rate"));
    }

    Ok(RateTable::new(date, rates))
}

fn row_rate(valute: &Valute) -> Result<Decimal, UpstreamError> {
    let value = parse_rate_value(&valute.char_code, &valute.value)?;
    let nominal = match valute.nominal.as_deref() {
        Some(raw) => parse_rate_value(&valute.char_code, raw)?,
        None => Decimal::ONE,
    };
    Ok(value / nominal)
}

// ============================================================================
// CbrRateProvider
// ============================================================================

/// CBR daily rates feed.
pub struct CbrRateProvider {
    client: Client,
    daily_url: String,
}

impl CbrRateProvider {
    pub fn new(daily_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            daily_url: daily_url.into(),
        }
    }

    async fn fetch(&self) -> Result<Vec<u8>, UpstreamError> {
        debug!("CBR request: {}", self.daily_url);

        let map_transport = |e: reqwest::Error| {
            if e.is_timeout() {
                UpstreamError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                UpstreamError::transport(PROVIDER_ID, format!("Request failed: {}", e))
            }
        };

        let response = self
            .client
            .get(&self.daily_url)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(UpstreamError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if !status.is_success() {
            return Err(UpstreamError::status(
                PROVIDER_ID,
                status.as_u16(),
                status.to_string(),
            ));
        }

        let body = response.bytes().await.map_err(map_transport)?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl RateProvider for CbrRateProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch_daily_rates(&self) -> Result<RateTable, UpstreamError> {
        let body = self.fetch().await?;
        let table = parse_daily_rates(&body)?;

        debug!(
            "CBR returned {} rates dated {:?}",
            table.len(),
            table.date()
        );
        Ok(table)
    }
}
