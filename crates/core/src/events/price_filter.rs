//! Budget filter over free-form catalog prices.
//!
//! Catalog prices are text ("от 500 до 1500 рублей", "100 RUB", "бесплатно").
//! The first run of digits is taken as the price. Text that says the event
//! is free counts as free; any other text without digits is not a price and
//! the event is excluded.

use std::str::FromStr;

use eventwise_upstream::Event;
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use rust_decimal::Decimal;

lazy_static! {
    /// First run of decimal digits
    static ref PRICE_DIGITS: Regex = Regex::new(r"[0-9]+").expect("Invalid regex pattern");
}

/// Price texts that mean "no charge", compared case-insensitively.
const FREE_MARKERS: [&str; 2] = ["free", "бесплатно"];

fn is_free_text(price_text: &str) -> bool {
    let lowered = price_text.to_lowercase();
    FREE_MARKERS.iter().any(|marker| lowered == *marker)
}

/// First run of digits in `price_text` as a number.
///
/// Returns `None` when the text holds no digits or the run is too long to
/// be a number.
pub fn extract_first_price(price_text: &str) -> Option<Decimal> {
    let digits = PRICE_DIGITS.find(price_text)?;
    Decimal::from_str(digits.as_str()).ok()
}

/// Whether `event` fits in `budget`.
///
/// Free events and events without a price are always kept.
/// Events whose price has no digits are dropped.
pub fn is_within_budget(event: &Event, budget: Decimal) -> bool {
    if event.is_free {
        return true;
    }

    let price_text = match event.price_text.as_deref().map(str::trim) {
        None | Some("") => return true,
        Some(text) if is_free_text(text) => return true,
        Some(text) => text,
    };

    match extract_first_price(price_text) {
        Some(price) => {
            let within = price <= budget;
            debug!(
                "Event {}: price {} against budget {}, within budget: {}",
                event.id, price, budget, within
            );
            within
        }
        None => {
            warn!("Event {}: invalid price format '{}'", event.id, price_text);
            false
        }
    }
}
