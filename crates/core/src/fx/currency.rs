//! Currency code handling.

use super::fx_errors::FxError;

/// Normalize a user-supplied ISO 4217 code to its uppercase form.
///
/// Surrounding whitespace is ignored; anything other than three ASCII
/// letters is rejected.
pub fn normalize_currency_code(code: &str) -> Result<String, FxError> {
    let trimmed = code.trim();
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(FxError::InvalidCurrencyCode(code.to_string()));
    }
    Ok(trimmed.to_ascii_uppercase())
}
