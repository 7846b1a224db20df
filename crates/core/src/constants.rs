/// Currency every budget is compared in
pub const SETTLEMENT_CURRENCY: &str = "RUB";

/// Decimal precision for converted amounts
pub const DECIMAL_PRECISION: u32 = 6;

/// Days added to the start date when the end of the window is not given
pub const DEFAULT_WINDOW_DAYS: u32 = 6;

/// Timezone the event catalog interprets calendar days in
pub const CATALOG_TIMEZONE: chrono_tz::Tz = chrono_tz::Europe::Moscow;
