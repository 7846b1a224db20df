use chrono::{Days, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Catalog event as returned by the event source.
///
/// `price_text` is whatever the catalog publishes ("100 RUB", "от 500 до 1500",
/// "") and is never parsed here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_text: Option<String>,
    #[serde(default)]
    pub is_free: bool,
}

impl Event {
    pub fn new(id: i64, title: impl Into<String>, price_text: Option<&str>) -> Self {
        Self {
            id,
            title: title.into(),
            price_text: price_text.map(str::to_string),
            is_free: false,
        }
    }

    pub fn free(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            price_text: None,
            is_free: true,
        }
    }
}

/// Rejected date window.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("dateFrom {from} cannot be after dateTo {to}")]
pub struct WindowError {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Inclusive range of calendar days to query the catalog for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateWindow {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateWindow {
    /// Build a window, rejecting `from > to`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, WindowError> {
        if from > to {
            return Err(WindowError { from, to });
        }
        Ok(Self { from, to })
    }

    /// Fill in missing bounds: `from` defaults to `today`, `to` defaults to
    /// `from + default_days`.
    pub fn resolve(
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        today: NaiveDate,
        default_days: u32,
    ) -> Result<Self, WindowError> {
        let from = from.unwrap_or(today);
        let to = match to {
            Some(to) => to,
            None => from
                .checked_add_days(Days::new(u64::from(default_days)))
                .unwrap_or(NaiveDate::MAX),
        };
        Self::new(from, to)
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

    /// Split into consecutive windows of at most `span_days` days each.
    ///
    /// A span of zero is treated as one day.
    pub fn split(&self, span_days: u32) -> Vec<DateWindow> {
        let step = u64::from(span_days.max(1));
        let mut windows = Vec::new();
        let mut start = self.from;

        loop {
            let end = start
                .checked_add_days(Days::new(step - 1))
                .map_or(self.to, |end| end.min(self.to));
            windows.push(DateWindow { from: start, to: end });

            match end.checked_add_days(Days::new(1)) {
                Some(next) if end < self.to => start = next,
                _ => break,
            }
        }

        windows
    }

    /// Epoch-second bounds of the window in the given timezone.
    ///
    /// `since` is midnight at the start of `from`; `until` is midnight at the
    /// start of the day after `to`, so the last day is fully covered.
    pub fn epoch_span(&self, tz: Tz) -> EpochSpan {
        let after_last = self.to.checked_add_days(Days::new(1)).unwrap_or(self.to);
        EpochSpan {
            since: start_of_day(self.from, tz),
            until: start_of_day(after_last, tz),
        }
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.from, self.to)
    }
}

/// Half-open `[since, until)` range in Unix seconds, as the catalog expects it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EpochSpan {
    pub since: i64,
    pub until: i64,
}

fn start_of_day(date: NaiveDate, tz: Tz) -> i64 {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight).earliest() {
        Some(local) => local.timestamp(),
        // Midnight skipped by a DST jump
        None => midnight.and_utc().timestamp(),
    }
}
