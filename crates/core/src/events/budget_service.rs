//! Budget aggregator.
//!
//! Per request the service validates the input, then fetches the events
//! and converts the budget concurrently, waits for both, and filters.
//! Both sub-operations run inside the caller's task, so dropping the
//! request future drops them too.
//!
//! Degradation rules:
//!
//! | Failure | Outcome |
//! |---------|---------|
//! | Some catalog queries fail | Events of the other queries, `degraded.events` |
//! | Every catalog query fails | Empty event list, `degraded.events` |
//! | Rates unavailable | Budget taken as already settled, `degraded.conversion` |
//! | Unsupported currency | Error, never degraded |
//! | Nothing left after filtering | [`Error::NoMatchingEvents`] |

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use eventwise_upstream::{DateWindow, Event};
use log::{debug, info, warn};
use rust_decimal::Decimal;

use super::event_source::EventSourceClient;
use super::events_model::{BudgetEvents, BudgetQuery, Degradation};
use super::price_filter::is_within_budget;
use crate::config::PipelineConfig;
use crate::constants::SETTLEMENT_CURRENCY;
use crate::errors::{Error, Result};
use crate::fx::{normalize_currency_code, ConversionRequest, FxError, FxServiceTrait};

const NO_EVENTS_IN_WINDOW: &str = "No events found for the given budget and date range.";
const NO_EVENTS_IN_BUDGET: &str = "No events fit within the given budget.";

#[derive(Clone)]
pub struct BudgetEventService {
    events: EventSourceClient,
    fx: Arc<dyn FxServiceTrait>,
    default_window_days: u32,
    timezone: Tz,
}

impl BudgetEventService {
    pub fn new(events: EventSourceClient, fx: Arc<dyn FxServiceTrait>, config: &PipelineConfig) -> Self {
        Self {
            events,
            fx,
            default_window_days: config.default_window_days,
            timezone: config.catalog_timezone,
        }
    }

    pub fn event_source(&self) -> &EventSourceClient {
        &self.events
    }

    /// Current calendar day in the catalog timezone.
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// Events affordable with `query.budget` inside the requested window.
    pub async fn get_events_by_budget(&self, query: BudgetQuery) -> Result<BudgetEvents> {
        self.get_events_by_budget_on(query, self.today()).await
    }

    /// Same as [`get_events_by_budget`](Self::get_events_by_budget) with an
    /// explicit "today" for resolving a missing window.
    pub async fn get_events_by_budget_on(&self, query: BudgetQuery, today: NaiveDate) -> Result<BudgetEvents> {
        if query.budget.is_sign_negative() && !query.budget.is_zero() {
            return Err(Error::validation("budget", "must not be negative"));
        }
        let currency = normalize_currency_code(&query.currency).map_err(|_| {
            Error::validation(
                "currency",
                format!("'{}' is not a 3-letter currency code", query.currency),
            )
        })?;
        let window = DateWindow::resolve(
            query.date_from,
            query.date_to,
            today,
            self.default_window_days,
        )?;

        info!("Budget request: {} {} for {}", query.budget, currency, window);

        let conversion = ConversionRequest::new(&currency, SETTLEMENT_CURRENCY, query.budget);
        let (fetched, converted) = tokio::join!(
            self.events.collect_events(window),
            self.fx.convert(conversion)
        );
        debug!("Budget request for {}: both sub-operations finished", window);

        let mut degraded = Degradation::default();

        let events = match fetched {
            Ok(fetched) => {
                if fetched.is_partial() {
                    warn!(
                        "{} catalog queries for {} failed, continuing with the rest",
                        fetched.failed_queries, window
                    );
                    degraded.events = true;
                }
                fetched.events
            }
            Err(err) => {
                warn!("Event catalog unavailable, continuing with no events: {}", err);
                degraded.events = true;
                Vec::new()
            }
        };

        let converted_budget = match converted {
            Ok(result) => result.converted_amount,
            Err(Error::Fx(FxError::RatesUnavailable { .. })) => {
                warn!(
                    "Exchange rates unavailable, treating {} {} as {}",
                    query.budget, currency, SETTLEMENT_CURRENCY
                );
                degraded.conversion = true;
                query.budget
            }
            Err(err) => return Err(err),
        };

        let fetched_count = events.len();
        if events.is_empty() {
            warn!("{}", NO_EVENTS_IN_WINDOW);
            return Err(Error::NoMatchingEvents(NO_EVENTS_IN_WINDOW.to_string()));
        }

        let events = filter_by_budget(events, converted_budget);
        if events.is_empty() {
            warn!("{}", NO_EVENTS_IN_BUDGET);
            return Err(Error::NoMatchingEvents(NO_EVENTS_IN_BUDGET.to_string()));
        }

        info!(
            "Budget request: {} of {} events fit {} {}",
            events.len(),
            fetched_count,
            converted_budget,
            SETTLEMENT_CURRENCY
        );

        Ok(BudgetEvents {
            events,
            converted_budget,
            settlement_currency: SETTLEMENT_CURRENCY.to_string(),
            date_from: window.from(),
            date_to: window.to(),
            degraded,
        })
    }
}

fn filter_by_budget(events: Vec<Event>, budget: Decimal) -> Vec<Event> {
    events
        .into_iter()
        .filter(|event| is_within_budget(event, budget))
        .collect()
}
