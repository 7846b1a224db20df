use chrono::NaiveDate;
use eventwise_upstream::Event;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Budget request as received from the caller.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BudgetQuery {
    pub budget: Decimal,
    pub currency: String,
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
}

impl BudgetQuery {
    pub fn new(budget: Decimal, currency: &str) -> Self {
        Self {
            budget,
            currency: currency.to_string(),
            date_from: None,
            date_to: None,
        }
    }

    pub fn between(mut self, date_from: NaiveDate, date_to: NaiveDate) -> Self {
        self.date_from = Some(date_from);
        self.date_to = Some(date_to);
        self
    }
}

/// Which half of the pipeline was replaced by its fallback.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Degradation {
    /// Some or all catalog queries failed; their events are missing.
    pub events: bool,
    /// Rates were unavailable; the budget was taken as already settled.
    pub conversion: bool,
}

impl Degradation {
    pub fn any(&self) -> bool {
        self.events || self.conversion
    }
}

/// Events that fit the budget, with the figures they were filtered by.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BudgetEvents {
    pub events: Vec<Event>,
    pub converted_budget: Decimal,
    pub settlement_currency: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub degraded: Degradation,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_query_accepts_optional_dates() {
        let query: BudgetQuery =
            serde_json::from_value(json!({ "budget": 100, "currency": "USD" })).unwrap();
        assert_eq!(query, BudgetQuery::new(dec!(100), "USD"));

        let query: BudgetQuery = serde_json::from_value(json!({
            "budget": 100,
            "currency": "USD",
            "dateFrom": "2024-10-01",
            "dateTo": "2024-10-07"
        }))
        .unwrap();
        assert_eq!(query.date_from, NaiveDate::from_ymd_opt(2024, 10, 1));
        assert_eq!(query.date_to, NaiveDate::from_ymd_opt(2024, 10, 7));
    }

    #[test]
    fn test_result_envelope_is_camel_case() {
        let result = BudgetEvents {
            events: vec![Event::new(1, "Event 1", Some("50"))],
            converted_budget: dec!(90),
            settlement_currency: "RUB".to_string(),
            date_from: NaiveDate::from_ymd_opt(2024, 10, 1).unwrap(),
            date_to: NaiveDate::from_ymd_opt(2024, 10, 7).unwrap(),
            degraded: Degradation {
                events: false,
                conversion: true,
            },
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["settlementCurrency"], "RUB");
        assert_eq!(value["dateFrom"], "2024-10-01");
        assert_eq!(value["degraded"], json!({ "events": false, "conversion": true }));
        assert_eq!(value["events"][0]["title"], "Event 1");
        assert!(value.get("convertedBudget").is_some());
    }
}
