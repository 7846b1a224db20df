use std::sync::Arc;

use crate::{error::ApiResult, main_lib::AppState};
use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use eventwise_core::events::{BudgetEvents, BudgetQuery};

async fn get_events_by_budget(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BudgetQuery>, JsonRejection>,
) -> ApiResult<Json<BudgetEvents>> {
    let Json(query) = payload?;
    let result = state.budget_service.get_events_by_budget(query).await?;
    Ok(Json(result))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/events", post(get_events_by_budget))
}
