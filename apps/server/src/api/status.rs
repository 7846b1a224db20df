use std::sync::Arc;

use crate::main_lib::AppState;
use axum::{extract::State, routing::get, Json, Router};
use eventwise_core::fx::{FxServiceTrait, FxStatus};
use serde::Serialize;

/// Point-in-time view of the pipeline for operators.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PipelineStatus {
    available_permits: usize,
    permit_capacity: usize,
    rates: FxStatus,
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<PipelineStatus> {
    Json(PipelineStatus {
        available_permits: state.permit_gate.available_permits(),
        permit_capacity: state.permit_gate.capacity(),
        rates: state.fx_service.status().await,
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(get_status))
}
