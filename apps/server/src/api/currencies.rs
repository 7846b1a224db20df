use std::sync::Arc;

use crate::{error::ApiResult, main_lib::AppState};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use eventwise_core::fx::{ConversionRequest, ConversionResult, CurrencyRate, FxServiceTrait};

async fn get_currency_rate(
    Path(code): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<CurrencyRate>> {
    let rate = state.fx_service.get_rate(&code).await?;
    Ok(Json(rate))
}

async fn convert_currency(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ConversionRequest>, JsonRejection>,
) -> ApiResult<Json<ConversionResult>> {
    let Json(request) = payload?;
    let result = state.fx_service.convert(request).await?;
    Ok(Json(result))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/currencies/rates/{code}", get(get_currency_rate))
        .route("/currencies/convert", post(convert_currency))
}
