use crate::api::AppState;
use crate::domain::{AssetId, Wad};
use crate::engine::PoolSnapshot;
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRateResponse {
    pub asset: String,
    /// Raw 18-decimal integer.
    pub exchange_rate: Wad,
    pub exchange_rate_decimal: String,
}

pub async fn get_exchange_rate(
    Path(asset): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ExchangeRateResponse>, AppError> {
    let id = AssetId::new(asset);
    let rate = state.market.read(|m| m.exchange_rate(&id)).await?;
    Ok(Json(ExchangeRateResponse {
        asset: id.to_string(),
        exchange_rate: rate,
        exchange_rate_decimal: rate.to_decimal_string(),
    }))
}

pub async fn get_pool(
    Path(asset): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PoolSnapshot>, AppError> {
    let id = AssetId::new(asset);
    let snapshot = state.market.read(|m| m.pool_snapshot(&id)).await?;
    Ok(Json(snapshot))
}
