use crate::api::AppState;
use crate::domain::{Address, AssetId, Derivative};
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct PositionsQuery {
    pub user: String,
    pub asset: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsResponse {
    pub user: String,
    pub asset: String,
    pub positions: Vec<Derivative>,
}

/// Active positions of a user in one asset, in ledger index order.
pub async fn get_positions(
    Query(params): Query<PositionsQuery>,
    State(state): State<AppState>,
) -> Result<Json<PositionsResponse>, AppError> {
    if params.user.trim().is_empty() {
        return Err(AppError::BadRequest("user must not be empty".into()));
    }
    let user = Address::new(params.user.trim());
    let asset = AssetId::new(params.asset.trim());

    let positions = state.market.read(|m| m.positions(&user, &asset)).await?;

    Ok(Json(PositionsResponse {
        user: user.to_string(),
        asset: asset.to_string(),
        positions,
    }))
}
