use crate::api::AppState;
use crate::domain::{Address, AssetId, Wad};
use crate::error::AppError;
use alloy_primitives::U256;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvideRequest {
    pub asset: String,
    pub provider: String,
    /// Native token units as an integer string.
    pub amount: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvideResponse {
    pub amount: Wad,
    pub shares_minted: Wad,
    pub exchange_rate: Wad,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    pub asset: String,
    pub holder: String,
    /// Share amount as a raw 18-decimal integer string.
    pub shares: Wad,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemResponse {
    pub shares_burned: Wad,
    /// Native token units as an integer string.
    pub payout_native: String,
    pub payout: Wad,
    pub exchange_rate: Wad,
}

fn parse_native(amount: &str) -> Result<U256, AppError> {
    U256::from_str(amount.trim())
        .map_err(|_| AppError::BadRequest(format!("Invalid amount: {}", amount)))
}

pub async fn provide(
    State(state): State<AppState>,
    Json(req): Json<ProvideRequest>,
) -> Result<Json<ProvideResponse>, AppError> {
    let native = parse_native(&req.amount)?;
    let asset = AssetId::new(req.asset);
    let provider = Address::new(req.provider);

    let outcome = state
        .market
        .transact(|m| m.provide_liquidity(&provider, &asset, native))
        .await?;

    Ok(Json(ProvideResponse {
        amount: outcome.amount,
        shares_minted: outcome.shares_minted,
        exchange_rate: outcome.exchange_rate,
    }))
}

pub async fn redeem(
    State(state): State<AppState>,
    Json(req): Json<RedeemRequest>,
) -> Result<Json<RedeemResponse>, AppError> {
    let asset = AssetId::new(req.asset);
    let holder = Address::new(req.holder);

    let outcome = state
        .market
        .transact(|m| m.redeem(&holder, &asset, req.shares))
        .await?;

    Ok(Json(RedeemResponse {
        shares_burned: outcome.shares_burned,
        payout_native: outcome.payout_native.to_string(),
        payout: outcome.payout,
        exchange_rate: outcome.exchange_rate,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_native() {
        assert_eq!(parse_native("1500000").unwrap(), U256::from(1_500_000u64));
        assert!(parse_native("1.5").is_err());
    }
}
