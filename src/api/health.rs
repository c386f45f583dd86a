use crate::api::AppState;
use axum::extract::State;
use axum::Json;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once the market is reachable; reports registered assets.
pub async fn ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    let assets: Vec<String> = state
        .market
        .read(|m| m.assets().map(|a| a.id.to_string()).collect())
        .await;
    Json(serde_json::json!({"status": "ready", "assets": assets}))
}
