pub mod health;
pub mod liquidity;
pub mod params;
pub mod pool;
pub mod positions;

use crate::engine::MarketService;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub market: MarketService,
}

impl AppState {
    pub fn new(market: MarketService) -> Self {
        Self { market }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/v1/assets/:asset/exchange-rate",
            get(pool::get_exchange_rate),
        )
        .route("/v1/assets/:asset/pool", get(pool::get_pool))
        .route("/v1/positions", get(positions::get_positions))
        .route("/v1/params", get(params::get_params))
        .route("/v1/liquidity/provide", post(liquidity::provide))
        .route("/v1/liquidity/redeem", post(liquidity::redeem))
        .layer(cors)
        .with_state(state)
}
