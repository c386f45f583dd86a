pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod governance;
pub mod stanley;
pub mod strategy;

pub use config::Config;
pub use domain::{Address, Asset, AssetId, Direction, SignedWad, Timestamp, Wad};
pub use engine::{Market, MarketService, ProtocolError, ProtocolResult};
pub use error::AppError;
pub use stanley::Stanley;
pub use strategy::{InMemoryLendingMarket, LendingStrategy, Strategy, StrategyError};
