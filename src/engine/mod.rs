//! Deterministic accounting engine: pool, shares, positions, index and parameters.
//!
//! Every entry point takes the caller explicitly and returns a
//! [`ProtocolResult`]. Mutations validate before they write, and
//! [`MarketService`] adds all-or-nothing semantics across several steps.

pub mod amm;
pub mod error;
pub mod index;
pub mod ledger;
pub mod market;
pub mod params;
pub mod pool;
pub mod shares;

pub use amm::{ClosePositionOutcome, OpenPositionRequest, Payout};
pub use error::{ErrorKind, ProtocolError, ProtocolResult};
pub use index::{IndexOracle, IporIndex};
pub use ledger::{AssetBalances, Exposure, PositionLedger};
pub use market::{Market, MarketService, MarketSetup, PoolSnapshot};
pub use params::{ParamValues, ParamsCall, ProtocolParams, PARAMS_TARGET};
pub use pool::{calculate_exchange_rate, ProvideOutcome, RedeemOutcome};
pub use shares::ShareLedger;
