//! Yield strategy adapters.
//!
//! A [`Strategy`] places idle pool funds in an external lending protocol. All
//! amounts crossing this trait are 18-decimal; adapters convert to the
//! asset's native precision at the protocol boundary.

use crate::domain::{Address, ArithmeticError, Timestamp, Wad};
use alloy_primitives::U256;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

pub mod lending;
pub mod mock;

pub use lending::{LendingMarket, LendingStrategy};
pub use mock::{InMemoryLendingMarket, MarketSeed};

/// Cooldown applied by Aave-style reward staking (10 days).
pub const AAVE_COOLDOWN_SECS: u64 = 864_000;

#[async_trait]
pub trait Strategy: Send + Sync + fmt::Debug {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Move `amount` into the protocol. Returns the amount actually placed,
    /// which may be lower after truncation to native precision.
    async fn deposit(&self, amount: Wad) -> Result<Wad, StrategyError>;

    /// Take `amount` out of the protocol. Returns the amount actually returned.
    async fn withdraw(&self, amount: Wad) -> Result<Wad, StrategyError>;

    /// Current position value, 18-decimal.
    async fn balance_of(&self) -> Result<Wad, StrategyError>;

    /// Current annual supply rate.
    async fn get_apr(&self) -> Result<Wad, StrategyError>;

    /// Start a reward claim (snapshot for cooldown-based protocols).
    async fn before_claim(&self, now: Timestamp) -> Result<(), StrategyError>;

    /// Complete a reward claim, paying the treasury. Returns the amount paid.
    async fn do_claim(&self, now: Timestamp) -> Result<Wad, StrategyError>;
}

/// How rewards are claimed from the underlying protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimPolicy {
    /// `before_claim` snapshots the accrued rewards; `do_claim` pays exactly
    /// that snapshot once `window` seconds have passed.
    Cooldown { window: u64 },
    /// `do_claim` pays everything accrued right away.
    Immediate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum ClaimState {
    Idle,
    Snapshotted { at: Timestamp, amount: Wad },
    Claimed { at: Timestamp, amount: Wad },
}

/// Error type for strategy operations.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyError {
    /// The external protocol rejected the call.
    Reverted(String),
    /// Position too small for the requested withdrawal (native units).
    InsufficientBalance { available: U256, requested: U256 },
    /// `do_claim` called before the cooldown elapsed.
    ClaimNotReady { ready_at: Timestamp },
    /// `do_claim` called without a preceding `before_claim`.
    ClaimNotStarted,
    /// Caller is not the adapter owner.
    NotOwner(Address),
    Arithmetic(ArithmeticError),
}

impl fmt::Display for StrategyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyError::Reverted(msg) => write!(f, "Strategy call reverted: {}", msg),
            StrategyError::InsufficientBalance {
                available,
                requested,
            } => write!(
                f,
                "Insufficient strategy balance: available {}, requested {}",
                available, requested
            ),
            StrategyError::ClaimNotReady { ready_at } => {
                write!(f, "Claim not ready until {}", ready_at.as_secs())
            }
            StrategyError::ClaimNotStarted => write!(f, "Claim not started"),
            StrategyError::NotOwner(addr) => write!(f, "Caller {} is not the strategy owner", addr),
            StrategyError::Arithmetic(err) => write!(f, "Arithmetic error: {}", err),
        }
    }
}

impl std::error::Error for StrategyError {}

impl From<ArithmeticError> for StrategyError {
    fn from(err: ArithmeticError) -> Self {
        StrategyError::Arithmetic(err)
    }
}
