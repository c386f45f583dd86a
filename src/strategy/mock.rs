//! In-memory lending protocol for testing without a chain.

use super::{LendingMarket, StrategyError};
use crate::domain::{Address, Wad, SECONDS_PER_YEAR};
use alloy_primitives::U256;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct MarketState {
    balance: U256,
    apr: Wad,
    rewards: Wad,
    claimed: BTreeMap<Address, Wad>,
    fail_supply: bool,
    fail_redeem: bool,
}

/// Deterministic lending protocol double.
///
/// Clones share state, so a test can keep a handle after moving one into a
/// strategy.
#[derive(Debug, Clone)]
pub struct InMemoryLendingMarket {
    name: String,
    state: Arc<Mutex<MarketState>>,
}

/// Starting position for an [`InMemoryLendingMarket`].
#[derive(Debug, Clone, Default)]
pub struct MarketSeed {
    /// Supply APR returned by `supply_apr`.
    pub apr: Wad,
    /// Position balance, native units.
    pub balance: U256,
    /// Unclaimed rewards.
    pub rewards: Wad,
}

impl InMemoryLendingMarket {
    pub fn new(name: impl Into<String>) -> Self {
        Self::seeded(name, MarketSeed::default())
    }

    pub fn seeded(name: impl Into<String>, seed: MarketSeed) -> Self {
        let state = MarketState {
            balance: seed.balance,
            apr: seed.apr,
            rewards: seed.rewards,
            ..MarketState::default()
        };
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn set_apr(&self, apr: Wad) {
        self.state.lock().await.apr = apr;
    }

    pub async fn set_fail_supply(&self, fail: bool) {
        self.state.lock().await.fail_supply = fail;
    }

    pub async fn set_fail_redeem(&self, fail: bool) {
        self.state.lock().await.fail_redeem = fail;
    }

    pub async fn add_rewards(&self, amount: Wad) {
        let mut state = self.state.lock().await;
        state.rewards = state.rewards.try_add(amount).unwrap_or(state.rewards);
    }

    /// Grow the balance by `apr * elapsed / year`.
    pub async fn accrue(&self, elapsed_secs: u64) {
        let mut state = self.state.lock().await;
        let interest = Wad::from_raw(state.balance)
            .try_mul(state.apr)
            .and_then(|v| v.try_mul_int(elapsed_secs))
            .and_then(|v| v.try_div_int(SECONDS_PER_YEAR));
        if let Ok(interest) = interest {
            state.balance += interest.raw();
        }
    }

    pub async fn balance_native(&self) -> U256 {
        self.state.lock().await.balance
    }

    pub async fn claimed_by(&self, account: &Address) -> Wad {
        self.state
            .lock()
            .await
            .claimed
            .get(account)
            .copied()
            .unwrap_or(Wad::ZERO)
    }
}

#[async_trait]
impl LendingMarket for InMemoryLendingMarket {
    async fn supply(&self, native: U256) -> Result<(), StrategyError> {
        let mut state = self.state.lock().await;
        if state.fail_supply {
            return Err(StrategyError::Reverted(format!("{}: supply paused", self.name)));
        }
        state.balance += native;
        Ok(())
    }

    async fn redeem(&self, native: U256) -> Result<U256, StrategyError> {
        let mut state = self.state.lock().await;
        if state.fail_redeem {
            return Err(StrategyError::Reverted(format!("{}: redeem paused", self.name)));
        }
        if native > state.balance {
            return Err(StrategyError::InsufficientBalance {
                available: state.balance,
                requested: native,
            });
        }
        state.balance -= native;
        Ok(native)
    }

    async fn balance(&self) -> Result<U256, StrategyError> {
        Ok(self.state.lock().await.balance)
    }

    async fn supply_apr(&self) -> Result<Wad, StrategyError> {
        Ok(self.state.lock().await.apr)
    }

    async fn accrued_rewards(&self) -> Result<Wad, StrategyError> {
        Ok(self.state.lock().await.rewards)
    }

    async fn claim_rewards(&self, to: &Address, amount: Wad) -> Result<(), StrategyError> {
        let mut state = self.state.lock().await;
        state.rewards = state.rewards.try_sub(amount)?;
        let claimed = state.claimed.entry(to.clone()).or_insert(Wad::ZERO);
        *claimed = claimed.try_add(amount)?;
        Ok(())
    }
}
