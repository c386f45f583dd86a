//! Strategy adapter over an external lending protocol.

use super::{ClaimPolicy, ClaimState, Strategy, StrategyError};
use crate::domain::{Address, Asset, Timestamp, Wad};
use crate::governance::Ownable;
use alloy_primitives::U256;
use async_trait::async_trait;
use std::fmt;
use tokio::sync::Mutex;

/// The external protocol as seen from one adapter's position.
///
/// Token amounts are in the asset's native units; rates and rewards are
/// 18-decimal.
#[async_trait]
pub trait LendingMarket: Send + Sync + fmt::Debug {
    async fn supply(&self, native: U256) -> Result<(), StrategyError>;

    /// Returns the native amount actually sent back.
    async fn redeem(&self, native: U256) -> Result<U256, StrategyError>;

    async fn balance(&self) -> Result<U256, StrategyError>;

    async fn supply_apr(&self) -> Result<Wad, StrategyError>;

    /// Reward tokens accrued and not yet claimed.
    async fn accrued_rewards(&self) -> Result<Wad, StrategyError>;

    /// Transfer `amount` of accrued rewards to `to`.
    async fn claim_rewards(&self, to: &Address, amount: Wad) -> Result<(), StrategyError>;
}

#[derive(Debug)]
struct AdapterState {
    ownable: Ownable,
    treasury: Address,
    claim: ClaimState,
}

#[derive(Debug)]
pub struct LendingStrategy<M: LendingMarket> {
    name: String,
    asset: Asset,
    market: M,
    policy: ClaimPolicy,
    state: Mutex<AdapterState>,
}

impl<M: LendingMarket> LendingStrategy<M> {
    pub fn new(
        name: impl Into<String>,
        asset: Asset,
        market: M,
        policy: ClaimPolicy,
        owner: Address,
        treasury: Address,
    ) -> Self {
        Self {
            name: name.into(),
            asset,
            market,
            policy,
            state: Mutex::new(AdapterState {
                ownable: Ownable::new(owner),
                treasury,
                claim: ClaimState::Idle,
            }),
        }
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    pub fn market(&self) -> &M {
        &self.market
    }

    pub async fn treasury(&self) -> Address {
        self.state.lock().await.treasury.clone()
    }

    pub async fn claim_state(&self) -> ClaimState {
        self.state.lock().await.claim
    }

    pub async fn set_treasury(&self, caller: &Address, treasury: Address) -> Result<(), StrategyError> {
        let mut state = self.state.lock().await;
        state
            .ownable
            .only_owner(caller)
            .map_err(|_| StrategyError::NotOwner(caller.clone()))?;
        tracing::info!(strategy = %self.name, treasury = %treasury, "Treasury updated");
        state.treasury = treasury;
        Ok(())
    }
}

#[async_trait]
impl<M: LendingMarket> Strategy for LendingStrategy<M> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deposit(&self, amount: Wad) -> Result<Wad, StrategyError> {
        let native = self.asset.from_wad(amount);
        if native.native.is_zero() {
            return Ok(Wad::ZERO);
        }
        tracing::debug!(strategy = %self.name, amount = %native.wad, "Supplying to lending market");
        self.market.supply(native.native).await?;
        Ok(native.wad)
    }

    async fn withdraw(&self, amount: Wad) -> Result<Wad, StrategyError> {
        let native = self.asset.from_wad(amount);
        if native.native.is_zero() {
            return Ok(Wad::ZERO);
        }
        tracing::debug!(strategy = %self.name, amount = %native.wad, "Redeeming from lending market");
        let returned = self.market.redeem(native.native).await?;
        Ok(self.asset.to_wad(returned)?)
    }

    async fn balance_of(&self) -> Result<Wad, StrategyError> {
        let native = self.market.balance().await?;
        Ok(self.asset.to_wad(native)?)
    }

    async fn get_apr(&self) -> Result<Wad, StrategyError> {
        self.market.supply_apr().await
    }

    async fn before_claim(&self, now: Timestamp) -> Result<(), StrategyError> {
        if self.policy == ClaimPolicy::Immediate {
            return Ok(());
        }
        let mut state = self.state.lock().await;
        let amount = self.market.accrued_rewards().await?;
        state.claim = ClaimState::Snapshotted { at: now, amount };
        tracing::info!(strategy = %self.name, amount = %amount, "Reward claim started");
        Ok(())
    }

    async fn do_claim(&self, now: Timestamp) -> Result<Wad, StrategyError> {
        let mut state = self.state.lock().await;
        let amount = match self.policy {
            ClaimPolicy::Immediate => self.market.accrued_rewards().await?,
            ClaimPolicy::Cooldown { window } => match state.claim {
                ClaimState::Snapshotted { at, amount } => {
                    let ready_at = at.plus_secs(window);
                    if now < ready_at {
                        return Err(StrategyError::ClaimNotReady { ready_at });
                    }
                    amount
                }
                ClaimState::Idle | ClaimState::Claimed { .. } => {
                    return Err(StrategyError::ClaimNotStarted)
                }
            },
        };

        if !amount.is_zero() {
            self.market.claim_rewards(&state.treasury, amount).await?;
        }
        state.claim = ClaimState::Claimed { at: now, amount };
        tracing::info!(strategy = %self.name, treasury = %state.treasury, amount = %amount, "Rewards claimed");
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{InMemoryLendingMarket, MarketSeed, AAVE_COOLDOWN_SECS};

    fn w(s: &str) -> Wad {
        Wad::from_decimal_str(s).unwrap()
    }

    fn aave(market: InMemoryLendingMarket) -> LendingStrategy<InMemoryLendingMarket> {
        LendingStrategy::new(
            "aave-usdc",
            Asset::new("USDC", 6).unwrap(),
            market,
            ClaimPolicy::Cooldown {
                window: AAVE_COOLDOWN_SECS,
            },
            Address::new("admin"),
            Address::new("treasury"),
        )
    }

    #[tokio::test]
    async fn test_usdc_balances_are_reported_in_wad() {
        let market = InMemoryLendingMarket::new("aave");
        let strategy = aave(market.clone());
        let placed = strategy.deposit(w("10.1234567")).await.unwrap();
        assert_eq!(placed, w("10.123456"));
        assert_eq!(market.balance_native().await, U256::from(10_123_456u64));
        assert_eq!(strategy.balance_of().await.unwrap(), w("10.123456"));
    }

    #[tokio::test]
    async fn test_cooldown_claim_state_machine() {
        let market = InMemoryLendingMarket::seeded(
            "aave",
            MarketSeed {
                rewards: w("5"),
                ..MarketSeed::default()
            },
        );
        let strategy = aave(market.clone());

        assert_eq!(
            strategy.do_claim(Timestamp::new(0)).await,
            Err(StrategyError::ClaimNotStarted)
        );

        strategy.before_claim(Timestamp::new(100)).await.unwrap();
        market.add_rewards(w("3")).await;

        let err = strategy.do_claim(Timestamp::new(200)).await.unwrap_err();
        assert_eq!(
            err,
            StrategyError::ClaimNotReady {
                ready_at: Timestamp::new(100 + AAVE_COOLDOWN_SECS as i64)
            }
        );

        let claimed = strategy
            .do_claim(Timestamp::new(100 + AAVE_COOLDOWN_SECS as i64))
            .await
            .unwrap();
        assert_eq!(claimed, w("5"));
        assert_eq!(market.claimed_by(&Address::new("treasury")).await, w("5"));
        assert!(matches!(
            strategy.claim_state().await,
            ClaimState::Claimed { .. }
        ));
        assert_eq!(
            strategy.do_claim(Timestamp::new(2_000_000)).await,
            Err(StrategyError::ClaimNotStarted)
        );
    }

    #[tokio::test]
    async fn test_immediate_claim_pays_all_accrued() {
        let market = InMemoryLendingMarket::seeded(
            "compound",
            MarketSeed {
                rewards: w("2"),
                ..MarketSeed::default()
            },
        );
        let strategy = LendingStrategy::new(
            "compound-dai",
            Asset::new("DAI", 18).unwrap(),
            market.clone(),
            ClaimPolicy::Immediate,
            Address::new("admin"),
            Address::new("treasury"),
        );
        strategy
            .set_treasury(&Address::new("admin"), Address::new("newTreasury"))
            .await
            .unwrap();
        let claimed = strategy.do_claim(Timestamp::new(0)).await.unwrap();
        assert_eq!(claimed, w("2"));
        assert_eq!(market.claimed_by(&Address::new("newTreasury")).await, w("2"));
    }

    #[tokio::test]
    async fn test_set_treasury_owner_only() {
        let strategy = aave(InMemoryLendingMarket::new("aave"));
        let err = strategy
            .set_treasury(&Address::new("userOne"), Address::new("userOne"))
            .await
            .unwrap_err();
        assert_eq!(err, StrategyError::NotOwner(Address::new("userOne")));
        assert_eq!(strategy.treasury().await, Address::new("treasury"));
    }
}
