//! Yield-strategy router.
//!
//! Routes idle pool funds between two strategies by APR and tracks the
//! depositor's claim with an ivToken share ledger minted and burned 1:1 with
//! the underlying amount. Calls are serialised; the lock is held across the
//! strategy awaits.

use crate::domain::{Address, Asset, Wad};
use crate::engine::{ProtocolError, ProtocolResult, ShareLedger};
use crate::governance::Ownable;
use crate::strategy::Strategy;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Amounts to take from each strategy for one withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalPlan {
    pub from_lower: Wad,
    pub from_higher: Wad,
}

/// Split a withdrawal between the lower- and higher-APR strategies.
///
/// The lower-APR strategy alone if it covers `amount`, else the higher-APR
/// one alone, else drain the lower and take the rest from the higher.
pub fn plan_withdrawal(
    amount: Wad,
    lower_balance: Wad,
    higher_balance: Wad,
) -> ProtocolResult<WithdrawalPlan> {
    if lower_balance >= amount {
        return Ok(WithdrawalPlan {
            from_lower: amount,
            from_higher: Wad::ZERO,
        });
    }
    if higher_balance >= amount {
        return Ok(WithdrawalPlan {
            from_lower: Wad::ZERO,
            from_higher: amount,
        });
    }
    if lower_balance.try_add(higher_balance)? < amount {
        return Err(ProtocolError::InsufficientLiquidity);
    }
    Ok(WithdrawalPlan {
        from_lower: lower_balance,
        from_higher: amount.try_sub(lower_balance)?,
    })
}

#[derive(Debug)]
struct RouterState {
    ownable: Ownable,
    depositor: Address,
    iv_token: ShareLedger,
}

#[derive(Debug)]
pub struct Stanley {
    asset: Asset,
    strategy_a: Arc<dyn Strategy>,
    strategy_b: Arc<dyn Strategy>,
    state: Mutex<RouterState>,
}

impl Stanley {
    pub fn new(
        asset: Asset,
        strategy_a: Arc<dyn Strategy>,
        strategy_b: Arc<dyn Strategy>,
        owner: Address,
        depositor: Address,
    ) -> Self {
        Self {
            asset,
            strategy_a,
            strategy_b,
            state: Mutex::new(RouterState {
                ownable: Ownable::new(owner),
                depositor,
                iv_token: ShareLedger::new(),
            }),
        }
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    /// ivToken price; always 1.0.
    pub fn exchange_rate(&self) -> Wad {
        Wad::ONE
    }

    pub async fn depositor(&self) -> Address {
        self.state.lock().await.depositor.clone()
    }

    /// Hand the depositor role to `depositor`, moving the previous
    /// depositor's ivToken balance with it.
    pub async fn set_depositor(&self, caller: &Address, depositor: Address) -> ProtocolResult<()> {
        let mut state = self.state.lock().await;
        state.ownable.only_owner(caller)?;
        let previous = state.depositor.clone();
        let held = state.iv_token.balance_of(&previous);
        if previous != depositor && !held.is_zero() {
            state.iv_token.burn(&previous, held)?;
            state.iv_token.mint(&depositor, held)?;
        }
        tracing::info!(
            asset = %self.asset.id,
            previous = %previous,
            depositor = %depositor,
            iv_moved = %held,
            "Router depositor updated"
        );
        state.depositor = depositor;
        Ok(())
    }

    pub async fn iv_balance_of(&self, holder: &Address) -> Wad {
        self.state.lock().await.iv_token.balance_of(holder)
    }

    pub async fn iv_total_supply(&self) -> Wad {
        self.state.lock().await.iv_token.total_supply()
    }

    /// Sum of both strategies' balances.
    pub async fn total_balance(&self) -> ProtocolResult<Wad> {
        let (a, b) = futures::try_join!(self.strategy_a.balance_of(), self.strategy_b.balance_of())?;
        Ok(a.try_add(b)?)
    }

    /// Strategies ordered (lower APR, higher APR); ties favour slot A as higher.
    async fn ranked(&self) -> ProtocolResult<(&Arc<dyn Strategy>, &Arc<dyn Strategy>)> {
        let (apr_a, apr_b) =
            futures::try_join!(self.strategy_a.get_apr(), self.strategy_b.get_apr())?;
        if apr_b > apr_a {
            Ok((&self.strategy_a, &self.strategy_b))
        } else {
            Ok((&self.strategy_b, &self.strategy_a))
        }
    }

    /// Place `amount` in the higher-APR strategy and mint ivToken for it.
    pub async fn deposit(&self, caller: &Address, amount: Wad) -> ProtocolResult<Wad> {
        let mut state = self.state.lock().await;
        if caller != &state.depositor {
            return Err(ProtocolError::CallerNotDepositor(caller.clone()));
        }
        let amount = self.asset.truncate(amount);
        if amount.is_zero() {
            return Err(ProtocolError::ZeroAmount);
        }

        let (_, target) = self.ranked().await?;
        let deposited = target.deposit(amount).await?;
        state.iv_token.mint(caller, deposited)?;

        tracing::info!(
            asset = %self.asset.id,
            strategy = target.name(),
            amount = %deposited,
            "Router deposit"
        );
        Ok(deposited)
    }

    /// Return `amount` to the depositor and burn the ivToken actually redeemed.
    ///
    /// `amount` is capped by the ivToken balance; use
    /// [`withdraw_all`](Self::withdraw_all) to collect accrued yield.
    pub async fn withdraw(&self, caller: &Address, amount: Wad) -> ProtocolResult<Wad> {
        let mut state = self.state.lock().await;
        if caller != &state.depositor {
            return Err(ProtocolError::CallerNotDepositor(caller.clone()));
        }
        if amount.is_zero() {
            return Err(ProtocolError::ZeroAmount);
        }
        let held = state.iv_token.balance_of(caller);
        if amount > held {
            return Err(ProtocolError::InsufficientShares {
                held,
                requested: amount,
            });
        }

        let (lower, higher) = self.ranked().await?;
        let (lower_balance, higher_balance) =
            futures::try_join!(lower.balance_of(), higher.balance_of())?;
        let plan = plan_withdrawal(amount, lower_balance, higher_balance)?;

        let (first, second) = self.take(lower, higher, plan).await?;

        let withdrawn = first.try_add(second)?.min(held);
        state.iv_token.burn(caller, withdrawn)?;

        tracing::info!(
            asset = %self.asset.id,
            requested = %amount,
            withdrawn = %withdrawn,
            from_lower = %first,
            from_higher = %second,
            "Router withdrawal"
        );
        Ok(withdrawn)
    }

    /// Drain both strategies, accrued yield included, and burn the caller's
    /// whole ivToken balance.
    pub async fn withdraw_all(&self, caller: &Address) -> ProtocolResult<Wad> {
        let mut state = self.state.lock().await;
        if caller != &state.depositor {
            return Err(ProtocolError::CallerNotDepositor(caller.clone()));
        }
        let held = state.iv_token.balance_of(caller);

        let (lower, higher) = self.ranked().await?;
        let (lower_balance, higher_balance) =
            futures::try_join!(lower.balance_of(), higher.balance_of())?;
        let plan = WithdrawalPlan {
            from_lower: lower_balance,
            from_higher: higher_balance,
        };
        let (first, second) = self.take(lower, higher, plan).await?;

        let withdrawn = first.try_add(second)?;
        if !held.is_zero() {
            state.iv_token.burn(caller, held)?;
        }

        tracing::info!(
            asset = %self.asset.id,
            withdrawn = %withdrawn,
            burned = %held,
            from_lower = %first,
            from_higher = %second,
            "Router full withdrawal"
        );
        Ok(withdrawn)
    }

    /// Run both legs of `plan`. When the second leg fails, the first leg's
    /// proceeds are put back before the error is returned.
    async fn take(
        &self,
        lower: &Arc<dyn Strategy>,
        higher: &Arc<dyn Strategy>,
        plan: WithdrawalPlan,
    ) -> ProtocolResult<(Wad, Wad)> {
        let first = if plan.from_lower.is_zero() {
            Wad::ZERO
        } else {
            lower.withdraw(plan.from_lower).await?
        };
        if plan.from_higher.is_zero() {
            return Ok((first, Wad::ZERO));
        }
        match higher.withdraw(plan.from_higher).await {
            Ok(second) => Ok((first, second)),
            Err(err) => {
                if !first.is_zero() {
                    if let Err(comp_err) = lower.deposit(first).await {
                        tracing::error!(
                            asset = %self.asset.id,
                            strategy = lower.name(),
                            amount = %first,
                            error = %comp_err,
                            "Failed to restore first withdrawal leg"
                        );
                    }
                }
                Err(err.into())
            }
        }
    }
}
