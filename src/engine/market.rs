//! The market aggregate and its transactional service wrapper.

use crate::domain::{
    Address, Asset, AssetId, Derivative, SignedWad, Timestamp, Wad,
};
use crate::engine::amm::{self, ClosePositionOutcome, OpenPositionRequest};
use crate::engine::pool::{self, ProvideOutcome, RedeemOutcome};
use crate::engine::{
    AssetBalances, Exposure, IndexOracle, IporIndex, ParamValues, PositionLedger, ProtocolError,
    ProtocolParams, ProtocolResult, ShareLedger,
};
use crate::governance::Ownable;
use alloy_primitives::U256;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Addresses and initial values a market is built from.
#[derive(Debug, Clone)]
pub struct MarketSetup {
    pub owner: Address,
    /// Trading engine identity; a ledger writer.
    pub amm: Address,
    /// Pool engine identity; a ledger writer.
    pub pool: Address,
    pub index_updaters: Vec<Address>,
    pub params: ParamValues,
}

/// Pool state for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSnapshot {
    pub asset: AssetId,
    pub decimals: u8,
    pub exchange_rate: Wad,
    pub total_shares: Wad,
    pub balances: AssetBalances,
    pub exposure: Exposure,
}

#[derive(Debug, Clone)]
pub struct Market {
    ownable: Ownable,
    amm: Address,
    pool: Address,
    assets: BTreeMap<AssetId, Asset>,
    shares: BTreeMap<AssetId, ShareLedger>,
    params: ProtocolParams,
    index: IndexOracle,
    ledger: PositionLedger,
}

impl Market {
    pub fn new(setup: MarketSetup) -> Self {
        Self {
            ownable: Ownable::new(setup.owner.clone()),
            ledger: PositionLedger::new([setup.amm.clone(), setup.pool.clone()]),
            amm: setup.amm,
            pool: setup.pool,
            assets: BTreeMap::new(),
            shares: BTreeMap::new(),
            params: ProtocolParams::with_values(setup.owner, setup.params),
            index: IndexOracle::new(setup.index_updaters),
        }
    }

    pub fn ownable(&self) -> &Ownable {
        &self.ownable
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ProtocolParams {
        &mut self.params
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    /// Direct ledger access; mutations still require a writer address.
    pub fn ledger_mut(&mut self) -> &mut PositionLedger {
        &mut self.ledger
    }

    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> ProtocolResult<()> {
        self.ownable.transfer_ownership(caller, new_owner)
    }

    pub fn confirm_transfer_ownership(&mut self, caller: &Address) -> ProtocolResult<()> {
        self.ownable.confirm_transfer_ownership(caller)
    }

    /// Register an asset. Owner only, once per id.
    pub fn add_asset(&mut self, caller: &Address, asset: Asset) -> ProtocolResult<()> {
        self.ownable.only_owner(caller)?;
        if self.assets.contains_key(&asset.id) {
            return Err(ProtocolError::AssetAlreadyRegistered(asset.id));
        }
        tracing::info!(asset = %asset.id, decimals = asset.decimals, "Asset registered");
        self.shares.insert(asset.id.clone(), ShareLedger::new());
        self.assets.insert(asset.id.clone(), asset);
        Ok(())
    }

    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    pub fn asset(&self, id: &AssetId) -> ProtocolResult<&Asset> {
        self.assets
            .get(id)
            .ok_or_else(|| ProtocolError::AssetNotSupported(id.clone()))
    }

    fn shares(&self, id: &AssetId) -> ProtocolResult<&ShareLedger> {
        self.shares
            .get(id)
            .ok_or_else(|| ProtocolError::AssetNotSupported(id.clone()))
    }

    pub fn share_balance(&self, id: &AssetId, holder: &Address) -> ProtocolResult<Wad> {
        Ok(self.shares(id)?.balance_of(holder))
    }

    pub fn exchange_rate(&self, id: &AssetId) -> ProtocolResult<Wad> {
        let shares = self.shares(id)?;
        pool::calculate_exchange_rate(
            self.ledger.get_balance(id).liquidity_pool,
            shares.total_supply(),
        )
    }

    pub fn pool_snapshot(&self, id: &AssetId) -> ProtocolResult<PoolSnapshot> {
        let asset = self.asset(id)?;
        Ok(PoolSnapshot {
            asset: asset.id.clone(),
            decimals: asset.decimals,
            exchange_rate: self.exchange_rate(id)?,
            total_shares: self.shares(id)?.total_supply(),
            balances: self.ledger.get_balance(id),
            exposure: self.ledger.get_exposure(id),
        })
    }

    pub fn provide_liquidity(
        &mut self,
        provider: &Address,
        id: &AssetId,
        native_amount: U256,
    ) -> ProtocolResult<ProvideOutcome> {
        let asset = self.asset(id)?.clone();
        let shares = self
            .shares
            .get_mut(id)
            .ok_or_else(|| ProtocolError::AssetNotSupported(id.clone()))?;
        pool::provide_liquidity(
            &mut self.ledger,
            shares,
            &self.pool,
            &asset,
            provider,
            native_amount,
        )
    }

    pub fn redeem(
        &mut self,
        holder: &Address,
        id: &AssetId,
        share_amount: Wad,
    ) -> ProtocolResult<RedeemOutcome> {
        let asset = self.asset(id)?.clone();
        let shares = self
            .shares
            .get_mut(id)
            .ok_or_else(|| ProtocolError::AssetNotSupported(id.clone()))?;
        pool::redeem(
            &mut self.ledger,
            shares,
            &self.pool,
            &asset,
            holder,
            share_amount,
        )
    }

    pub fn index(&self, id: &AssetId) -> ProtocolResult<&IporIndex> {
        self.index.get_index(id)
    }

    pub fn update_index(
        &mut self,
        caller: &Address,
        id: &AssetId,
        value: Wad,
        now: Timestamp,
    ) -> ProtocolResult<IporIndex> {
        self.asset(id)?;
        self.index.update_index(caller, id, value, now)
    }

    pub fn open_position(
        &mut self,
        id: &AssetId,
        request: OpenPositionRequest,
        now: Timestamp,
    ) -> ProtocolResult<Derivative> {
        let asset = self.asset(id)?.clone();
        let index = *self.index.get_index(id)?;
        amm::open_position(
            &mut self.ledger,
            &self.amm,
            self.params.values(),
            &index,
            &asset,
            request,
            now,
        )
    }

    pub fn close_position(
        &mut self,
        closer: &Address,
        position_id: u64,
        settlement: SignedWad,
        now: Timestamp,
    ) -> ProtocolResult<ClosePositionOutcome> {
        let asset_id = self.ledger.get_derivative(position_id)?.asset.clone();
        let asset = self.asset(&asset_id)?.clone();
        amm::close_position(
            &mut self.ledger,
            &self.amm,
            self.params.values(),
            &asset,
            closer,
            position_id,
            settlement,
            now,
        )
    }

    /// Active positions of `holder` in `id`.
    pub fn positions(&self, holder: &Address, id: &AssetId) -> ProtocolResult<Vec<Derivative>> {
        self.asset(id)?;
        Ok(self
            .ledger
            .get_user_derivatives(holder, id)
            .into_iter()
            .cloned()
            .collect())
    }
}

/// Shared, serialised access to a [`Market`].
///
/// Each mutation runs against a copy of the market and is committed only when
/// it returns `Ok`, so a failed operation leaves no partial state behind.
#[derive(Clone)]
pub struct MarketService {
    inner: Arc<Mutex<Market>>,
}

impl MarketService {
    pub fn new(market: Market) -> Self {
        Self {
            inner: Arc::new(Mutex::new(market)),
        }
    }

    pub async fn transact<T, F>(&self, op: F) -> ProtocolResult<T>
    where
        F: FnOnce(&mut Market) -> ProtocolResult<T>,
    {
        let mut guard = self.inner.lock().await;
        let mut draft = guard.clone();
        let out = op(&mut draft)?;
        *guard = draft;
        Ok(out)
    }

    pub async fn read<T, F>(&self, op: F) -> T
    where
        F: FnOnce(&Market) -> T,
    {
        let guard = self.inner.lock().await;
        op(&guard)
    }
}
