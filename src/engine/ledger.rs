//! Position ledger: derivative records, per-asset balances and exposure.
//!
//! Only the writer addresses fixed at construction may mutate the ledger, and
//! the caller is checked before anything else. Active position ids are kept in
//! two dense indexes (per asset, and per holder and asset); each stored item
//! remembers its slot in both so a close can swap-and-pop in constant time.

use crate::domain::{
    Address, AssetId, Derivative, DerivativeItem, DerivativeState, Direction, SignedWad, Timestamp,
    Wad,
};
use crate::engine::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Balances held for one asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetBalances {
    /// Pool balance backing the exchange rate.
    pub liquidity_pool: Wad,
    /// Collateral of open positions.
    pub collateral: Wad,
    pub liquidation_deposit: Wad,
    pub ipor_publication_fee: Wad,
    pub treasury: Wad,
}

/// Open notional and collateral per direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exposure {
    pub pay_fixed_notional: Wad,
    pub pay_fixed_collateral: Wad,
    pub receive_fixed_notional: Wad,
    pub receive_fixed_collateral: Wad,
}

impl Exposure {
    fn add(&mut self, derivative: &Derivative) -> ProtocolResult<()> {
        let (notional, collateral) = self.sides_mut(derivative.direction);
        let new_notional = notional.try_add(derivative.notional_amount)?;
        let new_collateral = collateral.try_add(derivative.collateral)?;
        *notional = new_notional;
        *collateral = new_collateral;
        Ok(())
    }

    fn remove(&mut self, derivative: &Derivative) -> ProtocolResult<()> {
        let (notional, collateral) = self.sides_mut(derivative.direction);
        let new_notional = notional.try_sub(derivative.notional_amount)?;
        let new_collateral = collateral.try_sub(derivative.collateral)?;
        *notional = new_notional;
        *collateral = new_collateral;
        Ok(())
    }

    fn sides_mut(&mut self, direction: Direction) -> (&mut Wad, &mut Wad) {
        match direction {
            Direction::PayFixed => (&mut self.pay_fixed_notional, &mut self.pay_fixed_collateral),
            Direction::ReceiveFixed => (
                &mut self.receive_fixed_notional,
                &mut self.receive_fixed_collateral,
            ),
        }
    }

    /// Collateral of all open positions.
    pub fn total_collateral(&self) -> ProtocolResult<Wad> {
        Ok(self
            .pay_fixed_collateral
            .try_add(self.receive_fixed_collateral)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionLedger {
    writers: BTreeSet<Address>,
    last_derivative_id: u64,
    items: BTreeMap<u64, DerivativeItem>,
    derivative_ids: BTreeMap<AssetId, Vec<u64>>,
    user_derivative_ids: BTreeMap<(Address, AssetId), Vec<u64>>,
    balances: BTreeMap<AssetId, AssetBalances>,
    exposures: BTreeMap<AssetId, Exposure>,
}

impl PositionLedger {
    pub fn new(writers: impl IntoIterator<Item = Address>) -> Self {
        Self {
            writers: writers.into_iter().collect(),
            last_derivative_id: 0,
            items: BTreeMap::new(),
            derivative_ids: BTreeMap::new(),
            user_derivative_ids: BTreeMap::new(),
            balances: BTreeMap::new(),
            exposures: BTreeMap::new(),
        }
    }

    fn only_writer(&self, caller: &Address) -> ProtocolResult<()> {
        if !self.writers.contains(caller) {
            return Err(ProtocolError::CallerNotWriter(caller.clone()));
        }
        Ok(())
    }

    // ---- queries ----

    pub fn last_derivative_id(&self) -> u64 {
        self.last_derivative_id
    }

    pub fn get_derivative_item(&self, id: u64) -> ProtocolResult<&DerivativeItem> {
        self.items.get(&id).ok_or(ProtocolError::PositionNotFound(id))
    }

    pub fn get_derivative(&self, id: u64) -> ProtocolResult<&Derivative> {
        self.get_derivative_item(id).map(|item| &item.item)
    }

    /// Active position ids for the asset.
    pub fn get_derivative_ids(&self, asset: &AssetId) -> &[u64] {
        self.derivative_ids
            .get(asset)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Active position ids held by `holder` in `asset`.
    pub fn get_user_derivative_ids(&self, holder: &Address, asset: &AssetId) -> &[u64] {
        self.user_derivative_ids
            .get(&(holder.clone(), asset.clone()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get_user_derivatives(&self, holder: &Address, asset: &AssetId) -> Vec<&Derivative> {
        self.get_user_derivative_ids(holder, asset)
            .iter()
            .filter_map(|id| self.items.get(id).map(|item| &item.item))
            .collect()
    }

    pub fn get_balance(&self, asset: &AssetId) -> AssetBalances {
        self.balances.get(asset).copied().unwrap_or_default()
    }

    pub fn get_exposure(&self, asset: &AssetId) -> Exposure {
        self.exposures.get(asset).copied().unwrap_or_default()
    }

    // ---- mutations ----

    /// Record a newly opened position and return its id.
    ///
    /// The pool receives the opening fee less the treasury share.
    pub fn update_storage_when_open_position(
        &mut self,
        caller: &Address,
        derivative: Derivative,
    ) -> ProtocolResult<u64> {
        self.only_writer(caller)?;

        let asset = derivative.asset.clone();
        let fee = derivative.fee;
        let pool_fee = fee.opening_amount.try_sub(fee.opening_treasury_amount)?;

        let mut balances = self.get_balance(&asset);
        balances.liquidity_pool = balances.liquidity_pool.try_add(pool_fee)?;
        balances.treasury = balances.treasury.try_add(fee.opening_treasury_amount)?;
        balances.ipor_publication_fee = balances
            .ipor_publication_fee
            .try_add(fee.ipor_publication_amount)?;
        balances.liquidation_deposit = balances
            .liquidation_deposit
            .try_add(fee.liquidation_deposit_amount)?;
        balances.collateral = balances.collateral.try_add(derivative.collateral)?;

        let mut exposure = self.get_exposure(&asset);
        exposure.add(&derivative)?;

        let id = self.last_derivative_id + 1;
        let ids = self.derivative_ids.entry(asset.clone()).or_default();
        let ids_index = ids.len();
        ids.push(id);
        let user_ids = self
            .user_derivative_ids
            .entry((derivative.buyer.clone(), asset.clone()))
            .or_default();
        let user_derivative_ids_index = user_ids.len();
        user_ids.push(id);

        let mut item = derivative;
        item.id = id;
        item.state = DerivativeState::Active;
        item.closing_timestamp = None;
        self.items.insert(
            id,
            DerivativeItem {
                item,
                ids_index,
                user_derivative_ids_index,
            },
        );
        self.last_derivative_id = id;
        self.balances.insert(asset.clone(), balances);
        self.exposures.insert(asset.clone(), exposure);

        tracing::info!(id, asset = %asset, "Position stored");
        Ok(id)
    }

    /// Mark a position closed and settle `pnl` against the pool.
    ///
    /// `pnl` is from the trader's point of view: a gain is paid out of the
    /// pool, a loss is credited to it.
    pub fn update_storage_when_close_position(
        &mut self,
        caller: &Address,
        holder: &Address,
        id: u64,
        pnl: SignedWad,
        closing_timestamp: Timestamp,
    ) -> ProtocolResult<()> {
        self.only_writer(caller)?;

        let stored = self.get_derivative_item(id)?;
        if !stored.item.is_active() {
            return Err(ProtocolError::PositionNotActive { id });
        }
        if &stored.item.buyer != holder {
            return Err(ProtocolError::PositionHolderMismatch {
                id,
                holder: holder.clone(),
            });
        }
        let stored = stored.clone();
        let derivative = &stored.item;
        let asset = derivative.asset.clone();

        let mut balances = self.get_balance(&asset);
        balances.collateral = balances.collateral.try_sub(derivative.collateral)?;
        balances.liquidation_deposit = balances
            .liquidation_deposit
            .try_sub(derivative.fee.liquidation_deposit_amount)?;
        balances.liquidity_pool = if pnl.is_negative() {
            balances.liquidity_pool.try_add(pnl.magnitude())?
        } else {
            balances
                .liquidity_pool
                .try_sub(pnl.magnitude())
                .map_err(|_| ProtocolError::InsufficientLiquidity)?
        };

        let mut exposure = self.get_exposure(&asset);
        exposure.remove(derivative)?;

        let ids = self.derivative_ids.entry(asset.clone()).or_default();
        if let Some(moved) = swap_pop(ids, stored.ids_index) {
            if let Some(moved_item) = self.items.get_mut(&moved) {
                moved_item.ids_index = stored.ids_index;
            }
        }
        let user_ids = self
            .user_derivative_ids
            .entry((holder.clone(), asset.clone()))
            .or_default();
        if let Some(moved) = swap_pop(user_ids, stored.user_derivative_ids_index) {
            if let Some(moved_item) = self.items.get_mut(&moved) {
                moved_item.user_derivative_ids_index = stored.user_derivative_ids_index;
            }
        }

        if let Some(entry) = self.items.get_mut(&id) {
            entry.item.state = DerivativeState::Closed;
            entry.item.closing_timestamp = Some(closing_timestamp);
        }
        self.balances.insert(asset.clone(), balances);
        self.exposures.insert(asset.clone(), exposure);

        tracing::info!(id, asset = %asset, pnl = %pnl, "Position closed");
        Ok(())
    }

    pub fn add_liquidity(
        &mut self,
        caller: &Address,
        asset: &AssetId,
        amount: Wad,
    ) -> ProtocolResult<()> {
        self.only_writer(caller)?;
        let mut balances = self.get_balance(asset);
        balances.liquidity_pool = balances.liquidity_pool.try_add(amount)?;
        self.balances.insert(asset.clone(), balances);
        Ok(())
    }

    pub fn subtract_liquidity(
        &mut self,
        caller: &Address,
        asset: &AssetId,
        amount: Wad,
    ) -> ProtocolResult<()> {
        self.only_writer(caller)?;
        let mut balances = self.get_balance(asset);
        balances.liquidity_pool = balances
            .liquidity_pool
            .try_sub(amount)
            .map_err(|_| ProtocolError::InsufficientLiquidity)?;
        self.balances.insert(asset.clone(), balances);
        Ok(())
    }

    pub fn credit_treasury(
        &mut self,
        caller: &Address,
        asset: &AssetId,
        amount: Wad,
    ) -> ProtocolResult<()> {
        self.only_writer(caller)?;
        let mut balances = self.get_balance(asset);
        balances.treasury = balances.treasury.try_add(amount)?;
        self.balances.insert(asset.clone(), balances);
        Ok(())
    }
}

/// Remove `ids[index]` by moving the last element into its slot.
///
/// Returns the id that moved, if any.
fn swap_pop(ids: &mut Vec<u64>, index: usize) -> Option<u64> {
    if index >= ids.len() {
        return None;
    }
    ids.swap_remove(index);
    ids.get(index).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DerivativeFee, DerivativeIndicator, POSITION_PERIOD_SECS};

    fn w(s: &str) -> Wad {
        Wad::from_decimal_str(s).unwrap()
    }

    fn milton() -> Address {
        Address::new("milton")
    }

    fn derivative(buyer: &str, direction: Direction) -> Derivative {
        let start = Timestamp::new(1_000);
        Derivative {
            id: 0,
            state: DerivativeState::Active,
            buyer: Address::new(buyer),
            asset: AssetId::new("DAI"),
            direction,
            collateral: w("1000"),
            fee: DerivativeFee {
                liquidation_deposit_amount: w("20"),
                opening_amount: w("10"),
                opening_treasury_amount: w("1"),
                ipor_publication_amount: w("10"),
                spread_value: w("0.01"),
            },
            collateralization_factor: w("10"),
            notional_amount: w("10000"),
            starting_timestamp: start,
            ending_timestamp: start.plus_secs(POSITION_PERIOD_SECS),
            closing_timestamp: None,
            indicator: DerivativeIndicator::default(),
        }
    }

    #[test]
    fn test_open_assigns_ids_and_balances() {
        let mut ledger = PositionLedger::new([milton()]);
        let id = ledger
            .update_storage_when_open_position(&milton(), derivative("userTwo", Direction::PayFixed))
            .unwrap();
        assert_eq!(id, 1);

        let balances = ledger.get_balance(&AssetId::new("DAI"));
        assert_eq!(balances.liquidity_pool, w("9"));
        assert_eq!(balances.treasury, w("1"));
        assert_eq!(balances.collateral, w("1000"));
        assert_eq!(balances.liquidation_deposit, w("20"));
        assert_eq!(balances.ipor_publication_fee, w("10"));

        let exposure = ledger.get_exposure(&AssetId::new("DAI"));
        assert_eq!(exposure.pay_fixed_notional, w("10000"));
        assert_eq!(exposure.receive_fixed_notional, Wad::ZERO);
    }

    #[test]
    fn test_open_rejects_non_writer() {
        let mut ledger = PositionLedger::new([milton()]);
        let before = ledger.clone();
        let err = ledger
            .update_storage_when_open_position(
                &Address::new("userThree"),
                derivative("userTwo", Direction::PayFixed),
            )
            .unwrap_err();
        assert_eq!(err.code(), Some("IPOR_1"));
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_close_gain_pays_from_pool() {
        let mut ledger = PositionLedger::new([milton()]);
        let dai = AssetId::new("DAI");
        ledger.add_liquidity(&milton(), &dai, w("100")).unwrap();
        let id = ledger
            .update_storage_when_open_position(&milton(), derivative("userTwo", Direction::PayFixed))
            .unwrap();
        ledger
            .update_storage_when_close_position(
                &milton(),
                &Address::new("userTwo"),
                id,
                SignedWad::positive(w("10")),
                Timestamp::new(2_000),
            )
            .unwrap();

        let balances = ledger.get_balance(&dai);
        assert_eq!(balances.liquidity_pool, w("99"));
        assert_eq!(balances.collateral, Wad::ZERO);
        assert_eq!(balances.liquidation_deposit, Wad::ZERO);
        let stored = ledger.get_derivative(id).unwrap();
        assert_eq!(stored.state, DerivativeState::Closed);
        assert_eq!(stored.closing_timestamp, Some(Timestamp::new(2_000)));
        assert!(ledger.get_derivative_ids(&dai).is_empty());
        assert_eq!(ledger.get_exposure(&dai), Exposure::default());
    }

    #[test]
    fn test_close_twice_fails() {
        let mut ledger = PositionLedger::new([milton()]);
        let id = ledger
            .update_storage_when_open_position(&milton(), derivative("userTwo", Direction::PayFixed))
            .unwrap();
        let holder = Address::new("userTwo");
        ledger
            .update_storage_when_close_position(&milton(), &holder, id, SignedWad::ZERO, Timestamp::new(5))
            .unwrap();
        let err = ledger
            .update_storage_when_close_position(&milton(), &holder, id, SignedWad::ZERO, Timestamp::new(6))
            .unwrap_err();
        assert_eq!(err, ProtocolError::PositionNotActive { id });
    }

    #[test]
    fn test_gain_above_pool_fails() {
        let mut ledger = PositionLedger::new([milton()]);
        let id = ledger
            .update_storage_when_open_position(&milton(), derivative("userTwo", Direction::ReceiveFixed))
            .unwrap();
        let err = ledger
            .update_storage_when_close_position(
                &milton(),
                &Address::new("userTwo"),
                id,
                SignedWad::positive(w("500")),
                Timestamp::new(5),
            )
            .unwrap_err();
        assert_eq!(err, ProtocolError::InsufficientLiquidity);
        assert!(ledger.get_derivative(id).unwrap().is_active());
    }

    #[test]
    fn test_swap_pop_helper() {
        let mut ids = vec![1, 2, 3];
        assert_eq!(swap_pop(&mut ids, 0), Some(3));
        assert_eq!(ids, vec![3, 2]);
        assert_eq!(swap_pop(&mut ids, 1), None);
        assert_eq!(ids, vec![3]);
    }
}
