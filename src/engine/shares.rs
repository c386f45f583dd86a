//! Fungible share balances (liquidity-provider and router receipts).

use crate::domain::{Address, Wad};
use crate::engine::{ProtocolError, ProtocolResult};
use std::collections::BTreeMap;

/// Holder balances plus the total supply.
///
/// The sum of all balances always equals `total_supply`; holders whose balance
/// drops to zero are removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareLedger {
    balances: BTreeMap<Address, Wad>,
    total_supply: Wad,
}

impl ShareLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, holder: &Address) -> Wad {
        self.balances.get(holder).copied().unwrap_or(Wad::ZERO)
    }

    pub fn total_supply(&self) -> Wad {
        self.total_supply
    }

    pub fn holders(&self) -> usize {
        self.balances.len()
    }

    pub fn mint(&mut self, to: &Address, amount: Wad) -> ProtocolResult<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let total_supply = self.total_supply.try_add(amount)?;
        let balance = self.balance_of(to).try_add(amount)?;
        self.balances.insert(to.clone(), balance);
        self.total_supply = total_supply;
        Ok(())
    }

    pub fn burn(&mut self, from: &Address, amount: Wad) -> ProtocolResult<()> {
        let held = self.balance_of(from);
        if held < amount {
            return Err(ProtocolError::InsufficientShares {
                held,
                requested: amount,
            });
        }
        let remaining = held.try_sub(amount)?;
        self.total_supply = self.total_supply.try_sub(amount)?;
        if remaining.is_zero() {
            self.balances.remove(from);
        } else {
            self.balances.insert(from.clone(), remaining);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_and_burn_track_supply() {
        let alice = Address::new("alice");
        let bob = Address::new("bob");
        let mut ledger = ShareLedger::new();
        ledger.mint(&alice, Wad::from_units(10)).unwrap();
        ledger.mint(&bob, Wad::from_units(5)).unwrap();
        assert_eq!(ledger.total_supply(), Wad::from_units(15));

        ledger.burn(&alice, Wad::from_units(10)).unwrap();
        assert_eq!(ledger.balance_of(&alice), Wad::ZERO);
        assert_eq!(ledger.total_supply(), Wad::from_units(5));
        assert_eq!(ledger.holders(), 1);
    }

    #[test]
    fn test_burn_more_than_held_fails_without_change() {
        let alice = Address::new("alice");
        let mut ledger = ShareLedger::new();
        ledger.mint(&alice, Wad::from_units(1)).unwrap();
        let err = ledger.burn(&alice, Wad::from_units(2)).unwrap_err();
        assert!(matches!(err, ProtocolError::InsufficientShares { .. }));
        assert_eq!(ledger.balance_of(&alice), Wad::from_units(1));
        assert_eq!(ledger.total_supply(), Wad::from_units(1));
    }

    #[test]
    fn test_zero_mint_leaves_no_entry() {
        let mut ledger = ShareLedger::new();
        ledger.mint(&Address::new("alice"), Wad::ZERO).unwrap();
        assert_eq!(ledger.holders(), 0);
    }
}
