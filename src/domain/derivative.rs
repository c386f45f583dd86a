//! Derivative position records kept by the position ledger.

use crate::domain::{Address, AssetId, Direction, Timestamp, Wad};
use serde::{Deserialize, Serialize};

/// Lifetime of a position from opening to maturity (28 days).
pub const POSITION_PERIOD_SECS: u64 = 28 * 24 * 60 * 60;

/// Position state. Closing is terminal; closed records are retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivativeState {
    Active,
    Closed,
}

/// Fee breakdown charged when the position was opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivativeFee {
    /// Held until close, then paid to whoever closes the position.
    pub liquidation_deposit_amount: Wad,
    /// Full opening fee (pool share plus treasury share).
    pub opening_amount: Wad,
    /// Part of `opening_amount` routed to the treasury.
    pub opening_treasury_amount: Wad,
    pub ipor_publication_amount: Wad,
    /// Spread applied on top of the index to derive the fixed rate.
    pub spread_value: Wad,
}

/// Market snapshot taken when the position was opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivativeIndicator {
    pub ipor_index_value: Wad,
    /// Interest-bearing-token price.
    pub ibt_price: Wad,
    pub ibt_quantity: Wad,
    pub fixed_interest_rate: Wad,
    pub soap: Wad,
}

/// A derivative position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Derivative {
    /// Assigned by the ledger on open; zero before that.
    pub id: u64,
    pub state: DerivativeState,
    pub buyer: Address,
    pub asset: AssetId,
    pub direction: Direction,
    pub collateral: Wad,
    pub fee: DerivativeFee,
    pub collateralization_factor: Wad,
    pub notional_amount: Wad,
    pub starting_timestamp: Timestamp,
    pub ending_timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closing_timestamp: Option<Timestamp>,
    pub indicator: DerivativeIndicator,
}

impl Derivative {
    pub fn is_active(&self) -> bool {
        self.state == DerivativeState::Active
    }

    /// True once the position reached its ending timestamp.
    pub fn is_matured(&self, now: Timestamp) -> bool {
        now >= self.ending_timestamp
    }
}

/// A stored derivative together with its positions in the active indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivativeItem {
    pub item: Derivative,
    /// Position in the asset-wide active id list.
    pub ids_index: usize,
    /// Position in the holder's active id list for the asset.
    pub user_derivative_ids_index: usize,
}
