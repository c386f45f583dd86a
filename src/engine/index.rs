//! Published benchmark rate per asset and the interest-bearing-token price.

use crate::domain::{Address, AssetId, Timestamp, Wad, SECONDS_PER_YEAR};
use crate::engine::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IporIndex {
    pub index_value: Wad,
    /// Starts at 1.0 and accrues at the previous index value.
    pub ibt_price: Wad,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOracle {
    updaters: BTreeSet<Address>,
    indexes: BTreeMap<AssetId, IporIndex>,
}

impl IndexOracle {
    pub fn new(updaters: impl IntoIterator<Item = Address>) -> Self {
        Self {
            updaters: updaters.into_iter().collect(),
            indexes: BTreeMap::new(),
        }
    }

    pub fn is_updater(&self, account: &Address) -> bool {
        self.updaters.contains(account)
    }

    pub fn get_index(&self, asset: &AssetId) -> ProtocolResult<&IporIndex> {
        self.indexes
            .get(asset)
            .ok_or_else(|| ProtocolError::IndexNotPublished(asset.clone()))
    }

    /// Publish a new index value.
    ///
    /// The token price accrues `price * previous_index * elapsed / year` since
    /// the previous publication.
    pub fn update_index(
        &mut self,
        caller: &Address,
        asset: &AssetId,
        index_value: Wad,
        now: Timestamp,
    ) -> ProtocolResult<IporIndex> {
        if !self.is_updater(caller) {
            return Err(ProtocolError::CallerNotUpdater(caller.clone()));
        }

        let ibt_price = match self.indexes.get(asset) {
            None => Wad::ONE,
            Some(previous) => {
                let elapsed = now.secs_since(previous.timestamp);
                let accrued = previous
                    .ibt_price
                    .try_mul(previous.index_value)?
                    .try_mul_int(elapsed)?
                    .try_div_int(SECONDS_PER_YEAR)?;
                previous.ibt_price.try_add(accrued)?
            }
        };

        let index = IporIndex {
            index_value,
            ibt_price,
            timestamp: now,
        };
        self.indexes.insert(asset.clone(), index);
        tracing::info!(asset = %asset, index = %index_value, ibt_price = %ibt_price, "Index updated");
        Ok(index)
    }
}
