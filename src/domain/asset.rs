//! Registered asset and the decimal-normalisation boundary.
//!
//! Inside the engine every amount is an 18-decimal [`Wad`]. Token amounts
//! enter and leave in the asset's native precision:
//! - entering (`to_wad`) scales up exactly;
//! - leaving (`from_wad`) truncates toward zero, and the truncated remainder
//!   is reported so callers can leave it where it was.

use super::wad::{pow10, ArithmeticError, Wad, WAD_DECIMALS};
use super::AssetId;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// An asset registered with the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    /// Native token precision, at most 18.
    pub decimals: u8,
}

/// Result of converting an internal amount to native precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeAmount {
    /// Amount in native token units.
    pub native: U256,
    /// The same amount back in 18 decimals (what actually leaves).
    pub wad: Wad,
    /// Truncated remainder that does not leave.
    pub dust: Wad,
}

impl Asset {
    /// Create an asset. Precision above 18 decimals is rejected.
    pub fn new(id: impl Into<String>, decimals: u8) -> Option<Self> {
        if decimals > WAD_DECIMALS {
            return None;
        }
        Some(Asset {
            id: AssetId::new(id),
            decimals,
        })
    }

    fn scale(&self) -> U256 {
        pow10(WAD_DECIMALS - self.decimals)
    }

    /// Native token units to an 18-decimal amount (exact).
    pub fn to_wad(&self, native: U256) -> Result<Wad, ArithmeticError> {
        native
            .checked_mul(self.scale())
            .map(Wad::from_raw)
            .ok_or(ArithmeticError::Overflow)
    }

    /// 18-decimal amount to native token units, truncating.
    pub fn from_wad(&self, amount: Wad) -> NativeAmount {
        let scale = self.scale();
        let native = amount.raw() / scale;
        let wad = Wad::from_raw(native * scale);
        NativeAmount {
            native,
            wad,
            dust: amount.saturating_sub(wad),
        }
    }

    /// Drop precision the native token cannot represent.
    pub fn truncate(&self, amount: Wad) -> Wad {
        self.from_wad(amount).wad
    }

    /// One whole token in native units (10^decimals).
    pub fn one_token(&self) -> U256 {
        pow10(self.decimals)
    }
}
