//! Domain types shared by the engine, the router and the HTTP surface.
//!
//! This module provides:
//! - 18-decimal fixed-point arithmetic via [`Wad`] / [`SignedWad`]
//! - Domain primitives: Timestamp, Address, AssetId, Direction
//! - Asset registration data with the native-precision boundary
//! - Derivative position records

pub mod asset;
pub mod derivative;
pub mod primitives;
pub mod wad;

pub use asset::{Asset, NativeAmount};
pub use derivative::{
    Derivative, DerivativeFee, DerivativeIndicator, DerivativeItem, DerivativeState,
    POSITION_PERIOD_SECS,
};
pub use primitives::{Address, AssetId, Direction, Timestamp, SECONDS_PER_YEAR};
pub use wad::{ArithmeticError, SignedWad, Wad, WadParseError, WAD_DECIMALS};
