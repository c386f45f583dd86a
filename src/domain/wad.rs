//! 18-decimal fixed-point numbers backed by a 256-bit unsigned integer.
//!
//! All monetary values and percentages inside the engine are `Wad`s: the raw
//! integer holds the value multiplied by 10^18. Multiplication and division
//! truncate toward zero; there is no rounding to nearest anywhere.

use alloy_primitives::U256;
use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional decimal digits carried by a [`Wad`].
pub const WAD_DECIMALS: u8 = 18;

const WAD_SCALE: u64 = 1_000_000_000_000_000_000;

/// Errors raised by fixed-point arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("arithmetic overflow")]
    Overflow,
    #[error("arithmetic underflow")]
    Underflow,
    #[error("division by zero")]
    DivisionByZero,
}

/// Errors raised when parsing a human-readable decimal into a [`Wad`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WadParseError {
    #[error("invalid decimal: {0}")]
    Invalid(String),
    #[error("negative values are not allowed: {0}")]
    Negative(String),
}

/// 10^exp as a U256.
pub(crate) fn pow10(exp: u8) -> U256 {
    let ten = U256::from(10u64);
    (0..exp).fold(U256::from(1u64), |acc, _| acc * ten)
}

/// Unsigned 18-decimal fixed-point value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Wad(U256);

impl Wad {
    /// 0.0
    pub const ZERO: Wad = Wad(U256::ZERO);
    /// 1.0
    pub const ONE: Wad = Wad(U256::from_limbs([WAD_SCALE, 0, 0, 0]));

    /// Wrap a raw 18-decimal integer.
    pub const fn from_raw(raw: U256) -> Self {
        Wad(raw)
    }

    /// Wrap a raw 18-decimal integer given as u128.
    pub fn from_raw_u128(raw: u128) -> Self {
        Wad(U256::from(raw))
    }

    /// Whole units, e.g. `from_units(40)` is 40.0.
    pub fn from_units(units: u64) -> Self {
        Wad(U256::from(units) * U256::from(WAD_SCALE))
    }

    /// `numerator / denominator` as a Wad, e.g. `from_ratio(3, 100)` is 0.03.
    pub fn from_ratio(numerator: u64, denominator: u64) -> Result<Self, ArithmeticError> {
        Wad::from_units(numerator).try_div(Wad::from_units(denominator))
    }

    /// Parse a human-readable decimal string ("0.01", "1500") losslessly.
    ///
    /// Digits beyond the 18th fractional place are truncated.
    pub fn from_decimal_str(s: &str) -> Result<Self, WadParseError> {
        let value =
            RustDecimal::from_str(s.trim()).map_err(|_| WadParseError::Invalid(s.to_string()))?;
        if value.is_sign_negative() && !value.is_zero() {
            return Err(WadParseError::Negative(s.to_string()));
        }
        let mantissa = U256::from(value.mantissa().unsigned_abs());
        let scale = value.scale() as u8;
        let raw = if scale <= WAD_DECIMALS {
            mantissa
                .checked_mul(pow10(WAD_DECIMALS - scale))
                .ok_or_else(|| WadParseError::Invalid(s.to_string()))?
        } else {
            mantissa / pow10(scale - WAD_DECIMALS)
        };
        Ok(Wad(raw))
    }

    /// The raw 18-decimal integer.
    pub fn raw(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn try_add(self, rhs: Wad) -> Result<Wad, ArithmeticError> {
        self.0
            .checked_add(rhs.0)
            .map(Wad)
            .ok_or(ArithmeticError::Overflow)
    }

    pub fn try_sub(self, rhs: Wad) -> Result<Wad, ArithmeticError> {
        self.0
            .checked_sub(rhs.0)
            .map(Wad)
            .ok_or(ArithmeticError::Underflow)
    }

    /// `self - rhs`, floored at zero.
    pub fn saturating_sub(self, rhs: Wad) -> Wad {
        Wad(self.0.saturating_sub(rhs.0))
    }

    /// Fixed-point product `self * rhs / 1e18`, truncated.
    pub fn try_mul(self, rhs: Wad) -> Result<Wad, ArithmeticError> {
        let product = self
            .0
            .checked_mul(rhs.0)
            .ok_or(ArithmeticError::Overflow)?;
        Ok(Wad(product / U256::from(WAD_SCALE)))
    }

    /// Fixed-point quotient `self * 1e18 / rhs`, truncated.
    pub fn try_div(self, rhs: Wad) -> Result<Wad, ArithmeticError> {
        if rhs.is_zero() {
            return Err(ArithmeticError::DivisionByZero);
        }
        let scaled = self
            .0
            .checked_mul(U256::from(WAD_SCALE))
            .ok_or(ArithmeticError::Overflow)?;
        Ok(Wad(scaled / rhs.0))
    }

    /// Multiply by a plain integer (no rescaling).
    pub fn try_mul_int(self, rhs: u64) -> Result<Wad, ArithmeticError> {
        self.0
            .checked_mul(U256::from(rhs))
            .map(Wad)
            .ok_or(ArithmeticError::Overflow)
    }

    /// Divide by a plain integer (no rescaling), truncated.
    pub fn try_div_int(self, rhs: u64) -> Result<Wad, ArithmeticError> {
        if rhs == 0 {
            return Err(ArithmeticError::DivisionByZero);
        }
        Ok(Wad(self.0 / U256::from(rhs)))
    }

    pub fn min(self, other: Wad) -> Wad {
        std::cmp::min(self, other)
    }

    /// Format as a decimal string without exponent or trailing zeros.
    pub fn to_decimal_string(&self) -> String {
        let scale = U256::from(WAD_SCALE);
        let integer = self.0 / scale;
        let fraction = self.0 % scale;
        if fraction.is_zero() {
            return integer.to_string();
        }
        let fraction = format!("{:0>18}", fraction.to_string());
        format!("{}.{}", integer, fraction.trim_end_matches('0'))
    }
}

impl fmt::Display for Wad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal_string())
    }
}

impl FromStr for Wad {
    type Err = WadParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_decimal_str(s)
    }
}

// Raw integer string on the wire, matching on-chain uint256 encoding.
impl Serialize for Wad {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Wad {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_str(&s)
            .map(Wad)
            .map_err(|e| serde::de::Error::custom(format!("invalid wad {}: {}", s, e)))
    }
}

/// Signed 18-decimal value, used for realised settlement amounts.
///
/// Zero is always non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SignedWad {
    magnitude: Wad,
    negative: bool,
}

impl SignedWad {
    pub const ZERO: SignedWad = SignedWad {
        magnitude: Wad::ZERO,
        negative: false,
    };

    pub fn positive(magnitude: Wad) -> Self {
        SignedWad {
            magnitude,
            negative: false,
        }
    }

    pub fn negative(magnitude: Wad) -> Self {
        SignedWad {
            magnitude,
            negative: !magnitude.is_zero(),
        }
    }

    pub fn magnitude(&self) -> Wad {
        self.magnitude
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn is_positive(&self) -> bool {
        !self.negative && !self.magnitude.is_zero()
    }
}

impl fmt::Display for SignedWad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-{}", self.magnitude)
        } else {
            write!(f, "{}", self.magnitude)
        }
    }
}

impl Serialize for SignedWad {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw = self.magnitude.raw().to_string();
        if self.negative {
            serializer.serialize_str(&format!("-{}", raw))
        } else {
            serializer.serialize_str(&raw)
        }
    }
}

impl<'de> Deserialize<'de> for SignedWad {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.as_str()),
        };
        let magnitude = U256::from_str(digits)
            .map(Wad)
            .map_err(|e| serde::de::Error::custom(format!("invalid signed wad {}: {}", s, e)))?;
        Ok(if negative {
            SignedWad::negative(magnitude)
        } else {
            SignedWad::positive(magnitude)
        })
    }
}
