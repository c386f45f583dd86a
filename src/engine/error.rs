use crate::domain::{Address, ArithmeticError, AssetId, Wad};
use crate::strategy::StrategyError;
use thiserror::Error;

pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Failure classes surfaced to callers. Every failure leaves state unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AccessDenied,
    Validation,
    InsufficientLiquidity,
    TimelockNotReady,
    UnderlyingCallReverted,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("caller {0} is not an authorised ledger writer")]
    CallerNotWriter(Address),
    #[error("Ownable: caller is not the owner")]
    CallerNotOwner(Address),
    #[error("caller {0} is not the appointed owner")]
    CallerNotAppointedOwner(Address),
    #[error("caller {0} is not an index updater")]
    CallerNotUpdater(Address),
    #[error("caller {0} is not the router depositor")]
    CallerNotDepositor(Address),
    #[error("account {account} is missing role {role}")]
    MissingRole { account: Address, role: &'static str },
    #[error("position {id} can only be closed by its buyer before maturity")]
    CallerNotPositionBuyer { id: u64 },

    #[error("parameter {name} out of range: {value}")]
    ParameterOutOfRange { name: &'static str, value: Wad },
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error("asset {0} is already registered")]
    AssetAlreadyRegistered(AssetId),
    #[error("insufficient shares: held {held}, requested {requested}")]
    InsufficientShares { held: Wad, requested: Wad },
    #[error("collateralization factor {0} out of range")]
    CollateralizationOutOfRange(Wad),
    #[error("total amount {0} does not cover the liquidation deposit and publication fee")]
    TotalAmountTooLow(Wad),
    #[error("liquidity pool utilization {0} exceeds the maximum")]
    UtilizationExceeded(Wad),
    #[error("position {id} is not active")]
    PositionNotActive { id: u64 },
    #[error("position {id} does not belong to {holder}")]
    PositionHolderMismatch { id: u64, holder: Address },
    #[error("delay {delay}s is below the minimum {min_delay}s")]
    DelayBelowMinimum { delay: u64, min_delay: u64 },
    #[error("operation {0} is already scheduled")]
    OperationAlreadyScheduled(String),
    #[error("arithmetic error: {0}")]
    Arithmetic(#[from] ArithmeticError),

    #[error("insufficient liquidity in pool")]
    InsufficientLiquidity,

    #[error("operation {0} is not ready")]
    TimelockNotReady(String),
    #[error("predecessor {0} has not been executed")]
    PredecessorNotDone(String),

    #[error("underlying transaction reverted: {0}")]
    UnderlyingCallReverted(String),
    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error("asset {0} is not registered")]
    AssetNotSupported(AssetId),
    #[error("no index published for asset {0}")]
    IndexNotPublished(AssetId),
    #[error("position {0} not found")]
    PositionNotFound(u64),
    #[error("operation {0} not found")]
    OperationNotFound(String),
}

impl ProtocolError {
    pub fn kind(&self) -> ErrorKind {
        use ProtocolError::*;
        match self {
            CallerNotWriter(_)
            | CallerNotOwner(_)
            | CallerNotAppointedOwner(_)
            | CallerNotUpdater(_)
            | CallerNotDepositor(_)
            | MissingRole { .. }
            | CallerNotPositionBuyer { .. } => ErrorKind::AccessDenied,
            ParameterOutOfRange { .. }
            | ZeroAmount
            | AssetAlreadyRegistered(_)
            | InsufficientShares { .. }
            | CollateralizationOutOfRange(_)
            | TotalAmountTooLow(_)
            | UtilizationExceeded(_)
            | PositionNotActive { .. }
            | PositionHolderMismatch { .. }
            | DelayBelowMinimum { .. }
            | OperationAlreadyScheduled(_)
            | Arithmetic(_) => ErrorKind::Validation,
            InsufficientLiquidity => ErrorKind::InsufficientLiquidity,
            TimelockNotReady(_) | PredecessorNotDone(_) => ErrorKind::TimelockNotReady,
            UnderlyingCallReverted(_) | Strategy(_) => ErrorKind::UnderlyingCallReverted,
            AssetNotSupported(_)
            | IndexNotPublished(_)
            | PositionNotFound(_)
            | OperationNotFound(_) => ErrorKind::NotFound,
        }
    }

    /// Protocol error code, where one exists.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            ProtocolError::CallerNotWriter(_) => Some("IPOR_1"),
            ProtocolError::CallerNotAppointedOwner(_) => Some("IPOR_007"),
            ProtocolError::ParameterOutOfRange { .. } => Some("IPOR_24"),
            ProtocolError::InsufficientLiquidity => Some("IPOR_45"),
            _ => None,
        }
    }
}
