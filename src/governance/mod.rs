//! Access-control fixtures: two-step ownership and the timelock.

pub mod ownable;
pub mod timelock;

pub use ownable::Ownable;
pub use timelock::{
    parse_bytes32, Governed, Operation, OperationId, OperationState, Salt, Timelock,
    EXECUTOR_ROLE, PROPOSER_ROLE,
};
