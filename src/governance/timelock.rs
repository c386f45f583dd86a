//! Two-phase scheduled execution of privileged calls.
//!
//! A proposer schedules an operation with a delay of at least `min_delay`.
//! Once the delay elapsed an executor may execute it exactly once; the call is
//! dispatched to the target with the timelock's own address as caller, so the
//! timelock must own the target for privileged calls to succeed.

use crate::domain::{Address, Timestamp};
use crate::engine::{ProtocolError, ProtocolResult};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

pub const PROPOSER_ROLE: &str = "PROPOSER_ROLE";
pub const EXECUTOR_ROLE: &str = "EXECUTOR_ROLE";

/// 32-byte operation salt.
pub type Salt = [u8; 32];

/// A component whose privileged entry points can be driven by the timelock.
pub trait Governed {
    type Call: Serialize + fmt::Debug;

    /// Stable name used in operation ids.
    fn governed_name(&self) -> &str;

    /// Apply `call` on behalf of `caller`.
    fn dispatch(&mut self, caller: &Address, call: &Self::Call) -> ProtocolResult<()>;
}

/// Content hash identifying a scheduled operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId([u8; 32]);

impl OperationId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Parse a 0x-prefixed 32-byte hex string (salts, predecessors).
pub fn parse_bytes32(s: &str) -> Option<[u8; 32]> {
    let bytes = hex::decode(s.trim_start_matches("0x")).ok()?;
    bytes.try_into().ok()
}

/// A call to be scheduled, as submitted by a proposer.
#[derive(Debug, Clone)]
pub struct Operation<C> {
    pub target: String,
    pub value: u128,
    pub call: C,
    pub predecessor: Option<OperationId>,
    pub salt: Salt,
}

impl<C: Serialize> Operation<C> {
    pub fn new(target: impl Into<String>, call: C, salt: Salt) -> Self {
        Self {
            target: target.into(),
            value: 0,
            call,
            predecessor: None,
            salt,
        }
    }

    pub fn with_predecessor(mut self, predecessor: OperationId) -> Self {
        self.predecessor = Some(predecessor);
        self
    }

    /// Hash of (target, value, call, predecessor, salt).
    pub fn id(&self) -> ProtocolResult<OperationId> {
        fn hash_var(hasher: &mut Sha256, data: &[u8]) {
            hasher.update((data.len() as u32).to_le_bytes());
            hasher.update(data);
        }

        let encoded_call = serde_json::to_vec(&self.call).map_err(|e| {
            ProtocolError::UnderlyingCallReverted(format!("call encoding failed: {}", e))
        })?;

        let mut hasher = Sha256::new();
        hash_var(&mut hasher, self.target.as_bytes());
        hasher.update(self.value.to_le_bytes());
        hash_var(&mut hasher, &encoded_call);
        hasher.update(self.predecessor.map(|p| p.0).unwrap_or([0u8; 32]));
        hasher.update(self.salt);
        Ok(OperationId(hasher.finalize().into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Pending { ready_at: Timestamp },
    Done,
}

#[derive(Debug, Clone)]
pub struct Timelock {
    address: Address,
    min_delay: u64,
    proposers: BTreeSet<Address>,
    executors: BTreeSet<Address>,
    operations: HashMap<OperationId, OperationState>,
}

impl Timelock {
    pub fn new(
        address: Address,
        min_delay: u64,
        proposers: impl IntoIterator<Item = Address>,
        executors: impl IntoIterator<Item = Address>,
    ) -> Self {
        Self {
            address,
            min_delay,
            proposers: proposers.into_iter().collect(),
            executors: executors.into_iter().collect(),
            operations: HashMap::new(),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn min_delay(&self) -> u64 {
        self.min_delay
    }

    pub fn operation_state(&self, id: &OperationId) -> Option<OperationState> {
        self.operations.get(id).copied()
    }

    pub fn is_operation_done(&self, id: &OperationId) -> bool {
        matches!(self.operations.get(id), Some(OperationState::Done))
    }

    fn require_role(
        set: &BTreeSet<Address>,
        caller: &Address,
        role: &'static str,
    ) -> ProtocolResult<()> {
        if !set.contains(caller) {
            return Err(ProtocolError::MissingRole {
                account: caller.clone(),
                role,
            });
        }
        Ok(())
    }

    pub fn schedule<C: Serialize>(
        &mut self,
        caller: &Address,
        operation: &Operation<C>,
        delay: u64,
        now: Timestamp,
    ) -> ProtocolResult<OperationId> {
        Self::require_role(&self.proposers, caller, PROPOSER_ROLE)?;
        if delay < self.min_delay {
            return Err(ProtocolError::DelayBelowMinimum {
                delay,
                min_delay: self.min_delay,
            });
        }
        let id = operation.id()?;
        if self.operations.contains_key(&id) {
            return Err(ProtocolError::OperationAlreadyScheduled(id.to_string()));
        }

        let ready_at = now.plus_secs(delay);
        self.operations
            .insert(id, OperationState::Pending { ready_at });
        tracing::info!(operation = %id, target = %operation.target, ready_at = ready_at.as_secs(), "Operation scheduled");
        Ok(id)
    }

    /// Execute a ready operation against `target`.
    ///
    /// If the dispatched call fails the operation stays pending and can be
    /// retried.
    pub fn execute<T: Governed>(
        &mut self,
        caller: &Address,
        target: &mut T,
        operation: &Operation<T::Call>,
        now: Timestamp,
    ) -> ProtocolResult<()> {
        Self::require_role(&self.executors, caller, EXECUTOR_ROLE)?;
        let id = operation.id()?;

        match self.operations.get(&id) {
            Some(OperationState::Pending { ready_at }) if now >= *ready_at => {}
            _ => return Err(ProtocolError::TimelockNotReady(id.to_string())),
        }
        if let Some(predecessor) = operation.predecessor {
            if !self.is_operation_done(&predecessor) {
                return Err(ProtocolError::PredecessorNotDone(predecessor.to_string()));
            }
        }
        if target.governed_name() != operation.target {
            return Err(ProtocolError::UnderlyingCallReverted(format!(
                "operation targets {} but was executed against {}",
                operation.target,
                target.governed_name()
            )));
        }

        target
            .dispatch(&self.address, &operation.call)
            .map_err(|e| ProtocolError::UnderlyingCallReverted(e.to_string()))?;

        self.operations.insert(id, OperationState::Done);
        tracing::info!(operation = %id, call = ?operation.call, "Operation executed");
        Ok(())
    }

    /// Drop a pending operation.
    pub fn cancel(&mut self, caller: &Address, id: &OperationId) -> ProtocolResult<()> {
        Self::require_role(&self.proposers, caller, PROPOSER_ROLE)?;
        match self.operations.get(id) {
            Some(OperationState::Pending { .. }) => {
                self.operations.remove(id);
                tracing::info!(operation = %id, "Operation cancelled");
                Ok(())
            }
            _ => Err(ProtocolError::OperationNotFound(id.to_string())),
        }
    }
}
