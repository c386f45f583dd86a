//! Two-step ownership.
//!
//! The current owner appoints a successor with `transfer_ownership`; the
//! transfer completes only when the appointee calls `confirm_transfer_ownership`.
//! Until then the current owner keeps every right, including re-appointing.

use crate::domain::Address;
use crate::engine::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownable {
    owner: Address,
    appointed: Option<Address>,
}

impl Ownable {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            appointed: None,
        }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn appointed_owner(&self) -> Option<&Address> {
        self.appointed.as_ref()
    }

    pub fn only_owner(&self, caller: &Address) -> ProtocolResult<()> {
        if caller != &self.owner {
            return Err(ProtocolError::CallerNotOwner(caller.clone()));
        }
        Ok(())
    }

    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> ProtocolResult<()> {
        self.only_owner(caller)?;
        self.appointed = Some(new_owner);
        Ok(())
    }

    pub fn confirm_transfer_ownership(&mut self, caller: &Address) -> ProtocolResult<()> {
        match &self.appointed {
            Some(appointed) if appointed == caller => {
                tracing::info!(previous = %self.owner, new = %caller, "Ownership transferred");
                self.owner = caller.clone();
                self.appointed = None;
                Ok(())
            }
            _ => Err(ProtocolError::CallerNotAppointedOwner(caller.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::new(s)
    }

    #[test]
    fn test_transfer_then_confirm() {
        let mut ownable = Ownable::new(addr("admin"));
        ownable
            .transfer_ownership(&addr("admin"), addr("userTwo"))
            .unwrap();
        ownable.confirm_transfer_ownership(&addr("userTwo")).unwrap();
        assert_eq!(ownable.owner(), &addr("userTwo"));
        assert!(ownable.appointed_owner().is_none());
    }

    #[test]
    fn test_transfer_by_non_owner_fails() {
        let mut ownable = Ownable::new(addr("admin"));
        let err = ownable
            .transfer_ownership(&addr("userThree"), addr("userTwo"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Ownable: caller is not the owner");
    }

    #[test]
    fn test_confirm_by_non_appointed_fails() {
        let mut ownable = Ownable::new(addr("admin"));
        ownable
            .transfer_ownership(&addr("admin"), addr("userTwo"))
            .unwrap();
        let err = ownable
            .confirm_transfer_ownership(&addr("userThree"))
            .unwrap_err();
        assert_eq!(err.code(), Some("IPOR_007"));
    }

    #[test]
    fn test_confirm_twice_fails() {
        let mut ownable = Ownable::new(addr("admin"));
        ownable
            .transfer_ownership(&addr("admin"), addr("userTwo"))
            .unwrap();
        ownable.confirm_transfer_ownership(&addr("userTwo")).unwrap();
        let err = ownable
            .confirm_transfer_ownership(&addr("userTwo"))
            .unwrap_err();
        assert_eq!(err.code(), Some("IPOR_007"));
    }

    #[test]
    fn test_previous_owner_loses_rights() {
        let mut ownable = Ownable::new(addr("admin"));
        ownable
            .transfer_ownership(&addr("admin"), addr("userTwo"))
            .unwrap();
        ownable.confirm_transfer_ownership(&addr("userTwo")).unwrap();
        assert!(matches!(
            ownable.transfer_ownership(&addr("admin"), addr("userTwo")),
            Err(ProtocolError::CallerNotOwner(_))
        ));
    }

    #[test]
    fn test_owner_keeps_rights_until_confirmed() {
        let mut ownable = Ownable::new(addr("admin"));
        ownable
            .transfer_ownership(&addr("admin"), addr("userTwo"))
            .unwrap();
        ownable
            .transfer_ownership(&addr("admin"), addr("userTwo"))
            .unwrap();
        assert_eq!(ownable.owner(), &addr("admin"));
    }
}
