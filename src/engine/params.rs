//! Owner-controlled protocol parameters.

use crate::domain::{Address, Wad};
use crate::engine::{ProtocolError, ProtocolResult};
use crate::governance::{Governed, Ownable};
use serde::{Deserialize, Serialize};

/// Name the parameters register under as a timelock target.
pub const PARAMS_TARGET: &str = "protocol-params";

/// Read-only view of the current parameter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamValues {
    pub opening_fee_percentage: Wad,
    pub opening_fee_for_treasury_percentage: Wad,
    pub income_tax_percentage: Wad,
    pub liquidation_deposit_amount: Wad,
    pub ipor_publication_fee_amount: Wad,
    pub min_collateralization_factor: Wad,
    pub max_collateralization_factor: Wad,
    /// May exceed 1.0.
    pub liquidity_pool_max_utilization_percentage: Wad,
    pub spread_pay_fixed_value: Wad,
    pub spread_receive_fixed_value: Wad,
}

impl Default for ParamValues {
    fn default() -> Self {
        let percent = |n: u64| Wad::ONE.try_mul_int(n).and_then(|v| v.try_div_int(100));
        Self {
            opening_fee_percentage: percent(1).unwrap_or(Wad::ZERO),
            opening_fee_for_treasury_percentage: Wad::ZERO,
            income_tax_percentage: percent(10).unwrap_or(Wad::ZERO),
            liquidation_deposit_amount: Wad::from_units(20),
            ipor_publication_fee_amount: Wad::from_units(10),
            min_collateralization_factor: Wad::from_units(10),
            max_collateralization_factor: Wad::from_units(50),
            liquidity_pool_max_utilization_percentage: percent(80).unwrap_or(Wad::ZERO),
            spread_pay_fixed_value: percent(1).unwrap_or(Wad::ZERO),
            spread_receive_fixed_value: percent(1).unwrap_or(Wad::ZERO),
        }
    }
}

/// Privileged parameter calls, dispatchable directly or through the timelock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "call", content = "value")]
pub enum ParamsCall {
    SetOpeningFeePercentage(Wad),
    SetOpeningFeeForTreasuryPercentage(Wad),
    SetIncomeTaxPercentage(Wad),
    SetLiquidationDepositAmount(Wad),
    SetIporPublicationFeeAmount(Wad),
    SetMinCollateralizationFactor(Wad),
    SetMaxCollateralizationFactor(Wad),
    SetLiquidityPoolMaxUtilizationPercentage(Wad),
    SetSpreadPayFixedValue(Wad),
    SetSpreadReceiveFixedValue(Wad),
    TransferOwnership(Address),
    ConfirmTransferOwnership,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolParams {
    ownable: Ownable,
    values: ParamValues,
}

fn require_fraction(name: &'static str, value: Wad) -> ProtocolResult<()> {
    if value > Wad::ONE {
        return Err(ProtocolError::ParameterOutOfRange { name, value });
    }
    Ok(())
}

impl ProtocolParams {
    pub fn new(owner: Address) -> Self {
        Self::with_values(owner, ParamValues::default())
    }

    pub fn with_values(owner: Address, values: ParamValues) -> Self {
        Self {
            ownable: Ownable::new(owner),
            values,
        }
    }

    pub fn values(&self) -> &ParamValues {
        &self.values
    }

    pub fn ownable(&self) -> &Ownable {
        &self.ownable
    }

    pub fn set_opening_fee_percentage(&mut self, caller: &Address, value: Wad) -> ProtocolResult<()> {
        self.ownable.only_owner(caller)?;
        require_fraction("openingFeePercentage", value)?;
        self.values.opening_fee_percentage = value;
        Ok(())
    }

    pub fn set_opening_fee_for_treasury_percentage(
        &mut self,
        caller: &Address,
        value: Wad,
    ) -> ProtocolResult<()> {
        self.ownable.only_owner(caller)?;
        require_fraction("openingFeeForTreasuryPercentage", value)?;
        self.values.opening_fee_for_treasury_percentage = value;
        Ok(())
    }

    pub fn set_income_tax_percentage(&mut self, caller: &Address, value: Wad) -> ProtocolResult<()> {
        self.ownable.only_owner(caller)?;
        require_fraction("incomeTaxPercentage", value)?;
        self.values.income_tax_percentage = value;
        Ok(())
    }

    pub fn set_liquidation_deposit_amount(
        &mut self,
        caller: &Address,
        value: Wad,
    ) -> ProtocolResult<()> {
        self.ownable.only_owner(caller)?;
        self.values.liquidation_deposit_amount = value;
        Ok(())
    }

    pub fn set_ipor_publication_fee_amount(
        &mut self,
        caller: &Address,
        value: Wad,
    ) -> ProtocolResult<()> {
        self.ownable.only_owner(caller)?;
        self.values.ipor_publication_fee_amount = value;
        Ok(())
    }

    pub fn set_min_collateralization_factor(
        &mut self,
        caller: &Address,
        value: Wad,
    ) -> ProtocolResult<()> {
        self.ownable.only_owner(caller)?;
        if value.is_zero() || value > self.values.max_collateralization_factor {
            return Err(ProtocolError::ParameterOutOfRange {
                name: "minCollateralizationFactorValue",
                value,
            });
        }
        self.values.min_collateralization_factor = value;
        Ok(())
    }

    pub fn set_max_collateralization_factor(
        &mut self,
        caller: &Address,
        value: Wad,
    ) -> ProtocolResult<()> {
        self.ownable.only_owner(caller)?;
        if value < self.values.min_collateralization_factor {
            return Err(ProtocolError::ParameterOutOfRange {
                name: "maxCollateralizationFactorValue",
                value,
            });
        }
        self.values.max_collateralization_factor = value;
        Ok(())
    }

    pub fn set_liquidity_pool_max_utilization_percentage(
        &mut self,
        caller: &Address,
        value: Wad,
    ) -> ProtocolResult<()> {
        self.ownable.only_owner(caller)?;
        self.values.liquidity_pool_max_utilization_percentage = value;
        Ok(())
    }

    pub fn set_spread_pay_fixed_value(&mut self, caller: &Address, value: Wad) -> ProtocolResult<()> {
        self.ownable.only_owner(caller)?;
        require_fraction("spreadPayFixedValue", value)?;
        self.values.spread_pay_fixed_value = value;
        Ok(())
    }

    pub fn set_spread_receive_fixed_value(
        &mut self,
        caller: &Address,
        value: Wad,
    ) -> ProtocolResult<()> {
        self.ownable.only_owner(caller)?;
        require_fraction("spreadReceiveFixedValue", value)?;
        self.values.spread_receive_fixed_value = value;
        Ok(())
    }

    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> ProtocolResult<()> {
        self.ownable.transfer_ownership(caller, new_owner)
    }

    pub fn confirm_transfer_ownership(&mut self, caller: &Address) -> ProtocolResult<()> {
        self.ownable.confirm_transfer_ownership(caller)
    }
}

impl Governed for ProtocolParams {
    type Call = ParamsCall;

    fn governed_name(&self) -> &str {
        PARAMS_TARGET
    }

    fn dispatch(&mut self, caller: &Address, call: &ParamsCall) -> ProtocolResult<()> {
        match call {
            ParamsCall::SetOpeningFeePercentage(v) => self.set_opening_fee_percentage(caller, *v),
            ParamsCall::SetOpeningFeeForTreasuryPercentage(v) => {
                self.set_opening_fee_for_treasury_percentage(caller, *v)
            }
            ParamsCall::SetIncomeTaxPercentage(v) => self.set_income_tax_percentage(caller, *v),
            ParamsCall::SetLiquidationDepositAmount(v) => {
                self.set_liquidation_deposit_amount(caller, *v)
            }
            ParamsCall::SetIporPublicationFeeAmount(v) => {
                self.set_ipor_publication_fee_amount(caller, *v)
            }
            ParamsCall::SetMinCollateralizationFactor(v) => {
                self.set_min_collateralization_factor(caller, *v)
            }
            ParamsCall::SetMaxCollateralizationFactor(v) => {
                self.set_max_collateralization_factor(caller, *v)
            }
            ParamsCall::SetLiquidityPoolMaxUtilizationPercentage(v) => {
                self.set_liquidity_pool_max_utilization_percentage(caller, *v)
            }
            ParamsCall::SetSpreadPayFixedValue(v) => self.set_spread_pay_fixed_value(caller, *v),
            ParamsCall::SetSpreadReceiveFixedValue(v) => {
                self.set_spread_receive_fixed_value(caller, *v)
            }
            ParamsCall::TransferOwnership(new_owner) => {
                self.transfer_ownership(caller, new_owner.clone())
            }
            ParamsCall::ConfirmTransferOwnership => self.confirm_transfer_ownership(caller),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(s: &str) -> Wad {
        Wad::from_decimal_str(s).unwrap()
    }

    fn admin() -> Address {
        Address::new("admin")
    }

    #[test]
    fn test_defaults() {
        let params = ProtocolParams::new(admin());
        let v = params.values();
        assert_eq!(v.opening_fee_percentage, w("0.01"));
        assert_eq!(v.opening_fee_for_treasury_percentage, Wad::ZERO);
        assert_eq!(v.income_tax_percentage, w("0.1"));
        assert_eq!(v.liquidation_deposit_amount, w("20"));
        assert_eq!(v.ipor_publication_fee_amount, w("10"));
        assert_eq!(v.min_collateralization_factor, w("10"));
        assert_eq!(v.max_collateralization_factor, w("50"));
        assert_eq!(v.liquidity_pool_max_utilization_percentage, w("0.8"));
    }

    #[test]
    fn test_percentage_above_one_rejected() {
        let mut params = ProtocolParams::new(admin());
        let err = params
            .set_opening_fee_for_treasury_percentage(&admin(), w("1.01"))
            .unwrap_err();
        assert_eq!(err.code(), Some("IPOR_24"));
        let err = params
            .set_income_tax_percentage(&admin(), w("1.01"))
            .unwrap_err();
        assert_eq!(err.code(), Some("IPOR_24"));
        let err = params.set_opening_fee_percentage(&admin(), w("1.01")).unwrap_err();
        assert_eq!(err.code(), Some("IPOR_24"));
    }

    #[test]
    fn test_percentage_of_exactly_one_accepted() {
        let mut params = ProtocolParams::new(admin());
        params
            .set_opening_fee_for_treasury_percentage(&admin(), Wad::ONE)
            .unwrap();
        assert_eq!(params.values().opening_fee_for_treasury_percentage, Wad::ONE);
    }

    #[test]
    fn test_max_utilization_above_one_allowed() {
        let mut params = ProtocolParams::new(admin());
        params
            .set_liquidity_pool_max_utilization_percentage(&admin(), w("1.5"))
            .unwrap();
        assert_eq!(
            params.values().liquidity_pool_max_utilization_percentage,
            w("1.5")
        );
    }

    #[test]
    fn test_collateralization_bounds_stay_ordered() {
        let mut params = ProtocolParams::new(admin());
        assert!(params
            .set_max_collateralization_factor(&admin(), w("5"))
            .is_err());
        assert!(params
            .set_min_collateralization_factor(&admin(), w("60"))
            .is_err());
        params
            .set_min_collateralization_factor(&admin(), w("20"))
            .unwrap();
        assert_eq!(params.values().min_collateralization_factor, w("20"));
    }

    #[test]
    fn test_setters_are_owner_only() {
        let mut params = ProtocolParams::new(admin());
        let err = params
            .set_liquidation_deposit_amount(&Address::new("user"), w("1"))
            .unwrap_err();
        assert!(matches!(err, ProtocolError::CallerNotOwner(_)));
        assert_eq!(params.values().liquidation_deposit_amount, w("20"));
    }

    #[test]
    fn test_call_json_shape() {
        let call = ParamsCall::SetIporPublicationFeeAmount(w("1"));
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"call": "setIporPublicationFeeAmount", "value": "1000000000000000000"})
        );
    }
}
