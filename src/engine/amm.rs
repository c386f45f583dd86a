//! Opening and closing derivative positions.
//!
//! Payoff calculation lives outside the engine: closing takes the realised
//! settlement and applies the loss cap, income tax and liquidation-deposit
//! rules to it.

use crate::domain::{
    Address, Asset, Derivative, DerivativeFee, DerivativeIndicator, DerivativeState, Direction,
    SignedWad, Timestamp, Wad, POSITION_PERIOD_SECS,
};
use crate::engine::{IporIndex, ParamValues, PositionLedger, ProtocolError, ProtocolResult};
use alloy_primitives::U256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPositionRequest {
    pub buyer: Address,
    /// Total paid by the trader, in native units.
    pub total_amount: U256,
    pub collateralization_factor: Wad,
    pub direction: Direction,
}

/// Native transfer made when a position closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub recipient: Address,
    pub native: U256,
    pub amount: Wad,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosePositionOutcome {
    pub id: u64,
    /// Settlement after the loss cap, trader's point of view.
    pub pnl: SignedWad,
    pub income_tax: Wad,
    pub payouts: Vec<Payout>,
}

/// Fee split for a given total amount.
struct OpeningAmounts {
    fee: DerivativeFee,
    collateral: Wad,
}

fn opening_amounts(params: &ParamValues, total: Wad, spread: Wad) -> ProtocolResult<OpeningAmounts> {
    let fixed_fees = params
        .liquidation_deposit_amount
        .try_add(params.ipor_publication_fee_amount)?;
    if total <= fixed_fees {
        return Err(ProtocolError::TotalAmountTooLow(total));
    }
    let available = total.try_sub(fixed_fees)?;
    let opening_amount = available.try_mul(params.opening_fee_percentage)?;
    let opening_treasury_amount =
        opening_amount.try_mul(params.opening_fee_for_treasury_percentage)?;
    let collateral = available.try_sub(opening_amount)?;

    Ok(OpeningAmounts {
        fee: DerivativeFee {
            liquidation_deposit_amount: params.liquidation_deposit_amount,
            opening_amount,
            opening_treasury_amount,
            ipor_publication_amount: params.ipor_publication_fee_amount,
            spread_value: spread,
        },
        collateral,
    })
}

/// Open a position and record it in the ledger.
pub fn open_position(
    ledger: &mut PositionLedger,
    amm: &Address,
    params: &ParamValues,
    index: &IporIndex,
    asset: &Asset,
    request: OpenPositionRequest,
    now: Timestamp,
) -> ProtocolResult<Derivative> {
    let cf = request.collateralization_factor;
    if cf < params.min_collateralization_factor || cf > params.max_collateralization_factor {
        return Err(ProtocolError::CollateralizationOutOfRange(cf));
    }
    let total = asset.to_wad(request.total_amount)?;

    let (spread, fixed_interest_rate) = match request.direction {
        Direction::PayFixed => (
            params.spread_pay_fixed_value,
            index.index_value.try_add(params.spread_pay_fixed_value)?,
        ),
        Direction::ReceiveFixed => (
            params.spread_receive_fixed_value,
            index
                .index_value
                .saturating_sub(params.spread_receive_fixed_value),
        ),
    };
    let amounts = opening_amounts(params, total, spread)?;
    let notional_amount = amounts.collateral.try_mul(cf)?;

    let balances = ledger.get_balance(&asset.id);
    let pool_fee = amounts
        .fee
        .opening_amount
        .try_sub(amounts.fee.opening_treasury_amount)?;
    let pool_after = balances.liquidity_pool.try_add(pool_fee)?;
    if pool_after.is_zero() {
        return Err(ProtocolError::InsufficientLiquidity);
    }
    let open_collateral = ledger.get_exposure(&asset.id).total_collateral()?;
    let utilization = open_collateral
        .try_add(amounts.collateral)?
        .try_div(pool_after)?;
    if utilization > params.liquidity_pool_max_utilization_percentage {
        return Err(ProtocolError::UtilizationExceeded(utilization));
    }

    let derivative = Derivative {
        id: 0,
        state: DerivativeState::Active,
        buyer: request.buyer,
        asset: asset.id.clone(),
        direction: request.direction,
        collateral: amounts.collateral,
        fee: amounts.fee,
        collateralization_factor: cf,
        notional_amount,
        starting_timestamp: now,
        ending_timestamp: now.plus_secs(POSITION_PERIOD_SECS),
        closing_timestamp: None,
        indicator: DerivativeIndicator {
            ipor_index_value: index.index_value,
            ibt_price: index.ibt_price,
            ibt_quantity: notional_amount.try_div(index.ibt_price)?,
            fixed_interest_rate,
            soap: Wad::ZERO,
        },
    };

    let id = ledger.update_storage_when_open_position(amm, derivative)?;
    let stored = ledger.get_derivative(id)?.clone();
    tracing::info!(
        id,
        asset = %asset.id,
        buyer = %stored.buyer,
        direction = %stored.direction,
        collateral = %stored.collateral,
        notional = %stored.notional_amount,
        "Position opened"
    );
    Ok(stored)
}

/// Close a position with the given realised settlement.
///
/// Before maturity only the buyer may close; afterwards anyone may, and the
/// closer collects the liquidation deposit.
#[allow(clippy::too_many_arguments)]
pub fn close_position(
    ledger: &mut PositionLedger,
    amm: &Address,
    params: &ParamValues,
    asset: &Asset,
    closer: &Address,
    id: u64,
    settlement: SignedWad,
    now: Timestamp,
) -> ProtocolResult<ClosePositionOutcome> {
    let derivative = ledger.get_derivative(id)?.clone();
    if !derivative.is_active() {
        return Err(ProtocolError::PositionNotActive { id });
    }
    if closer != &derivative.buyer && !derivative.is_matured(now) {
        return Err(ProtocolError::CallerNotPositionBuyer { id });
    }

    let (pnl, income_tax, trader_amount) = if settlement.is_negative() {
        let loss = settlement.magnitude().min(derivative.collateral);
        (
            SignedWad::negative(loss),
            Wad::ZERO,
            derivative.collateral.try_sub(loss)?,
        )
    } else {
        let gain = settlement.magnitude();
        let tax = gain.try_mul(params.income_tax_percentage)?;
        (
            SignedWad::positive(gain),
            tax,
            derivative.collateral.try_add(gain)?.try_sub(tax)?,
        )
    };

    ledger.update_storage_when_close_position(amm, &derivative.buyer, id, pnl, now)?;
    if !income_tax.is_zero() {
        ledger.credit_treasury(amm, &asset.id, income_tax)?;
    }

    let deposit = derivative.fee.liquidation_deposit_amount;
    let mut owed = vec![(derivative.buyer.clone(), trader_amount)];
    if closer == &derivative.buyer {
        owed[0].1 = trader_amount.try_add(deposit)?;
    } else {
        owed.push((closer.clone(), deposit));
    }

    let mut payouts = Vec::with_capacity(owed.len());
    let mut dust = Wad::ZERO;
    for (recipient, amount) in owed {
        let native = asset.from_wad(amount);
        dust = dust.try_add(native.dust)?;
        payouts.push(Payout {
            recipient,
            native: native.native,
            amount: native.wad,
        });
    }
    if !dust.is_zero() {
        ledger.add_liquidity(amm, &asset.id, dust)?;
    }

    tracing::info!(id, asset = %asset.id, closer = %closer, pnl = %pnl, tax = %income_tax, "Position settled");
    Ok(ClosePositionOutcome {
        id,
        pnl,
        income_tax,
        payouts,
    })
}
