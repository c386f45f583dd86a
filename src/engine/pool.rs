//! Liquidity provision and redemption against the pool exchange rate.

use crate::domain::{Address, Asset, Wad};
use crate::engine::{PositionLedger, ProtocolError, ProtocolResult, ShareLedger};
use alloy_primitives::U256;

/// Pool balance per share.
///
/// 1.0 while no shares exist, 0 if shares exist but the pool is empty.
pub fn calculate_exchange_rate(pool_balance: Wad, total_shares: Wad) -> ProtocolResult<Wad> {
    if total_shares.is_zero() {
        return Ok(Wad::ONE);
    }
    if pool_balance.is_zero() {
        return Ok(Wad::ZERO);
    }
    Ok(pool_balance.try_div(total_shares)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvideOutcome {
    pub amount: Wad,
    pub shares_minted: Wad,
    pub exchange_rate: Wad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeemOutcome {
    pub shares_burned: Wad,
    /// Payout in native token units.
    pub payout_native: U256,
    /// Payout in 18 decimals, after truncation to native precision.
    pub payout: Wad,
    /// Part of the computed payout that stays in the pool.
    pub dust: Wad,
    pub exchange_rate: Wad,
}

/// Deposit `native_amount` of `asset` and mint shares at the current rate.
pub fn provide_liquidity(
    ledger: &mut PositionLedger,
    shares: &mut ShareLedger,
    pool: &Address,
    asset: &Asset,
    provider: &Address,
    native_amount: U256,
) -> ProtocolResult<ProvideOutcome> {
    let amount = asset.to_wad(native_amount)?;
    if amount.is_zero() {
        return Err(ProtocolError::ZeroAmount);
    }

    let balance = ledger.get_balance(&asset.id);
    let exchange_rate = calculate_exchange_rate(balance.liquidity_pool, shares.total_supply())?;
    if exchange_rate.is_zero() {
        return Err(ProtocolError::InsufficientLiquidity);
    }

    let shares_minted = amount.try_div(exchange_rate)?;
    ledger.add_liquidity(pool, &asset.id, amount)?;
    shares.mint(provider, shares_minted)?;

    tracing::info!(
        asset = %asset.id,
        provider = %provider,
        amount = %amount,
        shares = %shares_minted,
        rate = %exchange_rate,
        "Liquidity provided"
    );
    Ok(ProvideOutcome {
        amount,
        shares_minted,
        exchange_rate,
    })
}

/// Burn `share_amount` shares and pay out their value at the current rate.
///
/// The payout is truncated to the asset's native precision; only the truncated
/// amount leaves the pool.
pub fn redeem(
    ledger: &mut PositionLedger,
    shares: &mut ShareLedger,
    pool: &Address,
    asset: &Asset,
    holder: &Address,
    share_amount: Wad,
) -> ProtocolResult<RedeemOutcome> {
    if share_amount.is_zero() {
        return Err(ProtocolError::ZeroAmount);
    }
    let held = shares.balance_of(holder);
    if held < share_amount {
        return Err(ProtocolError::InsufficientShares {
            held,
            requested: share_amount,
        });
    }

    let balance = ledger.get_balance(&asset.id);
    let exchange_rate = calculate_exchange_rate(balance.liquidity_pool, shares.total_supply())?;
    if exchange_rate.is_zero() {
        return Err(ProtocolError::InsufficientLiquidity);
    }

    let native = asset.from_wad(share_amount.try_mul(exchange_rate)?);
    ledger.subtract_liquidity(pool, &asset.id, native.wad)?;
    shares.burn(holder, share_amount)?;

    tracing::info!(
        asset = %asset.id,
        holder = %holder,
        shares = %share_amount,
        payout = %native.wad,
        rate = %exchange_rate,
        "Liquidity redeemed"
    );
    Ok(RedeemOutcome {
        shares_burned: share_amount,
        payout_native: native.native,
        payout: native.wad,
        dust: native.dust,
        exchange_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(s: &str) -> Wad {
        Wad::from_decimal_str(s).unwrap()
    }

    fn joseph() -> Address {
        Address::new("joseph")
    }

    #[test]
    fn test_rate_degenerate_cases() {
        assert_eq!(calculate_exchange_rate(Wad::ZERO, Wad::ZERO).unwrap(), Wad::ONE);
        assert_eq!(calculate_exchange_rate(w("5"), Wad::ZERO).unwrap(), Wad::ONE);
        assert_eq!(calculate_exchange_rate(Wad::ZERO, w("5")).unwrap(), Wad::ZERO);
        assert_eq!(calculate_exchange_rate(w("40.1"), w("40")).unwrap(), w("1.0025"));
    }

    #[test]
    fn test_provide_and_redeem_at_par() {
        let dai = Asset::new("DAI", 18).unwrap();
        let provider = Address::new("lp");
        let mut ledger = PositionLedger::new([joseph()]);
        let mut shares = ShareLedger::new();

        let outcome = provide_liquidity(
            &mut ledger,
            &mut shares,
            &joseph(),
            &dai,
            &provider,
            dai.one_token() * U256::from(14_000u64),
        )
        .unwrap();
        assert_eq!(outcome.shares_minted, w("14000"));

        let outcome =
            redeem(&mut ledger, &mut shares, &joseph(), &dai, &provider, w("14000")).unwrap();
        assert_eq!(outcome.payout, w("14000"));
        assert_eq!(shares.total_supply(), Wad::ZERO);
        assert_eq!(ledger.get_balance(&dai.id).liquidity_pool, Wad::ZERO);
    }

    #[test]
    fn test_drained_pool_blocks_provide() {
        let dai = Asset::new("DAI", 18).unwrap();
        let provider = Address::new("lp");
        let mut ledger = PositionLedger::new([joseph()]);
        let mut shares = ShareLedger::new();
        provide_liquidity(&mut ledger, &mut shares, &joseph(), &dai, &provider, dai.one_token())
            .unwrap();
        ledger.subtract_liquidity(&joseph(), &dai.id, Wad::ONE).unwrap();

        let err = provide_liquidity(&mut ledger, &mut shares, &joseph(), &dai, &provider, dai.one_token())
            .unwrap_err();
        assert_eq!(err.code(), Some("IPOR_45"));
        assert_eq!(shares.total_supply(), Wad::ONE);
    }

    #[test]
    fn test_zero_amount_rejected() {
        let dai = Asset::new("DAI", 18).unwrap();
        let mut ledger = PositionLedger::new([joseph()]);
        let mut shares = ShareLedger::new();
        let err = provide_liquidity(
            &mut ledger,
            &mut shares,
            &joseph(),
            &dai,
            &Address::new("lp"),
            U256::ZERO,
        )
        .unwrap_err();
        assert_eq!(err, ProtocolError::ZeroAmount);
    }

    #[test]
    fn test_redeem_more_than_held() {
        let dai = Asset::new("DAI", 18).unwrap();
        let mut ledger = PositionLedger::new([joseph()]);
        let mut shares = ShareLedger::new();
        let err = redeem(
            &mut ledger,
            &mut shares,
            &joseph(),
            &dai,
            &Address::new("lp"),
            Wad::ONE,
        )
        .unwrap_err();
        assert!(matches!(err, ProtocolError::InsufficientShares { .. }));
    }
}
