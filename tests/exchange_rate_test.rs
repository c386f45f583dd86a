use alloy_primitives::U256;
use ipor_engine::engine::{
    Market, MarketSetup, OpenPositionRequest, ParamValues, ProtocolError,
};
use ipor_engine::{Address, Asset, AssetId, Direction, Timestamp, Wad};

fn w(s: &str) -> Wad {
    Wad::from_decimal_str(s).unwrap()
}

fn admin() -> Address {
    Address::new("admin")
}

fn joseph() -> Address {
    Address::new("joseph")
}

fn liquidity_provider() -> Address {
    Address::new("liquidityProvider")
}

fn setup_market(asset: &Asset) -> Market {
    let mut market = Market::new(MarketSetup {
        owner: admin(),
        amm: Address::new("milton"),
        pool: joseph(),
        index_updaters: vec![Address::new("userOne")],
        params: ParamValues::default(),
    });
    market.add_asset(&admin(), asset.clone()).unwrap();
    market
        .update_index(&Address::new("userOne"), &asset.id, w("0.03"), Timestamp::new(0))
        .unwrap();
    market
}

fn tokens(asset: &Asset, units: u64) -> U256 {
    asset.one_token() * U256::from(units)
}

fn open(market: &mut Market, asset: &Asset, units: u64) {
    market
        .open_position(
            &asset.id,
            OpenPositionRequest {
                buyer: Address::new("userTwo"),
                total_amount: tokens(asset, units),
                collateralization_factor: w("10"),
                direction: Direction::PayFixed,
            },
            Timestamp::new(0),
        )
        .unwrap();
}

#[test]
fn test_exchange_rate_when_pool_and_supply_zero() {
    let dai = Asset::new("DAI", 18).unwrap();
    let market = setup_market(&dai);
    assert_eq!(market.exchange_rate(&dai.id).unwrap(), Wad::ONE);
}

#[test]
fn test_exchange_rate_when_pool_and_supply_non_zero() {
    let dai = Asset::new("DAI", 18).unwrap();
    let mut market = setup_market(&dai);
    market
        .provide_liquidity(&liquidity_provider(), &dai.id, tokens(&dai, 14_000))
        .unwrap();
    assert_eq!(market.exchange_rate(&dai.id).unwrap(), Wad::ONE);
}

#[test]
fn test_exchange_rate_when_pool_zero_and_supply_non_zero() {
    let dai = Asset::new("DAI", 18).unwrap();
    let mut market = setup_market(&dai);
    market
        .provide_liquidity(&liquidity_provider(), &dai.id, tokens(&dai, 14_000))
        .unwrap();
    market
        .ledger_mut()
        .subtract_liquidity(&joseph(), &dai.id, Wad::from_units(14_000))
        .unwrap();
    assert_eq!(market.exchange_rate(&dai.id).unwrap(), Wad::ZERO);
}

#[test]
fn test_exchange_rate_greater_than_one() {
    let dai = Asset::new("DAI", 18).unwrap();
    let mut market = setup_market(&dai);
    market
        .provide_liquidity(&liquidity_provider(), &dai.id, tokens(&dai, 40))
        .unwrap();
    open(&mut market, &dai, 40);
    assert_eq!(
        market.exchange_rate(&dai.id).unwrap().raw(),
        U256::from(1_002_500_000_000_000_000u64)
    );
}

#[test]
fn test_exchange_rate_when_pool_non_zero_and_supply_zero() {
    let dai = Asset::new("DAI", 18).unwrap();
    let mut market = setup_market(&dai);
    market
        .provide_liquidity(&liquidity_provider(), &dai.id, tokens(&dai, 40))
        .unwrap();
    open(&mut market, &dai, 40);
    let outcome = market
        .redeem(&liquidity_provider(), &dai.id, w("40"))
        .unwrap();
    assert_eq!(outcome.payout, w("40.1"));
    assert_eq!(market.exchange_rate(&dai.id).unwrap(), Wad::ONE);
}

fn market_at_rate_one_and_a_half(asset: &Asset) -> Market {
    let mut market = setup_market(asset);
    market
        .provide_liquidity(&liquidity_provider(), &asset.id, tokens(asset, 180))
        .unwrap();
    market
        .params_mut()
        .set_opening_fee_percentage(&admin(), w("0.6"))
        .unwrap();
    open(&mut market, asset, 180);
    market
}

#[test]
fn test_provide_does_not_change_rate_of_one_and_a_half() {
    let dai = Asset::new("DAI", 18).unwrap();
    let mut market = market_at_rate_one_and_a_half(&dai);
    assert_eq!(market.exchange_rate(&dai.id).unwrap(), w("1.5"));

    let user_three = Address::new("userThree");
    let outcome = market
        .provide_liquidity(&user_three, &dai.id, tokens(&dai, 1_500))
        .unwrap();
    assert_eq!(outcome.shares_minted, w("1000"));
    assert_eq!(market.share_balance(&dai.id, &user_three).unwrap(), w("1000"));
    assert_eq!(market.exchange_rate(&dai.id).unwrap(), w("1.5"));
}

#[test]
fn test_provide_and_redeem_do_not_change_rate_of_one_and_a_half() {
    let dai = Asset::new("DAI", 18).unwrap();
    let mut market = market_at_rate_one_and_a_half(&dai);
    let user_three = Address::new("userThree");
    market
        .provide_liquidity(&user_three, &dai.id, tokens(&dai, 1_500))
        .unwrap();
    let outcome = market.redeem(&user_three, &dai.id, w("1000")).unwrap();

    assert_eq!(outcome.payout, w("1500"));
    assert_eq!(market.share_balance(&dai.id, &user_three).unwrap(), Wad::ZERO);
    assert_eq!(market.exchange_rate(&dai.id).unwrap(), w("1.5"));
}

/// Pools whose rate does not divide evenly, including 1/3 and 10/7.
fn uneven_pools() -> Vec<(Asset, u64, &'static str)> {
    let dai = Asset::new("DAI", 18).unwrap();
    let usdc = Asset::new("USDC", 6).unwrap();
    vec![
        (dai.clone(), 30, "10"),
        (dai.clone(), 7, "10"),
        (dai.clone(), 3, "2"),
        (dai, 180, "270"),
        (usdc.clone(), 30, "10"),
        (usdc.clone(), 7, "10"),
        (usdc, 180, "270.000001"),
    ]
}

/// `shares` minted at par to the liquidity provider, then the pool balance
/// moved to `pool`.
fn market_with_pool(asset: &Asset, shares: u64, pool: Wad) -> Market {
    let mut market = setup_market(asset);
    market
        .provide_liquidity(&liquidity_provider(), &asset.id, tokens(asset, shares))
        .unwrap();
    let provided = Wad::from_units(shares);
    if pool < provided {
        market
            .ledger_mut()
            .subtract_liquidity(&joseph(), &asset.id, provided.try_sub(pool).unwrap())
            .unwrap();
    } else {
        market
            .ledger_mut()
            .add_liquidity(&joseph(), &asset.id, pool.try_sub(provided).unwrap())
            .unwrap();
    }
    market
}

fn provide_amounts(asset: &Asset) -> Vec<U256> {
    if asset.decimals == 6 {
        vec![U256::from(1u64), U256::from(1_234_567u64), U256::from(1_500_000_000u64)]
    } else {
        vec![
            U256::from(1u64),
            tokens(asset, 1_500),
            U256::from(123_456_789_012_345_678_901u128),
        ]
    }
}

#[test]
fn test_provide_keeps_uneven_rates() {
    for (asset, shares, pool) in uneven_pools() {
        for native in provide_amounts(&asset) {
            let mut market = market_with_pool(&asset, shares, w(pool));
            let before = market.exchange_rate(&asset.id).unwrap();

            market
                .provide_liquidity(&Address::new("userThree"), &asset.id, native)
                .unwrap();

            let after = market.exchange_rate(&asset.id).unwrap();
            assert!(
                after >= before && after.raw() - before.raw() <= U256::from(1u64),
                "{} pool {}/{}: rate {} -> {} after providing {}",
                asset.id,
                pool,
                shares,
                before,
                after,
                native
            );
        }
    }
}

#[test]
fn test_redeem_keeps_uneven_rates() {
    let share_amounts = [w("1"), w("0.0000007"), w("2.999999999999999999")];
    for (asset, shares, pool) in uneven_pools() {
        for share_amount in share_amounts {
            let mut market = market_with_pool(&asset, shares, w(pool));
            let before = market.exchange_rate(&asset.id).unwrap();

            let outcome = market
                .redeem(&liquidity_provider(), &asset.id, share_amount)
                .unwrap();

            // Truncated payout and native dust both stay in the pool, spread
            // over the remaining shares.
            let total = Wad::from_units(shares).raw();
            let remaining = total - share_amount.raw();
            let max_rise =
                (total + (outcome.dust.raw() + U256::from(1u64)) * Wad::ONE.raw()) / remaining;

            let after = market.exchange_rate(&asset.id).unwrap();
            assert!(
                after >= before && after.raw() - before.raw() <= max_rise,
                "{} pool {}/{}: rate {} -> {} after redeeming {}",
                asset.id,
                pool,
                shares,
                before,
                after,
                share_amount
            );
            if asset.decimals == 18 && share_amount == w("1") {
                assert!(after.raw() - before.raw() <= U256::from(1u64));
            }
        }
    }
}

#[test]
fn test_redeem_fails_on_empty_pool() {
    let dai = Asset::new("DAI", 18).unwrap();
    let mut market = setup_market(&dai);
    market
        .provide_liquidity(&liquidity_provider(), &dai.id, tokens(&dai, 10_000))
        .unwrap();
    market
        .ledger_mut()
        .subtract_liquidity(&joseph(), &dai.id, Wad::from_units(10_000))
        .unwrap();

    let err = market
        .redeem(&liquidity_provider(), &dai.id, w("1000"))
        .unwrap_err();
    assert_eq!(err.code(), Some("IPOR_45"));
    assert_eq!(
        market.share_balance(&dai.id, &liquidity_provider()).unwrap(),
        w("10000")
    );
}

#[test]
fn test_provide_fails_on_empty_pool() {
    let dai = Asset::new("DAI", 18).unwrap();
    let mut market = setup_market(&dai);
    market
        .provide_liquidity(&liquidity_provider(), &dai.id, tokens(&dai, 10_000))
        .unwrap();
    market
        .ledger_mut()
        .subtract_liquidity(&joseph(), &dai.id, Wad::from_units(10_000))
        .unwrap();

    let err = market
        .provide_liquidity(&liquidity_provider(), &dai.id, tokens(&dai, 10_000))
        .unwrap_err();
    assert_eq!(err, ProtocolError::InsufficientLiquidity);
}

#[test]
fn test_six_decimal_asset_scales_to_wad() {
    let usdc = Asset::new("USDC", 6).unwrap();
    let mut market = setup_market(&usdc);
    let outcome = market
        .provide_liquidity(&liquidity_provider(), &usdc.id, U256::from(1_000_000_000u64))
        .unwrap();
    assert_eq!(outcome.shares_minted, w("1000"));
}

#[test]
fn test_six_decimal_redeem_truncates_and_keeps_dust() {
    let usdc = Asset::new("USDC", 6).unwrap();
    let mut market = setup_market(&usdc);
    market
        .provide_liquidity(&liquidity_provider(), &usdc.id, tokens(&usdc, 40))
        .unwrap();
    open(&mut market, &usdc, 40);

    // 1.0000007 shares at 1.0025 = 1.00250070175, truncated to 1.002500
    let outcome = market
        .redeem(&liquidity_provider(), &usdc.id, w("1.0000007"))
        .unwrap();
    assert_eq!(outcome.payout_native, U256::from(1_002_500u64));
    assert_eq!(outcome.payout, w("1.0025"));
    assert!(!outcome.dust.is_zero());
    assert_eq!(
        market.ledger().get_balance(&usdc.id).liquidity_pool,
        w("39.0975")
    );
}

#[test]
fn test_unknown_asset_rejected() {
    let dai = Asset::new("DAI", 18).unwrap();
    let mut market = setup_market(&dai);
    let err = market
        .provide_liquidity(&liquidity_provider(), &AssetId::new("XYZ"), U256::from(1u64))
        .unwrap_err();
    assert!(matches!(err, ProtocolError::AssetNotSupported(_)));
}
