#![allow(dead_code)]

use std::collections::BTreeMap;

use cosmwasm_std::{
    ensure,
    testing::{mock_dependencies, mock_env, mock_info, MockApi, MockQuerier, MockStorage},
    Addr, Binary, Decimal, Env, Int128, OwnedDeps, Response, StdError, StdResult, Timestamp,
    Uint128,
};
use cw_asset::{AssetInfo, AssetInfoUnchecked};
use lst_vault::{
    error::AppError,
    execute_handler,
    host::{
        BatchSwapStep, Chain, ConversionMsg, FundManagement, RateQuery, SwapKind, Transactional,
        VaultLedger,
    },
    instantiate_handler,
    math::{mul_div, Rounding},
    msg::{AppExecuteMsg, AppInstantiateMsg, AppQueryMsg},
    query_handler,
    registry::{ConversionHandlerUnchecked, LstDescriptorUnchecked, PoolId, RouteUnchecked},
    state::LiquidationOrder,
};

pub const ETHER: u128 = 1_000_000_000_000_000_000;

pub const ADMIN: &str = "admin";
pub const ALICE: &str = "alice";
pub const BOB: &str = "bob";

pub const WSTETH_WRAPPER: &str = "wsteth_wrapper";
pub const RETH_RATES: &str = "reth_rates";
pub const SFRXETH_VAULT: &str = "sfrxeth_vault";

pub const WSTETH_POOL: PoolId = PoolId::new([0x01; 32]);
pub const RETH_POOL: PoolId = PoolId::new([0x02; 32]);
pub const SFRXETH_POOL: PoolId = PoolId::new([0x03; 32]);
pub const FRXETH_POOL: PoolId = PoolId::new([0x04; 32]);

// Registry indexes, in the order `lsts()` lists them
pub const WSTETH: u8 = 0;
pub const RETH: u8 = 1;
pub const SFRXETH: u8 = 2;

/// `milli` thousandths of an ether
pub fn eth(milli: u128) -> Uint128 {
    Uint128::new(milli * ETHER / 1000)
}

pub fn weth() -> AssetInfo {
    AssetInfo::native("weth")
}
pub fn steth() -> AssetInfo {
    AssetInfo::native("steth")
}
pub fn wsteth() -> AssetInfo {
    AssetInfo::native("wsteth")
}
pub fn reth() -> AssetInfo {
    AssetInfo::native("reth")
}
pub fn frxeth() -> AssetInfo {
    AssetInfo::native("frxeth")
}
pub fn sfrxeth() -> AssetInfo {
    AssetInfo::native("sfrxeth")
}

fn std_err(err: AppError) -> StdError {
    StdError::generic_err(err.to_string())
}

/// `num / den`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rate {
    pub num: u128,
    pub den: u128,
}

impl Rate {
    pub const fn new(num: u128, den: u128) -> Self {
        Self { num, den }
    }

    pub fn apply(&self, amount: Uint128, rounding: Rounding) -> StdResult<Uint128> {
        mul_div(
            amount,
            Uint128::new(self.num),
            Uint128::new(self.den),
            rounding,
        )
        .map_err(std_err)
    }

    pub fn invert(&self) -> Self {
        Self::new(self.den, self.num)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Curve {
    /// One unit of `assets[0]` always trades for `rate` units of `assets[1]`
    ConstantSum(Rate),
    ConstantProduct,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Pool {
    pub assets: [AssetInfo; 2],
    pub reserves: [Uint128; 2],
    pub curve: Curve,
}

impl Pool {
    pub fn constant_sum(assets: [AssetInfo; 2], rate: Rate, depth: Uint128) -> Self {
        Self {
            assets,
            reserves: [depth, depth],
            curve: Curve::ConstantSum(rate),
        }
    }

    pub fn constant_product(assets: [AssetInfo; 2], reserves: [Uint128; 2]) -> Self {
        Self {
            assets,
            reserves,
            curve: Curve::ConstantProduct,
        }
    }

    fn side(&self, asset: &AssetInfo) -> StdResult<usize> {
        self.assets
            .iter()
            .position(|a| a == asset)
            .ok_or_else(|| StdError::generic_err(format!("BAL#521 {asset} not in pool")))
    }

    fn out_given_in(&self, side_in: usize, amount_in: Uint128) -> StdResult<Uint128> {
        let side_out = 1 - side_in;
        let out = match self.curve {
            Curve::ConstantSum(rate) if side_in == 0 => rate.apply(amount_in, Rounding::Floor)?,
            Curve::ConstantSum(rate) => rate.invert().apply(amount_in, Rounding::Floor)?,
            Curve::ConstantProduct => mul_div(
                self.reserves[side_out],
                amount_in,
                self.reserves[side_in].checked_add(amount_in)?,
                Rounding::Floor,
            )
            .map_err(std_err)?,
        };
        ensure!(
            out < self.reserves[side_out],
            StdError::generic_err("BAL#001 not enough liquidity")
        );
        Ok(out)
    }

    fn in_given_out(&self, side_in: usize, amount_out: Uint128) -> StdResult<Uint128> {
        let side_out = 1 - side_in;
        ensure!(
            amount_out < self.reserves[side_out],
            StdError::generic_err("BAL#001 not enough liquidity")
        );
        match self.curve {
            Curve::ConstantSum(rate) if side_in == 0 => {
                rate.invert().apply(amount_out, Rounding::Ceiling)
            }
            Curve::ConstantSum(rate) => rate.apply(amount_out, Rounding::Ceiling),
            Curve::ConstantProduct => mul_div(
                self.reserves[side_in],
                amount_out,
                self.reserves[side_out] - amount_out,
                Rounding::Ceiling,
            )
            .map_err(std_err),
        }
    }

    fn trade(&mut self, side_in: usize, amount_in: Uint128, amount_out: Uint128) {
        self.reserves[side_in] += amount_in;
        self.reserves[1 - side_in] -= amount_out;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Family {
    WrapPair { raw: AssetInfo, wrapped: AssetInfo },
    Vault { raw: AssetInfo, wrapped: AssetInfo },
    Native,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Converter {
    pub family: Family,
    /// Raw (or base) value of one wrapped token
    pub rate: Rate,
    /// Takes the raw tokens, reports a mint, credits nothing
    pub mints_nothing: bool,
    /// Every rate query fails
    pub offline: bool,
}

impl Converter {
    pub fn new(family: Family, rate: Rate) -> Self {
        Self {
            family,
            rate,
            mints_nothing: false,
            offline: false,
        }
    }
}

/// Trade someone else pushes through a pool right before the vault's next swap
#[derive(Clone, Debug, PartialEq)]
pub struct FrontRun {
    pub pool: PoolId,
    pub asset_in: AssetInfo,
    pub amount_in: Uint128,
}

/// In-memory chain: token balances, conversion handlers, a batch-swap venue and the share ledger.
/// Checkpoints are full clones.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MockHost {
    balances: BTreeMap<(String, Addr), Uint128>,
    pools: BTreeMap<PoolId, Pool>,
    converters: BTreeMap<Addr, Converter>,
    shares: BTreeMap<Addr, Uint128>,
    pub decimals_offset: u8,
    /// Base asset withheld from the proceeds of every executed swap
    pub short_delivery: Uint128,
    pub front_run: Option<FrontRun>,
}

impl MockHost {
    /// Handlers and deep pools, every pool trading at the handlers' rates
    pub fn market() -> Self {
        let mut host = Self::default();
        let depth = Uint128::new(1_000 * ETHER);

        host.add_converter(
            WSTETH_WRAPPER,
            Converter::new(
                Family::WrapPair {
                    raw: steth(),
                    wrapped: wsteth(),
                },
                Rate::new(5, 4),
            ),
        );
        host.add_converter(RETH_RATES, Converter::new(Family::Native, Rate::new(11, 10)));
        host.add_converter(
            SFRXETH_VAULT,
            Converter::new(
                Family::Vault {
                    raw: frxeth(),
                    wrapped: sfrxeth(),
                },
                Rate::new(21, 20),
            ),
        );

        host.add_pool(
            WSTETH_POOL,
            Pool::constant_sum([wsteth(), weth()], Rate::new(5, 4), depth),
        );
        host.add_pool(
            RETH_POOL,
            Pool::constant_sum([reth(), weth()], Rate::new(11, 10), depth),
        );
        host.add_pool(
            SFRXETH_POOL,
            Pool::constant_sum([sfrxeth(), frxeth()], Rate::new(21, 20), depth),
        );
        host.add_pool(
            FRXETH_POOL,
            Pool::constant_sum([frxeth(), weth()], Rate::new(1, 1), depth),
        );
        host
    }

    pub fn add_pool(&mut self, id: PoolId, pool: Pool) {
        self.pools.insert(id, pool);
    }

    pub fn pool(&self, id: PoolId) -> &Pool {
        &self.pools[&id]
    }

    pub fn add_converter(&mut self, contract: &str, converter: Converter) {
        self.converters.insert(Addr::unchecked(contract), converter);
    }

    pub fn converter_mut(&mut self, contract: &str) -> &mut Converter {
        self.converters
            .get_mut(&Addr::unchecked(contract))
            .expect("converter registered")
    }

    pub fn mint(&mut self, asset: &AssetInfo, holder: &Addr, amount: Uint128) {
        self.credit(asset, holder, amount);
    }

    pub fn balance_of(&self, asset: &AssetInfo, holder: &Addr) -> Uint128 {
        self.balance(asset, holder).unwrap()
    }

    pub fn set_shares(&mut self, owner: &str, shares: Uint128) {
        self.shares.insert(Addr::unchecked(owner), shares);
    }

    fn credit(&mut self, asset: &AssetInfo, holder: &Addr, amount: Uint128) {
        *self
            .balances
            .entry((asset.to_string(), holder.clone()))
            .or_default() += amount;
    }

    fn debit(&mut self, asset: &AssetInfo, holder: &Addr, amount: Uint128) -> StdResult<()> {
        let held = self.balance(asset, holder)?;
        let remaining = held.checked_sub(amount).map_err(|_| {
            StdError::generic_err(format!("{holder} holds {held} {asset}, needs {amount}"))
        })?;
        self.balances
            .insert((asset.to_string(), holder.clone()), remaining);
        Ok(())
    }

    fn converter(&self, contract: &Addr) -> StdResult<&Converter> {
        self.converters
            .get(contract)
            .ok_or_else(|| StdError::generic_err(format!("no contract at {contract}")))
    }

    /// Runs the swaps on copies of the pools, returning the deltas and the pools afterwards
    fn simulate(
        &self,
        kind: SwapKind,
        swaps: &[BatchSwapStep],
        assets: &[AssetInfo],
    ) -> StdResult<(Vec<Int128>, BTreeMap<PoolId, Pool>)> {
        let mut pools = self.pools.clone();
        let mut deltas = vec![0i128; assets.len()];
        let mut previous = Uint128::zero();

        for step in swaps {
            let pool = pools.get_mut(&step.pool_id).ok_or_else(|| {
                StdError::generic_err(format!("BAL#500 no pool {}", step.pool_id))
            })?;
            let (asset_in, asset_out) = match (
                assets.get(step.asset_in_index),
                assets.get(step.asset_out_index),
            ) {
                (Some(asset_in), Some(asset_out)) => (asset_in, asset_out),
                _ => return Err(StdError::generic_err("BAL#100 asset index out of bounds")),
            };
            let side_in = pool.side(asset_in)?;
            ensure!(
                pool.side(asset_out)? == 1 - side_in,
                StdError::generic_err("BAL#509 cannot swap same token")
            );

            let amount = if step.amount.is_zero() {
                previous
            } else {
                step.amount
            };
            let (amount_in, amount_out) = match kind {
                SwapKind::GivenIn => (amount, pool.out_given_in(side_in, amount)?),
                SwapKind::GivenOut => (pool.in_given_out(side_in, amount)?, amount),
            };
            pool.trade(side_in, amount_in, amount_out);

            deltas[step.asset_in_index] += amount_in.u128() as i128;
            deltas[step.asset_out_index] -= amount_out.u128() as i128;
            previous = match kind {
                SwapKind::GivenIn => amount_out,
                SwapKind::GivenOut => amount_in,
            };
        }
        Ok((deltas.into_iter().map(Int128::new).collect(), pools))
    }
}

impl Chain for MockHost {
    fn balance(&self, asset: &AssetInfo, holder: &Addr) -> StdResult<Uint128> {
        Ok(self
            .balances
            .get(&(asset.to_string(), holder.clone()))
            .copied()
            .unwrap_or_default())
    }

    fn transfer(
        &mut self,
        asset: &AssetInfo,
        from: &Addr,
        to: &Addr,
        amount: Uint128,
    ) -> StdResult<()> {
        self.debit(asset, from, amount)?;
        self.credit(asset, to, amount);
        Ok(())
    }

    fn query_rate(&self, contract: &Addr, query: &RateQuery) -> StdResult<Uint128> {
        let converter = self.converter(contract)?;
        ensure!(
            !converter.offline,
            StdError::generic_err(format!("{contract} is offline"))
        );
        let rate = converter.rate;
        match (&converter.family, query) {
            (Family::WrapPair { .. }, RateQuery::UnderlyingPerWrapped { amount })
            | (Family::Vault { .. }, RateQuery::ConvertToAssets { shares: amount })
            | (Family::Native, RateQuery::BaseValue { amount }) => {
                rate.apply(*amount, Rounding::Floor)
            }
            (Family::WrapPair { .. }, RateQuery::WrappedPerUnderlying { amount })
            | (Family::Vault { .. }, RateQuery::ConvertToShares { assets: amount }) => {
                rate.invert().apply(*amount, Rounding::Floor)
            }
            _ => Err(StdError::generic_err(format!(
                "{contract} does not answer {query:?}"
            ))),
        }
    }

    fn execute_conversion(
        &mut self,
        contract: &Addr,
        sender: &Addr,
        msg: &ConversionMsg,
    ) -> StdResult<Uint128> {
        let converter = self.converter(contract)?.clone();
        let (raw, wrapped, amount) = match (&converter.family, msg) {
            (Family::WrapPair { raw, wrapped }, ConversionMsg::Wrap { amount })
            | (Family::Vault { raw, wrapped }, ConversionMsg::Deposit { assets: amount }) => {
                (raw, wrapped, *amount)
            }
            _ => {
                return Err(StdError::generic_err(format!(
                    "{contract} does not accept {msg:?}"
                )))
            }
        };

        let minted = converter.rate.invert().apply(amount, Rounding::Floor)?;
        self.debit(raw, sender, amount)?;
        if !converter.mints_nothing {
            self.credit(wrapped, sender, minted);
        }
        Ok(minted)
    }

    fn query_batch_swap(
        &self,
        kind: SwapKind,
        swaps: &[BatchSwapStep],
        assets: &[AssetInfo],
        _funds: &FundManagement,
    ) -> StdResult<Vec<Int128>> {
        self.simulate(kind, swaps, assets).map(|(deltas, _)| deltas)
    }

    fn batch_swap(
        &mut self,
        kind: SwapKind,
        swaps: &[BatchSwapStep],
        assets: &[AssetInfo],
        funds: &FundManagement,
        limits: &[Int128],
        _deadline: Timestamp,
    ) -> StdResult<Vec<Int128>> {
        if let Some(FrontRun {
            pool,
            asset_in,
            amount_in,
        }) = self.front_run.take()
        {
            let pool = self
                .pools
                .get_mut(&pool)
                .ok_or_else(|| StdError::generic_err("front run on unknown pool"))?;
            let side_in = pool.side(&asset_in)?;
            let out = pool.out_given_in(side_in, amount_in)?;
            pool.trade(side_in, amount_in, out);
        }

        let (deltas, pools) = self.simulate(kind, swaps, assets)?;
        ensure!(
            limits.len() == deltas.len(),
            StdError::generic_err("BAL#103 input length mismatch")
        );
        for (index, (delta, limit)) in deltas.iter().zip(limits).enumerate() {
            ensure!(
                delta <= limit,
                StdError::generic_err(format!("BAL#507 swap limit exceeded on asset {index}"))
            );
        }

        let last = assets.len() - 1;
        for (index, (asset, delta)) in assets.iter().zip(&deltas).enumerate() {
            let delta = delta.i128();
            if delta > 0 {
                self.debit(asset, &funds.sender, Uint128::new(delta.unsigned_abs()))?;
            } else if delta < 0 {
                let mut received = Uint128::new(delta.unsigned_abs());
                if index == last {
                    received = received.saturating_sub(self.short_delivery);
                }
                self.credit(asset, &funds.recipient, received);
            }
        }
        self.pools = pools;
        Ok(deltas)
    }
}

impl VaultLedger for MockHost {
    fn total_shares(&self) -> Uint128 {
        self.shares.values().copied().sum()
    }

    fn shares_of(&self, owner: &Addr) -> Uint128 {
        self.shares.get(owner).copied().unwrap_or_default()
    }

    fn burn(&mut self, owner: &Addr, shares: Uint128) -> StdResult<()> {
        let held = self.shares.entry(owner.clone()).or_default();
        *held = held.checked_sub(shares)?;
        Ok(())
    }

    fn decimals_offset(&self) -> u8 {
        self.decimals_offset
    }
}

impl Transactional for MockHost {
    type Checkpoint = MockHost;

    fn checkpoint(&self) -> MockHost {
        self.clone()
    }

    fn revert_to(&mut self, checkpoint: MockHost) {
        *self = checkpoint;
    }
}

pub fn wsteth_lst() -> LstDescriptorUnchecked {
    LstDescriptorUnchecked {
        asset: AssetInfoUnchecked::native("steth"),
        wrapped: AssetInfoUnchecked::native("wsteth"),
        route: RouteUnchecked::Direct { pool: WSTETH_POOL },
        conversion: ConversionHandlerUnchecked::WrapPair {
            contract: WSTETH_WRAPPER.to_owned(),
        },
        min_touch_threshold: Uint128::new(1_000),
        priority_weight: Decimal::permille(35),
    }
}

pub fn reth_lst() -> LstDescriptorUnchecked {
    LstDescriptorUnchecked {
        asset: AssetInfoUnchecked::native("reth"),
        wrapped: AssetInfoUnchecked::native("reth"),
        route: RouteUnchecked::Direct { pool: RETH_POOL },
        conversion: ConversionHandlerUnchecked::Native {
            rate_provider: RETH_RATES.to_owned(),
        },
        min_touch_threshold: Uint128::new(1_000),
        priority_weight: Decimal::permille(28),
    }
}

pub fn sfrxeth_lst() -> LstDescriptorUnchecked {
    LstDescriptorUnchecked {
        asset: AssetInfoUnchecked::native("frxeth"),
        wrapped: AssetInfoUnchecked::native("sfrxeth"),
        route: RouteUnchecked::Bridged {
            bridge_asset: AssetInfoUnchecked::native("frxeth"),
            pool_a: SFRXETH_POOL,
            pool_b: FRXETH_POOL,
        },
        conversion: ConversionHandlerUnchecked::Vault {
            contract: SFRXETH_VAULT.to_owned(),
        },
        min_touch_threshold: Uint128::new(1_000),
        priority_weight: Decimal::permille(41),
    }
}

/// wstETH, rETH and sfrxETH at indexes 0, 1 and 2
pub fn lsts() -> Vec<LstDescriptorUnchecked> {
    vec![wsteth_lst(), reth_lst(), sfrxeth_lst()]
}

/// Instantiated vault engine wired to a [`MockHost`]
pub struct TestVault {
    pub deps: OwnedDeps<MockStorage, MockApi, MockQuerier>,
    pub env: Env,
    pub host: MockHost,
}

impl TestVault {
    pub fn new(lsts: Vec<LstDescriptorUnchecked>) -> anyhow::Result<Self> {
        Self::with_order(lsts, LiquidationOrder::default())
    }

    pub fn with_order(
        lsts: Vec<LstDescriptorUnchecked>,
        liquidation_order: LiquidationOrder,
    ) -> anyhow::Result<Self> {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut deps = mock_dependencies();
        let env = mock_env();
        instantiate_handler(
            deps.as_mut(),
            env.clone(),
            mock_info(ADMIN, &[]),
            AppInstantiateMsg {
                admin: None,
                base_asset: AssetInfoUnchecked::native("weth"),
                slippage_buffer: None,
                delivery_tolerance: None,
                liquidation_order: Some(liquidation_order),
                lsts,
            },
        )?;
        Ok(Self {
            deps,
            env,
            host: MockHost::market(),
        })
    }

    pub fn address(&self) -> Addr {
        self.env.contract.address.clone()
    }

    /// Credits the vault with `asset`
    pub fn fund(&mut self, asset: &AssetInfo, amount: Uint128) {
        let vault = self.address();
        self.host.mint(asset, &vault, amount);
    }

    pub fn holdings(&self, asset: &AssetInfo) -> Uint128 {
        self.host.balance_of(asset, &self.address())
    }

    /// Gives `owner` shares worth everything the vault currently holds
    pub fn issue_all_shares(&mut self, owner: &str) -> anyhow::Result<Uint128> {
        let total = self.total_assets()?;
        self.host.set_shares(owner, total);
        Ok(total)
    }

    pub fn total_assets(&self) -> anyhow::Result<Uint128> {
        let response: lst_vault::msg::TotalAssetsResponse =
            cosmwasm_std::from_json(self.query(AppQueryMsg::TotalAssets {})?)?;
        Ok(response.total_assets)
    }

    pub fn positions(&self) -> anyhow::Result<lst_vault::msg::PositionsResponse> {
        Ok(cosmwasm_std::from_json(
            self.query(AppQueryMsg::Positions {})?,
        )?)
    }

    pub fn execute(&mut self, sender: &str, msg: AppExecuteMsg) -> Result<Response, AppError> {
        execute_handler(
            self.deps.as_mut(),
            self.env.clone(),
            mock_info(sender, &[]),
            &mut self.host,
            msg,
        )
    }

    pub fn withdraw(&mut self, sender: &str, amount: Uint128) -> Result<Response, AppError> {
        self.execute(
            sender,
            AppExecuteMsg::Withdraw {
                amount,
                receiver: None,
                max_shares_in: None,
            },
        )
    }

    pub fn query(&self, msg: AppQueryMsg) -> Result<Binary, AppError> {
        query_handler(self.deps.as_ref(), self.env.clone(), &self.host, msg)
    }
}

/// `(lst_index, base_received)` of every executed swap step
pub fn swaps(response: &Response) -> Vec<(u8, Uint128)> {
    response
        .events
        .iter()
        .filter(|e| e.ty == "lst_swap")
        .map(|e| {
            let attr = |key: &str| {
                e.attributes
                    .iter()
                    .find(|a| a.key == key)
                    .map(|a| a.value.clone())
                    .unwrap()
            };
            (
                attr("lst_index").parse().unwrap(),
                Uint128::new(attr("base_received").parse().unwrap()),
            )
        })
        .collect()
}

/// Value of `key` in the first event of type `ty`
pub fn event_attr(response: &Response, ty: &str, key: &str) -> Option<String> {
    response
        .events
        .iter()
        .find(|e| e.ty == ty)
        .and_then(|e| e.attributes.iter().find(|a| a.key == key))
        .map(|a| a.value.clone())
}
