use cosmwasm_schema::cw_serde;
use cosmwasm_std::{ensure, Addr, Binary, Int128, Timestamp, Uint128};
use cw_asset::AssetInfo;

use crate::{
    contract::AppResult,
    error::AppError,
    helpers::{with_buffer, without_buffer},
    host::{BatchSwapStep, Chain, ConversionMsg, FundManagement, RateQuery, SwapKind},
    registry::{ConversionHandler, LstDescriptor, Route, TokenRegistry},
};

impl Route {
    /// Venue asset list: wrapped first, base last
    pub fn assets(&self, wrapped: &AssetInfo, base: &AssetInfo) -> Vec<AssetInfo> {
        match self {
            Route::Direct { .. } => vec![wrapped.clone(), base.clone()],
            Route::Bridged { bridge_asset, .. } => {
                vec![wrapped.clone(), bridge_asset.clone(), base.clone()]
            }
        }
    }

    /// Swap steps against the asset list of [`Route::assets`].
    /// Exact-output routes are listed from the base asset backwards.
    pub fn steps(&self, kind: SwapKind, amount: Uint128) -> Vec<BatchSwapStep> {
        let step = |pool_id, asset_in_index, asset_out_index, amount| BatchSwapStep {
            pool_id,
            asset_in_index,
            asset_out_index,
            amount,
            user_data: Binary::default(),
        };
        match (self, kind) {
            (Route::Direct { pool }, _) => vec![step(*pool, 0, 1, amount)],
            (Route::Bridged { pool_a, pool_b, .. }, SwapKind::GivenIn) => vec![
                step(*pool_a, 0, 1, amount),
                step(*pool_b, 1, 2, Uint128::zero()),
            ],
            (Route::Bridged { pool_a, pool_b, .. }, SwapKind::GivenOut) => vec![
                step(*pool_b, 1, 2, amount),
                step(*pool_a, 0, 1, Uint128::zero()),
            ],
        }
    }
}

/// Measured result of one executed unwind
#[cw_serde]
pub struct SwapOutcome {
    pub lst_index: u8,
    /// Wrapped tokens minted from raw tokens before the swap
    pub wrapped_minted: Uint128,
    /// Wrapped tokens that left the vault
    pub wrapped_spent: Uint128,
    /// Base asset that reached the vault
    pub base_received: Uint128,
}

/// Quotes and executes LST -> base asset conversions on the swap venue
pub struct SwapRouter<'a> {
    registry: &'a TokenRegistry,
    vault: &'a Addr,
}

impl<'a> SwapRouter<'a> {
    pub fn new(registry: &'a TokenRegistry, vault: &'a Addr) -> Self {
        Self { registry, vault }
    }

    /// Wrapped input needed to receive exactly `desired_base_out`, slippage buffer included
    pub fn quote<C: Chain + ?Sized>(
        &self,
        chain: &C,
        lst_index: u8,
        desired_base_out: Uint128,
    ) -> AppResult<Uint128> {
        let lst = self.registry.get(lst_index)?;
        let deltas = self.simulate(chain, lst, SwapKind::GivenOut, desired_base_out)?;
        let required = amount_in(&deltas);
        ensure!(
            !required.is_zero() || desired_base_out.is_zero(),
            AppError::SwapFailed {
                lst_index,
                reason: "venue quoted a free swap".to_string()
            }
        );
        with_buffer(required, self.registry.config().slippage_buffer)
    }

    /// Base asset obtainable from `wrapped_available`, keeping room for the slippage buffer
    pub fn quote_max_out<C: Chain + ?Sized>(
        &self,
        chain: &C,
        lst_index: u8,
        wrapped_available: Uint128,
    ) -> AppResult<Uint128> {
        let lst = self.registry.get(lst_index)?;
        let usable = without_buffer(wrapped_available, self.registry.config().slippage_buffer)?;
        if usable.is_zero() {
            return Ok(Uint128::zero());
        }
        let deltas = self.simulate(chain, lst, SwapKind::GivenIn, usable)?;
        Ok(amount_out(&deltas))
    }

    /// Unwinds `wrapped_in` (at most) of an LST into exactly `base_out` base asset.
    ///
    /// Wraps raw tokens first when the live wrapped balance is short, and fails with
    /// [`AppError::ConversionFailed`] if that produces nothing. The swap input limit is
    /// capped by the live wrapped balance. The returned amounts are measured on balances,
    /// not taken from the venue's answer.
    pub fn execute<C: Chain + ?Sized>(
        &self,
        chain: &mut C,
        deadline: Timestamp,
        lst_index: u8,
        wrapped_in: Uint128,
        base_out: Uint128,
    ) -> AppResult<SwapOutcome> {
        let lst = self.registry.get(lst_index)?;
        let base = self.registry.base_asset();

        let wrapped_before_wrap = chain.balance(&lst.wrapped, self.vault)?;
        let wrapped_live = if wrapped_before_wrap < wrapped_in {
            self.wrap_deficit(
                chain,
                lst_index,
                lst,
                wrapped_before_wrap,
                wrapped_in - wrapped_before_wrap,
            )?
        } else {
            wrapped_before_wrap
        };
        let wrapped_minted = wrapped_live.saturating_sub(wrapped_before_wrap);

        let limit_in = wrapped_in.min(wrapped_live);
        let base_before = chain.balance(base, self.vault)?;

        let assets = lst.route.assets(&lst.wrapped, base);
        let swaps = lst.route.steps(SwapKind::GivenOut, base_out);
        let limits = limits(assets.len(), limit_in, base_out)?;
        log::debug!(
            "LST {lst_index}: swapping at most {limit_in} {} for {base_out} {base}",
            lst.wrapped
        );
        chain
            .batch_swap(
                SwapKind::GivenOut,
                &swaps,
                &assets,
                &FundManagement::external(self.vault),
                &limits,
                deadline,
            )
            .map_err(|e| AppError::SwapFailed {
                lst_index,
                reason: e.to_string(),
            })?;

        let wrapped_after = chain.balance(&lst.wrapped, self.vault)?;
        let base_after = chain.balance(base, self.vault)?;
        let wrapped_spent = wrapped_live.saturating_sub(wrapped_after);
        ensure!(
            wrapped_spent <= limit_in,
            AppError::SwapFailed {
                lst_index,
                reason: format!("venue pulled {wrapped_spent} above the {limit_in} limit"),
            }
        );

        Ok(SwapOutcome {
            lst_index,
            wrapped_minted,
            wrapped_spent,
            base_received: base_after.saturating_sub(base_before),
        })
    }

    /// Converts raw tokens into `deficit` more wrapped tokens (as far as raw holdings go)
    /// and returns the new wrapped balance, which must have strictly grown.
    fn wrap_deficit<C: Chain + ?Sized>(
        &self,
        chain: &mut C,
        lst_index: u8,
        lst: &LstDescriptor,
        wrapped_before: Uint128,
        deficit: Uint128,
    ) -> AppResult<Uint128> {
        let msg = match &lst.conversion {
            ConversionHandler::Native { .. } => return Ok(wrapped_before),
            ConversionHandler::WrapPair { contract } => {
                let raw = self.raw_for(
                    chain,
                    lst,
                    contract,
                    RateQuery::UnderlyingPerWrapped { amount: deficit },
                )?;
                if raw.is_zero() {
                    return Ok(wrapped_before);
                }
                ConversionMsg::Wrap { amount: raw }
            }
            ConversionHandler::Vault { contract } => {
                let raw = self.raw_for(
                    chain,
                    lst,
                    contract,
                    RateQuery::ConvertToAssets { shares: deficit },
                )?;
                if raw.is_zero() {
                    return Ok(wrapped_before);
                }
                ConversionMsg::Deposit { assets: raw }
            }
        };

        log::debug!("LST {lst_index}: converting raw tokens {msg:?}");
        let reported = chain.execute_conversion(lst.conversion.contract(), self.vault, &msg)?;

        // The handler's own answer proves nothing, only the balance does
        let wrapped_after = chain.balance(&lst.wrapped, self.vault)?;
        ensure!(
            wrapped_after > wrapped_before,
            AppError::ConversionFailed {
                lst_index,
                token: lst.wrapped.to_string(),
            }
        );
        if wrapped_after - wrapped_before != reported {
            log::warn!(
                "LST {lst_index}: handler reported {reported} wrapped, balance moved by {}",
                wrapped_after - wrapped_before
            );
        }
        Ok(wrapped_after)
    }

    /// Raw tokens to convert for a wrapped amount, rounded up and capped by raw holdings
    fn raw_for<C: Chain + ?Sized>(
        &self,
        chain: &C,
        lst: &LstDescriptor,
        contract: &Addr,
        query: RateQuery,
    ) -> AppResult<Uint128> {
        let raw_held = chain.balance(&lst.asset, self.vault)?;
        let raw_needed = chain.query_rate(contract, &query)?.checked_add(Uint128::one())?;
        Ok(raw_needed.min(raw_held))
    }

    fn simulate<C: Chain + ?Sized>(
        &self,
        chain: &C,
        lst: &LstDescriptor,
        kind: SwapKind,
        amount: Uint128,
    ) -> AppResult<Vec<Int128>> {
        let assets = lst.route.assets(&lst.wrapped, self.registry.base_asset());
        let swaps = lst.route.steps(kind, amount);
        let funds = FundManagement::external(self.vault);
        Ok(chain.query_batch_swap(kind, &swaps, &assets, &funds)?)
    }
}

/// Wrapped paid into the venue: positive delta of the first asset
fn amount_in(deltas: &[Int128]) -> Uint128 {
    deltas
        .first()
        .map(|d| Uint128::new(d.i128().max(0).unsigned_abs()))
        .unwrap_or_default()
}

/// Base received from the venue: negative delta of the last asset
fn amount_out(deltas: &[Int128]) -> Uint128 {
    deltas
        .last()
        .map(|d| Uint128::new(d.i128().min(0).unsigned_abs()))
        .unwrap_or_default()
}

/// Venue limits: pay at most `max_in` wrapped, receive at least `min_out` base,
/// and leave no bridge asset behind.
fn limits(assets: usize, max_in: Uint128, min_out: Uint128) -> AppResult<Vec<Int128>> {
    let signed = |amount: Uint128| {
        i128::try_from(amount.u128())
            .map(Int128::new)
            .map_err(|_| AppError::InvalidConfig(format!("swap amount {amount} out of range")))
    };
    let max_in = signed(max_in)?;
    let min_out = signed(min_out)?;
    let mut limits = vec![Int128::zero(); assets];
    limits[0] = max_in;
    limits[assets - 1] = Int128::zero() - min_out;
    Ok(limits)
}
