use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Uint128};

use crate::{
    contract::AppResult,
    error::AppError,
    host::Chain,
    oracle::BalanceOracle,
    registry::TokenRegistry,
    router::SwapRouter,
};

#[cw_serde]
pub struct WithdrawalStep {
    pub lst_index: u8,
    /// Upper bound of wrapped tokens to sell, slippage buffer included
    pub swap_amount_in_wrapped: Uint128,
    /// Exact base asset requested from the venue
    pub expected_base_out: Uint128,
}

#[cw_serde]
pub struct WithdrawalPlan {
    pub shortfall: Uint128,
    /// Steps in execution order
    pub steps: Vec<WithdrawalStep>,
}

impl WithdrawalPlan {
    pub fn empty() -> Self {
        Self {
            shortfall: Uint128::zero(),
            steps: vec![],
        }
    }

    pub fn expected_total(&self) -> Uint128 {
        self.steps.iter().map(|s| s.expected_base_out).sum()
    }

    pub fn is_feasible(&self) -> bool {
        self.expected_total() >= self.shortfall
    }

    /// Fails with [`AppError::PlanInfeasible`] if the steps do not cover the shortfall
    pub fn into_feasible(self) -> AppResult<Self> {
        if self.is_feasible() {
            Ok(self)
        } else {
            Err(AppError::PlanInfeasible {
                shortfall: self.shortfall,
                covered: self.expected_total(),
            })
        }
    }

    pub fn lsts_touched(&self) -> Vec<u8> {
        self.steps.iter().map(|s| s.lst_index).collect()
    }
}

/// Chooses which LSTs to unwind for a shortfall.
/// Only reads and simulates; the returned plan may be infeasible.
pub struct WithdrawalPlanner<'a> {
    registry: &'a TokenRegistry,
    vault: &'a Addr,
}

impl<'a> WithdrawalPlanner<'a> {
    pub fn new(registry: &'a TokenRegistry, vault: &'a Addr) -> Self {
        Self { registry, vault }
    }

    pub fn plan<C: Chain + ?Sized>(&self, chain: &C, shortfall: Uint128) -> AppResult<WithdrawalPlan> {
        let oracle = BalanceOracle::new(self.registry, chain, self.vault);
        let router = SwapRouter::new(self.registry, self.vault);

        let mut remaining = shortfall;
        let mut steps = vec![];

        for lst_index in self.registry.liquidation_order() {
            if remaining.is_zero() {
                break;
            }
            let lst = self.registry.get(lst_index)?;
            let position = oracle.value_of(lst_index)?;

            if !position.priced || position.swappable_wrapped.is_zero() {
                continue;
            }
            if position.swappable_wrapped < lst.min_touch_threshold {
                log::debug!(
                    "LST {lst_index}: {} below touch threshold {}",
                    position.swappable_wrapped,
                    lst.min_touch_threshold
                );
                continue;
            }

            let target = match router.quote_max_out(chain, lst_index, position.swappable_wrapped) {
                Ok(max_out) => remaining.min(max_out),
                Err(e) => {
                    log::debug!("LST {lst_index}: no quote for the whole position ({e}), sizing down");
                    partial_exit(&router, chain, lst_index, position.swappable_wrapped, remaining)
                }
            };
            if target.is_zero() {
                continue;
            }

            let required_in = match router.quote(chain, lst_index, target) {
                Ok(required_in) => required_in.min(position.swappable_wrapped),
                Err(e) => {
                    log::debug!("LST {lst_index}: no exact-output quote, skipping ({e})");
                    continue;
                }
            };

            log::debug!("LST {lst_index}: plan to sell up to {required_in} for {target}");
            steps.push(WithdrawalStep {
                lst_index,
                swap_amount_in_wrapped: required_in,
                expected_base_out: target,
            });
            remaining = remaining.checked_sub(target)?;
        }

        Ok(WithdrawalPlan { shortfall, steps })
    }
}

/// Halvings of the target tried when the venue cannot take a whole position
const PARTIAL_EXIT_ATTEMPTS: usize = 8;

/// Largest of `remaining`, `remaining / 2`, ... the venue quotes within `swappable`, zero if none
fn partial_exit<C: Chain + ?Sized>(
    router: &SwapRouter,
    chain: &C,
    lst_index: u8,
    swappable: Uint128,
    remaining: Uint128,
) -> Uint128 {
    let mut target = remaining;
    for _ in 0..PARTIAL_EXIT_ATTEMPTS {
        if target.is_zero() {
            break;
        }
        match router.quote(chain, lst_index, target) {
            Ok(required_in) if required_in <= swappable => return target,
            _ => target = Uint128::new(target.u128() / 2),
        }
    }
    Uint128::zero()
}
