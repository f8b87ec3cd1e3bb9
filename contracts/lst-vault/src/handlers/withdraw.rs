use cosmwasm_schema::cw_serde;
use cosmwasm_std::{ensure, Addr, Deps, Env, Event, MessageInfo, Response, Timestamp, Uint128};
use cw_utils::nonpayable;

use crate::{
    contract::AppResult,
    distribution::withdraw::{WithdrawalPlan, WithdrawalPlanner, WithdrawalStep},
    error::AppError,
    helpers::delivered_within,
    host::{Chain, Host, VaultLedger},
    math::{convert_to_assets, convert_to_shares, Rounding},
    oracle::BalanceOracle,
    registry::TokenRegistry,
    router::{SwapOutcome, SwapRouter},
};

#[cw_serde]
pub struct ExecutedStep {
    pub lst_index: u8,
    pub expected_base_out: Uint128,
    pub wrapped_minted: Uint128,
    pub wrapped_spent: Uint128,
    pub base_received: Uint128,
}

impl ExecutedStep {
    fn new(step: &WithdrawalStep, outcome: SwapOutcome) -> Self {
        Self {
            lst_index: step.lst_index,
            expected_base_out: step.expected_base_out,
            wrapped_minted: outcome.wrapped_minted,
            wrapped_spent: outcome.wrapped_spent,
            base_received: outcome.base_received,
        }
    }

    pub fn event(&self) -> Event {
        Event::new("lst_swap")
            .add_attribute("lst_index", self.lst_index.to_string())
            .add_attribute("amount_swapped", self.wrapped_spent)
            .add_attribute("base_received", self.base_received)
    }
}

/// Everything a committed withdrawal did
#[cw_serde]
pub struct WithdrawReceipt {
    pub owner: Addr,
    pub receiver: Addr,
    pub amount: Uint128,
    pub shares: Uint128,
    pub steps: Vec<ExecutedStep>,
}

impl WithdrawReceipt {
    pub fn lsts_touched(&self) -> Vec<u8> {
        self.steps.iter().map(|s| s.lst_index).collect()
    }

    /// Base asset obtained from swaps, across all steps
    pub fn total_swapped(&self) -> Uint128 {
        self.steps.iter().map(|s| s.base_received).sum()
    }

    /// One `lst_swap` event per step, then the `withdraw` summary
    pub fn events(&self) -> Vec<Event> {
        let touched = self
            .lsts_touched()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.steps
            .iter()
            .map(ExecutedStep::event)
            .chain(std::iter::once(
                Event::new("withdraw")
                    .add_attribute("owner", self.owner.as_str())
                    .add_attribute("receiver", self.receiver.as_str())
                    .add_attribute("requested", self.amount)
                    .add_attribute("shares", self.shares)
                    .add_attribute("lsts_touched", touched)
                    .add_attribute("total_swapped", self.total_swapped()),
            ))
            .collect()
    }

    pub fn into_response(self) -> Response {
        Response::new()
            .add_attribute("action", "withdraw")
            .add_attribute("amount", self.amount)
            .add_events(self.events())
    }
}

/// Drives one withdrawal from share validation to the final transfer.
///
/// Everything that can be checked without mutating runs first: share price, plan
/// feasibility, owner balance. From the first mutation on, any error reverts the host
/// to the checkpoint taken just before it.
pub struct WithdrawalExecutor<'a> {
    registry: &'a TokenRegistry,
    vault: &'a Addr,
    deadline: Timestamp,
}

impl<'a> WithdrawalExecutor<'a> {
    pub fn new(registry: &'a TokenRegistry, vault: &'a Addr, deadline: Timestamp) -> Self {
        Self {
            registry,
            vault,
            deadline,
        }
    }

    /// Shares burned for `amount` at the current share price (rounded up)
    pub fn preview_shares<H: Chain + VaultLedger + ?Sized>(
        &self,
        host: &H,
        amount: Uint128,
    ) -> AppResult<Uint128> {
        let total_assets = BalanceOracle::new(self.registry, host, self.vault).total_assets()?;
        convert_to_shares(
            amount,
            total_assets,
            host.total_shares(),
            host.decimals_offset(),
            Rounding::Ceiling,
        )
    }

    /// Assets `owner` could withdraw at the current share price, capped by total assets
    pub fn max_withdraw<H: Chain + VaultLedger + ?Sized>(
        &self,
        host: &H,
        owner: &Addr,
    ) -> AppResult<Uint128> {
        let total_assets = BalanceOracle::new(self.registry, host, self.vault).total_assets()?;
        let assets = convert_to_assets(
            host.shares_of(owner),
            total_assets,
            host.total_shares(),
            host.decimals_offset(),
            Rounding::Floor,
        )?;
        Ok(assets.min(total_assets))
    }

    /// Plan covering whatever the liquid balance does not
    pub fn plan<C: Chain + ?Sized>(&self, chain: &C, amount: Uint128) -> AppResult<WithdrawalPlan> {
        let liquid = BalanceOracle::new(self.registry, chain, self.vault).liquid_balance()?;
        let shortfall = amount.saturating_sub(liquid);
        if shortfall.is_zero() {
            return Ok(WithdrawalPlan::empty());
        }
        WithdrawalPlanner::new(self.registry, self.vault).plan(chain, shortfall)
    }

    pub fn withdraw<H: Host>(
        &self,
        host: &mut H,
        owner: &Addr,
        receiver: &Addr,
        amount: Uint128,
        max_shares_in: Option<Uint128>,
    ) -> AppResult<WithdrawReceipt> {
        ensure!(!amount.is_zero(), AppError::ZeroAmount {});

        // Priced once, before any swap can move the share price
        let shares = self.preview_shares(&*host, amount)?;

        let held = host.shares_of(owner);
        ensure!(
            held >= shares,
            AppError::InsufficientShares {
                required: shares,
                available: held,
            }
        );
        if let Some(max_shares_in) = max_shares_in {
            ensure!(
                shares <= max_shares_in,
                AppError::SharesSlippageExceeded {
                    required: shares,
                    max_shares_in,
                }
            );
        }

        let plan = self.plan(&*host, amount)?.into_feasible()?;

        let checkpoint = host.checkpoint();
        match self.settle(host, owner, receiver, amount, shares, &plan) {
            Ok(receipt) => Ok(receipt),
            Err(err) => {
                log::warn!("withdrawal of {amount} for {owner} reverted: {err}");
                host.revert_to(checkpoint);
                Err(err)
            }
        }
    }

    fn settle<H: Host>(
        &self,
        host: &mut H,
        owner: &Addr,
        receiver: &Addr,
        amount: Uint128,
        shares: Uint128,
        plan: &WithdrawalPlan,
    ) -> AppResult<WithdrawReceipt> {
        let router = SwapRouter::new(self.registry, self.vault);
        let tolerance = self.registry.config().delivery_tolerance;
        let base = self.registry.base_asset();

        let mut gathered = Uint128::zero();
        let mut steps = Vec::with_capacity(plan.steps.len());
        for (position, step) in plan.steps.iter().enumerate() {
            let outcome = router.execute(
                host,
                self.deadline,
                step.lst_index,
                step.swap_amount_in_wrapped,
                step.expected_base_out,
            )?;
            gathered = gathered.checked_add(outcome.base_received)?;

            if !delivered_within(step.expected_base_out, outcome.base_received, tolerance)? {
                let still_expected: Uint128 = plan.steps[position + 1..]
                    .iter()
                    .map(|s| s.expected_base_out)
                    .sum();
                ensure!(
                    gathered.checked_add(still_expected)? >= plan.shortfall,
                    AppError::SwapSlippageExceeded {
                        lst_index: step.lst_index,
                        expected: step.expected_base_out,
                        received: outcome.base_received,
                    }
                );
                log::warn!(
                    "LST {}: under-delivered {} of {}, remaining steps still cover",
                    step.lst_index,
                    outcome.base_received,
                    step.expected_base_out
                );
            }
            steps.push(ExecutedStep::new(step, outcome));
        }

        let liquid = host.balance(base, self.vault)?;
        ensure!(
            liquid >= amount,
            AppError::InsufficientAssets {
                requested: amount,
                available: liquid,
            }
        );

        host.burn(owner, shares)?;
        host.transfer(base, self.vault, receiver, amount)?;

        Ok(WithdrawReceipt {
            owner: owner.clone(),
            receiver: receiver.clone(),
            amount,
            shares,
            steps,
        })
    }
}

/// Withdraws `amount` base asset from the sender's shares to `receiver` (sender by default)
pub fn withdraw_handler<H: Host>(
    deps: Deps,
    env: &Env,
    info: &MessageInfo,
    host: &mut H,
    amount: Uint128,
    receiver: Option<String>,
    max_shares_in: Option<Uint128>,
) -> AppResult {
    nonpayable(info)?;
    let receiver = receiver
        .map(|r| deps.api.addr_validate(&r))
        .transpose()?
        .unwrap_or_else(|| info.sender.clone());

    let registry = TokenRegistry::load(deps.storage)?;
    let receipt = WithdrawalExecutor::new(&registry, &env.contract.address, env.block.time)
        .withdraw(host, &info.sender, &receiver, amount, max_shares_in)?;

    log::info!(
        "withdrew {} for {} burning {} shares, LSTs touched {:?}",
        receipt.amount,
        receipt.owner,
        receipt.shares,
        receipt.lsts_touched()
    );
    Ok(receipt.into_response())
}
