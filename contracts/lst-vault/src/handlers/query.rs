use cosmwasm_std::{to_json_binary, Binary, Deps, Env, Uint128};

use super::withdraw::WithdrawalExecutor;
use crate::{
    contract::AppResult,
    host::{Chain, VaultLedger},
    msg::{
        AppQueryMsg, ConfigResponse, LstEntry, LstsResponse, MaxWithdrawResponse,
        PositionsResponse, PreviewWithdrawResponse, TotalAssetsResponse,
    },
    oracle::BalanceOracle,
    registry::TokenRegistry,
    state::ADMIN,
};

pub fn query_handler<H: Chain + VaultLedger + ?Sized>(
    deps: Deps,
    env: Env,
    host: &H,
    msg: AppQueryMsg,
) -> AppResult<Binary> {
    match msg {
        AppQueryMsg::Config {} => to_json_binary(&query_config(deps)?),
        AppQueryMsg::Lsts {} => to_json_binary(&query_lsts(deps)?),
        AppQueryMsg::Positions {} => to_json_binary(&query_positions(deps, &env, host)?),
        AppQueryMsg::TotalAssets {} => to_json_binary(&query_total_assets(deps, &env, host)?),
        AppQueryMsg::PreviewWithdraw { amount } => {
            to_json_binary(&query_preview_withdraw(deps, &env, host, amount)?)
        }
        AppQueryMsg::MaxWithdraw { owner } => {
            to_json_binary(&query_max_withdraw(deps, &env, host, owner)?)
        }
    }
    .map_err(Into::into)
}

pub fn query_config(deps: Deps) -> AppResult<ConfigResponse> {
    let registry = TokenRegistry::load(deps.storage)?;
    Ok(ConfigResponse {
        config: registry.config().clone(),
        admin: ADMIN.get(deps)?,
    })
}

pub fn query_lsts(deps: Deps) -> AppResult<LstsResponse> {
    let registry = TokenRegistry::load(deps.storage)?;
    Ok(LstsResponse {
        lsts: registry
            .iter()
            .map(|(index, descriptor)| LstEntry {
                index,
                descriptor: descriptor.clone(),
            })
            .collect(),
        liquidation_order: registry.liquidation_order(),
    })
}

pub fn query_positions<H: Chain + ?Sized>(
    deps: Deps,
    env: &Env,
    host: &H,
) -> AppResult<PositionsResponse> {
    let registry = TokenRegistry::load(deps.storage)?;
    let oracle = BalanceOracle::new(&registry, host, &env.contract.address);

    let liquid_balance = oracle.liquid_balance()?;
    let positions = oracle.positions()?;
    let total_assets = positions.iter().try_fold(liquid_balance, |total, position| {
        total.checked_add(position.value_in_base)
    })?;
    Ok(PositionsResponse {
        liquid_balance,
        positions,
        total_assets,
    })
}

pub fn query_total_assets<H: Chain + VaultLedger + ?Sized>(
    deps: Deps,
    env: &Env,
    host: &H,
) -> AppResult<TotalAssetsResponse> {
    let registry = TokenRegistry::load(deps.storage)?;
    let total_assets = BalanceOracle::new(&registry, host, &env.contract.address).total_assets()?;
    Ok(TotalAssetsResponse {
        total_assets,
        total_shares: host.total_shares(),
    })
}

/// Read-only dry run of a withdrawal: nothing is wrapped, swapped or burned
pub fn query_preview_withdraw<H: Chain + VaultLedger + ?Sized>(
    deps: Deps,
    env: &Env,
    host: &H,
    amount: Uint128,
) -> AppResult<PreviewWithdrawResponse> {
    let registry = TokenRegistry::load(deps.storage)?;
    let executor = WithdrawalExecutor::new(&registry, &env.contract.address, env.block.time);

    let shares = executor.preview_shares(host, amount)?;
    let plan = executor.plan(host, amount)?;
    Ok(PreviewWithdrawResponse {
        shares,
        feasible: plan.is_feasible(),
        plan,
    })
}

pub fn query_max_withdraw<H: Chain + VaultLedger + ?Sized>(
    deps: Deps,
    env: &Env,
    host: &H,
    owner: String,
) -> AppResult<MaxWithdrawResponse> {
    let owner = deps.api.addr_validate(&owner)?;
    let registry = TokenRegistry::load(deps.storage)?;
    let max_assets = WithdrawalExecutor::new(&registry, &env.contract.address, env.block.time)
        .max_withdraw(host, &owner)?;
    Ok(MaxWithdrawResponse { max_assets })
}
