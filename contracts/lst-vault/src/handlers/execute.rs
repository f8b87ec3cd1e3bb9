use cosmwasm_std::{ensure, Decimal, DepsMut, Env, MessageInfo, Response};
use cw_utils::nonpayable;

use super::withdraw::withdraw_handler;
use crate::{
    check::{check_distinct, check_index, Checkable},
    contract::AppResult,
    error::AppError,
    host::Host,
    msg::AppExecuteMsg,
    registry::{LstDescriptorUnchecked, TokenRegistry},
    state::{ConfigUnchecked, LiquidationOrder, ADMIN, CONFIG, LSTS},
};

pub fn execute_handler<H: Host>(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    host: &mut H,
    msg: AppExecuteMsg,
) -> AppResult {
    match msg {
        AppExecuteMsg::Withdraw {
            amount,
            receiver,
            max_shares_in,
        } => withdraw_handler(
            deps.as_ref(),
            &env,
            &info,
            host,
            amount,
            receiver,
            max_shares_in,
        ),
        AppExecuteMsg::UpdateConfig {
            slippage_buffer,
            delivery_tolerance,
            liquidation_order,
        } => update_config(
            deps,
            info,
            slippage_buffer,
            delivery_tolerance,
            liquidation_order,
        ),
        AppExecuteMsg::SetLst { index, descriptor } => set_lst(deps, info, index, descriptor),
        AppExecuteMsg::RemoveLst { index } => remove_lst(deps, info, index),
        AppExecuteMsg::UpdateAdmin { admin } => update_admin(deps, info, admin),
    }
}

fn update_config(
    deps: DepsMut,
    info: MessageInfo,
    slippage_buffer: Option<Decimal>,
    delivery_tolerance: Option<Decimal>,
    liquidation_order: Option<LiquidationOrder>,
) -> AppResult {
    ADMIN.assert_admin(deps.as_ref(), &info.sender)?;
    nonpayable(&info)?;

    let mut config: ConfigUnchecked = CONFIG.load(deps.storage)?.into();
    if let Some(slippage_buffer) = slippage_buffer {
        config.slippage_buffer = slippage_buffer;
    }
    if let Some(delivery_tolerance) = delivery_tolerance {
        config.delivery_tolerance = delivery_tolerance;
    }
    if let Some(liquidation_order) = liquidation_order {
        config.liquidation_order = liquidation_order;
    }
    let config = config.check(deps.as_ref())?;
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new()
        .add_attribute("action", "update_config")
        .add_attribute("slippage_buffer", config.slippage_buffer.to_string())
        .add_attribute("delivery_tolerance", config.delivery_tolerance.to_string()))
}

fn set_lst(
    deps: DepsMut,
    info: MessageInfo,
    index: u8,
    descriptor: LstDescriptorUnchecked,
) -> AppResult {
    ADMIN.assert_admin(deps.as_ref(), &info.sender)?;
    nonpayable(&info)?;

    let index = check_index(index)?;
    let registry = TokenRegistry::load(deps.storage)?;
    let lst = descriptor.check(deps.as_ref(), registry.base_asset())?;
    check_distinct(index, &lst, registry.iter())?;
    let replaced = LSTS.has(deps.storage, index);
    LSTS.save(deps.storage, index, &lst)?;

    log::info!("LST {index} set to {} (replaced: {replaced})", lst.wrapped);
    Ok(Response::new()
        .add_attribute("action", "set_lst")
        .add_attribute("lst_index", index.to_string())
        .add_attribute("wrapped", lst.wrapped.to_string()))
}

fn remove_lst(deps: DepsMut, info: MessageInfo, index: u8) -> AppResult {
    ADMIN.assert_admin(deps.as_ref(), &info.sender)?;
    nonpayable(&info)?;

    ensure!(LSTS.has(deps.storage, index), AppError::UnknownLst(index));
    LSTS.remove(deps.storage, index);

    Ok(Response::new()
        .add_attribute("action", "remove_lst")
        .add_attribute("lst_index", index.to_string()))
}

fn update_admin(deps: DepsMut, info: MessageInfo, admin: Option<String>) -> AppResult {
    nonpayable(&info)?;
    let admin = admin
        .map(|admin| deps.api.addr_validate(&admin))
        .transpose()?;
    Ok(ADMIN.execute_update_admin(deps, info, admin)?)
}
