use cosmwasm_std::{ensure, DepsMut, Env, MessageInfo, Response};

use crate::{
    check::{check_distinct, check_index, Checkable},
    contract::{AppResult, APP_ID, APP_VERSION, MAX_LSTS},
    error::AppError,
    msg::AppInstantiateMsg,
    registry::LstDescriptor,
    state::{
        ConfigUnchecked, ADMIN, CONFIG, DEFAULT_DELIVERY_TOLERANCE, DEFAULT_SLIPPAGE_BUFFER, LSTS,
    },
};

pub fn instantiate_handler(
    mut deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    msg: AppInstantiateMsg,
) -> AppResult {
    ensure!(
        msg.lsts.len() <= MAX_LSTS as usize,
        AppError::InvalidConfig(format!(
            "{} LSTs registered, at most {MAX_LSTS} supported",
            msg.lsts.len()
        ))
    );

    let config = ConfigUnchecked {
        base_asset: msg.base_asset,
        slippage_buffer: msg.slippage_buffer.unwrap_or(DEFAULT_SLIPPAGE_BUFFER),
        delivery_tolerance: msg.delivery_tolerance.unwrap_or(DEFAULT_DELIVERY_TOLERANCE),
        liquidation_order: msg.liquidation_order.unwrap_or_default(),
    }
    .check(deps.as_ref())?;
    CONFIG.save(deps.storage, &config)?;

    let mut lsts: Vec<(u8, LstDescriptor)> = Vec::with_capacity(msg.lsts.len());
    for (index, lst) in msg.lsts.into_iter().enumerate() {
        let index = check_index(index as u8)?;
        let lst = lst.check(deps.as_ref(), &config.base_asset)?;
        check_distinct(index, &lst, lsts.iter().map(|(i, l)| (*i, l)))?;
        lsts.push((index, lst));
    }
    for (index, lst) in &lsts {
        LSTS.save(deps.storage, *index, lst)?;
    }

    let admin = msg
        .admin
        .map(|admin| deps.api.addr_validate(&admin))
        .transpose()?
        .unwrap_or(info.sender);
    ADMIN.set(deps.branch(), Some(admin.clone()))?;

    log::info!("LST vault instantiated for {}", config.base_asset);
    Ok(Response::new()
        .add_attribute("action", "instantiate")
        .add_attribute("contract", APP_ID)
        .add_attribute("version", APP_VERSION)
        .add_attribute("admin", admin)
        .add_attribute("base_asset", config.base_asset.to_string()))
}
