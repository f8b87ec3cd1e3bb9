use cosmwasm_std::{ensure, DivideByZeroError, Uint128, Uint256};

use crate::contract::AppResult;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Rounding {
    Floor,
    Ceiling,
}

/// Convert assets to shares with a virtual offset against share-price inflation.
///
/// Formula: shares = assets × (total_shares + 10^offset) / (total_assets + 1)
pub fn convert_to_shares(
    assets: Uint128,
    total_assets: Uint128,
    total_shares: Uint128,
    decimals_offset: u8,
    rounding: Rounding,
) -> AppResult<Uint128> {
    let (virtual_assets, virtual_shares) = virtual_supply(total_assets, total_shares, decimals_offset)?;
    mul_div(assets, virtual_shares, virtual_assets, rounding)
}

/// Convert shares to assets with the same virtual offset.
///
/// Formula: assets = shares × (total_assets + 1) / (total_shares + 10^offset)
pub fn convert_to_assets(
    shares: Uint128,
    total_assets: Uint128,
    total_shares: Uint128,
    decimals_offset: u8,
    rounding: Rounding,
) -> AppResult<Uint128> {
    let (virtual_assets, virtual_shares) = virtual_supply(total_assets, total_shares, decimals_offset)?;
    mul_div(shares, virtual_assets, virtual_shares, rounding)
}

fn virtual_supply(
    total_assets: Uint128,
    total_shares: Uint128,
    decimals_offset: u8,
) -> AppResult<(Uint128, Uint128)> {
    let offset = Uint128::new(10).checked_pow(decimals_offset.into())?;
    Ok((
        total_assets.checked_add(Uint128::one())?,
        total_shares.checked_add(offset)?,
    ))
}

/// (value × numerator) / denominator through a 256-bit intermediate
pub fn mul_div(
    value: Uint128,
    numerator: Uint128,
    denominator: Uint128,
    rounding: Rounding,
) -> AppResult<Uint128> {
    ensure!(
        !denominator.is_zero(),
        DivideByZeroError::new(value)
    );

    let product = Uint256::from(value).checked_mul(numerator.into())?;
    let denominator = Uint256::from(denominator);

    let result = match rounding {
        Rounding::Floor => product.checked_div(denominator)?,
        Rounding::Ceiling => product
            .checked_add(denominator)?
            .checked_sub(Uint256::one())?
            .checked_div(denominator)?,
    };

    Ok(Uint128::try_from(result)?)
}
