use cosmwasm_std::{Decimal, Uint128};

use crate::{
    contract::AppResult,
    math::{mul_div, Rounding},
};

/// Adds `buffer` on top of `amount`, rounding up
pub fn with_buffer(amount: Uint128, buffer: Decimal) -> AppResult<Uint128> {
    let factor = Decimal::one().checked_add(buffer)?;
    mul_div(amount, factor.atomics(), Decimal::one().atomics(), Rounding::Ceiling)
}

/// Largest amount that stays within `amount` once `buffer` is added back
pub fn without_buffer(amount: Uint128, buffer: Decimal) -> AppResult<Uint128> {
    let factor = Decimal::one().checked_add(buffer)?;
    mul_div(amount, Decimal::one().atomics(), factor.atomics(), Rounding::Floor)
}

/// Lowest delivery still accepted for an `expected` amount
pub fn min_delivery(expected: Uint128, tolerance: Decimal) -> AppResult<Uint128> {
    let factor = Decimal::one().checked_sub(tolerance)?;
    mul_div(expected, factor.atomics(), Decimal::one().atomics(), Rounding::Floor)
}

/// Returns whether `actual` delivers `expected` within `tolerance`
pub fn delivered_within(expected: Uint128, actual: Uint128, tolerance: Decimal) -> AppResult<bool> {
    Ok(actual >= min_delivery(expected, tolerance)?)
}
