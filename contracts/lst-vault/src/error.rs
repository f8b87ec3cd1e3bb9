use cosmwasm_std::{
    ConversionOverflowError, Decimal, DivideByZeroError, OverflowError, StdError, Uint128,
};
use cw_asset::AssetError;
use cw_controllers::AdminError;
use cw_utils::PaymentError;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum AppError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    Overflow(#[from] OverflowError),

    #[error("{0}")]
    DivideByZero(#[from] DivideByZeroError),

    #[error("{0}")]
    ConversionOverflow(#[from] ConversionOverflowError),

    #[error("{0}")]
    Asset(#[from] AssetError),

    #[error("{0}")]
    Admin(#[from] AdminError),

    #[error("{0}")]
    Payment(#[from] PaymentError),

    #[error("Amount must be greater than zero")]
    ZeroAmount {},

    #[error("Insufficient shares: owner holds {available}, withdrawal needs {required}")]
    InsufficientShares {
        required: Uint128,
        available: Uint128,
    },

    #[error("Withdrawal would burn {required} shares, above the allowed {max_shares_in}")]
    SharesSlippageExceeded {
        required: Uint128,
        max_shares_in: Uint128,
    },

    #[error("No combination of LSTs covers the shortfall of {shortfall}, best plan gathers {covered}")]
    PlanInfeasible {
        shortfall: Uint128,
        covered: Uint128,
    },

    #[error("Conversion of LST {lst_index} produced no {token}")]
    ConversionFailed { lst_index: u8, token: String },

    #[error("Swap on LST {lst_index} delivered {received}, expected {expected}")]
    SwapSlippageExceeded {
        lst_index: u8,
        expected: Uint128,
        received: Uint128,
    },

    #[error("Swap on LST {lst_index} reverted: {reason}")]
    SwapFailed { lst_index: u8, reason: String },

    #[error("Vault holds {available} base asset, cannot transfer {requested}")]
    InsufficientAssets {
        requested: Uint128,
        available: Uint128,
    },

    #[error("No LST registered at index {0}")]
    UnknownLst(u8),

    #[error("Invalid LST descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Decimal {0} must be strictly lower than one")]
    InvalidFraction(Decimal),
}
