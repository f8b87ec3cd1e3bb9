use cosmwasm_std::Response;

use crate::error::AppError;

/// The version of the vault engine
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
/// The id of the vault engine
pub const APP_ID: &str = "abstract:lst-vault";

/// Maximum number of LSTs the registry accepts
pub const MAX_LSTS: u8 = 16;

/// The type of the result returned by the engine's entry points.
pub type AppResult<T = Response> = Result<T, AppError>;
