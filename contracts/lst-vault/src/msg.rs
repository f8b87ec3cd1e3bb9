use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Addr, Decimal, Uint128};
use cw_asset::AssetInfoUnchecked;

use crate::{
    distribution::withdraw::WithdrawalPlan,
    oracle::LstPosition,
    registry::{LstDescriptor, LstDescriptorUnchecked},
    state::{Config, LiquidationOrder},
};

/// App instantiate message
#[cw_serde]
pub struct AppInstantiateMsg {
    /// Defaults to the instantiator
    pub admin: Option<String>,
    /// Asset users deposit and withdraw
    pub base_asset: AssetInfoUnchecked,
    pub slippage_buffer: Option<Decimal>,
    pub delivery_tolerance: Option<Decimal>,
    pub liquidation_order: Option<LiquidationOrder>,
    /// Supported LSTs, registered under their position in this list
    pub lsts: Vec<LstDescriptorUnchecked>,
}

/// App execute messages
#[cw_serde]
pub enum AppExecuteMsg {
    /// Withdraw `amount` base asset against the sender's shares.
    /// LST positions are sold as needed when the liquid balance is short.
    Withdraw {
        amount: Uint128,
        /// Defaults to the sender
        receiver: Option<String>,
        /// Fail instead of burning more shares than this
        max_shares_in: Option<Uint128>,
    },
    /// Admin only
    UpdateConfig {
        slippage_buffer: Option<Decimal>,
        delivery_tolerance: Option<Decimal>,
        liquidation_order: Option<LiquidationOrder>,
    },
    /// Registers or replaces the LST at `index`. Admin only
    SetLst {
        index: u8,
        descriptor: LstDescriptorUnchecked,
    },
    /// Admin only
    RemoveLst { index: u8 },
    /// Admin only, `None` renounces
    UpdateAdmin { admin: Option<String> },
}

/// App query messages
#[cw_serde]
#[derive(QueryResponses)]
pub enum AppQueryMsg {
    #[returns(ConfigResponse)]
    Config {},
    /// Registered LSTs by ascending index
    #[returns(LstsResponse)]
    Lsts {},
    /// Current valuation of every LST position
    #[returns(PositionsResponse)]
    Positions {},
    #[returns(TotalAssetsResponse)]
    TotalAssets {},
    /// Plan and shares a withdrawal of `amount` would use right now
    #[returns(PreviewWithdrawResponse)]
    PreviewWithdraw { amount: Uint128 },
    #[returns(MaxWithdrawResponse)]
    MaxWithdraw { owner: String },
}

#[cw_serde]
pub struct ConfigResponse {
    pub config: Config,
    pub admin: Option<Addr>,
}

#[cw_serde]
pub struct LstEntry {
    pub index: u8,
    pub descriptor: LstDescriptor,
}

#[cw_serde]
pub struct LstsResponse {
    pub lsts: Vec<LstEntry>,
    /// Indexes in the order they are unwound
    pub liquidation_order: Vec<u8>,
}

#[cw_serde]
pub struct PositionsResponse {
    pub liquid_balance: Uint128,
    pub positions: Vec<LstPosition>,
    pub total_assets: Uint128,
}

#[cw_serde]
pub struct TotalAssetsResponse {
    pub total_assets: Uint128,
    pub total_shares: Uint128,
}

#[cw_serde]
pub struct PreviewWithdrawResponse {
    pub shares: Uint128,
    pub plan: WithdrawalPlan,
    /// Whether the plan covers its shortfall
    pub feasible: bool,
}

#[cw_serde]
pub struct MaxWithdrawResponse {
    pub max_assets: Uint128,
}
