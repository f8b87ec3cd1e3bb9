use cosmwasm_schema::cw_serde;
use cosmwasm_std::Decimal;
use cw_asset::{AssetInfo, AssetInfoUnchecked};
use cw_controllers::Admin;
use cw_storage_plus::{Item, Map};

use crate::registry::LstDescriptor;

pub const CONFIG: Item<Config> = Item::new("config");
/// LST descriptors keyed by their registry index
pub const LSTS: Map<u8, LstDescriptor> = Map::new("lsts");
pub const ADMIN: Admin = Admin::new("admin");

/// Added on top of every exact-output quote to absorb price movement until execution
pub const DEFAULT_SLIPPAGE_BUFFER: Decimal = Decimal::percent(2);
/// Accepted under-delivery of a swap step before it counts as slipped
pub const DEFAULT_DELIVERY_TOLERANCE: Decimal = Decimal::permille(1);

#[cw_serde]
pub struct Config {
    /// Asset deposited by users and paid out on withdrawal
    pub base_asset: AssetInfo,
    pub slippage_buffer: Decimal,
    pub delivery_tolerance: Decimal,
    pub liquidation_order: LiquidationOrder,
}

#[cw_serde]
pub struct ConfigUnchecked {
    pub base_asset: AssetInfoUnchecked,
    pub slippage_buffer: Decimal,
    pub delivery_tolerance: Decimal,
    pub liquidation_order: LiquidationOrder,
}

impl From<Config> for ConfigUnchecked {
    fn from(value: Config) -> Self {
        Self {
            base_asset: value.base_asset.into(),
            slippage_buffer: value.slippage_buffer,
            delivery_tolerance: value.delivery_tolerance,
            liquidation_order: value.liquidation_order,
        }
    }
}

/// Order in which LST positions are unwound to cover a shortfall.
/// Ties on `priority_weight` are always broken by ascending index.
#[cw_serde]
#[derive(Copy, Default)]
pub enum LiquidationOrder {
    /// Sell the lowest-yield positions first, preserving the vault's weighted yield
    #[default]
    LowestWeightFirst,
    HighestWeightFirst,
}
