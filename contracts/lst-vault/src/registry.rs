use std::collections::BTreeMap;
use std::fmt;

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Decimal, Order, StdError, StdResult, Storage, Uint128};
use cw_asset::{AssetInfo, AssetInfoUnchecked};

use crate::{
    contract::AppResult,
    error::AppError,
    state::{Config, LiquidationOrder, CONFIG, LSTS},
};

/// Opaque 32-byte pool identifier, as encoded by the swap venue
#[cw_serde]
#[derive(Copy, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(pub [u8; 32]);

impl PoolId {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> StdResult<Self> {
        let id: [u8; 32] = bytes.try_into().map_err(|_| {
            StdError::generic_err(format!("pool id must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(id))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        self.0.iter().try_for_each(|b| write!(f, "{b:02x}"))
    }
}

/// How a wrapped LST reaches the base asset on the venue
#[cw_serde]
pub enum Route {
    /// wrapped -> base in a single pool
    Direct { pool: PoolId },
    /// wrapped -> bridge_asset in `pool_a`, then bridge_asset -> base in `pool_b`
    Bridged {
        bridge_asset: AssetInfo,
        pool_a: PoolId,
        pool_b: PoolId,
    },
}

#[cw_serde]
pub enum RouteUnchecked {
    Direct {
        pool: PoolId,
    },
    Bridged {
        bridge_asset: AssetInfoUnchecked,
        pool_a: PoolId,
        pool_b: PoolId,
    },
}

/// Family-specific contract converting between `asset` and `wrapped`.
/// Each family exposes a different rate accessor and wrap entry point.
#[cw_serde]
pub enum ConversionHandler {
    /// Rebasing token wrapped into a non-rebasing one (wstETH style)
    WrapPair { contract: Addr },
    /// Tokenized vault whose shares are the wrapped form (ERC-4626 style)
    Vault { contract: Addr },
    /// Token traded as is, valued through its own rate provider (rETH style)
    Native { rate_provider: Addr },
}

#[cw_serde]
pub enum ConversionHandlerUnchecked {
    WrapPair { contract: String },
    Vault { contract: String },
    Native { rate_provider: String },
}

impl ConversionHandler {
    pub fn contract(&self) -> &Addr {
        match self {
            ConversionHandler::WrapPair { contract } | ConversionHandler::Vault { contract } => {
                contract
            }
            ConversionHandler::Native { rate_provider } => rate_provider,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, ConversionHandler::Native { .. })
    }
}

/// Static description of one supported LST
#[cw_serde]
pub struct LstDescriptor {
    /// Raw liquid staking token
    pub asset: AssetInfo,
    /// Token actually traded on the venue, equal to `asset` for native LSTs
    pub wrapped: AssetInfo,
    pub route: Route,
    pub conversion: ConversionHandler,
    /// Positions with less swappable wrapped balance are never touched
    pub min_touch_threshold: Uint128,
    /// Yield weight, drives the liquidation order
    pub priority_weight: Decimal,
}

#[cw_serde]
pub struct LstDescriptorUnchecked {
    pub asset: AssetInfoUnchecked,
    pub wrapped: AssetInfoUnchecked,
    pub route: RouteUnchecked,
    pub conversion: ConversionHandlerUnchecked,
    pub min_touch_threshold: Uint128,
    pub priority_weight: Decimal,
}

impl From<LstDescriptor> for LstDescriptorUnchecked {
    fn from(value: LstDescriptor) -> Self {
        Self {
            asset: value.asset.into(),
            wrapped: value.wrapped.into(),
            route: match value.route {
                Route::Direct { pool } => RouteUnchecked::Direct { pool },
                Route::Bridged {
                    bridge_asset,
                    pool_a,
                    pool_b,
                } => RouteUnchecked::Bridged {
                    bridge_asset: bridge_asset.into(),
                    pool_a,
                    pool_b,
                },
            },
            conversion: match value.conversion {
                ConversionHandler::WrapPair { contract } => ConversionHandlerUnchecked::WrapPair {
                    contract: contract.into_string(),
                },
                ConversionHandler::Vault { contract } => ConversionHandlerUnchecked::Vault {
                    contract: contract.into_string(),
                },
                ConversionHandler::Native { rate_provider } => {
                    ConversionHandlerUnchecked::Native {
                        rate_provider: rate_provider.into_string(),
                    }
                }
            },
            min_touch_threshold: value.min_touch_threshold,
            priority_weight: value.priority_weight,
        }
    }
}

/// Configuration table handed to the oracle, router and planner.
/// Loaded once per call, nothing below it reads storage.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenRegistry {
    config: Config,
    lsts: BTreeMap<u8, LstDescriptor>,
}

impl TokenRegistry {
    pub fn new(config: Config, lsts: impl IntoIterator<Item = (u8, LstDescriptor)>) -> Self {
        Self {
            config,
            lsts: lsts.into_iter().collect(),
        }
    }

    pub fn load(storage: &dyn Storage) -> AppResult<Self> {
        let config = CONFIG.load(storage)?;
        let lsts = LSTS
            .range(storage, None, None, Order::Ascending)
            .collect::<StdResult<Vec<_>>>()?;
        Ok(Self::new(config, lsts))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn base_asset(&self) -> &AssetInfo {
        &self.config.base_asset
    }

    pub fn get(&self, lst_index: u8) -> AppResult<&LstDescriptor> {
        self.lsts
            .get(&lst_index)
            .ok_or(AppError::UnknownLst(lst_index))
    }

    pub fn len(&self) -> usize {
        self.lsts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lsts.is_empty()
    }

    /// Descriptors by ascending index
    pub fn iter(&self) -> impl Iterator<Item = (u8, &LstDescriptor)> {
        self.lsts.iter().map(|(index, lst)| (*index, lst))
    }

    /// Indexes in the order they should be unwound.
    /// Total order: weight in the configured direction, then ascending index.
    pub fn liquidation_order(&self) -> Vec<u8> {
        let mut order: Vec<(Decimal, u8)> = self
            .iter()
            .map(|(index, lst)| (lst.priority_weight, index))
            .collect();
        match self.config.liquidation_order {
            LiquidationOrder::LowestWeightFirst => order.sort(),
            LiquidationOrder::HighestWeightFirst => {
                order.sort_by(|(wa, ia), (wb, ib)| wb.cmp(wa).then(ia.cmp(ib)))
            }
        }
        order.into_iter().map(|(_, index)| index).collect()
    }
}
