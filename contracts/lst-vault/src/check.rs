use cosmwasm_std::Deps;

use crate::contract::AppResult;

pub trait Checkable {
    type CheckOutput;
    fn check(self, deps: Deps) -> AppResult<Self::CheckOutput>;
}

mod config {
    use cosmwasm_std::{ensure, Decimal, Deps};

    use crate::{
        contract::AppResult,
        error::AppError,
        state::{Config, ConfigUnchecked},
    };

    use super::Checkable;

    /// Fractions applied to amounts must leave something of the amount
    fn check_fraction(fraction: Decimal) -> AppResult<Decimal> {
        ensure!(fraction < Decimal::one(), AppError::InvalidFraction(fraction));
        Ok(fraction)
    }

    impl Checkable for ConfigUnchecked {
        type CheckOutput = Config;

        fn check(self, deps: Deps) -> AppResult<Config> {
            Ok(Config {
                base_asset: self.base_asset.check(deps.api, None)?,
                slippage_buffer: check_fraction(self.slippage_buffer)?,
                delivery_tolerance: check_fraction(self.delivery_tolerance)?,
                liquidation_order: self.liquidation_order,
            })
        }
    }
}

mod registry {
    use cosmwasm_std::{ensure, ensure_ne, Deps};
    use cw_asset::AssetInfo;

    use crate::{
        contract::{AppResult, MAX_LSTS},
        error::AppError,
        registry::{
            ConversionHandler, ConversionHandlerUnchecked, LstDescriptor, LstDescriptorUnchecked,
            Route, RouteUnchecked,
        },
    };

    impl ConversionHandlerUnchecked {
        pub fn check(self, deps: Deps) -> AppResult<ConversionHandler> {
            Ok(match self {
                ConversionHandlerUnchecked::WrapPair { contract } => ConversionHandler::WrapPair {
                    contract: deps.api.addr_validate(&contract)?,
                },
                ConversionHandlerUnchecked::Vault { contract } => ConversionHandler::Vault {
                    contract: deps.api.addr_validate(&contract)?,
                },
                ConversionHandlerUnchecked::Native { rate_provider } => ConversionHandler::Native {
                    rate_provider: deps.api.addr_validate(&rate_provider)?,
                },
            })
        }
    }

    impl LstDescriptorUnchecked {
        /// Descriptors only make sense against the vault's base asset
        pub fn check(self, deps: Deps, base_asset: &AssetInfo) -> AppResult<LstDescriptor> {
            let asset = self.asset.check(deps.api, None)?;
            let wrapped = self.wrapped.check(deps.api, None)?;
            let conversion = self.conversion.check(deps)?;

            if conversion.is_native() {
                ensure!(
                    asset == wrapped,
                    AppError::InvalidDescriptor(format!(
                        "native LST {asset} cannot trade as {wrapped}"
                    ))
                );
            } else {
                ensure_ne!(
                    asset,
                    wrapped,
                    AppError::InvalidDescriptor(format!("{asset} cannot wrap into itself"))
                );
            }
            ensure!(
                &asset != base_asset && &wrapped != base_asset,
                AppError::InvalidDescriptor(format!("{base_asset} is the base asset"))
            );

            let route = match self.route {
                RouteUnchecked::Direct { pool } => Route::Direct { pool },
                RouteUnchecked::Bridged {
                    bridge_asset,
                    pool_a,
                    pool_b,
                } => {
                    let bridge_asset = bridge_asset.check(deps.api, None)?;
                    ensure!(
                        bridge_asset != wrapped && &bridge_asset != base_asset,
                        AppError::InvalidDescriptor(format!(
                            "bridge asset {bridge_asset} must differ from both ends of the route"
                        ))
                    );
                    ensure_ne!(
                        pool_a,
                        pool_b,
                        AppError::InvalidDescriptor(format!("both hops go through pool {pool_a}"))
                    );
                    Route::Bridged {
                        bridge_asset,
                        pool_a,
                        pool_b,
                    }
                }
            };

            Ok(LstDescriptor {
                asset,
                wrapped,
                route,
                conversion,
                min_touch_threshold: self.min_touch_threshold,
                priority_weight: self.priority_weight,
            })
        }
    }

    /// Tokens of `lst` must not back any other registered LST, or the oracle counts them twice
    pub(crate) fn check_distinct<'a>(
        index: u8,
        lst: &LstDescriptor,
        registered: impl IntoIterator<Item = (u8, &'a LstDescriptor)>,
    ) -> AppResult<()> {
        for (other_index, other) in registered {
            if other_index == index {
                continue;
            }
            let shared = [&lst.asset, &lst.wrapped]
                .into_iter()
                .find(|token| **token == other.asset || **token == other.wrapped);
            if let Some(token) = shared {
                return Err(AppError::InvalidDescriptor(format!(
                    "{token} already backs LST {other_index}"
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn check_index(index: u8) -> AppResult<u8> {
        ensure!(
            index < MAX_LSTS,
            AppError::InvalidConfig(format!("LST index {index} above the {MAX_LSTS} LST limit"))
        );
        Ok(index)
    }
}

pub(crate) use registry::{check_distinct, check_index};
