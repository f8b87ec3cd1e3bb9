use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, StdError, StdResult, Uint128};

use crate::{
    contract::AppResult,
    host::{Chain, RateQuery},
    registry::{ConversionHandler, LstDescriptor, TokenRegistry},
};

/// One whole token at 18 decimals, the amount a rate is sanity checked on
const RATE_UNIT: Uint128 = Uint128::new(1_000_000_000_000_000_000);

/// Holdings of one LST, recomputed on every read
#[cw_serde]
pub struct LstPosition {
    pub lst_index: u8,
    pub raw_balance: Uint128,
    pub wrapped_balance: Uint128,
    /// Raw balance plus the base value of the wrapped balance
    pub value_in_base: Uint128,
    /// Wrapped balance plus what the raw balance would wrap into
    pub swappable_wrapped: Uint128,
    /// False when the rate accessor failed, the position then counts for nothing
    pub priced: bool,
}

/// Reduces the vault's LST holdings to base asset value.
/// Pure reads: nothing here mutates the chain.
pub struct BalanceOracle<'a, C: ?Sized> {
    registry: &'a TokenRegistry,
    chain: &'a C,
    vault: &'a Addr,
}

impl<'a, C: Chain + ?Sized> BalanceOracle<'a, C> {
    pub fn new(registry: &'a TokenRegistry, chain: &'a C, vault: &'a Addr) -> Self {
        Self {
            registry,
            chain,
            vault,
        }
    }

    /// Base asset immediately available for payouts
    pub fn liquid_balance(&self) -> AppResult<Uint128> {
        Ok(self.chain.balance(self.registry.base_asset(), self.vault)?)
    }

    pub fn value_of(&self, lst_index: u8) -> AppResult<LstPosition> {
        let lst = self.registry.get(lst_index)?;
        let raw_balance = self.chain.balance(&lst.asset, self.vault)?;
        // Native LSTs trade as is, a single balance backs both views
        let wrapped_balance = if lst.conversion.is_native() {
            raw_balance
        } else {
            self.chain.balance(&lst.wrapped, self.vault)?
        };

        let priced = self
            .price(lst, raw_balance, wrapped_balance)
            .map_err(|e| e.to_string())
            .and_then(|valuation| valuation.ok_or_else(|| "implausible zero rate".to_string()));

        let position = match priced {
            Ok((value_in_base, swappable_wrapped)) => LstPosition {
                lst_index,
                raw_balance,
                wrapped_balance,
                value_in_base,
                swappable_wrapped,
                priced: true,
            },
            Err(reason) => {
                log::warn!("excluding LST {lst_index} from valuation: {reason}");
                LstPosition {
                    lst_index,
                    raw_balance,
                    wrapped_balance,
                    value_in_base: Uint128::zero(),
                    swappable_wrapped: Uint128::zero(),
                    priced: false,
                }
            }
        };
        Ok(position)
    }

    /// All registered positions by ascending index
    pub fn positions(&self) -> AppResult<Vec<LstPosition>> {
        self.registry
            .iter()
            .map(|(index, _)| self.value_of(index))
            .collect()
    }

    /// Liquid balance plus the value of every priced position
    pub fn total_assets(&self) -> AppResult<Uint128> {
        self.positions()?
            .iter()
            .try_fold(self.liquid_balance()?, |total, position| {
                Ok(total.checked_add(position.value_in_base)?)
            })
    }

    /// Returns `(value_in_base, swappable_wrapped)`, or `None` when a rate
    /// accessor prices a whole unit at zero.
    fn price(
        &self,
        lst: &LstDescriptor,
        raw_balance: Uint128,
        wrapped_balance: Uint128,
    ) -> StdResult<Option<(Uint128, Uint128)>> {
        let query = |q: RateQuery, amount: Uint128| -> StdResult<Option<Uint128>> {
            if amount.is_zero() {
                return Ok(Some(Uint128::zero()));
            }
            let converted = self.chain.query_rate(lst.conversion.contract(), &q)?;
            if !converted.is_zero() {
                return Ok(Some(converted));
            }
            // Dust rounds down to nothing, a whole unit must not
            if amount >= RATE_UNIT {
                return Ok(None);
            }
            let per_unit = self
                .chain
                .query_rate(lst.conversion.contract(), &q.with_amount(RATE_UNIT))?;
            Ok((!per_unit.is_zero()).then_some(Uint128::zero()))
        };

        let valuation = match &lst.conversion {
            ConversionHandler::WrapPair { .. } => query(
                RateQuery::UnderlyingPerWrapped {
                    amount: wrapped_balance,
                },
                wrapped_balance,
            )?
            .zip(query(
                RateQuery::WrappedPerUnderlying {
                    amount: raw_balance,
                },
                raw_balance,
            )?),
            ConversionHandler::Vault { .. } => query(
                RateQuery::ConvertToAssets {
                    shares: wrapped_balance,
                },
                wrapped_balance,
            )?
            .zip(query(
                RateQuery::ConvertToShares {
                    assets: raw_balance,
                },
                raw_balance,
            )?),
            ConversionHandler::Native { .. } => {
                return Ok(query(RateQuery::BaseValue { amount: raw_balance }, raw_balance)?
                    .map(|value| (value, wrapped_balance)));
            }
        };

        // Raw tokens of the wrap families are redeemable one to one for base
        valuation
            .map(|(wrapped_value, raw_as_wrapped)| {
                Ok::<_, StdError>((
                    raw_balance.checked_add(wrapped_value)?,
                    wrapped_balance.checked_add(raw_as_wrapped)?,
                ))
            })
            .transpose()
    }
}
