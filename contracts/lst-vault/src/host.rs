//! Boundary with everything the engine talks to but does not own:
//! token balances, LST conversion handlers, the swap venue and the share ledger.
//!
//! Return values coming back through these traits are never trusted on their own.
//! Callers re-read balances after every mutating call.

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Binary, Int128, StdResult, Timestamp, Uint128};
use cw_asset::AssetInfo;

use crate::registry::PoolId;

#[cw_serde]
#[derive(Copy)]
pub enum SwapKind {
    /// `amount` of the first step is the exact input
    GivenIn,
    /// `amount` of the first step is the exact output, steps are listed from the output backwards
    GivenOut,
}

/// One hop of a batch swap. `amount` zero means "use the previous hop's result".
#[cw_serde]
pub struct BatchSwapStep {
    pub pool_id: PoolId,
    pub asset_in_index: usize,
    pub asset_out_index: usize,
    pub amount: Uint128,
    pub user_data: Binary,
}

#[cw_serde]
pub struct FundManagement {
    pub sender: Addr,
    pub from_internal_balance: bool,
    pub recipient: Addr,
    pub to_internal_balance: bool,
}

impl FundManagement {
    /// Vault pays and receives on its own external balances
    pub fn external(vault: &Addr) -> Self {
        Self {
            sender: vault.clone(),
            from_internal_balance: false,
            recipient: vault.clone(),
            to_internal_balance: false,
        }
    }
}

/// Read-only rate accessors exposed by the conversion handler families
#[cw_serde]
pub enum RateQuery {
    /// Raw tokens released by `amount` wrapped tokens (wrap pair)
    UnderlyingPerWrapped { amount: Uint128 },
    /// Wrapped tokens minted for `amount` raw tokens (wrap pair)
    WrappedPerUnderlying { amount: Uint128 },
    /// Underlying assets backing `shares` vault shares
    ConvertToAssets { shares: Uint128 },
    /// Vault shares minted for `assets` underlying
    ConvertToShares { assets: Uint128 },
    /// Base asset value of `amount` native LST
    BaseValue { amount: Uint128 },
}

impl RateQuery {
    /// The same conversion asked for another amount
    pub fn with_amount(&self, amount: Uint128) -> Self {
        match self {
            RateQuery::UnderlyingPerWrapped { .. } => RateQuery::UnderlyingPerWrapped { amount },
            RateQuery::WrappedPerUnderlying { .. } => RateQuery::WrappedPerUnderlying { amount },
            RateQuery::ConvertToAssets { .. } => RateQuery::ConvertToAssets { shares: amount },
            RateQuery::ConvertToShares { .. } => RateQuery::ConvertToShares { assets: amount },
            RateQuery::BaseValue { .. } => RateQuery::BaseValue { amount },
        }
    }
}

/// Mutating entry points of the conversion handler families
#[cw_serde]
pub enum ConversionMsg {
    /// Wrap `amount` raw tokens held by the sender
    Wrap { amount: Uint128 },
    /// Deposit `assets` raw tokens into the vault for shares
    Deposit { assets: Uint128 },
}

/// Token, conversion and venue access of the vault's host chain
pub trait Chain {
    fn balance(&self, asset: &AssetInfo, holder: &Addr) -> StdResult<Uint128>;

    fn transfer(
        &mut self,
        asset: &AssetInfo,
        from: &Addr,
        to: &Addr,
        amount: Uint128,
    ) -> StdResult<()>;

    fn query_rate(&self, contract: &Addr, query: &RateQuery) -> StdResult<Uint128>;

    /// Returns whatever the handler reports, which may not match what it actually did
    fn execute_conversion(
        &mut self,
        contract: &Addr,
        sender: &Addr,
        msg: &ConversionMsg,
    ) -> StdResult<Uint128>;

    /// Simulates a batch swap. Deltas are signed per asset: positive paid in, negative received.
    fn query_batch_swap(
        &self,
        kind: SwapKind,
        swaps: &[BatchSwapStep],
        assets: &[AssetInfo],
        funds: &FundManagement,
    ) -> StdResult<Vec<Int128>>;

    /// Executes a batch swap. Reverts if any delta exceeds its limit or the deadline passed.
    fn batch_swap(
        &mut self,
        kind: SwapKind,
        swaps: &[BatchSwapStep],
        assets: &[AssetInfo],
        funds: &FundManagement,
        limits: &[Int128],
        deadline: Timestamp,
    ) -> StdResult<Vec<Int128>>;
}

/// Share bookkeeping of the vault
pub trait VaultLedger {
    fn total_shares(&self) -> Uint128;

    fn shares_of(&self, owner: &Addr) -> Uint128;

    fn burn(&mut self, owner: &Addr, shares: Uint128) -> StdResult<()>;

    /// Virtual share offset exponent protecting against donation attacks
    fn decimals_offset(&self) -> u8 {
        0
    }
}

/// All-or-nothing execution. A withdrawal checkpoints before its first mutation
/// and reverts to it on any failure.
pub trait Transactional {
    type Checkpoint;

    fn checkpoint(&self) -> Self::Checkpoint;

    fn revert_to(&mut self, checkpoint: Self::Checkpoint);
}

pub trait Host: Chain + VaultLedger + Transactional {}

impl<T: Chain + VaultLedger + Transactional> Host for T {}
