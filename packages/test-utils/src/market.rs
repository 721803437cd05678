//! # Market Harness
//!
//! Plays the host: routes trades through the auction hooks and the
//! [`InMemoryPool`], and makes every call all-or-nothing across both by
//! snapshotting them before the call.

use doppler_core::{
    AccountId, Auction, AuctionConfig, AuctionError, BalanceDelta, Currency, MigrationOutcome,
    ModifyLiquidityParams, PoolError, PoolKey, PoolManager, SwapParams, TokenAmounts,
};
use thiserror::Error;
use tracing::debug;

use crate::constants::{HOOK, TOKEN0, TOKEN1};
use crate::pool::InMemoryPool;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HarnessError {
    #[error(transparent)]
    Auction(#[from] AuctionError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

pub type HarnessResult<T> = Result<T, HarnessError>;

/// An auction, its pool and a clock
#[derive(Debug, Clone)]
pub struct Market {
    pub pool: InMemoryPool,
    pub auction: Auction,
    pub now: u64,
}

impl Market {
    /// Build a market with the pool opened at the auction's starting tick
    pub fn new(config: AuctionConfig, tick_spacing: i32) -> HarnessResult<Self> {
        let starting_tick = config.starting_tick;
        Self::with_initial_tick(config, tick_spacing, starting_tick)
    }

    /// Build a market with the pool opened at `tick`; the auction is bound
    /// at the starting time
    pub fn with_initial_tick(
        config: AuctionConfig,
        tick_spacing: i32,
        tick: i32,
    ) -> HarnessResult<Self> {
        let hook = AccountId::new(HOOK);
        let key = pool_key(tick_spacing);
        let supply = config.num_tokens_to_sell;
        let asset = if config.is_token0 {
            TokenAmounts::new(supply, 0)
        } else {
            TokenAmounts::new(0, supply)
        };
        let now = config.starting_time;

        let mut pool = InMemoryPool::new(key.clone(), hook.clone(), tick)?;
        pool.mint(&hook, asset);
        let mut auction = Auction::new(config, hook)?;
        auction.initialize(&mut pool, key, now)?;

        Ok(Self { pool, auction, now })
    }

    pub fn config(&self) -> &AuctionConfig {
        self.auction.config()
    }

    pub fn warp(&mut self, timestamp: u64) {
        self.now = timestamp;
    }

    pub fn advance(&mut self, seconds: u64) {
        self.now += seconds;
    }

    pub fn tick(&self) -> i32 {
        self.pool.slot0().tick
    }

    /// Give `account` tokens of both kinds
    pub fn fund(&mut self, account: &AccountId, amount0: u128, amount1: u128) {
        self.pool.mint(account, TokenAmounts::new(amount0, amount1));
    }

    /// Run one trade through both hooks
    pub fn swap(&mut self, trader: &AccountId, params: SwapParams) -> HarnessResult<BalanceDelta> {
        let now = self.now;
        self.transact(|market| {
            let fee = market.auction.before_swap(&mut market.pool, &params, now)?;
            market.pool.set_lp_fee(fee);
            let outcome = market.pool.swap(trader, &params, fee)?;
            market.auction.after_swap(&market.pool, outcome.delta, now)?;
            Ok(outcome.delta)
        })
    }

    /// Spend `numeraire_in` on the asset
    pub fn buy(&mut self, trader: &AccountId, numeraire_in: u128) -> HarnessResult<BalanceDelta> {
        let params = SwapParams::exact_input(!self.config().is_token0, numeraire_in);
        self.swap(trader, params)
    }

    /// Buy exactly `asset_out` of the asset
    pub fn buy_exact_out(
        &mut self,
        trader: &AccountId,
        asset_out: u128,
    ) -> HarnessResult<BalanceDelta> {
        let params = SwapParams::exact_output(!self.config().is_token0, asset_out);
        self.swap(trader, params)
    }

    /// Sell `asset_in` of the asset back
    pub fn sell(&mut self, trader: &AccountId, asset_in: u128) -> HarnessResult<BalanceDelta> {
        let params = SwapParams::exact_input(self.config().is_token0, asset_in);
        self.swap(trader, params)
    }

    /// Third-party liquidity provision, gated by the auction
    pub fn add_liquidity(
        &mut self,
        sender: &AccountId,
        params: ModifyLiquidityParams,
    ) -> HarnessResult<BalanceDelta> {
        self.transact(|market| {
            market.auction.before_add_liquidity(sender)?;
            let (delta, _) = market.pool.modify_liquidity(params)?;
            Ok(delta)
        })
    }

    pub fn migrate(
        &mut self,
        caller: &AccountId,
        recipient: &AccountId,
    ) -> HarnessResult<MigrationOutcome> {
        let now = self.now;
        self.transact(|market| {
            Ok(market
                .auction
                .migrate(&mut market.pool, caller, recipient, now)?)
        })
    }

    /// Asset amount in a trader-side delta
    pub fn asset_delta(&self, delta: BalanceDelta) -> i128 {
        if self.config().is_token0 {
            delta.amount0
        } else {
            delta.amount1
        }
    }

    /// Numeraire amount in a trader-side delta
    pub fn numeraire_delta(&self, delta: BalanceDelta) -> i128 {
        if self.config().is_token0 {
            delta.amount1
        } else {
            delta.amount0
        }
    }

    fn transact<T>(
        &mut self,
        operation: impl FnOnce(&mut Self) -> HarnessResult<T>,
    ) -> HarnessResult<T> {
        let pool = self.pool.clone();
        let auction = self.auction.clone();
        let result = operation(self);
        if let Err(error) = &result {
            debug!(%error, "call reverted");
            self.pool = pool;
            self.auction = auction;
        }
        result
    }
}

/// Key of the harness pool
pub fn pool_key(tick_spacing: i32) -> PoolKey {
    PoolKey {
        currency0: Currency::new(TOKEN0),
        currency1: Currency::new(TOKEN1),
        tick_spacing,
    }
}
