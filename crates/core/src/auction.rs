//! # Auction State Machine
//!
//! [`Auction`] owns one auction's configuration, running totals, slug book
//! and reserves, and exposes the hooks a pool invokes around trades:
//!
//! 1. **initialize** - bind to a pool once and place the first slug set
//! 2. **before_swap** - gate trading by phase and time; rebalance on the
//!    first trade of each epoch; enter refund mode at an underfunded maturity
//! 3. **after_swap** - guard the lower slug and account sales and proceeds
//! 4. **migrate** - release all liquidity to the migrator's recipient
//!
//! Every public operation is all-or-nothing over engine state: on error the
//! engine is restored to its state before the call. Pool-side effects of a
//! failed call are the host's to roll back.

use doppler_math::{
    abs_i128, amount_less_fee, calculate_swap_fee, get_sqrt_price_at_tick, safe_add_u128,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::accumulator::{accumulator_delta, settle_curve, Drift};
use crate::adapter::{clear_slugs, install_slugs, reposition_price};
use crate::config::AuctionConfig;
use crate::constants::MAX_TICK_SPACING;
use crate::error::{AuctionError, AuctionResult};
use crate::events::AuctionEvent;
use crate::phase::AuctionPhase;
use crate::pool::{AccountId, BalanceDelta, Currency, PoolKey, PoolManager, SwapParams};
use crate::position::PositionBook;
use crate::slugs::{compute_refund_slug, compute_slugs, SlugInputs};
use crate::state::{AuctionState, TokenAmounts};

/// Final settlement reported by [`Auction::migrate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationOutcome {
    pub sqrt_price_x64: u128,
    pub token0: Currency,
    /// Fees swept from slugs over the auction's life
    pub fees0: u128,
    /// Amount paid to the recipient
    pub balance0: u128,
    pub token1: Currency,
    pub fees1: u128,
    pub balance1: u128,
}

/// One Dutch auction attached to one pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auction {
    config: AuctionConfig,
    /// The engine's own account in the pool
    hook: AccountId,
    pool_key: Option<PoolKey>,
    state: AuctionState,
    positions: PositionBook,
    phase: AuctionPhase,
    /// Tokens held in the pool outside of slugs
    reserves: TokenAmounts,
    #[serde(skip)]
    events: Vec<AuctionEvent>,
}

impl Auction {
    /// Create an auction; the configuration is validated here and only here
    pub fn new(config: AuctionConfig, hook: AccountId) -> AuctionResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            hook,
            pool_key: None,
            state: AuctionState::default(),
            positions: PositionBook::default(),
            phase: AuctionPhase::Uninitialized,
            reserves: TokenAmounts::default(),
            events: Vec::new(),
        })
    }

    pub fn config(&self) -> &AuctionConfig {
        &self.config
    }

    pub fn hook(&self) -> &AccountId {
        &self.hook
    }

    pub fn pool_key(&self) -> Option<&PoolKey> {
        self.pool_key.as_ref()
    }

    pub fn state(&self) -> &AuctionState {
        &self.state
    }

    pub fn positions(&self) -> &PositionBook {
        &self.positions
    }

    pub fn phase(&self) -> AuctionPhase {
        self.phase
    }

    pub fn reserves(&self) -> TokenAmounts {
        self.reserves
    }

    /// Notifications recorded since the last drain
    pub fn events(&self) -> &[AuctionEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<AuctionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Currency being sold
    pub fn asset_currency(&self) -> Option<&Currency> {
        self.pool_key.as_ref().map(|key| {
            if self.config.is_token0 {
                &key.currency0
            } else {
                &key.currency1
            }
        })
    }

    // ========================================================================
    // Pool Hooks
    // ========================================================================

    /// Bind to `key`, deposit the supply and place the initial slugs
    ///
    /// The supply must already sit in the hook account; it is settled into
    /// the pool here.
    pub fn initialize<P: PoolManager>(
        &mut self,
        pool: &mut P,
        key: PoolKey,
        now: u64,
    ) -> AuctionResult<()> {
        self.transact(|auction| auction.initialize_inner(pool, key, now))
    }

    /// Only the engine may provide liquidity to its pool
    pub fn before_add_liquidity(&self, sender: &AccountId) -> AuctionResult<()> {
        if sender != &self.hook {
            return Err(AuctionError::CannotAddLiquidity);
        }
        Ok(())
    }

    /// Pre-trade hook; returns the LP fee to charge on this trade
    pub fn before_swap<P: PoolManager>(
        &mut self,
        pool: &mut P,
        params: &SwapParams,
        now: u64,
    ) -> AuctionResult<u32> {
        self.transact(|auction| auction.before_swap_inner(pool, params, now))
    }

    /// Post-trade hook; `delta` is the trader's realized balance change
    pub fn after_swap<P: PoolManager>(
        &mut self,
        pool: &P,
        delta: BalanceDelta,
        now: u64,
    ) -> AuctionResult<()> {
        self.transact(|auction| auction.after_swap_inner(pool, delta, now))
    }

    /// Release every slug and all reserves to `recipient`
    pub fn migrate<P: PoolManager>(
        &mut self,
        pool: &mut P,
        caller: &AccountId,
        recipient: &AccountId,
        now: u64,
    ) -> AuctionResult<MigrationOutcome> {
        self.transact(|auction| auction.migrate_inner(pool, caller, recipient, now))
    }

    // ========================================================================
    // Operations
    // ========================================================================

    fn initialize_inner<P: PoolManager>(
        &mut self,
        pool: &mut P,
        key: PoolKey,
        now: u64,
    ) -> AuctionResult<()> {
        if self.phase.is_initialized() {
            return Err(AuctionError::AlreadyInitialized);
        }
        let spacing = key.tick_spacing;
        if !(1..=MAX_TICK_SPACING).contains(&spacing) {
            return Err(AuctionError::InvalidTickSpacing(spacing));
        }
        if self.config.gamma % spacing != 0 {
            return Err(AuctionError::GammaNotMultipleOfSpacing {
                gamma: self.config.gamma,
                tick_spacing: spacing,
            });
        }

        self.pool_key = Some(key);
        let asset = self.asset_currency().cloned().ok_or(AuctionError::NotInitialized)?;
        pool.settle(&asset, self.config.num_tokens_to_sell)?;
        self.reserves
            .credit_asset(self.config.is_token0, self.config.num_tokens_to_sell)?;

        let slot0 = pool.slot0();
        let drift = settle_curve(&self.config, 0, 0, spacing, slot0.tick)?;
        self.place_slugs(pool, &drift, now)?;

        let epoch = self.config.current_epoch(now);
        self.state.last_epoch = epoch;
        self.phase.transition(AuctionPhase::Active)?;

        info!(epoch, tick = slot0.tick, reference = drift.reference_tick, "auction initialized");
        self.events.push(AuctionEvent::Initialized {
            timestamp: now,
            epoch,
            tick: drift.reference_tick,
        });
        Ok(())
    }

    fn before_swap_inner<P: PoolManager>(
        &mut self,
        pool: &mut P,
        params: &SwapParams,
        now: u64,
    ) -> AuctionResult<u32> {
        match self.phase {
            AuctionPhase::Uninitialized => return Err(AuctionError::NotInitialized),
            AuctionPhase::EarlyExit => return Err(AuctionError::MaximumProceedsReached),
            AuctionPhase::Migrated { .. } => return Err(AuctionError::AuctionMigrated),
            AuctionPhase::Active | AuctionPhase::InsufficientProceeds => {}
        }
        if now < self.config.starting_time {
            return Err(AuctionError::CannotSwapBeforeStartTime);
        }

        if self.phase.is_insufficient_proceeds() {
            self.check_refund_direction(params)?;
            return Ok(self.config.lp_fee);
        }

        if now >= self.config.ending_time {
            if self.state.total_proceeds < self.config.minimum_proceeds {
                self.enter_refund_mode(pool, now)?;
                self.check_refund_direction(params)?;
                return Ok(self.config.lp_fee);
            }
            return Err(AuctionError::SwapAfterMaturitySufficientProceeds);
        }

        if self.config.current_epoch(now) > self.state.last_epoch {
            self.rebalance(pool, now)?;
        }
        Ok(self.config.lp_fee)
    }

    fn after_swap_inner<P: PoolManager>(
        &mut self,
        pool: &P,
        delta: BalanceDelta,
        now: u64,
    ) -> AuctionResult<()> {
        match self.phase {
            AuctionPhase::Uninitialized => return Err(AuctionError::NotInitialized),
            AuctionPhase::Migrated { .. } => return Err(AuctionError::AuctionMigrated),
            _ => {}
        }

        let slot0 = pool.slot0();
        let lower_edge = self.positions.lower().tick_lower;
        let below_range = if self.config.is_token0 {
            slot0.tick < lower_edge
        } else {
            slot0.tick > lower_edge
        };
        if below_range {
            warn!(tick = slot0.tick, lower_edge, "trade pushed price past the lower slug");
            return Err(AuctionError::SwapBelowRange);
        }

        if !matches!(self.phase, AuctionPhase::Active) {
            return Ok(());
        }

        let fee = calculate_swap_fee(slot0.protocol_fee, self.config.lp_fee)?;
        let (asset_delta, numeraire_delta) = if self.config.is_token0 {
            (delta.amount0, delta.amount1)
        } else {
            (delta.amount1, delta.amount0)
        };

        let state = &mut self.state;
        if asset_delta >= 0 {
            state.total_tokens_sold =
                safe_add_u128(state.total_tokens_sold, asset_delta.unsigned_abs())?;
        } else {
            let net = amount_less_fee(abs_i128(asset_delta), fee)?;
            state.total_tokens_sold = state.total_tokens_sold.saturating_sub(net);
        }
        if numeraire_delta < 0 {
            let net = amount_less_fee(abs_i128(numeraire_delta), fee)?;
            state.total_proceeds = safe_add_u128(state.total_proceeds, net)?;
        } else {
            state.total_proceeds = state
                .total_proceeds
                .saturating_sub(numeraire_delta.unsigned_abs());
        }

        if self.state.total_proceeds >= self.config.maximum_proceeds {
            self.phase.transition(AuctionPhase::EarlyExit)?;
            let epoch = self.config.current_epoch(now);
            info!(
                epoch,
                total_proceeds = self.state.total_proceeds,
                "maximum proceeds reached"
            );
            self.events.push(AuctionEvent::EarlyExit {
                timestamp: now,
                epoch,
                total_proceeds: self.state.total_proceeds,
            });
        }
        Ok(())
    }

    fn migrate_inner<P: PoolManager>(
        &mut self,
        pool: &mut P,
        caller: &AccountId,
        recipient: &AccountId,
        now: u64,
    ) -> AuctionResult<MigrationOutcome> {
        if caller != &self.config.migrator {
            return Err(AuctionError::Unauthorized);
        }
        if self.phase.is_migrated() {
            return Err(AuctionError::AuctionMigrated);
        }
        let early_exit = self.phase.is_early_exit();
        let matured = self.phase == AuctionPhase::Active
            && now >= self.config.ending_time
            && self.state.total_proceeds >= self.config.minimum_proceeds;
        if !early_exit && !matured {
            return Err(AuctionError::MigrationNotEligible);
        }
        let key = self.pool_key.clone().ok_or(AuctionError::NotInitialized)?;

        clear_slugs(
            pool,
            &mut self.positions,
            &mut self.reserves,
            &mut self.state.fees_accrued,
        )?;

        let TokenAmounts { amount0, amount1 } = self.reserves;
        if amount0 > 0 {
            pool.take(&key.currency0, recipient, amount0)?;
        }
        if amount1 > 0 {
            pool.take(&key.currency1, recipient, amount1)?;
        }
        self.reserves = TokenAmounts::default();

        let sqrt_price_x64 = pool.slot0().sqrt_price_x64;
        let fees = self.state.fees_accrued;
        let outcome = MigrationOutcome {
            sqrt_price_x64,
            token0: key.currency0.clone(),
            fees0: fees.amount0,
            balance0: amount0,
            token1: key.currency1.clone(),
            fees1: fees.amount1,
            balance1: amount1,
        };

        self.phase.transition(AuctionPhase::Migrated { early_exit })?;
        info!(%recipient, balance0 = amount0, balance1 = amount1, early_exit, "auction migrated");
        self.events.push(AuctionEvent::Migrated {
            timestamp: now,
            recipient: recipient.clone(),
            sqrt_price_x64,
            balance0: amount0,
            balance1: amount1,
        });
        Ok(outcome)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn transact<T>(
        &mut self,
        operation: impl FnOnce(&mut Self) -> AuctionResult<T>,
    ) -> AuctionResult<T> {
        let checkpoint = self.clone();
        let result = operation(self);
        if let Err(error) = &result {
            debug!(%error, "operation rejected, engine state restored");
            *self = checkpoint;
        }
        result
    }

    fn tick_spacing(&self) -> AuctionResult<i32> {
        self.pool_key
            .as_ref()
            .map(|key| key.tick_spacing)
            .ok_or(AuctionError::NotInitialized)
    }

    /// Only asset sales are accepted in refund mode
    fn check_refund_direction(&self, params: &SwapParams) -> AuctionResult<()> {
        if params.zero_for_one != self.config.is_token0 {
            warn!(zero_for_one = params.zero_for_one, "refund mode accepts asset sales only");
            return Err(AuctionError::InvalidSwapAfterMaturityInsufficientProceeds);
        }
        Ok(())
    }

    /// Epoch rebalance: advance the accumulator, then re-place every slug
    fn rebalance<P: PoolManager>(&mut self, pool: &mut P, now: u64) -> AuctionResult<()> {
        let spacing = self.tick_spacing()?;
        let epoch = self.config.current_epoch(now);
        let current_tick = pool.slot0().tick;

        let raw_delta = accumulator_delta(&self.config, &self.state, spacing, current_tick, now)?;
        let drift = settle_curve(
            &self.config,
            self.state.tick_accumulator,
            raw_delta,
            spacing,
            current_tick,
        )?;
        if drift.applied_delta != 0 {
            self.state.tick_accumulator = drift.accumulator;
        }
        self.state.total_tokens_sold_last_epoch = self.state.total_tokens_sold;
        self.state.last_epoch = epoch;

        self.place_slugs(pool, &drift, now)?;

        debug!(
            epoch,
            tick_accumulator = self.state.tick_accumulator,
            tick_lower = drift.bounds.tick_lower,
            tick_upper = drift.bounds.tick_upper,
            reference = drift.reference_tick,
            "rebalanced"
        );
        self.events.push(AuctionEvent::Rebalanced {
            timestamp: now,
            epoch,
            tick_accumulator: self.state.tick_accumulator,
            tick_lower: drift.bounds.tick_lower,
            tick_upper: drift.bounds.tick_upper,
            reference_tick: drift.reference_tick,
        });
        Ok(())
    }

    /// Clear, reposition the price at the reference tick, then install a
    /// fresh layout sized from post-clearing reserves
    fn place_slugs<P: PoolManager>(
        &mut self,
        pool: &mut P,
        drift: &Drift,
        now: u64,
    ) -> AuctionResult<()> {
        let spacing = self.tick_spacing()?;
        clear_slugs(
            pool,
            &mut self.positions,
            &mut self.reserves,
            &mut self.state.fees_accrued,
        )?;

        let target = get_sqrt_price_at_tick(drift.reference_tick)?;
        if pool.slot0().sqrt_price_x64 != target {
            reposition_price(pool, target, &mut self.reserves)?;
        }

        let is_token0 = self.config.is_token0;
        let inputs = SlugInputs {
            bounds: drift.bounds,
            reference_tick: drift.reference_tick,
            tick_spacing: spacing,
            asset_available: self.reserves.asset(is_token0),
            numeraire_available: self.reserves.numeraire(is_token0),
            total_tokens_sold: self.state.total_tokens_sold,
            total_proceeds: self.state.total_proceeds,
            now,
        };
        let slugs = compute_slugs(&self.config, &inputs)?;
        install_slugs(pool, &mut self.positions, slugs.positions(), &mut self.reserves)
    }

    /// One-way switch into refund mode at an underfunded maturity
    fn enter_refund_mode<P: PoolManager>(&mut self, pool: &mut P, now: u64) -> AuctionResult<()> {
        let spacing = self.tick_spacing()?;
        clear_slugs(
            pool,
            &mut self.positions,
            &mut self.reserves,
            &mut self.state.fees_accrued,
        )?;

        let slug = compute_refund_slug(
            &self.config,
            spacing,
            self.reserves.numeraire(self.config.is_token0),
            self.state.total_tokens_sold,
            self.state.total_proceeds,
            pool.slot0().tick,
            None,
        )?;
        if !slug.is_empty() {
            let target = get_sqrt_price_at_tick(slug.tick_upper)?;
            if pool.slot0().sqrt_price_x64 != target {
                reposition_price(pool, target, &mut self.reserves)?;
            }
        }
        install_slugs(pool, &mut self.positions, [&slug], &mut self.reserves)?;

        self.phase.transition(AuctionPhase::InsufficientProceeds)?;
        info!(
            total_proceeds = self.state.total_proceeds,
            minimum_proceeds = self.config.minimum_proceeds,
            "insufficient proceeds, refund mode entered"
        );
        self.events.push(AuctionEvent::InsufficientProceeds {
            timestamp: now,
            total_proceeds: self.state.total_proceeds,
            minimum_proceeds: self.config.minimum_proceeds,
        });
        Ok(())
    }
}
