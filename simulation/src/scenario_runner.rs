//! # Scenario Runner
//!
//! Replays a [`ScenarioConfig`] against a [`Market`]: orders execute in time
//! order, rejected orders are counted and skipped, and the slug layout is
//! captured after every placement.

use std::collections::BTreeSet;

use doppler_core::{
    AccountId, AuctionEvent, AuctionPhase, BalanceDelta, MigrationOutcome, TokenAmounts,
};
use doppler_test_utils::Market;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{OrderConfig, ScenarioConfig, Side};
use crate::error::SimulationResult;
use crate::snapshot::SnapshotFrame;

/// Outcome of one order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OrderResult {
    Filled {
        at: u64,
        trader: String,
        side: Side,
        asset: i128,
        numeraire: i128,
    },
    Rejected {
        at: u64,
        trader: String,
        side: Side,
        reason: String,
    },
    /// Sell with nothing to sell
    Skipped { at: u64, trader: String },
}

/// Summary of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub phase: AuctionPhase,
    pub last_epoch: u64,
    pub tick_accumulator: i128,
    pub total_tokens_sold: u128,
    pub total_proceeds: u128,
    pub fees_accrued: TokenAmounts,
    pub final_tick: i32,
    pub filled: usize,
    pub rejected: usize,
    pub skipped: usize,
    pub orders: Vec<OrderResult>,
    pub events: Vec<AuctionEvent>,
    pub migration: Option<MigrationOutcome>,
}

pub struct ScenarioRunner {
    scenario: ScenarioConfig,
    market: Market,
    funded: BTreeSet<AccountId>,
    frames: Vec<SnapshotFrame>,
    events: Vec<AuctionEvent>,
}

impl ScenarioRunner {
    /// Open the pool and initialize the auction at its starting time
    pub fn new(scenario: ScenarioConfig) -> SimulationResult<Self> {
        scenario.validate()?;
        let config = scenario.auction_config()?;
        let initial_tick = scenario.pool.initial_tick.unwrap_or(config.starting_tick);

        let mut market =
            Market::with_initial_tick(config, scenario.pool.tick_spacing, initial_tick)?;
        market.pool.set_protocol_fee(scenario.pool.protocol_fee);

        info!(
            scenario = %scenario.name,
            tick = market.tick(),
            "auction initialized"
        );

        let mut runner = Self {
            scenario,
            market,
            funded: BTreeSet::new(),
            frames: Vec::new(),
            events: Vec::new(),
        };
        runner.collect_events();
        Ok(runner)
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    /// Slug layouts captured so far
    pub fn frames(&self) -> &[SnapshotFrame] {
        &self.frames
    }

    /// Execute every order, then migrate if a recipient is configured
    pub fn run(&mut self) -> SimulationResult<ScenarioReport> {
        let orders = self.scenario.all_orders();
        let mut results = Vec::with_capacity(orders.len());
        for order in &orders {
            results.push(self.execute(order)?);
        }

        let ending_time = self.market.config().ending_time;
        if self.market.now < ending_time {
            self.market.warp(ending_time);
        }
        let migration = self.try_migrate();

        Ok(self.report(results, migration))
    }

    /// Run one order at its scheduled time
    pub fn execute(&mut self, order: &OrderConfig) -> SimulationResult<OrderResult> {
        let timestamp = self.market.config().starting_time + order.at;
        self.market.warp(timestamp.max(self.market.now));

        let trader = self.fund(&order.trader)?;
        let outcome = match order.side {
            Side::Buy => {
                let amount = self.scenario.scale(order.amount)?;
                self.market.buy(&trader, amount)
            }
            Side::Sell => {
                let is_token0 = self.market.config().is_token0;
                let held = self.market.pool.balance_of(&trader).asset(is_token0);
                let amount = self.scenario.scale(order.amount)?.min(held);
                if amount == 0 {
                    debug!(trader = %trader, "nothing to sell");
                    return Ok(OrderResult::Skipped {
                        at: order.at,
                        trader: order.trader.clone(),
                    });
                }
                self.market.sell(&trader, amount)
            }
        };

        let result = match outcome {
            Ok(delta) => self.filled(order, delta),
            Err(error) => {
                warn!(trader = %trader, side = ?order.side, %error, "order rejected");
                OrderResult::Rejected {
                    at: order.at,
                    trader: order.trader.clone(),
                    side: order.side,
                    reason: error.to_string(),
                }
            }
        };
        self.collect_events();
        Ok(result)
    }

    fn filled(&self, order: &OrderConfig, delta: BalanceDelta) -> OrderResult {
        let asset = self.market.asset_delta(delta);
        let numeraire = self.market.numeraire_delta(delta);
        debug!(
            trader = %order.trader,
            side = ?order.side,
            asset,
            numeraire,
            tick = self.market.tick(),
            "order filled"
        );
        OrderResult::Filled {
            at: order.at,
            trader: order.trader.clone(),
            side: order.side,
            asset,
            numeraire,
        }
    }

    /// Fund `name` with both tokens on first use
    fn fund(&mut self, name: &str) -> SimulationResult<AccountId> {
        let account = AccountId::new(name);
        if self.funded.insert(account.clone()) {
            let funds = self.scenario.scale(self.scenario.trader_funds)?;
            self.market.fund(&account, funds, funds);
        }
        Ok(account)
    }

    fn try_migrate(&mut self) -> Option<MigrationOutcome> {
        let recipient = AccountId::new(self.scenario.recipient.clone()?);
        let migrator = self.market.config().migrator.clone();
        match self.market.migrate(&migrator, &recipient) {
            Ok(outcome) => {
                info!(
                    recipient = %recipient,
                    balance0 = outcome.balance0,
                    balance1 = outcome.balance1,
                    "migrated"
                );
                self.collect_events();
                Some(outcome)
            }
            Err(error) => {
                warn!(%error, "migration not possible");
                None
            }
        }
    }

    /// Move new engine events into the run log, capturing a layout after
    /// each placement
    fn collect_events(&mut self) {
        for event in self.market.auction.drain_events() {
            match &event {
                AuctionEvent::Initialized { timestamp, .. }
                | AuctionEvent::Rebalanced { timestamp, .. }
                | AuctionEvent::InsufficientProceeds { timestamp, .. } => {
                    self.frames.push(SnapshotFrame::capture(
                        self.market.auction.positions(),
                        *timestamp,
                        self.market.tick(),
                    ));
                }
                AuctionEvent::EarlyExit { .. } | AuctionEvent::Migrated { .. } => {}
            }
            info!(event = event.name(), timestamp = event.timestamp(), "auction event");
            self.events.push(event);
        }
    }

    fn report(
        &self,
        orders: Vec<OrderResult>,
        migration: Option<MigrationOutcome>,
    ) -> ScenarioReport {
        let state = self.market.auction.state();
        let count = |predicate: fn(&OrderResult) -> bool| {
            orders.iter().filter(|result| predicate(result)).count()
        };
        ScenarioReport {
            name: self.scenario.name.clone(),
            phase: self.market.auction.phase(),
            last_epoch: state.last_epoch,
            tick_accumulator: state.tick_accumulator,
            total_tokens_sold: state.total_tokens_sold,
            total_proceeds: state.total_proceeds,
            fees_accrued: state.fees_accrued,
            final_tick: self.market.tick(),
            filled: count(|o| matches!(o, OrderResult::Filled { .. })),
            rejected: count(|o| matches!(o, OrderResult::Rejected { .. })),
            skipped: count(|o| matches!(o, OrderResult::Skipped { .. })),
            orders,
            events: self.events.clone(),
            migration,
        }
    }
}
