//! Scenario configuration
//!
//! Scenarios are TOML files loaded through the `config` crate, with
//! `DOPPLER_SIM__<SECTION>__<KEY>` environment variables layered on top
//! (for example `DOPPLER_SIM__AUCTION__GAMMA=2000`). Token amounts are
//! written in whole tokens and scaled by `auction.decimals`.

use std::fs;
use std::path::Path;

use doppler_core::{AccountId, AuctionConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{SimulationError, SimulationResult};

/// A full simulation scenario
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
    /// Scenario name for logging
    pub name: String,

    pub auction: AuctionParams,

    pub pool: PoolParams,

    /// Whole tokens of each currency given to every trader on first use
    pub trader_funds: u64,

    /// Scheduled orders
    #[serde(default)]
    pub orders: Vec<OrderConfig>,

    /// Optional randomly generated order flow
    #[serde(default)]
    pub random_flow: Option<RandomFlowConfig>,

    /// Migrate to this recipient once the run finishes, if eligible
    #[serde(default)]
    pub recipient: Option<String>,
}

/// Auction parameters in whole-token units
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuctionParams {
    pub decimals: u32,
    pub num_tokens_to_sell: u64,
    pub minimum_proceeds: u64,
    pub maximum_proceeds: u64,
    pub starting_time: u64,
    pub ending_time: u64,
    pub epoch_length: u64,
    pub starting_tick: i32,
    pub ending_tick: i32,
    pub gamma: i32,
    pub is_token0: bool,
    pub num_pd_slugs: u8,
    /// Pips
    pub lp_fee: u32,
    pub migrator: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolParams {
    pub tick_spacing: i32,

    /// Opening tick; defaults to the auction's starting tick
    #[serde(default)]
    pub initial_tick: Option<i32>,

    /// Pips
    #[serde(default)]
    pub protocol_fee: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Spend numeraire on the asset
    Buy,
    /// Sell the asset back
    Sell,
}

/// One trade
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderConfig {
    /// Seconds after the auction start
    pub at: u64,
    pub trader: String,
    pub side: Side,
    /// Whole tokens: numeraire spent for buys, asset sold for sells
    pub amount: u64,
}

/// Seeded random order generation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RandomFlowConfig {
    pub seed: u64,
    pub orders: usize,
    pub traders: usize,
    /// Largest order in whole tokens
    pub max_amount: u64,
    /// Probability that an order is a sell
    pub sell_probability: f64,
}

impl ScenarioConfig {
    /// Load a scenario file with environment overrides and validate it
    pub fn load(path: &Path) -> SimulationResult<Self> {
        let scenario: ScenarioConfig = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("DOPPLER_SIM")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        scenario.validate()?;
        Ok(scenario)
    }

    /// Write the scenario as TOML
    pub fn save(&self, path: &Path) -> SimulationResult<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate the scenario, including the auction configuration it implies
    pub fn validate(&self) -> SimulationResult<()> {
        if self.name.is_empty() {
            return Err(SimulationError::invalid("scenario name is empty"));
        }
        self.auction_config()?.validate()?;

        let duration = self.auction.ending_time.saturating_sub(self.auction.starting_time);
        for order in &self.orders {
            if order.amount == 0 {
                return Err(SimulationError::invalid(format!(
                    "order for {} at {} has zero amount",
                    order.trader, order.at
                )));
            }
            if order.at > duration {
                return Err(SimulationError::invalid(format!(
                    "order at {} is past the auction end ({duration}s)",
                    order.at
                )));
            }
        }

        if let Some(flow) = &self.random_flow {
            flow.validate()?;
        }
        Ok(())
    }

    /// One whole token in base units
    pub fn unit(&self) -> SimulationResult<u128> {
        10u128
            .checked_pow(self.auction.decimals)
            .ok_or_else(|| SimulationError::invalid("decimals too large"))
    }

    /// Whole tokens to base units
    pub fn scale(&self, whole: u64) -> SimulationResult<u128> {
        (whole as u128)
            .checked_mul(self.unit()?)
            .ok_or_else(|| SimulationError::invalid(format!("amount {whole} overflows")))
    }

    pub fn auction_config(&self) -> SimulationResult<AuctionConfig> {
        let params = &self.auction;
        Ok(AuctionConfig {
            num_tokens_to_sell: self.scale(params.num_tokens_to_sell)?,
            minimum_proceeds: self.scale(params.minimum_proceeds)?,
            maximum_proceeds: self.scale(params.maximum_proceeds)?,
            starting_time: params.starting_time,
            ending_time: params.ending_time,
            starting_tick: params.starting_tick,
            ending_tick: params.ending_tick,
            epoch_length: params.epoch_length,
            gamma: params.gamma,
            is_token0: params.is_token0,
            num_pd_slugs: params.num_pd_slugs,
            lp_fee: params.lp_fee,
            migrator: AccountId::new(params.migrator.clone()),
        })
    }

    /// Scheduled orders plus generated ones, ordered by time
    pub fn all_orders(&self) -> Vec<OrderConfig> {
        let mut orders = self.orders.clone();
        if let Some(flow) = &self.random_flow {
            let duration = self.auction.ending_time.saturating_sub(self.auction.starting_time);
            orders.extend(flow.generate(duration));
        }
        // Stable: same-time orders keep file order
        orders.sort_by_key(|order| order.at);
        orders
    }

    /// A small token0 auction used by `doppler-sim init`
    pub fn example() -> Self {
        let day = 86_400;
        ScenarioConfig {
            name: "example".to_string(),
            auction: AuctionParams {
                decimals: 18,
                num_tokens_to_sell: 1_000_000,
                minimum_proceeds: 100,
                maximum_proceeds: 50_000,
                starting_time: 1_000,
                ending_time: 1_000 + 10 * day,
                epoch_length: day,
                starting_tick: 0,
                ending_tick: -10_000,
                gamma: 1_000,
                is_token0: true,
                num_pd_slugs: 5,
                lp_fee: 3_000,
                migrator: "migrator".to_string(),
            },
            pool: PoolParams {
                tick_spacing: 10,
                initial_tick: None,
                protocol_fee: 0,
            },
            trader_funds: 1_000_000_000,
            orders: vec![
                OrderConfig {
                    at: 3_600,
                    trader: "alice".to_string(),
                    side: Side::Buy,
                    amount: 500,
                },
                OrderConfig {
                    at: 2 * day + 60,
                    trader: "bob".to_string(),
                    side: Side::Buy,
                    amount: 1_000,
                },
                OrderConfig {
                    at: 4 * day,
                    trader: "alice".to_string(),
                    side: Side::Sell,
                    amount: 200,
                },
            ],
            random_flow: None,
            recipient: Some("recipient".to_string()),
        }
    }
}

impl RandomFlowConfig {
    fn validate(&self) -> SimulationResult<()> {
        if self.traders == 0 {
            return Err(SimulationError::invalid("random flow needs at least one trader"));
        }
        if self.max_amount == 0 {
            return Err(SimulationError::invalid("random flow max_amount is zero"));
        }
        if !(0.0..=1.0).contains(&self.sell_probability) {
            return Err(SimulationError::invalid(format!(
                "sell_probability {} is not a probability",
                self.sell_probability
            )));
        }
        Ok(())
    }

    /// Deterministic orders spread over `duration` seconds
    pub fn generate(&self, duration: u64) -> Vec<OrderConfig> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        (0..self.orders)
            .map(|_| {
                let side = if rng.gen_bool(self.sell_probability) {
                    Side::Sell
                } else {
                    Side::Buy
                };
                OrderConfig {
                    at: rng.gen_range(0..=duration),
                    trader: format!("trader-{}", rng.gen_range(0..self.traders)),
                    side,
                    amount: rng.gen_range(1..=self.max_amount),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_is_valid() {
        let scenario = ScenarioConfig::example();
        scenario.validate().unwrap();
        let config = scenario.auction_config().unwrap();
        assert_eq!(config.num_tokens_to_sell, 1_000_000 * 10u128.pow(18));
    }

    #[test]
    fn test_toml_round_trip() {
        let scenario = ScenarioConfig::example();
        let text = toml::to_string_pretty(&scenario).unwrap();
        let parsed: ScenarioConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.orders, scenario.orders);
        assert_eq!(parsed.auction.gamma, scenario.auction.gamma);
    }

    #[test]
    fn test_rejects_orders_past_end() {
        let mut scenario = ScenarioConfig::example();
        scenario.orders[0].at = 11 * 86_400;
        assert!(matches!(
            scenario.validate(),
            Err(SimulationError::InvalidScenario(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_auction() {
        let mut scenario = ScenarioConfig::example();
        scenario.auction.epoch_length = 7;
        assert!(matches!(
            scenario.validate(),
            Err(SimulationError::Auction(_))
        ));
    }

    #[test]
    fn test_random_flow_is_seeded() {
        let flow = RandomFlowConfig {
            seed: 7,
            orders: 20,
            traders: 3,
            max_amount: 100,
            sell_probability: 0.3,
        };
        let first = flow.generate(1_000);
        assert_eq!(first, flow.generate(1_000));
        assert_eq!(first.len(), 20);
        assert!(first.iter().all(|order| order.at <= 1_000 && order.amount >= 1));
    }
}
