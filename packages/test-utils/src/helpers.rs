use doppler_core::{AccountId, AuctionConfig, BalanceDelta, Position, PositionBook};
use doppler_math::WAD;

use crate::constants::{DAY, MIGRATOR, START_TIME, TOKENS_TO_SELL, TRADER_FUNDS};
use crate::market::Market;

/// Token0 auction over 10 daily epochs, price falling from tick 0 to -10000
pub fn token0_config() -> AuctionConfig {
    AuctionConfig {
        num_tokens_to_sell: TOKENS_TO_SELL,
        minimum_proceeds: 100 * WAD,
        maximum_proceeds: 10_000 * WAD,
        starting_time: START_TIME,
        ending_time: START_TIME + 10 * DAY,
        starting_tick: 0,
        ending_tick: -10_000,
        epoch_length: DAY,
        gamma: 1_000,
        is_token0: true,
        num_pd_slugs: 5,
        lp_fee: 3_000,
        migrator: AccountId::new(MIGRATOR),
    }
}

/// Mirror image of [`token0_config`]: the asset is token1 and its price
/// (token0 per token1) falls as the pool tick rises
pub fn token1_config() -> AuctionConfig {
    AuctionConfig {
        starting_tick: 0,
        ending_tick: 10_000,
        is_token0: false,
        ..token0_config()
    }
}

/// A funded trader
pub fn trader(market: &mut Market, name: &str) -> AccountId {
    let account = AccountId::new(name);
    market.fund(&account, TRADER_FUNDS, TRADER_FUNDS);
    account
}

/// Tokens per epoch under a linear schedule
pub fn per_epoch(config: &AuctionConfig) -> u128 {
    config.num_tokens_to_sell / config.num_epochs() as u128
}

/// Both amounts of a delta as magnitudes
pub fn magnitudes(delta: BalanceDelta) -> (u128, u128) {
    (delta.amount0.unsigned_abs(), delta.amount1.unsigned_abs())
}

/// Written slugs that hold liquidity
pub fn live_slugs(book: &PositionBook) -> Vec<Position> {
    book.active().copied().collect()
}
