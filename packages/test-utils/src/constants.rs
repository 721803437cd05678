//! Shared fixtures for auction tests

use doppler_math::WAD;

pub const DAY: u64 = 86_400;

/// Default auction start used by fixtures
pub const START_TIME: u64 = 1_000;

pub const TOKEN0: &str = "token0";
pub const TOKEN1: &str = "token1";

// Accounts
pub const HOOK: &str = "doppler-hook";
pub const MIGRATOR: &str = "migrator";
pub const RECIPIENT: &str = "recipient";
pub const ALICE: &str = "alice";
pub const BOB: &str = "bob";

/// Supply sold by the fixture configs
pub const TOKENS_TO_SELL: u128 = 1_000_000 * WAD;

/// Starting numeraire balance for fixture traders
pub const TRADER_FUNDS: u128 = 1_000_000_000 * WAD;
