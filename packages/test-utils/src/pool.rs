//! # In-Memory Pool
//!
//! A small concentrated-liquidity pool that satisfies [`PoolManager`] for
//! tests and simulation. It tracks positions by `(tick_lower, tick_upper,
//! salt)`, walks the price across position boundaries during swaps and
//! credits fees pro-rata to in-range positions.
//!
//! Token custody is explicit: every account has a wallet, the hook
//! additionally has a credit balance inside the pool, and `vault` holds all
//! tokens the pool custodies. Tokens are only created by [`InMemoryPool::mint`].

use std::collections::BTreeMap;

use doppler_core::{
    AccountId, BalanceDelta, Currency, ModifyLiquidityParams, PoolError, PoolKey, PoolManager,
    Slot0, SwapParams, TokenAmounts,
};
use doppler_math::{
    compute_swap_step, get_amounts_for_liquidity, get_sqrt_price_at_tick, get_tick_at_sqrt_price,
    max_sqrt_price, min_sqrt_price, mul_div, safe_cast_u128_to_i128, Rounding, MAX_TICK, MIN_TICK,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Liquidity and uncollected fees of one position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LiquidityPosition {
    pub liquidity: u128,
    pub fees_owed: TokenAmounts,
}

/// `(tick_lower, tick_upper, salt)`
pub type PositionKey = (i32, i32, u8);

/// Realized amounts of a swap, seen from the trader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwapOutcome {
    pub delta: BalanceDelta,
    pub fees: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryPool {
    key: PoolKey,
    slot0: Slot0,
    hook: AccountId,
    positions: BTreeMap<PositionKey, LiquidityPosition>,
    /// Hook balance held inside the pool
    credits: TokenAmounts,
    wallets: BTreeMap<AccountId, TokenAmounts>,
    /// Every token the pool custodies
    vault: TokenAmounts,
    /// Total ever minted, for conservation checks
    minted: TokenAmounts,
}

impl InMemoryPool {
    pub fn new(key: PoolKey, hook: AccountId, tick: i32) -> Result<Self, PoolError> {
        let sqrt_price_x64 = get_sqrt_price_at_tick(tick)?;
        Ok(Self {
            key,
            slot0: Slot0 {
                sqrt_price_x64,
                tick,
                protocol_fee: 0,
                lp_fee: 0,
            },
            hook,
            positions: BTreeMap::new(),
            credits: TokenAmounts::default(),
            wallets: BTreeMap::new(),
            vault: TokenAmounts::default(),
            minted: TokenAmounts::default(),
        })
    }

    pub fn key(&self) -> &PoolKey {
        &self.key
    }

    pub fn hook(&self) -> &AccountId {
        &self.hook
    }

    pub fn set_protocol_fee(&mut self, protocol_fee: u32) {
        self.slot0.protocol_fee = protocol_fee;
    }

    pub fn set_lp_fee(&mut self, lp_fee: u32) {
        self.slot0.lp_fee = lp_fee;
    }

    /// Create tokens in `account`'s wallet
    pub fn mint(&mut self, account: &AccountId, amounts: TokenAmounts) {
        let wallet = self.wallets.entry(account.clone()).or_default();
        wallet.amount0 += amounts.amount0;
        wallet.amount1 += amounts.amount1;
        self.minted.amount0 += amounts.amount0;
        self.minted.amount1 += amounts.amount1;
    }

    pub fn balance_of(&self, account: &AccountId) -> TokenAmounts {
        self.wallets.get(account).copied().unwrap_or_default()
    }

    /// Hook balance held inside the pool
    pub fn credits(&self) -> TokenAmounts {
        self.credits
    }

    pub fn vault(&self) -> TokenAmounts {
        self.vault
    }

    pub fn minted(&self) -> TokenAmounts {
        self.minted
    }

    /// Sum of every wallet plus the vault
    pub fn total_supply(&self) -> TokenAmounts {
        self.wallets
            .values()
            .fold(self.vault, |total, wallet| TokenAmounts {
                amount0: total.amount0 + wallet.amount0,
                amount1: total.amount1 + wallet.amount1,
            })
    }

    pub fn position(&self, key: PositionKey) -> Option<&LiquidityPosition> {
        self.positions.get(&key)
    }

    pub fn positions(&self) -> impl Iterator<Item = (&PositionKey, &LiquidityPosition)> {
        self.positions.iter()
    }

    /// Tokens backing every position at the current price, fees included
    pub fn position_holdings(&self) -> Result<TokenAmounts, PoolError> {
        let mut total = TokenAmounts::default();
        for (&(tick_lower, tick_upper, _), position) in &self.positions {
            let (amount0, amount1) = get_amounts_for_liquidity(
                self.slot0.sqrt_price_x64,
                get_sqrt_price_at_tick(tick_lower)?,
                get_sqrt_price_at_tick(tick_upper)?,
                position.liquidity,
                false,
            )?;
            total.amount0 += amount0 + position.fees_owed.amount0;
            total.amount1 += amount1 + position.fees_owed.amount1;
        }
        Ok(total)
    }

    /// Execute a trader swap at `fee_pips`, settling the trader's wallet
    ///
    /// A trader who cannot pay leaves the pool untouched.
    pub fn swap(
        &mut self,
        trader: &AccountId,
        params: &SwapParams,
        fee_pips: u32,
    ) -> Result<SwapOutcome, PoolError> {
        if params.amount_specified == 0 {
            return Err(PoolError::ZeroAmount);
        }
        let checkpoint = (self.slot0, self.positions.clone());
        let settled = self.execute_swap(params, fee_pips).and_then(|outcome| {
            let mut wallet = self.balance_of(trader);
            debit_credit(&mut wallet, outcome.delta, trader, &self.key)?;
            Ok((outcome, wallet))
        });
        let (outcome, wallet) = match settled {
            Ok(settled) => settled,
            Err(error) => {
                (self.slot0, self.positions) = checkpoint;
                return Err(error);
            }
        };
        self.wallets.insert(trader.clone(), wallet);
        vault_apply(&mut self.vault, outcome.delta);

        trace!(
            %trader,
            amount0 = outcome.delta.amount0,
            amount1 = outcome.delta.amount1,
            tick = self.slot0.tick,
            "swap"
        );
        Ok(outcome)
    }

    // ========================================================================
    // Swap Engine
    // ========================================================================

    fn execute_swap(&mut self, params: &SwapParams, fee_pips: u32) -> Result<SwapOutcome, PoolError> {
        let zero_for_one = params.zero_for_one;
        let exact_input = params.is_exact_input();
        let current = self.slot0.sqrt_price_x64;
        let limit = match params.sqrt_price_limit_x64 {
            Some(limit) => limit,
            None if zero_for_one => min_sqrt_price()? + 1,
            None => max_sqrt_price()? - 1,
        };
        let valid_limit = if zero_for_one {
            limit < current && limit > min_sqrt_price()?
        } else {
            limit > current && limit < max_sqrt_price()?
        };
        if !valid_limit {
            return Err(PoolError::InvalidPriceLimit(limit));
        }

        let mut remaining = params.amount_specified.unsigned_abs();
        let mut price = current;
        let (mut total_in, mut total_out, mut total_fees) = (0u128, 0u128, 0u128);

        while remaining > 0 && price != limit {
            let boundary = self.next_boundary(price, zero_for_one)?;
            let target = match boundary {
                Some(boundary) if zero_for_one => boundary.max(limit),
                Some(boundary) => boundary.min(limit),
                None => limit,
            };
            let liquidity = self.active_liquidity(price, zero_for_one)?;
            let step = compute_swap_step(price, target, liquidity, remaining, exact_input, fee_pips)?;

            if exact_input {
                remaining = remaining.saturating_sub(step.amount_in + step.fee_amount);
            } else {
                remaining = remaining.saturating_sub(step.amount_out);
            }
            total_in += step.amount_in + step.fee_amount;
            total_out += step.amount_out;
            total_fees += step.fee_amount;
            self.distribute_fee(price, zero_for_one, liquidity, step.fee_amount)?;

            let stalled = step.sqrt_price_next_x64 == price && step.amount_out == 0;
            price = step.sqrt_price_next_x64;
            if stalled && step.amount_in == 0 {
                break;
            }
        }

        self.set_price(price)?;
        let input = safe_cast_u128_to_i128(total_in)?;
        let output = safe_cast_u128_to_i128(total_out)?;
        let delta = if zero_for_one {
            BalanceDelta::new(-input, output)
        } else {
            BalanceDelta::new(output, -input)
        };
        Ok(SwapOutcome {
            delta,
            fees: total_fees,
        })
    }

    fn set_price(&mut self, sqrt_price_x64: u128) -> Result<(), PoolError> {
        self.slot0.sqrt_price_x64 = sqrt_price_x64;
        self.slot0.tick = get_tick_at_sqrt_price(sqrt_price_x64)?;
        Ok(())
    }

    fn sqrt_bounds(key: &PositionKey) -> Result<(u128, u128), PoolError> {
        Ok((get_sqrt_price_at_tick(key.0)?, get_sqrt_price_at_tick(key.1)?))
    }

    /// Positions a move from `price` in the given direction trades against
    fn in_range(price: u128, lower: u128, upper: u128, zero_for_one: bool) -> bool {
        if zero_for_one {
            lower < price && price <= upper
        } else {
            lower <= price && price < upper
        }
    }

    fn active_liquidity(&self, price: u128, zero_for_one: bool) -> Result<u128, PoolError> {
        let mut liquidity = 0u128;
        for (key, position) in &self.positions {
            let (lower, upper) = Self::sqrt_bounds(key)?;
            if Self::in_range(price, lower, upper, zero_for_one) {
                liquidity += position.liquidity;
            }
        }
        Ok(liquidity)
    }

    /// Nearest position edge strictly beyond `price`
    fn next_boundary(&self, price: u128, zero_for_one: bool) -> Result<Option<u128>, PoolError> {
        let mut next: Option<u128> = None;
        for key in self.positions.keys() {
            let (lower, upper) = Self::sqrt_bounds(key)?;
            for edge in [lower, upper] {
                let beyond = if zero_for_one { edge < price } else { edge > price };
                if beyond {
                    next = Some(match next {
                        Some(current) if zero_for_one => current.max(edge),
                        Some(current) => current.min(edge),
                        None => edge,
                    });
                }
            }
        }
        Ok(next)
    }

    /// Split a step's fee across in-range positions by liquidity; rounding
    /// dust goes to the first of them
    fn distribute_fee(
        &mut self,
        price: u128,
        zero_for_one: bool,
        liquidity: u128,
        fee: u128,
    ) -> Result<(), PoolError> {
        if fee == 0 || liquidity == 0 {
            return Ok(());
        }
        let mut paid = 0u128;
        let mut first: Option<PositionKey> = None;
        for (key, position) in self.positions.iter_mut() {
            let (lower, upper) = Self::sqrt_bounds(key)?;
            if !Self::in_range(price, lower, upper, zero_for_one) || position.liquidity == 0 {
                continue;
            }
            let share = mul_div(fee, position.liquidity, liquidity, Rounding::Down)?;
            credit_fee(&mut position.fees_owed, zero_for_one, share);
            paid += share;
            first.get_or_insert(*key);
        }
        if let Some(position) = first.and_then(|key| self.positions.get_mut(&key)) {
            credit_fee(&mut position.fees_owed, zero_for_one, fee - paid);
        }
        Ok(())
    }

    fn validate_range(&self, params: &ModifyLiquidityParams) -> Result<(), PoolError> {
        let (tick_lower, tick_upper) = (params.tick_lower, params.tick_upper);
        if tick_lower >= tick_upper || tick_lower < MIN_TICK || tick_upper > MAX_TICK {
            return Err(PoolError::InvalidRange {
                tick_lower,
                tick_upper,
            });
        }
        let spacing = self.key.tick_spacing;
        for tick in [tick_lower, tick_upper] {
            if tick % spacing != 0 {
                return Err(PoolError::TickMisaligned {
                    tick,
                    tick_spacing: spacing,
                });
            }
        }
        Ok(())
    }

    fn currency_index(&self, currency: &Currency) -> Result<bool, PoolError> {
        if currency == &self.key.currency0 {
            Ok(true)
        } else if currency == &self.key.currency1 {
            Ok(false)
        } else {
            Err(PoolError::UnknownCurrency(currency.clone()))
        }
    }
}

// ============================================================================
// Pool Contract
// ============================================================================

impl PoolManager for InMemoryPool {
    fn slot0(&self) -> Slot0 {
        self.slot0
    }

    fn modify_liquidity(
        &mut self,
        params: ModifyLiquidityParams,
    ) -> Result<(BalanceDelta, BalanceDelta), PoolError> {
        self.validate_range(&params)?;
        let key = (params.tick_lower, params.tick_upper, params.salt);
        let adding = params.liquidity_delta > 0;
        let magnitude = params.liquidity_delta.unsigned_abs();

        let mut position = self.positions.get(&key).copied().unwrap_or_default();
        if !adding && position.liquidity < magnitude {
            return Err(PoolError::InsufficientLiquidity {
                available: position.liquidity,
                requested: magnitude,
            });
        }

        let (amount0, amount1) = get_amounts_for_liquidity(
            self.slot0.sqrt_price_x64,
            get_sqrt_price_at_tick(params.tick_lower)?,
            get_sqrt_price_at_tick(params.tick_upper)?,
            magnitude,
            adding,
        )?;
        let (amount0, amount1) = (
            safe_cast_u128_to_i128(amount0)?,
            safe_cast_u128_to_i128(amount1)?,
        );
        let principal = if adding {
            BalanceDelta::new(-amount0, -amount1)
        } else {
            BalanceDelta::new(amount0, amount1)
        };
        let fees = BalanceDelta::new(
            safe_cast_u128_to_i128(position.fees_owed.amount0)?,
            safe_cast_u128_to_i128(position.fees_owed.amount1)?,
        );
        let delta = BalanceDelta::new(principal.amount0 + fees.amount0, principal.amount1 + fees.amount1);

        let hook = self.hook.clone();
        debit_credit(&mut self.credits, delta, &hook, &self.key)?;

        position.fees_owed = TokenAmounts::default();
        position.liquidity = if adding {
            position.liquidity + magnitude
        } else {
            position.liquidity - magnitude
        };
        if position.liquidity == 0 {
            self.positions.remove(&key);
        } else {
            self.positions.insert(key, position);
        }
        Ok((delta, fees))
    }

    fn swap_to_price(&mut self, sqrt_price_x64: u128) -> Result<BalanceDelta, PoolError> {
        let current = self.slot0.sqrt_price_x64;
        if sqrt_price_x64 == current {
            return Ok(BalanceDelta::ZERO);
        }
        let params = SwapParams {
            zero_for_one: sqrt_price_x64 < current,
            amount_specified: -i128::MAX,
            sqrt_price_limit_x64: Some(sqrt_price_x64),
        };
        let outcome = self.execute_swap(&params, 0)?;
        let hook = self.hook.clone();
        debit_credit(&mut self.credits, outcome.delta, &hook, &self.key)?;
        Ok(outcome.delta)
    }

    fn take(
        &mut self,
        currency: &Currency,
        recipient: &AccountId,
        amount: u128,
    ) -> Result<(), PoolError> {
        let is_currency0 = self.currency_index(currency)?;
        let (credit, vault) = if is_currency0 {
            (&mut self.credits.amount0, &mut self.vault.amount0)
        } else {
            (&mut self.credits.amount1, &mut self.vault.amount1)
        };
        if *credit < amount {
            return Err(PoolError::InsufficientFunds {
                account: self.hook.clone(),
                currency: currency.clone(),
                available: *credit,
                required: amount,
            });
        }
        *credit -= amount;
        *vault -= amount;

        let wallet = self.wallets.entry(recipient.clone()).or_default();
        if is_currency0 {
            wallet.amount0 += amount;
        } else {
            wallet.amount1 += amount;
        }
        Ok(())
    }

    fn settle(&mut self, currency: &Currency, amount: u128) -> Result<(), PoolError> {
        let is_currency0 = self.currency_index(currency)?;
        let wallet = self.wallets.entry(self.hook.clone()).or_default();
        let (held, credit, vault) = if is_currency0 {
            (&mut wallet.amount0, &mut self.credits.amount0, &mut self.vault.amount0)
        } else {
            (&mut wallet.amount1, &mut self.credits.amount1, &mut self.vault.amount1)
        };
        if *held < amount {
            return Err(PoolError::InsufficientFunds {
                account: self.hook.clone(),
                currency: currency.clone(),
                available: *held,
                required: amount,
            });
        }
        *held -= amount;
        *credit += amount;
        *vault += amount;
        Ok(())
    }
}

// ============================================================================
// Balance Helpers
// ============================================================================

/// Apply a caller-side delta to `balance`; negative amounts are owed
fn debit_credit(
    balance: &mut TokenAmounts,
    delta: BalanceDelta,
    account: &AccountId,
    key: &PoolKey,
) -> Result<(), PoolError> {
    let updated0 = apply_one(balance.amount0, delta.amount0);
    let updated1 = apply_one(balance.amount1, delta.amount1);
    match (updated0, updated1) {
        (Some(amount0), Some(amount1)) => {
            *balance = TokenAmounts::new(amount0, amount1);
            Ok(())
        }
        (None, _) => Err(PoolError::InsufficientFunds {
            account: account.clone(),
            currency: key.currency0.clone(),
            available: balance.amount0,
            required: delta.amount0.unsigned_abs(),
        }),
        (_, None) => Err(PoolError::InsufficientFunds {
            account: account.clone(),
            currency: key.currency1.clone(),
            available: balance.amount1,
            required: delta.amount1.unsigned_abs(),
        }),
    }
}

fn apply_one(balance: u128, delta: i128) -> Option<u128> {
    if delta >= 0 {
        balance.checked_add(delta.unsigned_abs())
    } else {
        balance.checked_sub(delta.unsigned_abs())
    }
}

/// The vault moves opposite to a trader's delta
fn vault_apply(vault: &mut TokenAmounts, delta: BalanceDelta) {
    vault.amount0 = apply_one(vault.amount0, -delta.amount0).unwrap_or(0);
    vault.amount1 = apply_one(vault.amount1, -delta.amount1).unwrap_or(0);
}

fn credit_fee(fees: &mut TokenAmounts, zero_for_one: bool, amount: u128) {
    if zero_for_one {
        fees.amount0 += amount;
    } else {
        fees.amount1 += amount;
    }
}
