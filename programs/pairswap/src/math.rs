//! Constant product math (x·y=k) for swaps and LP accounting.
//!
//! All intermediates are u128 and every operation is checked; results are
//! floored so rounding always favours the pool.

use crate::error::AmmError;

pub const BPS_DENOMINATOR: u64 = 10_000;

/// Integer square root using Newton's method.
pub fn isqrt(n: u128) -> u128 {
    if n == 0 {
        return 0;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

fn mul_div_floor(a: u64, b: u64, denominator: u64) -> Result<u64, AmmError> {
    let q = (a as u128)
        .checked_mul(b as u128)
        .ok_or(AmmError::Overflow)?
        .checked_div(denominator as u128)
        .ok_or(AmmError::Overflow)?;
    u64::try_from(q).map_err(|_| AmmError::Overflow)
}

fn mul_div_ceil(a: u64, b: u64, denominator: u64) -> Result<u64, AmmError> {
    if denominator == 0 {
        return Err(AmmError::Overflow);
    }
    let product = (a as u128).checked_mul(b as u128).ok_or(AmmError::Overflow)?;
    let d = denominator as u128;
    let q = product / d + u128::from(product % d != 0);
    u64::try_from(q).map_err(|_| AmmError::Overflow)
}

// ---------------------------------------------------------------------------
// Swap
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapQuote {
    pub amount_in: u64,
    /// Input counted toward the curve after the fee is withheld.
    pub amount_in_after_fee: u64,
    /// Fee retained by the pool (in input tokens).
    pub fee: u64,
    pub amount_out: u64,
}

/// Output for `amount_in` against `(reserve_in, reserve_out)`:
/// `after_fee = amount_in * (10000 - fee_bps) / 10000`,
/// `amount_out = reserve_out * after_fee / (reserve_in + after_fee)`.
pub fn swap_quote(
    amount_in: u64,
    reserve_in: u64,
    reserve_out: u64,
    fee_bps: u16,
) -> Result<SwapQuote, AmmError> {
    if amount_in == 0 {
        return Err(AmmError::ZeroAmount);
    }
    if reserve_in == 0 || reserve_out == 0 {
        return Err(AmmError::ZeroLiquidity);
    }
    let fee_bps = u64::from(fee_bps);
    let keep_bps = BPS_DENOMINATOR
        .checked_sub(fee_bps)
        .ok_or(AmmError::Overflow)?;

    let amount_in_after_fee = mul_div_floor(amount_in, keep_bps, BPS_DENOMINATOR)?;
    let fee = amount_in
        .checked_sub(amount_in_after_fee)
        .ok_or(AmmError::Overflow)?;

    let numerator = (reserve_out as u128)
        .checked_mul(amount_in_after_fee as u128)
        .ok_or(AmmError::Overflow)?;
    let denominator = (reserve_in as u128)
        .checked_add(amount_in_after_fee as u128)
        .ok_or(AmmError::Overflow)?;
    let amount_out = numerator
        .checked_div(denominator)
        .ok_or(AmmError::Overflow)?;
    let amount_out = u64::try_from(amount_out).map_err(|_| AmmError::Overflow)?;

    Ok(SwapQuote {
        amount_in,
        amount_in_after_fee,
        fee,
        amount_out,
    })
}

/// `new_in * new_out >= old_in * old_out`
pub fn constant_product_holds(
    reserve_in_before: u64,
    reserve_out_before: u64,
    reserve_in_after: u64,
    reserve_out_after: u64,
) -> bool {
    let k_before = reserve_in_before as u128 * reserve_out_before as u128;
    let k_after = reserve_in_after as u128 * reserve_out_after as u128;
    k_after >= k_before
}

// ---------------------------------------------------------------------------
// Liquidity
// ---------------------------------------------------------------------------

/// Tokens drawn from a depositor and LP minted for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deposit {
    pub amount_a: u64,
    pub amount_b: u64,
    pub lp_minted: u64,
}

/// First deposit: `sqrt(amount_a * amount_b)` LP, both amounts drawn in full.
pub fn initial_deposit(amount_a: u64, amount_b: u64) -> Result<Deposit, AmmError> {
    let product = (amount_a as u128)
        .checked_mul(amount_b as u128)
        .ok_or(AmmError::Overflow)?;
    let lp_minted = u64::try_from(isqrt(product)).map_err(|_| AmmError::Overflow)?;
    Ok(Deposit {
        amount_a,
        amount_b,
        lp_minted,
    })
}

/// Deposit into a funded pool. LP is the smaller of the two proportional
/// claims; the drawn amounts are that LP's share of reserves, rounded up and
/// never above what was offered.
pub fn proportional_deposit(
    desired_a: u64,
    desired_b: u64,
    reserve_a: u64,
    reserve_b: u64,
    lp_supply: u64,
) -> Result<Deposit, AmmError> {
    if reserve_a == 0 || reserve_b == 0 || lp_supply == 0 {
        return Err(AmmError::ZeroLiquidity);
    }
    let lp_from_a = mul_div_floor(desired_a, lp_supply, reserve_a)?;
    let lp_from_b = mul_div_floor(desired_b, lp_supply, reserve_b)?;
    let lp_minted = lp_from_a.min(lp_from_b);

    let amount_a = mul_div_ceil(lp_minted, reserve_a, lp_supply)?;
    let amount_b = mul_div_ceil(lp_minted, reserve_b, lp_supply)?;
    debug_assert!(amount_a <= desired_a && amount_b <= desired_b);

    Ok(Deposit {
        amount_a,
        amount_b,
        lp_minted,
    })
}

/// Share of reserves redeemed by burning `lp_amount`, floored.
pub fn withdrawal_amounts(
    lp_amount: u64,
    reserve_a: u64,
    reserve_b: u64,
    lp_supply: u64,
) -> Result<(u64, u64), AmmError> {
    if lp_supply == 0 {
        return Err(AmmError::ZeroLiquidity);
    }
    if lp_amount > lp_supply {
        return Err(AmmError::ExceedsLpBalance);
    }
    let amount_a = mul_div_floor(lp_amount, reserve_a, lp_supply)?;
    let amount_b = mul_div_floor(lp_amount, reserve_b, lp_supply)?;
    Ok((amount_a, amount_b))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(4), 2);
        assert_eq!(isqrt(9), 3);
        assert_eq!(isqrt(100), 10);
        assert_eq!(isqrt(1_000_000), 1_000);
        // Non-perfect squares round down
        assert_eq!(isqrt(2), 1);
        assert_eq!(isqrt(8), 2);
        assert_eq!(isqrt(10), 3);
    }

    #[test]
    fn test_isqrt_large() {
        assert_eq!(isqrt(1_000_000_000_000_000_000), 1_000_000_000);
        let max = u64::MAX as u128 * u64::MAX as u128;
        assert_eq!(isqrt(max), u64::MAX as u128);
    }

    #[test]
    fn test_swap_quote_with_30_bps() {
        // 10 * 9970 / 10000 = 9; 100 * 9 / 109 = 8
        let q = swap_quote(10, 100, 100, 30).unwrap();
        assert_eq!(q.amount_in_after_fee, 9);
        assert_eq!(q.fee, 1);
        assert_eq!(q.amount_out, 8);
        assert!(constant_product_holds(100, 100, 110, 92));
    }

    #[test]
    fn test_swap_quote_large_reserves() {
        let reserve = 1_000_000_000u64;
        let q = swap_quote(100_000_000, reserve, reserve, 25).unwrap();
        assert!(q.amount_out < 100_000_000);
        assert!(q.amount_out > 90_000_000);
        assert!(constant_product_holds(
            reserve,
            reserve,
            reserve + 100_000_000,
            reserve - q.amount_out
        ));
    }

    #[test]
    fn test_swap_quote_fee_free() {
        let q = swap_quote(100, 1_000, 1_000, 0).unwrap();
        assert_eq!(q.fee, 0);
        assert_eq!(q.amount_out, 90); // 1000 * 100 / 1100
    }

    #[test]
    fn test_swap_quote_rejects_empty_pool() {
        assert_eq!(swap_quote(10, 0, 100, 30), Err(AmmError::ZeroLiquidity));
        assert_eq!(swap_quote(0, 100, 100, 30), Err(AmmError::ZeroAmount));
    }

    #[test]
    fn test_swap_quote_never_drains() {
        let q = swap_quote(u64::MAX, 1, 1_000, 30).unwrap();
        assert!(q.amount_out < 1_000);
    }

    #[test]
    fn test_initial_deposit_geometric_mean() {
        assert_eq!(initial_deposit(100, 100).unwrap().lp_minted, 100);
        assert_eq!(initial_deposit(1_000_000_000, 4_000_000_000).unwrap().lp_minted, 2_000_000_000);
        assert_eq!(initial_deposit(1, 2).unwrap().lp_minted, 1);
        assert_eq!(initial_deposit(u64::MAX, u64::MAX).unwrap().lp_minted, u64::MAX);
    }

    #[test]
    fn test_proportional_deposit() {
        let d = proportional_deposit(100, 200, 1_000, 2_000, 1_414).unwrap();
        assert_eq!(d.lp_minted, 141); // 100 * 1414 / 1000
        assert_eq!(d.amount_a, 100); // ceil(141 * 1000 / 1414) = 100
        assert_eq!(d.amount_b, 200); // ceil(141 * 2000 / 1414) = 200
    }

    #[test]
    fn test_proportional_deposit_excess_side_is_trimmed() {
        // Pool 110:92, 100 LP. Offer 55 A but 1000 B: A is limiting.
        let d = proportional_deposit(55, 1_000, 110, 92, 100).unwrap();
        assert_eq!(d.lp_minted, 50);
        assert_eq!(d.amount_a, 55);
        assert_eq!(d.amount_b, 46);
    }

    #[test]
    fn test_proportional_deposit_rounds_up_draw() {
        // 3 * 7 / 10 = 2 LP; draws ceil(2 * 10 / 7) = 3 and ceil(2 * 10 / 7) = 3
        let d = proportional_deposit(3, 3, 10, 10, 7).unwrap();
        assert_eq!(d.lp_minted, 2);
        assert_eq!(d.amount_a, 3);
        assert_eq!(d.amount_b, 3);
    }

    #[test]
    fn test_proportional_deposit_dust_mints_nothing() {
        let d = proportional_deposit(1, 1, 1_000, 1_000, 10).unwrap();
        assert_eq!(d.lp_minted, 0);
        assert_eq!(d.amount_a, 0);
        assert_eq!(d.amount_b, 0);
    }

    #[test]
    fn test_withdrawal_amounts() {
        assert_eq!(withdrawal_amounts(50, 110, 92, 100).unwrap(), (55, 46));
        assert_eq!(withdrawal_amounts(1_414, 10_000, 20_000, 14_142).unwrap(), (999, 1_999));
        assert_eq!(withdrawal_amounts(100, 110, 92, 100).unwrap(), (110, 92));
        assert_eq!(withdrawal_amounts(1, 1, 1, 0), Err(AmmError::ZeroLiquidity));
        assert_eq!(withdrawal_amounts(101, 1, 1, 100), Err(AmmError::ExceedsLpBalance));
    }
}
