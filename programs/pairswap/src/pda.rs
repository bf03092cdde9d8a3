//! Program-derived addresses for a pool and the accounts it controls.
//!
//! Pool and LP mint addresses are keyed by the canonical (sorted) mint pair,
//! so `(x, y)` and `(y, x)` resolve to the same pool. Vaults are keyed by the
//! pool address.

use solana_program::pubkey::Pubkey;

use crate::error::AmmError;

pub const POOL_SEED: &[u8] = b"pool";
pub const LP_MINT_SEED: &[u8] = b"lp_mint";
pub const VAULT_A_SEED: &[u8] = b"vault_a";
pub const VAULT_B_SEED: &[u8] = b"vault_b";

/// Which of the pool's two assets an account refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn vault_seed(self) -> &'static [u8] {
        match self {
            Side::A => VAULT_A_SEED,
            Side::B => VAULT_B_SEED,
        }
    }

    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

/// Every address `initialize` creates for a token pair, with their bumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolAddresses {
    pub mint_a: Pubkey,
    pub mint_b: Pubkey,
    pub pool: Pubkey,
    pub pool_bump: u8,
    pub lp_mint: Pubkey,
    pub lp_mint_bump: u8,
    pub vault_a: Pubkey,
    pub vault_a_bump: u8,
    pub vault_b: Pubkey,
    pub vault_b_bump: u8,
}

impl PoolAddresses {
    pub fn vault(&self, side: Side) -> Pubkey {
        match side {
            Side::A => self.vault_a,
            Side::B => self.vault_b,
        }
    }
}

/// Sort two mints and return (lower, higher). Returns error if identical.
pub fn sort_mints<'a>(
    mint_x: &'a Pubkey,
    mint_y: &'a Pubkey,
) -> Result<(&'a Pubkey, &'a Pubkey), AmmError> {
    if mint_x == mint_y {
        return Err(AmmError::IdenticalAssets);
    }
    if mint_x < mint_y {
        Ok((mint_x, mint_y))
    } else {
        Ok((mint_y, mint_x))
    }
}

fn find(seeds: &[&[u8]], program_id: &Pubkey) -> Result<(Pubkey, u8), AmmError> {
    Pubkey::try_find_program_address(seeds, program_id).ok_or(AmmError::NoViableBump)
}

pub fn find_pool_address(
    program_id: &Pubkey,
    mint_x: &Pubkey,
    mint_y: &Pubkey,
) -> Result<(Pubkey, u8), AmmError> {
    let (mint_a, mint_b) = sort_mints(mint_x, mint_y)?;
    find(&[POOL_SEED, mint_a.as_ref(), mint_b.as_ref()], program_id)
}

pub fn find_lp_mint_address(
    program_id: &Pubkey,
    mint_x: &Pubkey,
    mint_y: &Pubkey,
) -> Result<(Pubkey, u8), AmmError> {
    let (mint_a, mint_b) = sort_mints(mint_x, mint_y)?;
    find(&[LP_MINT_SEED, mint_a.as_ref(), mint_b.as_ref()], program_id)
}

pub fn find_vault_address(
    program_id: &Pubkey,
    pool: &Pubkey,
    side: Side,
) -> Result<(Pubkey, u8), AmmError> {
    find(&[side.vault_seed(), pool.as_ref()], program_id)
}

pub fn derive_pool_addresses(
    program_id: &Pubkey,
    mint_x: &Pubkey,
    mint_y: &Pubkey,
) -> Result<PoolAddresses, AmmError> {
    let (mint_a, mint_b) = sort_mints(mint_x, mint_y)?;
    let (pool, pool_bump) = find_pool_address(program_id, mint_a, mint_b)?;
    let (lp_mint, lp_mint_bump) = find_lp_mint_address(program_id, mint_a, mint_b)?;
    let (vault_a, vault_a_bump) = find_vault_address(program_id, &pool, Side::A)?;
    let (vault_b, vault_b_bump) = find_vault_address(program_id, &pool, Side::B)?;

    Ok(PoolAddresses {
        mint_a: *mint_a,
        mint_b: *mint_b,
        pool,
        pool_bump,
        lp_mint,
        lp_mint_bump,
        vault_a,
        vault_a_bump,
        vault_b,
        vault_b_bump,
    })
}

/// Recompute a pool address from its recorded mints and bump, without the
/// bump search.
pub fn pool_address_with_bump(
    program_id: &Pubkey,
    mint_a: &Pubkey,
    mint_b: &Pubkey,
    bump: u8,
) -> Result<Pubkey, AmmError> {
    Pubkey::create_program_address(
        &[POOL_SEED, mint_a.as_ref(), mint_b.as_ref(), &[bump]],
        program_id,
    )
    .map_err(|_| AmmError::InvalidPDA)
}
