use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::error::AmmError;
use crate::pda::Side;

// ---------------------------------------------------------------------------
// State: PoolAccount
// ---------------------------------------------------------------------------

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolAccount {
    pub token_a: Pubkey, // 32
    pub token_b: Pubkey, // 32
    pub reserve_a: u64,  // 8
    pub reserve_b: u64,  // 8
    pub bump: u8,        // 1
}

impl PoolAccount {
    pub const SIZE: usize = 32 + 32 + 8 + 8 + 1; // 81

    pub fn new(token_a: Pubkey, token_b: Pubkey, bump: u8) -> Self {
        Self {
            token_a,
            token_b,
            reserve_a: 0,
            reserve_b: 0,
            bump,
        }
    }

    pub fn unpack(data: &[u8]) -> Result<Self, AmmError> {
        Self::try_from_slice(data).map_err(|_| AmmError::InvalidAccountData)
    }

    pub fn pack(&self) -> Result<Vec<u8>, AmmError> {
        borsh::to_vec(self).map_err(|_| AmmError::InvalidAccountData)
    }

    /// Which side of the pool holds `mint`, if any.
    pub fn side_of(&self, mint: &Pubkey) -> Option<Side> {
        if *mint == self.token_a {
            Some(Side::A)
        } else if *mint == self.token_b {
            Some(Side::B)
        } else {
            None
        }
    }

    pub fn mint(&self, side: Side) -> Pubkey {
        match side {
            Side::A => self.token_a,
            Side::B => self.token_b,
        }
    }

    pub fn reserve(&self, side: Side) -> u64 {
        match side {
            Side::A => self.reserve_a,
            Side::B => self.reserve_b,
        }
    }

    pub fn set_reserve(&mut self, side: Side, amount: u64) {
        match side {
            Side::A => self.reserve_a = amount,
            Side::B => self.reserve_b = amount,
        }
    }

    pub fn is_funded(&self) -> bool {
        self.reserve_a > 0 && self.reserve_b > 0
    }
}

/// Lifecycle position of a token pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolStatus {
    Uninitialized,
    /// Reserves (0, 0) and no LP outstanding.
    Empty,
    Funded,
}

impl PoolStatus {
    pub fn of(pool: Option<&PoolAccount>, lp_supply: u64) -> Self {
        match pool {
            None => PoolStatus::Uninitialized,
            Some(p) if p.is_funded() && lp_supply > 0 => PoolStatus::Funded,
            Some(_) => PoolStatus::Empty,
        }
    }
}
