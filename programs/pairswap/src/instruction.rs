//! Instruction data layouts and builders.
//!
//! Data is one discriminator byte followed by the borsh-encoded arguments.
//!
//! Instructions:
//!   0 = Initialize
//!   1 = AddLiquidity
//!   2 = Swap
//!   3 = RemoveLiquidity

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use crate::error::AmmError;
use crate::pda::derive_pool_addresses;

// ── Instruction Discriminators ──────────────────────────────────────────────

pub const IX_INITIALIZE: u8 = 0;
pub const IX_ADD_LIQUIDITY: u8 = 1;
pub const IX_SWAP: u8 = 2;
pub const IX_REMOVE_LIQUIDITY: u8 = 3;

// ── Args ────────────────────────────────────────────────────────────────────

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddLiquidityArgs {
    pub amount_a: u64,
    pub amount_b: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapArgs {
    pub input_mint: Pubkey,
    pub amount_in: u64,
    pub min_amount_out: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveLiquidityArgs {
    pub lp_amount: u64,
}

/// Decoded instruction data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmmInstruction {
    Initialize,
    AddLiquidity(AddLiquidityArgs),
    Swap(SwapArgs),
    RemoveLiquidity(RemoveLiquidityArgs),
}

impl AmmInstruction {
    pub fn unpack(data: &[u8]) -> Result<Self, AmmError> {
        let (&disc, rest) = data.split_first().ok_or(AmmError::InvalidInstruction)?;
        Ok(match disc {
            IX_INITIALIZE if rest.is_empty() => AmmInstruction::Initialize,
            IX_ADD_LIQUIDITY => AmmInstruction::AddLiquidity(decode(rest)?),
            IX_SWAP => AmmInstruction::Swap(decode(rest)?),
            IX_REMOVE_LIQUIDITY => AmmInstruction::RemoveLiquidity(decode(rest)?),
            _ => return Err(AmmError::InvalidInstruction),
        })
    }

    pub fn pack(&self) -> Vec<u8> {
        fn with_args(disc: u8, args: &impl BorshSerialize) -> Vec<u8> {
            let mut data = vec![disc];
            // writing into a Vec cannot fail
            let _ = args.serialize(&mut data);
            data
        }
        match self {
            AmmInstruction::Initialize => vec![IX_INITIALIZE],
            AmmInstruction::AddLiquidity(args) => with_args(IX_ADD_LIQUIDITY, args),
            AmmInstruction::Swap(args) => with_args(IX_SWAP, args),
            AmmInstruction::RemoveLiquidity(args) => with_args(IX_REMOVE_LIQUIDITY, args),
        }
    }
}

fn decode<T: BorshDeserialize>(data: &[u8]) -> Result<T, AmmError> {
    T::try_from_slice(data).map_err(|_| AmmError::InvalidInstruction)
}

// ── Instruction Builders ────────────────────────────────────────────────────

/// Create the pool, LP mint and vaults for a token pair (mints in any order).
///
/// Accounts:
///   0. `[signer]` payer
///   1. `[writable]` pool PDA
///   2. `[]` mint_a
///   3. `[]` mint_b
///   4. `[writable]` lp_mint PDA
///   5. `[writable]` vault_a PDA
///   6. `[writable]` vault_b PDA
pub fn initialize(
    program_id: &Pubkey,
    payer: &Pubkey,
    mint_x: &Pubkey,
    mint_y: &Pubkey,
) -> Result<Instruction, AmmError> {
    let addrs = derive_pool_addresses(program_id, mint_x, mint_y)?;
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(addrs.pool, false),
            AccountMeta::new_readonly(addrs.mint_a, false),
            AccountMeta::new_readonly(addrs.mint_b, false),
            AccountMeta::new(addrs.lp_mint, false),
            AccountMeta::new(addrs.vault_a, false),
            AccountMeta::new(addrs.vault_b, false),
        ],
        data: AmmInstruction::Initialize.pack(),
    })
}

/// Deposit into the pool for `(mint_x, mint_y)`. `user_token_a` and
/// `user_token_b` follow the pool's canonical (sorted) mint order, as do the
/// amounts.
///
/// Accounts:
///   0. `[signer]` depositor
///   1. `[writable]` pool PDA
///   2. `[writable]` user_token_a
///   3. `[writable]` user_token_b
///   4. `[writable]` vault_a
///   5. `[writable]` vault_b
///   6. `[writable]` user_lp (created if it is the depositor's ATA and missing)
///   7. `[writable]` lp_mint
#[allow(clippy::too_many_arguments)]
pub fn add_liquidity(
    program_id: &Pubkey,
    depositor: &Pubkey,
    mint_x: &Pubkey,
    mint_y: &Pubkey,
    user_token_a: &Pubkey,
    user_token_b: &Pubkey,
    user_lp: &Pubkey,
    amount_a: u64,
    amount_b: u64,
) -> Result<Instruction, AmmError> {
    let addrs = derive_pool_addresses(program_id, mint_x, mint_y)?;
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*depositor, true),
            AccountMeta::new(addrs.pool, false),
            AccountMeta::new(*user_token_a, false),
            AccountMeta::new(*user_token_b, false),
            AccountMeta::new(addrs.vault_a, false),
            AccountMeta::new(addrs.vault_b, false),
            AccountMeta::new(*user_lp, false),
            AccountMeta::new(addrs.lp_mint, false),
        ],
        data: AmmInstruction::AddLiquidity(AddLiquidityArgs { amount_a, amount_b }).pack(),
    })
}

/// Swap `amount_in` of `input_mint` for the pool's other asset.
///
/// Accounts:
///   0. `[signer]` trader
///   1. `[writable]` pool PDA
///   2. `[writable]` vault_a
///   3. `[writable]` vault_b
///   4. `[writable]` user_source (holds `input_mint`)
///   5. `[writable]` user_destination
#[allow(clippy::too_many_arguments)]
pub fn swap(
    program_id: &Pubkey,
    trader: &Pubkey,
    mint_x: &Pubkey,
    mint_y: &Pubkey,
    user_source: &Pubkey,
    user_destination: &Pubkey,
    input_mint: &Pubkey,
    amount_in: u64,
    min_amount_out: u64,
) -> Result<Instruction, AmmError> {
    let addrs = derive_pool_addresses(program_id, mint_x, mint_y)?;
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*trader, true),
            AccountMeta::new(addrs.pool, false),
            AccountMeta::new(addrs.vault_a, false),
            AccountMeta::new(addrs.vault_b, false),
            AccountMeta::new(*user_source, false),
            AccountMeta::new(*user_destination, false),
        ],
        data: AmmInstruction::Swap(SwapArgs {
            input_mint: *input_mint,
            amount_in,
            min_amount_out,
        })
        .pack(),
    })
}

/// Burn `lp_amount` LP tokens for a proportional share of both reserves.
/// Vaults and the LP mint are derived from the pool by the program.
///
/// Accounts:
///   0. `[signer]` withdrawer
///   1. `[writable]` pool PDA
///   2. `[writable]` user_token_a
///   3. `[writable]` user_token_b
///   4. `[writable]` user_lp
#[allow(clippy::too_many_arguments)]
pub fn remove_liquidity(
    program_id: &Pubkey,
    withdrawer: &Pubkey,
    mint_x: &Pubkey,
    mint_y: &Pubkey,
    user_token_a: &Pubkey,
    user_token_b: &Pubkey,
    user_lp: &Pubkey,
    lp_amount: u64,
) -> Result<Instruction, AmmError> {
    let addrs = derive_pool_addresses(program_id, mint_x, mint_y)?;
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*withdrawer, true),
            AccountMeta::new(addrs.pool, false),
            AccountMeta::new(*user_token_a, false),
            AccountMeta::new(*user_token_b, false),
            AccountMeta::new(*user_lp, false),
        ],
        data: AmmInstruction::RemoveLiquidity(RemoveLiquidityArgs { lp_amount }).pack(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_data_layout() {
        let mint = Pubkey::new_from_array([7u8; 32]);
        let data = AmmInstruction::Swap(SwapArgs {
            input_mint: mint,
            amount_in: 10,
            min_amount_out: 8,
        })
        .pack();
        assert_eq!(data.len(), 1 + 32 + 8 + 8);
        assert_eq!(data[0], IX_SWAP);
        assert_eq!(&data[1..33], &[7u8; 32]);
        assert_eq!(&data[33..41], &10u64.to_le_bytes());
        assert_eq!(&data[41..49], &8u64.to_le_bytes());
    }

    #[test]
    fn test_unpack() {
        let ix = AmmInstruction::AddLiquidity(AddLiquidityArgs {
            amount_a: 100,
            amount_b: 200,
        });
        assert_eq!(AmmInstruction::unpack(&ix.pack()).unwrap(), ix);
        assert_eq!(
            AmmInstruction::unpack(&[IX_INITIALIZE]).unwrap(),
            AmmInstruction::Initialize
        );
    }

    #[test]
    fn test_unpack_rejects_bad_data() {
        assert_eq!(AmmInstruction::unpack(&[]), Err(AmmError::InvalidInstruction));
        assert_eq!(AmmInstruction::unpack(&[9]), Err(AmmError::InvalidInstruction));
        assert_eq!(AmmInstruction::unpack(&[IX_INITIALIZE, 0]), Err(AmmError::InvalidInstruction));
        // truncated u64
        assert_eq!(
            AmmInstruction::unpack(&[IX_REMOVE_LIQUIDITY, 1, 2, 3]),
            Err(AmmError::InvalidInstruction)
        );
    }

    #[test]
    fn test_initialize_builder_sorts_mints() {
        let program_id = crate::id();
        let payer = Pubkey::new_unique();
        let x = Pubkey::new_unique();
        let y = Pubkey::new_unique();
        let ix1 = initialize(&program_id, &payer, &x, &y).unwrap();
        let ix2 = initialize(&program_id, &payer, &y, &x).unwrap();
        assert_eq!(ix1, ix2);
        assert_eq!(ix1.accounts.len(), 7);
        assert!(ix1.accounts[0].is_signer);
        assert!(ix1.accounts[2].pubkey < ix1.accounts[3].pubkey);
    }

    #[test]
    fn test_builders_reject_identical_mints() {
        let program_id = crate::id();
        let m = Pubkey::new_unique();
        assert_eq!(
            initialize(&program_id, &Pubkey::new_unique(), &m, &m),
            Err(AmmError::IdenticalAssets)
        );
    }
}
