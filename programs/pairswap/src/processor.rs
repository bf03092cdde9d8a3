use solana_program::{instruction::AccountMeta, msg, pubkey::Pubkey};
use spl_associated_token_account::get_associated_token_address;

use crate::config::AmmConfig;
use crate::error::AmmError;
use crate::instruction::{AddLiquidityArgs, AmmInstruction, RemoveLiquidityArgs, SwapArgs};
use crate::math;
use crate::pda::{self, PoolAddresses};
use crate::state::PoolAccount;
use crate::store::{Changeset, StoredAccount};
use crate::token;

pub fn process_instruction(
    program_id: &Pubkey,
    config: &AmmConfig,
    cs: &mut Changeset,
    accounts: &[AccountMeta],
    data: &[u8],
) -> Result<(), AmmError> {
    match AmmInstruction::unpack(data)? {
        AmmInstruction::Initialize => process_initialize(program_id, config, cs, accounts),
        AmmInstruction::AddLiquidity(args) => process_add_liquidity(program_id, cs, accounts, args),
        AmmInstruction::Swap(args) => process_swap(program_id, config, cs, accounts, args),
        AmmInstruction::RemoveLiquidity(args) => {
            process_remove_liquidity(program_id, cs, accounts, args)
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn next_account<'a>(
    iter: &mut impl Iterator<Item = &'a AccountMeta>,
) -> Result<&'a AccountMeta, AmmError> {
    iter.next().ok_or(AmmError::NotEnoughAccountKeys)
}

fn assert_signer(meta: &AccountMeta) -> Result<(), AmmError> {
    if !meta.is_signer {
        return Err(AmmError::AccountNotSigner);
    }
    Ok(())
}

fn assert_writable(meta: &AccountMeta) -> Result<(), AmmError> {
    if !meta.is_writable {
        return Err(AmmError::AccountNotWritable);
    }
    Ok(())
}

/// Load a pool record and check that `pool_key` re-derives from its own
/// mints and bump.
pub(crate) fn load_pool(
    cs: &Changeset,
    program_id: &Pubkey,
    pool_key: &Pubkey,
) -> Result<PoolAccount, AmmError> {
    let account = cs.get(pool_key).ok_or(AmmError::NotInitialized)?;
    if account.owner != *program_id {
        return Err(AmmError::InvalidOwner);
    }
    let pool = PoolAccount::unpack(&account.data)?;
    let expected = pda::pool_address_with_bump(program_id, &pool.token_a, &pool.token_b, pool.bump)?;
    if expected != *pool_key {
        return Err(AmmError::InvalidPDA);
    }
    Ok(pool)
}

fn store_pool(
    cs: &mut Changeset,
    program_id: &Pubkey,
    pool_key: &Pubkey,
    pool: &PoolAccount,
) -> Result<(), AmmError> {
    cs.put(*pool_key, StoredAccount::new(*program_id, pool.pack()?));
    Ok(())
}

/// Vault balances must equal the recorded reserves before anything commits.
fn assert_vaults_match(
    cs: &Changeset,
    pool: &PoolAccount,
    addrs: &PoolAddresses,
) -> Result<(), AmmError> {
    if token::balance(cs, &addrs.vault_a)? != pool.reserve_a
        || token::balance(cs, &addrs.vault_b)? != pool.reserve_b
    {
        msg!("Vault balances diverged from pool reserves");
        return Err(AmmError::InvariantViolated);
    }
    Ok(())
}

/// Accept an existing LP token account, or create the owner's associated
/// token account for the LP mint if that is what was passed.
fn ensure_lp_account(
    cs: &mut Changeset,
    owner: &Pubkey,
    user_lp: &Pubkey,
    lp_mint: &Pubkey,
) -> Result<(), AmmError> {
    if cs.exists(user_lp) {
        if token::load_token_account(cs, user_lp)?.mint != *lp_mint {
            return Err(AmmError::InvalidToken);
        }
        return Ok(());
    }
    if *user_lp != get_associated_token_address(owner, lp_mint) {
        msg!("LP account does not exist and is not the owner's associated token account");
        return Err(AmmError::AccountNotFound);
    }
    token::initialize_account(cs, user_lp, lp_mint, owner)
}

// ---------------------------------------------------------------------------
// Instruction 0: Initialize
// ---------------------------------------------------------------------------
// Accounts:
//   0. [signer]   payer
//   1. [writable] pool PDA (seeds: ["pool", mint_a, mint_b])
//   2. []         mint_a
//   3. []         mint_b
//   4. [writable] lp_mint PDA (seeds: ["lp_mint", mint_a, mint_b])
//   5. [writable] vault_a PDA (seeds: ["vault_a", pool])
//   6. [writable] vault_b PDA (seeds: ["vault_b", pool])

fn process_initialize(
    program_id: &Pubkey,
    config: &AmmConfig,
    cs: &mut Changeset,
    accounts: &[AccountMeta],
) -> Result<(), AmmError> {
    let iter = &mut accounts.iter();
    let payer = next_account(iter)?;
    let pool_info = next_account(iter)?;
    let mint_x_info = next_account(iter)?;
    let mint_y_info = next_account(iter)?;
    let lp_mint_info = next_account(iter)?;
    let vault_a_info = next_account(iter)?;
    let vault_b_info = next_account(iter)?;

    assert_signer(payer)?;
    assert_writable(pool_info)?;
    assert_writable(lp_mint_info)?;
    assert_writable(vault_a_info)?;
    assert_writable(vault_b_info)?;

    // Mints may arrive in either order; the pool stores them sorted.
    let addrs = pda::derive_pool_addresses(program_id, &mint_x_info.pubkey, &mint_y_info.pubkey)?;
    if pool_info.pubkey != addrs.pool
        || lp_mint_info.pubkey != addrs.lp_mint
        || vault_a_info.pubkey != addrs.vault_a
        || vault_b_info.pubkey != addrs.vault_b
    {
        return Err(AmmError::InvalidPDA);
    }

    if cs.exists(&addrs.pool) {
        return Err(AmmError::AlreadyInitialized);
    }

    token::load_mint(cs, &addrs.mint_a)?;
    token::load_mint(cs, &addrs.mint_b)?;

    // LP mint and both vaults are controlled by the pool PDA.
    token::initialize_mint(cs, &addrs.lp_mint, &addrs.pool, config.lp_decimals)?;
    token::initialize_account(cs, &addrs.vault_a, &addrs.mint_a, &addrs.pool)?;
    token::initialize_account(cs, &addrs.vault_b, &addrs.mint_b, &addrs.pool)?;

    let pool = PoolAccount::new(addrs.mint_a, addrs.mint_b, addrs.pool_bump);
    store_pool(cs, program_id, &addrs.pool, &pool)?;

    msg!(
        "EVENT:PoolInitialized:{{\"payer\":\"{}\",\"pool\":\"{}\",\"mint_a\":\"{}\",\"mint_b\":\"{}\",\"lp_mint\":\"{}\",\"bump\":{}}}",
        payer.pubkey,
        addrs.pool,
        addrs.mint_a,
        addrs.mint_b,
        addrs.lp_mint,
        addrs.pool_bump,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction 1: AddLiquidity
// ---------------------------------------------------------------------------
// Accounts:
//   0. [signer]   depositor
//   1. [writable] pool PDA
//   2. [writable] depositor_token_a
//   3. [writable] depositor_token_b
//   4. [writable] vault_a
//   5. [writable] vault_b
//   6. [writable] depositor_lp (created inline when it is the depositor's ATA)
//   7. [writable] lp_mint

fn process_add_liquidity(
    program_id: &Pubkey,
    cs: &mut Changeset,
    accounts: &[AccountMeta],
    args: AddLiquidityArgs,
) -> Result<(), AmmError> {
    let iter = &mut accounts.iter();
    let depositor = next_account(iter)?;
    let pool_info = next_account(iter)?;
    let depositor_token_a = next_account(iter)?;
    let depositor_token_b = next_account(iter)?;
    let vault_a_info = next_account(iter)?;
    let vault_b_info = next_account(iter)?;
    let depositor_lp = next_account(iter)?;
    let lp_mint_info = next_account(iter)?;

    assert_signer(depositor)?;
    assert_writable(pool_info)?;
    assert_writable(depositor_token_a)?;
    assert_writable(depositor_token_b)?;
    assert_writable(vault_a_info)?;
    assert_writable(vault_b_info)?;
    assert_writable(depositor_lp)?;
    assert_writable(lp_mint_info)?;

    if args.amount_a == 0 || args.amount_b == 0 {
        return Err(AmmError::ZeroAmount);
    }

    let mut pool = load_pool(cs, program_id, &pool_info.pubkey)?;
    let addrs = pda::derive_pool_addresses(program_id, &pool.token_a, &pool.token_b)?;
    if vault_a_info.pubkey != addrs.vault_a
        || vault_b_info.pubkey != addrs.vault_b
        || lp_mint_info.pubkey != addrs.lp_mint
    {
        return Err(AmmError::InvalidPDA);
    }

    let user_a = token::load_token_account(cs, &depositor_token_a.pubkey)?;
    let user_b = token::load_token_account(cs, &depositor_token_b.pubkey)?;
    if user_a.mint != pool.token_a || user_b.mint != pool.token_b {
        return Err(AmmError::InvalidToken);
    }
    if user_a.amount < args.amount_a || user_b.amount < args.amount_b {
        return Err(AmmError::InsufficientCallerBalance);
    }

    ensure_lp_account(cs, &depositor.pubkey, &depositor_lp.pubkey, &addrs.lp_mint)?;

    let lp_supply = token::load_mint(cs, &addrs.lp_mint)?.supply;
    let deposit = if lp_supply == 0 {
        // First deposit fixes the price: reserves become exactly the amounts offered.
        math::initial_deposit(args.amount_a, args.amount_b)?
    } else {
        math::proportional_deposit(
            args.amount_a,
            args.amount_b,
            pool.reserve_a,
            pool.reserve_b,
            lp_supply,
        )?
    };

    if deposit.lp_minted == 0 {
        return Err(AmmError::InsufficientLiquidityMinted);
    }

    pool.reserve_a = pool
        .reserve_a
        .checked_add(deposit.amount_a)
        .ok_or(AmmError::ReserveOverflow)?;
    pool.reserve_b = pool
        .reserve_b
        .checked_add(deposit.amount_b)
        .ok_or(AmmError::ReserveOverflow)?;

    // Transfer tokens from depositor to vaults
    token::transfer(
        cs,
        &depositor_token_a.pubkey,
        &addrs.vault_a,
        &depositor.pubkey,
        deposit.amount_a,
    )?;
    token::transfer(
        cs,
        &depositor_token_b.pubkey,
        &addrs.vault_b,
        &depositor.pubkey,
        deposit.amount_b,
    )?;

    // Mint LP tokens to depositor (pool PDA is mint authority)
    token::mint_to(
        cs,
        &addrs.lp_mint,
        &depositor_lp.pubkey,
        &addrs.pool,
        deposit.lp_minted,
    )?;

    store_pool(cs, program_id, &addrs.pool, &pool)?;
    assert_vaults_match(cs, &pool, &addrs)?;

    msg!(
        "EVENT:LiquidityAdded:{{\"depositor\":\"{}\",\"pool\":\"{}\",\"deposit_a\":{},\"deposit_b\":{},\"lp_minted\":{}}}",
        depositor.pubkey,
        addrs.pool,
        deposit.amount_a,
        deposit.amount_b,
        deposit.lp_minted,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction 2: Swap
// ---------------------------------------------------------------------------
// Accounts:
//   0. [signer]   trader
//   1. [writable] pool PDA
//   2. [writable] vault_a
//   3. [writable] vault_b
//   4. [writable] trader_source (holds input_mint)
//   5. [writable] trader_destination (holds the other mint)

fn process_swap(
    program_id: &Pubkey,
    config: &AmmConfig,
    cs: &mut Changeset,
    accounts: &[AccountMeta],
    args: SwapArgs,
) -> Result<(), AmmError> {
    let iter = &mut accounts.iter();
    let trader = next_account(iter)?;
    let pool_info = next_account(iter)?;
    let vault_a_info = next_account(iter)?;
    let vault_b_info = next_account(iter)?;
    let trader_source = next_account(iter)?;
    let trader_destination = next_account(iter)?;

    assert_signer(trader)?;
    assert_writable(pool_info)?;
    assert_writable(vault_a_info)?;
    assert_writable(vault_b_info)?;
    assert_writable(trader_source)?;
    assert_writable(trader_destination)?;

    if args.amount_in == 0 {
        return Err(AmmError::ZeroAmount);
    }

    let mut pool = load_pool(cs, program_id, &pool_info.pubkey)?;
    let addrs = pda::derive_pool_addresses(program_id, &pool.token_a, &pool.token_b)?;
    if vault_a_info.pubkey != addrs.vault_a || vault_b_info.pubkey != addrs.vault_b {
        return Err(AmmError::InvalidPDA);
    }

    let side_in = pool.side_of(&args.input_mint).ok_or(AmmError::InvalidToken)?;
    let side_out = side_in.other();

    let source = token::load_token_account(cs, &trader_source.pubkey)?;
    let destination = token::load_token_account(cs, &trader_destination.pubkey)?;
    if source.mint != args.input_mint || destination.mint != pool.mint(side_out) {
        return Err(AmmError::InvalidToken);
    }

    if !pool.is_funded() {
        return Err(AmmError::ZeroLiquidity);
    }
    if source.amount < args.amount_in {
        return Err(AmmError::InsufficientCallerBalance);
    }

    let reserve_in = pool.reserve(side_in);
    let reserve_out = pool.reserve(side_out);
    let quote = math::swap_quote(args.amount_in, reserve_in, reserve_out, config.fee_bps)?;

    if quote.amount_out == 0 {
        return Err(AmmError::ZeroAmount);
    }
    if quote.amount_out >= reserve_out {
        return Err(AmmError::InsufficientLiquidity);
    }
    if quote.amount_out < args.min_amount_out {
        return Err(AmmError::SlippageExceeded);
    }

    // The whole input (fee included) stays in the pool.
    let new_reserve_in = reserve_in
        .checked_add(args.amount_in)
        .ok_or(AmmError::ReserveOverflow)?;
    let new_reserve_out = reserve_out
        .checked_sub(quote.amount_out)
        .ok_or(AmmError::Overflow)?;
    if !math::constant_product_holds(reserve_in, reserve_out, new_reserve_in, new_reserve_out) {
        return Err(AmmError::InvariantViolated);
    }

    // 1. Input tokens from trader to the input vault
    token::transfer(
        cs,
        &trader_source.pubkey,
        &addrs.vault(side_in),
        &trader.pubkey,
        args.amount_in,
    )?;

    // 2. Output tokens from the output vault to trader, signed by the pool PDA
    token::transfer(
        cs,
        &addrs.vault(side_out),
        &trader_destination.pubkey,
        &addrs.pool,
        quote.amount_out,
    )?;

    pool.set_reserve(side_in, new_reserve_in);
    pool.set_reserve(side_out, new_reserve_out);

    store_pool(cs, program_id, &addrs.pool, &pool)?;
    assert_vaults_match(cs, &pool, &addrs)?;

    msg!(
        "EVENT:Swap:{{\"trader\":\"{}\",\"pool\":\"{}\",\"input_mint\":\"{}\",\"amount_in\":{},\"amount_out\":{},\"fee\":{},\"reserve_a\":{},\"reserve_b\":{}}}",
        trader.pubkey,
        addrs.pool,
        args.input_mint,
        args.amount_in,
        quote.amount_out,
        quote.fee,
        pool.reserve_a,
        pool.reserve_b,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction 3: RemoveLiquidity
// ---------------------------------------------------------------------------
// Accounts:
//   0. [signer]   withdrawer
//   1. [writable] pool PDA
//   2. [writable] withdrawer_token_a
//   3. [writable] withdrawer_token_b
//   4. [writable] withdrawer_lp (LP tokens burned from here)
//
// Vaults and the LP mint are derived from the pool.

fn process_remove_liquidity(
    program_id: &Pubkey,
    cs: &mut Changeset,
    accounts: &[AccountMeta],
    args: RemoveLiquidityArgs,
) -> Result<(), AmmError> {
    let iter = &mut accounts.iter();
    let withdrawer = next_account(iter)?;
    let pool_info = next_account(iter)?;
    let withdrawer_token_a = next_account(iter)?;
    let withdrawer_token_b = next_account(iter)?;
    let withdrawer_lp = next_account(iter)?;

    assert_signer(withdrawer)?;
    assert_writable(pool_info)?;
    assert_writable(withdrawer_token_a)?;
    assert_writable(withdrawer_token_b)?;
    assert_writable(withdrawer_lp)?;

    if args.lp_amount == 0 {
        return Err(AmmError::ZeroAmount);
    }

    let mut pool = load_pool(cs, program_id, &pool_info.pubkey)?;
    let addrs = pda::derive_pool_addresses(program_id, &pool.token_a, &pool.token_b)?;

    let user_a = token::load_token_account(cs, &withdrawer_token_a.pubkey)?;
    let user_b = token::load_token_account(cs, &withdrawer_token_b.pubkey)?;
    if user_a.mint != pool.token_a || user_b.mint != pool.token_b {
        return Err(AmmError::InvalidToken);
    }

    let lp_account = token::load_token_account(cs, &withdrawer_lp.pubkey)?;
    if lp_account.mint != addrs.lp_mint {
        return Err(AmmError::InvalidToken);
    }
    if lp_account.owner != withdrawer.pubkey {
        return Err(AmmError::InvalidAuthority);
    }
    if args.lp_amount > lp_account.amount {
        return Err(AmmError::ExceedsLpBalance);
    }

    let lp_supply = token::load_mint(cs, &addrs.lp_mint)?.supply;
    let (amount_a, amount_b) =
        math::withdrawal_amounts(args.lp_amount, pool.reserve_a, pool.reserve_b, lp_supply)?;

    pool.reserve_a = pool
        .reserve_a
        .checked_sub(amount_a)
        .ok_or(AmmError::Overflow)?;
    pool.reserve_b = pool
        .reserve_b
        .checked_sub(amount_b)
        .ok_or(AmmError::Overflow)?;

    // Burn LP tokens from withdrawer
    token::burn(
        cs,
        &withdrawer_lp.pubkey,
        &addrs.lp_mint,
        &withdrawer.pubkey,
        args.lp_amount,
    )?;

    // Transfer tokens from vaults to withdrawer
    if amount_a > 0 {
        token::transfer(
            cs,
            &addrs.vault_a,
            &withdrawer_token_a.pubkey,
            &addrs.pool,
            amount_a,
        )?;
    }
    if amount_b > 0 {
        token::transfer(
            cs,
            &addrs.vault_b,
            &withdrawer_token_b.pubkey,
            &addrs.pool,
            amount_b,
        )?;
    }

    store_pool(cs, program_id, &addrs.pool, &pool)?;
    assert_vaults_match(cs, &pool, &addrs)?;

    msg!(
        "EVENT:LiquidityRemoved:{{\"withdrawer\":\"{}\",\"pool\":\"{}\",\"lp_burned\":{},\"amount_a\":{},\"amount_b\":{}}}",
        withdrawer.pubkey,
        addrs.pool,
        args.lp_amount,
        amount_a,
        amount_b,
    );

    Ok(())
}
