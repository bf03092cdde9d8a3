//! SPL token accounts held in the store: the LP mint, the pool vaults and
//! user balances. Records are packed with `spl_token::state` layouts and
//! owned by the SPL token program id.

use solana_program::{program_option::COption, program_pack::Pack, pubkey::Pubkey};
use spl_token::state::{Account as TokenAccount, AccountState, Mint};

use crate::error::AmmError;
use crate::store::{Changeset, StoredAccount};

pub fn load_mint(cs: &Changeset, key: &Pubkey) -> Result<Mint, AmmError> {
    let account = cs.get(key).ok_or(AmmError::AccountNotFound)?;
    if account.owner != spl_token::id() {
        return Err(AmmError::InvalidOwner);
    }
    Mint::unpack(&account.data).map_err(|_| AmmError::InvalidAccountData)
}

pub fn load_token_account(cs: &Changeset, key: &Pubkey) -> Result<TokenAccount, AmmError> {
    let account = cs.get(key).ok_or(AmmError::AccountNotFound)?;
    if account.owner != spl_token::id() {
        return Err(AmmError::InvalidOwner);
    }
    TokenAccount::unpack(&account.data).map_err(|_| AmmError::InvalidAccountData)
}

pub fn balance(cs: &Changeset, key: &Pubkey) -> Result<u64, AmmError> {
    Ok(load_token_account(cs, key)?.amount)
}

fn store_mint(cs: &mut Changeset, key: Pubkey, mint: Mint) -> Result<(), AmmError> {
    let mut data = vec![0u8; Mint::LEN];
    Mint::pack(mint, &mut data).map_err(|_| AmmError::InvalidAccountData)?;
    cs.put(key, StoredAccount::new(spl_token::id(), data));
    Ok(())
}

fn store_token_account(
    cs: &mut Changeset,
    key: Pubkey,
    account: TokenAccount,
) -> Result<(), AmmError> {
    let mut data = vec![0u8; TokenAccount::LEN];
    TokenAccount::pack(account, &mut data).map_err(|_| AmmError::InvalidAccountData)?;
    cs.put(key, StoredAccount::new(spl_token::id(), data));
    Ok(())
}

fn ensure_unfrozen(account: &TokenAccount) -> Result<(), AmmError> {
    if account.is_frozen() {
        return Err(AmmError::InvalidAccountData);
    }
    Ok(())
}

pub fn initialize_mint(
    cs: &mut Changeset,
    key: &Pubkey,
    mint_authority: &Pubkey,
    decimals: u8,
) -> Result<(), AmmError> {
    if cs.exists(key) {
        return Err(AmmError::AlreadyInitialized);
    }
    let mint = Mint {
        mint_authority: COption::Some(*mint_authority),
        supply: 0,
        decimals,
        is_initialized: true,
        freeze_authority: COption::None,
    };
    store_mint(cs, *key, mint)
}

pub fn initialize_account(
    cs: &mut Changeset,
    key: &Pubkey,
    mint: &Pubkey,
    owner: &Pubkey,
) -> Result<(), AmmError> {
    if cs.exists(key) {
        return Err(AmmError::AlreadyInitialized);
    }
    load_mint(cs, mint)?;
    let account = TokenAccount {
        mint: *mint,
        owner: *owner,
        state: AccountState::Initialized,
        ..TokenAccount::default()
    };
    store_token_account(cs, *key, account)
}

/// Move `amount` between two accounts of the same mint. `authority` must be
/// the source account's owner.
pub fn transfer(
    cs: &mut Changeset,
    source: &Pubkey,
    destination: &Pubkey,
    authority: &Pubkey,
    amount: u64,
) -> Result<(), AmmError> {
    let mut src = load_token_account(cs, source)?;
    let mut dst = load_token_account(cs, destination)?;
    ensure_unfrozen(&src)?;
    ensure_unfrozen(&dst)?;

    if src.mint != dst.mint {
        return Err(AmmError::InvalidToken);
    }
    if src.owner != *authority {
        return Err(AmmError::InvalidAuthority);
    }
    if src.amount < amount {
        return Err(AmmError::InsufficientFunds);
    }
    if source == destination {
        return Ok(());
    }

    src.amount = src.amount.checked_sub(amount).ok_or(AmmError::Overflow)?;
    dst.amount = dst.amount.checked_add(amount).ok_or(AmmError::Overflow)?;

    store_token_account(cs, *source, src)?;
    store_token_account(cs, *destination, dst)
}

/// Mint tokens; `authority` must be the mint authority.
pub fn mint_to(
    cs: &mut Changeset,
    mint_key: &Pubkey,
    destination: &Pubkey,
    authority: &Pubkey,
    amount: u64,
) -> Result<(), AmmError> {
    let mut mint = load_mint(cs, mint_key)?;
    let mut dst = load_token_account(cs, destination)?;
    ensure_unfrozen(&dst)?;

    if mint.mint_authority != COption::Some(*authority) {
        return Err(AmmError::InvalidAuthority);
    }
    if dst.mint != *mint_key {
        return Err(AmmError::InvalidToken);
    }

    mint.supply = mint.supply.checked_add(amount).ok_or(AmmError::Overflow)?;
    dst.amount = dst.amount.checked_add(amount).ok_or(AmmError::Overflow)?;

    store_mint(cs, *mint_key, mint)?;
    store_token_account(cs, *destination, dst)
}

/// Burn tokens from an account; `authority` must be its owner.
pub fn burn(
    cs: &mut Changeset,
    source: &Pubkey,
    mint_key: &Pubkey,
    authority: &Pubkey,
    amount: u64,
) -> Result<(), AmmError> {
    let mut mint = load_mint(cs, mint_key)?;
    let mut src = load_token_account(cs, source)?;
    ensure_unfrozen(&src)?;

    if src.mint != *mint_key {
        return Err(AmmError::InvalidToken);
    }
    if src.owner != *authority {
        return Err(AmmError::InvalidAuthority);
    }
    if src.amount < amount {
        return Err(AmmError::InsufficientFunds);
    }

    src.amount = src.amount.checked_sub(amount).ok_or(AmmError::Overflow)?;
    mint.supply = mint.supply.checked_sub(amount).ok_or(AmmError::Overflow)?;

    store_token_account(cs, *source, src)?;
    store_mint(cs, *mint_key, mint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AccountStore;

    struct Fixture {
        mint: Pubkey,
        authority: Pubkey,
        alice: Pubkey,
        alice_acct: Pubkey,
        bob_acct: Pubkey,
    }

    fn setup(cs: &mut Changeset) -> Fixture {
        let f = Fixture {
            mint: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
            alice: Pubkey::new_unique(),
            alice_acct: Pubkey::new_unique(),
            bob_acct: Pubkey::new_unique(),
        };
        initialize_mint(cs, &f.mint, &f.authority, 6).unwrap();
        initialize_account(cs, &f.alice_acct, &f.mint, &f.alice).unwrap();
        initialize_account(cs, &f.bob_acct, &f.mint, &Pubkey::new_unique()).unwrap();
        mint_to(cs, &f.mint, &f.alice_acct, &f.authority, 1_000).unwrap();
        f
    }

    #[test]
    fn test_mint_transfer_burn() {
        let store = AccountStore::new();
        let mut cs = store.begin();
        let f = setup(&mut cs);

        transfer(&mut cs, &f.alice_acct, &f.bob_acct, &f.alice, 400).unwrap();
        assert_eq!(balance(&cs, &f.alice_acct).unwrap(), 600);
        assert_eq!(balance(&cs, &f.bob_acct).unwrap(), 400);

        burn(&mut cs, &f.alice_acct, &f.mint, &f.alice, 100).unwrap();
        assert_eq!(balance(&cs, &f.alice_acct).unwrap(), 500);
        assert_eq!(load_mint(&cs, &f.mint).unwrap().supply, 900);
    }

    #[test]
    fn test_transfer_requires_owner_and_funds() {
        let store = AccountStore::new();
        let mut cs = store.begin();
        let f = setup(&mut cs);

        assert_eq!(
            transfer(&mut cs, &f.alice_acct, &f.bob_acct, &f.authority, 1),
            Err(AmmError::InvalidAuthority)
        );
        assert_eq!(
            transfer(&mut cs, &f.alice_acct, &f.bob_acct, &f.alice, 1_001),
            Err(AmmError::InsufficientFunds)
        );
        assert_eq!(balance(&cs, &f.alice_acct).unwrap(), 1_000);
    }

    #[test]
    fn test_mint_to_requires_authority() {
        let store = AccountStore::new();
        let mut cs = store.begin();
        let f = setup(&mut cs);

        assert_eq!(
            mint_to(&mut cs, &f.mint, &f.alice_acct, &f.alice, 1),
            Err(AmmError::InvalidAuthority)
        );
    }

    #[test]
    fn test_mint_supply_overflow() {
        let store = AccountStore::new();
        let mut cs = store.begin();
        let f = setup(&mut cs);

        assert_eq!(
            mint_to(&mut cs, &f.mint, &f.bob_acct, &f.authority, u64::MAX),
            Err(AmmError::Overflow)
        );
    }

    #[test]
    fn test_cross_mint_transfer_rejected() {
        let store = AccountStore::new();
        let mut cs = store.begin();
        let f = setup(&mut cs);
        let other_mint = Pubkey::new_unique();
        let other_acct = Pubkey::new_unique();
        initialize_mint(&mut cs, &other_mint, &f.authority, 6).unwrap();
        initialize_account(&mut cs, &other_acct, &other_mint, &f.alice).unwrap();

        assert_eq!(
            transfer(&mut cs, &f.alice_acct, &other_acct, &f.alice, 1),
            Err(AmmError::InvalidToken)
        );
    }

    #[test]
    fn test_double_initialize_rejected() {
        let store = AccountStore::new();
        let mut cs = store.begin();
        let f = setup(&mut cs);
        assert_eq!(
            initialize_mint(&mut cs, &f.mint, &f.authority, 6),
            Err(AmmError::AlreadyInitialized)
        );
        assert_eq!(
            initialize_account(&mut cs, &f.alice_acct, &f.mint, &f.alice),
            Err(AmmError::AlreadyInitialized)
        );
    }

    #[test]
    fn test_wrong_owner_program_rejected() {
        let store = AccountStore::new();
        let mut cs = store.begin();
        let key = Pubkey::new_unique();
        cs.put(key, StoredAccount::new(Pubkey::new_unique(), vec![0u8; Mint::LEN]));
        assert_eq!(load_mint(&cs, &key), Err(AmmError::InvalidOwner));
        assert_eq!(load_mint(&cs, &Pubkey::new_unique()), Err(AmmError::AccountNotFound));
    }
}
