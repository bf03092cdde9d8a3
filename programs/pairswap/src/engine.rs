//! Host-side driver: owns the account store and runs each instruction
//! against a fresh changeset, committing only on success.

use solana_program::{instruction::Instruction, msg, pubkey::Pubkey};

use crate::config::AmmConfig;
use crate::error::{AmmError, ConfigError};
use crate::math::{self, SwapQuote};
use crate::pda::{self, PoolAddresses};
use crate::processor;
use crate::state::{PoolAccount, PoolStatus};
use crate::store::{AccountStore, Changeset};
use crate::token;

#[derive(Debug, Clone)]
pub struct Engine {
    program_id: Pubkey,
    config: AmmConfig,
    store: AccountStore,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            program_id: crate::id(),
            config: AmmConfig::default(),
            store: AccountStore::new(),
        }
    }
}

impl Engine {
    pub fn new(config: AmmConfig) -> Result<Self, ConfigError> {
        Self::with_program_id(crate::id(), config)
    }

    pub fn with_program_id(program_id: Pubkey, config: AmmConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            program_id,
            config,
            store: AccountStore::new(),
        })
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn config(&self) -> &AmmConfig {
        &self.config
    }

    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    /// Execute one instruction. Either every account write it makes is
    /// committed or none is.
    pub fn process(&mut self, ix: &Instruction) -> Result<(), AmmError> {
        if ix.program_id != self.program_id {
            return Err(AmmError::IncorrectProgramId);
        }
        let program_id = self.program_id;
        let config = self.config;
        self.apply(|cs| {
            processor::process_instruction(&program_id, &config, cs, &ix.accounts, &ix.data)
        })
        .inspect_err(|err| msg!("Instruction rejected: {} (code {})", err, err.code()))
    }

    fn apply<F>(&mut self, f: F) -> Result<(), AmmError>
    where
        F: FnOnce(&mut Changeset<'_>) -> Result<(), AmmError>,
    {
        let mut cs = self.store.begin();
        f(&mut cs)?;
        let writes = cs.into_writes();
        self.store.commit(writes);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Token setup (stands in for the external token program)
    // -----------------------------------------------------------------------

    pub fn create_mint(
        &mut self,
        mint: &Pubkey,
        mint_authority: &Pubkey,
        decimals: u8,
    ) -> Result<(), AmmError> {
        self.apply(|cs| token::initialize_mint(cs, mint, mint_authority, decimals))
    }

    pub fn create_token_account(
        &mut self,
        account: &Pubkey,
        mint: &Pubkey,
        owner: &Pubkey,
    ) -> Result<(), AmmError> {
        self.apply(|cs| token::initialize_account(cs, account, mint, owner))
    }

    pub fn mint_to(
        &mut self,
        mint: &Pubkey,
        destination: &Pubkey,
        mint_authority: &Pubkey,
        amount: u64,
    ) -> Result<(), AmmError> {
        self.apply(|cs| token::mint_to(cs, mint, destination, mint_authority, amount))
    }

    pub fn transfer(
        &mut self,
        source: &Pubkey,
        destination: &Pubkey,
        authority: &Pubkey,
        amount: u64,
    ) -> Result<(), AmmError> {
        self.apply(|cs| token::transfer(cs, source, destination, authority, amount))
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn addresses(&self, mint_x: &Pubkey, mint_y: &Pubkey) -> Result<PoolAddresses, AmmError> {
        pda::derive_pool_addresses(&self.program_id, mint_x, mint_y)
    }

    pub fn pool(&self, pool_key: &Pubkey) -> Result<PoolAccount, AmmError> {
        processor::load_pool(&self.store.begin(), &self.program_id, pool_key)
    }

    pub fn pool_for_pair(&self, mint_x: &Pubkey, mint_y: &Pubkey) -> Result<PoolAccount, AmmError> {
        let (pool_key, _) = pda::find_pool_address(&self.program_id, mint_x, mint_y)?;
        self.pool(&pool_key)
    }

    pub fn pool_status(&self, mint_x: &Pubkey, mint_y: &Pubkey) -> Result<PoolStatus, AmmError> {
        let addrs = self.addresses(mint_x, mint_y)?;
        if !self.store.contains(&addrs.pool) {
            return Ok(PoolStatus::Uninitialized);
        }
        let pool = self.pool(&addrs.pool)?;
        let lp_supply = token::load_mint(&self.store.begin(), &addrs.lp_mint)?.supply;
        Ok(PoolStatus::of(Some(&pool), lp_supply))
    }

    pub fn lp_supply(&self, mint_x: &Pubkey, mint_y: &Pubkey) -> Result<u64, AmmError> {
        let addrs = self.addresses(mint_x, mint_y)?;
        Ok(token::load_mint(&self.store.begin(), &addrs.lp_mint)?.supply)
    }

    pub fn token_balance(&self, account: &Pubkey) -> Result<u64, AmmError> {
        token::balance(&self.store.begin(), account)
    }

    /// Price a swap against current reserves without touching state.
    pub fn quote_swap(
        &self,
        pool_key: &Pubkey,
        input_mint: &Pubkey,
        amount_in: u64,
    ) -> Result<SwapQuote, AmmError> {
        let pool = self.pool(pool_key)?;
        let side_in = pool.side_of(input_mint).ok_or(AmmError::InvalidToken)?;
        math::swap_quote(
            amount_in,
            pool.reserve(side_in),
            pool.reserve(side_in.other()),
            self.config.fee_bps,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_FEE_BPS;
    use crate::instruction;

    #[test]
    fn test_rejects_invalid_config() {
        let config = AmmConfig {
            fee_bps: MAX_FEE_BPS + 1,
            lp_decimals: 9,
        };
        assert_eq!(
            Engine::new(config).unwrap_err(),
            ConfigError::FeeTooHigh(MAX_FEE_BPS + 1)
        );
    }

    #[test]
    fn test_rejects_foreign_program_id() {
        let mut engine = Engine::default();
        let ix = instruction::initialize(
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
        )
        .unwrap();
        assert_eq!(engine.process(&ix), Err(AmmError::IncorrectProgramId));
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_failed_setup_commits_nothing() {
        let mut engine = Engine::default();
        let mint = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        let account = Pubkey::new_unique();
        engine.create_mint(&mint, &authority, 6).unwrap();
        engine
            .create_token_account(&account, &mint, &Pubkey::new_unique())
            .unwrap();

        let before = engine.store().len();
        assert_eq!(
            engine.mint_to(&mint, &account, &Pubkey::new_unique(), 5),
            Err(AmmError::InvalidAuthority)
        );
        assert_eq!(engine.store().len(), before);
        assert_eq!(engine.token_balance(&account).unwrap(), 0);
    }

    #[test]
    fn test_unknown_pair_is_uninitialized() {
        let engine = Engine::default();
        let x = Pubkey::new_unique();
        let y = Pubkey::new_unique();
        assert_eq!(engine.pool_status(&x, &y).unwrap(), PoolStatus::Uninitialized);
        assert_eq!(engine.pool_for_pair(&x, &y), Err(AmmError::NotInitialized));
    }
}
