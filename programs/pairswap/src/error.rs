use num_derive::FromPrimitive;
use num_traits::FromPrimitive as _;
use solana_program::program_error::ProgramError;

/// Errors returned by the AMM engine. The discriminant is the custom error
/// code surfaced through [`ProgramError::Custom`], so variants are append-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, thiserror::Error)]
pub enum AmmError {
    #[error("Invalid instruction discriminator or data")]
    InvalidInstruction,
    #[error("Instruction targets a different program")]
    IncorrectProgramId,
    #[error("Not enough account keys supplied")]
    NotEnoughAccountKeys,
    #[error("Account not signer")]
    AccountNotSigner,
    #[error("Account not writable")]
    AccountNotWritable,
    #[error("Invalid account owner")]
    InvalidOwner,
    #[error("Invalid account data")]
    InvalidAccountData,
    #[error("Account does not exist")]
    AccountNotFound,
    #[error("Already initialized")]
    AlreadyInitialized,
    #[error("Not initialized")]
    NotInitialized,
    #[error("Mints must be different")]
    IdenticalAssets,
    #[error("Invalid PDA")]
    InvalidPDA,
    #[error("No valid bump seed for this token pair")]
    NoViableBump,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Invalid authority")]
    InvalidAuthority,
    #[error("Invalid amount (must be > 0)")]
    ZeroAmount,
    #[error("Insufficient caller balance")]
    InsufficientCallerBalance,
    #[error("Insufficient funds")]
    InsufficientFunds,
    #[error("Insufficient LP tokens")]
    ExceedsLpBalance,
    #[error("Zero liquidity")]
    ZeroLiquidity,
    #[error("Insufficient liquidity")]
    InsufficientLiquidity,
    #[error("Insufficient liquidity minted")]
    InsufficientLiquidityMinted,
    #[error("Slippage tolerance exceeded")]
    SlippageExceeded,
    #[error("Reserve overflow")]
    ReserveOverflow,
    #[error("Arithmetic overflow")]
    Overflow,
    #[error("Constant product invariant violated")]
    InvariantViolated,
}

/// How a caller should treat a rejected instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed input or accounts; nothing was read past the failing check.
    Validation,
    /// Well-formed request the pool cannot honour in its current state.
    Invariant,
    /// Checked arithmetic failed; the instruction is fatal as submitted.
    Overflow,
}

impl AmmError {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::from_u32(code)
    }

    pub fn class(self) -> ErrorClass {
        match self {
            AmmError::ReserveOverflow | AmmError::Overflow => ErrorClass::Overflow,
            AmmError::InsufficientFunds
            | AmmError::ExceedsLpBalance
            | AmmError::ZeroLiquidity
            | AmmError::InsufficientLiquidity
            | AmmError::InsufficientLiquidityMinted
            | AmmError::SlippageExceeded
            | AmmError::InvariantViolated => ErrorClass::Invariant,
            _ => ErrorClass::Validation,
        }
    }
}

impl From<AmmError> for ProgramError {
    fn from(e: AmmError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

/// Errors raised while building an [`AmmConfig`](crate::config::AmmConfig).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
    #[error("Fee of {0} bps exceeds the 1000 bps cap")]
    FeeTooHigh(u16),
    #[error("LP decimals {0} exceed 18")]
    DecimalsTooHigh(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_through_program_error() {
        let err = AmmError::SlippageExceeded;
        let pe: ProgramError = err.into();
        let ProgramError::Custom(code) = pe else {
            panic!("expected custom error, got {pe:?}");
        };
        assert_eq!(AmmError::from_code(code), Some(AmmError::SlippageExceeded));
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(AmmError::InvalidInstruction.code(), 0);
        assert_eq!(AmmError::AlreadyInitialized.code(), 8);
        assert_eq!(AmmError::InvariantViolated.code(), 25);
        assert_eq!(AmmError::from_code(26), None);
    }

    #[test]
    fn test_error_classes() {
        assert_eq!(AmmError::ZeroAmount.class(), ErrorClass::Validation);
        assert_eq!(AmmError::IdenticalAssets.class(), ErrorClass::Validation);
        assert_eq!(AmmError::InvalidPDA.class(), ErrorClass::Validation);
        assert_eq!(AmmError::SlippageExceeded.class(), ErrorClass::Invariant);
        assert_eq!(AmmError::ExceedsLpBalance.class(), ErrorClass::Invariant);
        assert_eq!(AmmError::ReserveOverflow.class(), ErrorClass::Overflow);
    }
}
