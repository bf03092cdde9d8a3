// PairSwap: Constant Product AMM (x*y=k)
// Program ID: ApjKE4vSFoMgd9Xd3J2vDGphVTCJgtD7sELUvSvwS7yY
//
// One pool per unordered token pair. Each pool has two token vaults and an
// LP mint, all addressed by PDAs under this program id and controlled by the
// pool PDA. Instructions run through `Engine`, which applies them to an
// in-memory account store atomically.

pub mod config;
pub mod engine;
pub mod error;
pub mod instruction;
pub mod math;
pub mod pda;
pub mod processor;
pub mod state;
pub mod store;
pub mod token;

solana_program::declare_id!("ApjKE4vSFoMgd9Xd3J2vDGphVTCJgtD7sELUvSvwS7yY");

pub use config::AmmConfig;
pub use engine::Engine;
pub use error::{AmmError, ConfigError, ErrorClass};
pub use instruction::AmmInstruction;
pub use pda::{PoolAddresses, Side};
pub use state::{PoolAccount, PoolStatus};
