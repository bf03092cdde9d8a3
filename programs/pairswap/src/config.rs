use borsh::{BorshDeserialize, BorshSerialize};

use crate::error::ConfigError;

pub const DEFAULT_FEE_BPS: u16 = 30;
pub const DEFAULT_LP_DECIMALS: u8 = 9;
/// Max 10% swap fee
pub const MAX_FEE_BPS: u16 = 1_000;
const MAX_DECIMALS: u8 = 18;

/// Engine-wide parameters shared by every pool.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmmConfig {
    /// Swap fee charged on the input amount, in basis points. Stays in the pool.
    pub fee_bps: u16,
    /// Decimals of each LP mint created by `initialize`.
    pub lp_decimals: u8,
}

impl Default for AmmConfig {
    fn default() -> Self {
        Self {
            fee_bps: DEFAULT_FEE_BPS,
            lp_decimals: DEFAULT_LP_DECIMALS,
        }
    }
}

impl AmmConfig {
    pub fn new(fee_bps: u16, lp_decimals: u8) -> Result<Self, ConfigError> {
        let config = Self {
            fee_bps,
            lp_decimals,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fee_bps > MAX_FEE_BPS {
            return Err(ConfigError::FeeTooHigh(self.fee_bps));
        }
        if self.lp_decimals > MAX_DECIMALS {
            return Err(ConfigError::DecimalsTooHigh(self.lp_decimals));
        }
        Ok(())
    }

    /// Reads `AMM_FEE_BPS` and `AMM_LP_DECIMALS`, falling back to defaults
    /// for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let fee_bps = match lookup("AMM_FEE_BPS") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: "AMM_FEE_BPS",
                value: raw,
            })?,
            None => DEFAULT_FEE_BPS,
        };
        let lp_decimals = match lookup("AMM_LP_DECIMALS") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: "AMM_LP_DECIMALS",
                value: raw,
            })?,
            None => DEFAULT_LP_DECIMALS,
        };
        Self::new(fee_bps, lp_decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AmmConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AmmConfig::default());
        assert_eq!(config.fee_bps, 30);
        assert_eq!(config.lp_decimals, 9);
    }

    #[test]
    fn test_overrides() {
        let config =
            AmmConfig::from_lookup(lookup(&[("AMM_FEE_BPS", "25"), ("AMM_LP_DECIMALS", " 6 ")]))
                .unwrap();
        assert_eq!(config.fee_bps, 25);
        assert_eq!(config.lp_decimals, 6);
    }

    #[test]
    fn test_rejects_garbage() {
        let err = AmmConfig::from_lookup(lookup(&[("AMM_FEE_BPS", "0.3%")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                var: "AMM_FEE_BPS",
                value: "0.3%".to_string()
            }
        );
    }

    #[test]
    fn test_fee_cap() {
        assert!(AmmConfig::new(1_000, 9).is_ok());
        assert_eq!(AmmConfig::new(1_001, 9), Err(ConfigError::FeeTooHigh(1_001)));
        assert_eq!(AmmConfig::new(30, 19), Err(ConfigError::DecimalsTooHigh(19)));
    }

    #[test]
    fn test_config_size() {
        let serialized = borsh::to_vec(&AmmConfig::default()).unwrap();
        assert_eq!(serialized.len(), 3);
    }
}
