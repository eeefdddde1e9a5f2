//! Configuration loading and representation.
//!
//! Read from the process environment at the edge of the process:
//!
//! | variable          | meaning                               | default        |
//! |-------------------|---------------------------------------|----------------|
//! | `AGORA_LEDGER_ID` | UUID naming the ledger's event stream | fresh UUIDv7   |
//! | `AGORA_OWNER`     | address recorded as the ledger owner  | zero address   |
//! | `AGORA_CLOCK`     | `logical` or `system`                 | `logical`      |
//! | `AGORA_LOG`       | tracing filter directive              | `info`         |

use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use agora_core::{Address, LedgerId};

use crate::clock::{Clock, LogicalClock, SystemClock};

pub const ENV_LEDGER_ID: &str = "AGORA_LEDGER_ID";
pub const ENV_OWNER: &str = "AGORA_OWNER";
pub const ENV_CLOCK: &str = "AGORA_CLOCK";
pub const ENV_LOG: &str = "AGORA_LOG";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::Invalid {
            var,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Which time source stamps posts and comments.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ClockKind {
    /// Counter starting after the newest recorded timestamp.
    #[default]
    Logical,
    /// Unix seconds, clamped to never go backwards.
    System,
}

impl ClockKind {
    /// Build a fresh clock; replay moves it past recorded history.
    pub fn build(self) -> Arc<dyn Clock> {
        match self {
            ClockKind::Logical => Arc::new(LogicalClock::new()),
            ClockKind::System => Arc::new(SystemClock::new()),
        }
    }
}

impl FromStr for ClockKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "logical" => Ok(ClockKind::Logical),
            "system" => Ok(ClockKind::System),
            other => Err(format!("unknown clock kind '{other}' (expected logical|system)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub ledger_id: LedgerId,
    pub owner: Address,
    pub clock: ClockKind,
    pub log_filter: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            ledger_id: LedgerId::new(),
            owner: Address::ZERO,
            clock: ClockKind::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl LedgerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; unset or blank keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = get(ENV_LEDGER_ID) {
            config.ledger_id = raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid(ENV_LEDGER_ID, &raw, e))?;
        }
        if let Some(raw) = get(ENV_OWNER) {
            config.owner = raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid(ENV_OWNER, &raw, e))?;
        }
        if let Some(raw) = get(ENV_CLOCK) {
            config.clock = raw
                .parse()
                .map_err(|e| ConfigError::invalid(ENV_CLOCK, &raw, e))?;
        }
        if let Some(raw) = get(ENV_LOG) {
            config.log_filter = raw.trim().to_string();
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::Timestamp;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = LedgerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.owner, Address::ZERO);
        assert_eq!(config.clock, ClockKind::Logical);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn all_variables_are_read() {
        let id = "01890a5d-ac96-774b-bcce-b302099a8057";
        let owner = format!("0x{}", "11".repeat(20));
        let config = LedgerConfig::from_lookup(lookup(&[
            (ENV_LEDGER_ID, id),
            (ENV_OWNER, owner.as_str()),
            (ENV_CLOCK, "System"),
            (ENV_LOG, "agora=debug"),
        ]))
        .unwrap();

        assert_eq!(config.ledger_id.to_string(), id);
        assert_eq!(config.owner.to_string(), owner);
        assert_eq!(config.clock, ClockKind::System);
        assert_eq!(config.log_filter, "agora=debug");
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = LedgerConfig::from_lookup(lookup(&[(ENV_CLOCK, "  ")])).unwrap();
        assert_eq!(config.clock, ClockKind::Logical);
    }

    #[test]
    fn bad_values_name_the_variable() {
        let err = LedgerConfig::from_lookup(lookup(&[(ENV_OWNER, "bob")])).unwrap_err();
        match err {
            ConfigError::Invalid { var, value, .. } => {
                assert_eq!(var, ENV_OWNER);
                assert_eq!(value, "bob");
            }
        }

        let err = LedgerConfig::from_lookup(lookup(&[(ENV_CLOCK, "sundial")])).unwrap_err();
        assert!(err.to_string().contains(ENV_CLOCK));

        let err = LedgerConfig::from_lookup(lookup(&[(ENV_LEDGER_ID, "nope")])).unwrap_err();
        assert!(err.to_string().contains(ENV_LEDGER_ID));
    }

    #[test]
    fn clock_kind_builds_resumable_clock() {
        let clock = ClockKind::Logical.build();
        assert_eq!(clock.now(), Timestamp(1));
        clock.resume_after(Timestamp(9));
        assert_eq!(clock.now(), Timestamp(10));
    }
}
