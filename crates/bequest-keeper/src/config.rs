//! Keeper configuration.
//!
//! Layers, lowest first: built-in defaults, an optional config file, then
//! `KEEPER_*` environment variables (`KEEPER_RPC_URL`, `KEEPER_BATCH_SIZE`,
//! `KEEPER_TARGET_OWNERS=a,b,c`, ...). Command-line flags in the keeper
//! binary override all three.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use bequest_core::constants::{COIN, DEFAULT_RPC_PORT};
use bequest_core::types::{Address, Identity};

use crate::error::KeeperError;

pub const ENV_PREFIX: &str = "KEEPER";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeeperConfig {
    /// JSON-RPC endpoint of the ledger node.
    pub rpc_url: String,
    /// File holding the keeper's hex-encoded Ed25519 secret key.
    pub wallet_path: Option<PathBuf>,
    /// Below this fee-payer balance the keeper logs a warning every cycle.
    pub min_balance: u64,
    pub check_interval_secs: u64,
    /// Maximum number of executions in flight at once.
    pub batch_size: usize,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// Bound on every individual ledger call.
    pub attempt_timeout_ms: u64,
    /// Restrict discovery to these owners. Empty means every owner.
    pub target_owners: Vec<Identity>,
    pub shard_index: u64,
    pub shard_count: u64,
    pub log_level: String,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            rpc_url: format!("http://127.0.0.1:{DEFAULT_RPC_PORT}"),
            wallet_path: None,
            min_balance: COIN / 100,
            check_interval_secs: 300,
            batch_size: 10,
            max_attempts: 3,
            backoff_base_ms: 1_000,
            backoff_max_ms: 30_000,
            attempt_timeout_ms: 30_000,
            target_owners: Vec::new(),
            shard_index: 0,
            shard_count: 1,
            log_level: "info".to_string(),
        }
    }
}

impl KeeperConfig {
    /// Load defaults, then `path` (if any), then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, KeeperError> {
        Self::load_layered(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_layered(path: Option<&Path>, env: Environment) -> Result<Self, KeeperError> {
        let mut builder = Config::builder().add_source(Config::try_from(&KeeperConfig::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let env = env
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("target_owners");
        let cfg: KeeperConfig = builder.add_source(env).build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), KeeperError> {
        let invalid = |msg: &str| Err(KeeperError::InvalidConfig(msg.to_string()));
        if self.check_interval_secs == 0 {
            return invalid("check_interval_secs must be positive");
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be positive");
        }
        if self.max_attempts == 0 {
            return invalid("max_attempts must be positive");
        }
        if self.attempt_timeout_ms == 0 {
            return invalid("attempt_timeout_ms must be positive");
        }
        if self.backoff_base_ms > self.backoff_max_ms {
            return invalid("backoff_base_ms exceeds backoff_max_ms");
        }
        if self.shard_count == 0 || self.shard_index >= self.shard_count {
            return Err(KeeperError::InvalidConfig(format!(
                "shard {} of {} is out of range",
                self.shard_index, self.shard_count
            )));
        }
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    /// Delay before retry number `attempt` (1-based): base doubled per
    /// attempt, capped at `backoff_max_ms`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        let ms = self.backoff_base_ms.saturating_mul(factor).min(self.backoff_max_ms);
        Duration::from_millis(ms)
    }

    pub fn is_targeted(&self, owner: &Identity) -> bool {
        self.target_owners.is_empty() || self.target_owners.contains(owner)
    }

    /// Whether `address` falls in this keeper's shard of the key space.
    pub fn owns_shard(&self, address: &Address) -> bool {
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&address.as_bytes()[..8]);
        u64::from_le_bytes(prefix) % self.shard_count == self.shard_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = KeeperConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.batch_size, 10);
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(cfg.min_balance, 10_000_000);
        assert!(cfg.rpc_url.ends_with(&DEFAULT_RPC_PORT.to_string()));
    }

    #[test]
    fn load_without_sources_yields_defaults() {
        let cfg = KeeperConfig::load_layered(None, env(&[])).unwrap();
        assert_eq!(cfg, KeeperConfig::default());
    }

    #[test]
    fn environment_overrides() {
        let owner = Identity([7u8; 32]);
        let other = Identity([8u8; 32]);
        let owners = format!("{owner},{other}");
        let cfg = KeeperConfig::load_layered(
            None,
            env(&[
                ("KEEPER_RPC_URL", "http://10.0.0.1:9000"),
                ("KEEPER_BATCH_SIZE", "25"),
                ("KEEPER_TARGET_OWNERS", &owners),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.rpc_url, "http://10.0.0.1:9000");
        assert_eq!(cfg.batch_size, 25);
        assert_eq!(cfg.target_owners, vec![owner, other]);
    }

    #[test]
    fn file_then_environment() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "check_interval_secs = 60\nbatch_size = 4\nshard_count = 2\nshard_index = 1").unwrap();
        let cfg = KeeperConfig::load_layered(Some(file.path()), env(&[("KEEPER_BATCH_SIZE", "8")])).unwrap();
        assert_eq!(cfg.check_interval_secs, 60);
        assert_eq!(cfg.batch_size, 8);
        assert_eq!((cfg.shard_index, cfg.shard_count), (1, 2));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = KeeperConfig::load_layered(Some(Path::new("/nonexistent/keeper.toml")), env(&[])).unwrap_err();
        assert!(matches!(err, KeeperError::Config(_)));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let bad = [
            KeeperConfig { batch_size: 0, ..Default::default() },
            KeeperConfig { max_attempts: 0, ..Default::default() },
            KeeperConfig { check_interval_secs: 0, ..Default::default() },
            KeeperConfig { shard_index: 2, shard_count: 2, ..Default::default() },
            KeeperConfig { backoff_base_ms: 10, backoff_max_ms: 5, ..Default::default() },
        ];
        for cfg in bad {
            assert!(matches!(cfg.validate(), Err(KeeperError::InvalidConfig(_))), "{cfg:?}");
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let cfg = KeeperConfig { backoff_base_ms: 100, backoff_max_ms: 500, ..Default::default() };
        assert_eq!(cfg.backoff(1), Duration::from_millis(100));
        assert_eq!(cfg.backoff(2), Duration::from_millis(200));
        assert_eq!(cfg.backoff(3), Duration::from_millis(400));
        assert_eq!(cfg.backoff(4), Duration::from_millis(500));
        assert_eq!(cfg.backoff(80), Duration::from_millis(500));
    }

    #[test]
    fn shards_partition_the_key_space() {
        let configs: Vec<_> = (0..3)
            .map(|i| KeeperConfig { shard_index: i, shard_count: 3, ..Default::default() })
            .collect();
        for b in 0..=255u8 {
            let address = Address([b; 32]);
            assert_eq!(configs.iter().filter(|c| c.owns_shard(&address)).count(), 1);
        }
    }

    #[test]
    fn empty_target_list_matches_everyone() {
        let owner = Identity([1u8; 32]);
        assert!(KeeperConfig::default().is_targeted(&owner));
        let cfg = KeeperConfig { target_owners: vec![Identity([2u8; 32])], ..Default::default() };
        assert!(!cfg.is_targeted(&owner));
    }
}
