//! # bequest-keeper
//! Finds inactive owners and executes their inheritance.
//!
//! Keepers are unprivileged and stateless between cycles, so any number of
//! them can run against the same ledger. Correctness under races comes from
//! the ledger's atomic commit: at most one `ExecuteInheritance` per account
//! succeeds and the rest report [`KeeperOutcome::AlreadyExecuted`].

pub mod config;
pub mod error;
pub mod keeper;

use std::path::Path;

use bequest_core::crypto::KeyPair;

pub use config::KeeperConfig;
pub use error::KeeperError;
pub use keeper::{Candidate, CycleReport, Keeper, KeeperOutcome};

/// Read a keypair from a file holding a hex-encoded 32-byte secret key.
pub fn load_keypair(path: &Path) -> Result<KeyPair, KeeperError> {
    let contents = std::fs::read_to_string(path).map_err(|e| KeeperError::KeyFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(KeyPair::from_secret_hex(contents.trim())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_keypair_from_hex_file() {
        let kp = KeyPair::from_secret_bytes([4u8; 32]);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", hex_secret(&kp)).unwrap();
        assert_eq!(load_keypair(file.path()).unwrap().identity(), kp.identity());
    }

    #[test]
    fn missing_key_file() {
        let err = load_keypair(Path::new("/nonexistent/keeper.key")).unwrap_err();
        assert!(matches!(err, KeeperError::KeyFile { .. }));
    }

    #[test]
    fn garbage_key_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not hex").unwrap();
        assert!(matches!(load_keypair(file.path()), Err(KeeperError::Crypto(_))));
    }

    fn hex_secret(kp: &KeyPair) -> String {
        kp.secret_bytes().iter().map(|b| format!("{b:02x}")).collect()
    }
}
