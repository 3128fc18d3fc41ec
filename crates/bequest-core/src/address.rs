//! Deterministic address derivation.
//!
//! Every program-owned location is `BLAKE3(domain || len(tag) || tag ||
//! len(part) || part ...)`, with lengths encoded as little-endian `u32`.
//! Length prefixes keep `("ab", "c")` and `("a", "bc")` distinct.

use crate::constants::{tags, ADDRESS_DOMAIN};
use crate::types::{Address, Identity};

/// Derive the address for `tag` and the ordered `parts`.
pub fn derive_address(tag: &[u8], parts: &[&[u8]]) -> Address {
    let mut hasher = blake3::Hasher::new();
    hasher.update(ADDRESS_DOMAIN);
    absorb(&mut hasher, tag);
    for part in parts {
        absorb(&mut hasher, part);
    }
    Address(*hasher.finalize().as_bytes())
}

fn absorb(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u32).to_le_bytes());
    hasher.update(bytes);
}

pub fn platform_config_address() -> Address {
    derive_address(tags::PLATFORM_CONFIG, &[])
}

pub fn treasury_address() -> Address {
    derive_address(tags::TREASURY, &[])
}

pub fn user_profile_address(user: &Identity) -> Address {
    derive_address(tags::USER_PROFILE, &[user.as_bytes()])
}

/// The owner's multi-heir custodial record.
pub fn custodial_address(owner: &Identity) -> Address {
    derive_address(tags::CUSTODIAL, &[owner.as_bytes()])
}

/// The single-heir record for one owner/heir pair.
pub fn single_heir_address(owner: &Identity, heir: &Identity) -> Address {
    derive_address(tags::SINGLE_HEIR, &[owner.as_bytes(), heir.as_bytes()])
}

/// The native-balance holder backing a custodial record.
pub fn vault_address(record: &Address) -> Address {
    derive_address(tags::VAULT, &[record.as_bytes()])
}
