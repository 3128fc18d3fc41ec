//! Core value types: identities, addresses, bounded percentages and fees.
//!
//! Identities and addresses are 32-byte keys rendered in base58. An identity
//! is an Ed25519 public key; an address is any ledger location, either an
//! identity's own wallet or a location derived with
//! [`derive_address`](crate::address::derive_address).

use bincode::de::Decoder;
use bincode::error::DecodeError;
use bincode::Decode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::constants::{MAX_PLATFORM_FEE_BPS, PERCENT_PRECISION};
use crate::error::AccountError;

macro_rules! key_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
            bincode::Encode, bincode::Decode,
        )]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub const ZERO: Self = Self([0u8; 32]);

            pub fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&bs58::encode(self.0).into_string())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self)
            }
        }

        impl FromStr for $name {
            type Err = AccountError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = bs58::decode(s)
                    .into_vec()
                    .map_err(|e| AccountError::InvalidKey(e.to_string()))?;
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|v: Vec<u8>| AccountError::InvalidKey(format!("expected 32 bytes, got {}", v.len())))?;
                Ok(Self(arr))
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

key_type!(
    /// An Ed25519 public key identifying an owner, heir, admin or keeper.
    Identity
);

key_type!(
    /// A ledger location holding a record and/or a native balance.
    Address
);

impl Identity {
    /// The identity's own wallet address on the ledger.
    pub fn wallet(&self) -> Address {
        Address(self.0)
    }
}

/// BLAKE3 hash of a signed transaction, used as its receipt identifier.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct TxId(pub [u8; 32]);

impl TxId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// A whole-number allocation percentage in `1..=100`.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Percentage(u8);

impl Percentage {
    pub const FULL: Self = Self(100);

    pub fn new(value: u8) -> Result<Self, AccountError> {
        if value == 0 || u64::from(value) > PERCENT_PRECISION {
            return Err(AccountError::InvalidPercentage(value));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Percentage {
    type Error = AccountError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<Context> Decode<Context> for Percentage {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        Self::new(<u8 as Decode<Context>>::decode(decoder)?).map_err(|e| DecodeError::OtherString(e.to_string()))
    }
}

bincode::impl_borrow_decode!(Percentage);

impl From<Percentage> for u8 {
    fn from(p: Percentage) -> u8 {
        p.0
    }
}

/// Platform fee in basis points, bounded by [`MAX_PLATFORM_FEE_BPS`].
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode,
)]
#[serde(try_from = "u16", into = "u16")]
pub struct FeeBps(u16);

impl FeeBps {
    pub const ZERO: Self = Self(0);

    pub fn new(bps: u16) -> Result<Self, AccountError> {
        if bps > MAX_PLATFORM_FEE_BPS {
            return Err(AccountError::InvalidFeeBps { bps, max: MAX_PLATFORM_FEE_BPS });
        }
        Ok(Self(bps))
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for FeeBps {
    type Error = AccountError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<Context> Decode<Context> for FeeBps {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        Self::new(<u16 as Decode<Context>>::decode(decoder)?).map_err(|e| DecodeError::OtherString(e.to_string()))
    }
}

bincode::impl_borrow_decode!(FeeBps);

impl From<FeeBps> for u16 {
    fn from(f: FeeBps) -> u16 {
        f.0
    }
}

/// One heir designation within a custodial account.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct HeirShare {
    pub heir: Identity,
    pub allocation: Percentage,
}

impl HeirShare {
    pub fn new(heir: Identity, allocation: Percentage) -> Self {
        Self { heir, allocation }
    }
}

impl fmt::Display for HeirShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.heir, self.allocation.get())
    }
}

impl FromStr for HeirShare {
    type Err = AccountError;

    /// Parses `<base58 identity>:<percentage>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (heir, pct) = s
            .rsplit_once(':')
            .ok_or_else(|| AccountError::InvalidKey(format!("expected <heir>:<percent>, got {s}")))?;
        let pct: u8 = pct
            .parse()
            .map_err(|_| AccountError::InvalidKey(format!("bad percentage in {s}")))?;
        Ok(Self { heir: heir.parse()?, allocation: Percentage::new(pct)? })
    }
}

/// Sum of allocations, widened so oversized lists cannot wrap.
pub fn allocation_sum(heirs: &[HeirShare]) -> u32 {
    heirs.iter().map(|h| u32::from(h.allocation.get())).sum()
}
