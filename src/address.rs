//! Akash account address operations and verifications.

use crate::utils::{ripemd160, sha256};
use bech32::{primitives::decode::CheckedHrpstring, Bech32, Hrp};
pub use secp256k1::{PublicKey, SecretKey as PrivateKey};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::{fmt, result::Result, str::FromStr};

/// Bech32 human-readable part of Akash account addresses.
pub const DEFAULT_PREFIX: &str = "akash";

/// Akash account address.
///
/// Address is a bech32 encoding of a 20-byte public key digest
/// under a network-specific human-readable prefix.
#[derive(Clone, Debug, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct AccountAddress {
    prefix: String,
    hash: [u8; 20],
    encoded: String,
}

impl AccountAddress {
    /// Size of underlying digest in bytes.
    pub const WIDTH: usize = 20;

    pub fn new(prefix: &str, hash: [u8; Self::WIDTH]) -> Result<Self, AddressError> {
        //! Create an address from raw digest bytes and a prefix.
        let hrp =
            Hrp::parse(prefix).map_err(|_| AddressError::InvalidPrefix(prefix.to_string()))?;
        let encoded = bech32::encode::<Bech32>(hrp, &hash)
            .map_err(|e| AddressError::Bech32(e.to_string()))?;
        Ok(Self {
            prefix: hrp.to_lowercase(),
            hash,
            encoded,
        })
    }

    pub fn parse_with_prefix(s: &str, expected: &str) -> Result<Self, AddressError> {
        //! Parse an address, additionally checking its prefix.
        let address: Self = s.parse()?;
        if address.prefix != expected.to_ascii_lowercase() {
            return Err(AddressError::PrefixMismatch {
                expected: expected.to_string(),
                got: address.prefix,
            });
        }
        Ok(address)
    }

    pub fn prefix(&self) -> &str {
        //! Human-readable part.
        &self.prefix
    }

    pub const fn as_bytes(&self) -> &[u8; Self::WIDTH] {
        //! Underlying `RIPEMD160(SHA256(pubkey))` digest.
        &self.hash
    }

    pub fn to_bech32(&self) -> String {
        //! Encode as a bech32 string.
        self.encoded.clone()
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

impl FromStr for AccountAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Cosmos addresses carry a Bech32 checksum, never Bech32m.
        let checked = CheckedHrpstring::new::<Bech32>(s)
            .map_err(|e| AddressError::Bech32(e.to_string()))?;
        let hrp = checked.hrp();
        let data: Vec<u8> = checked.byte_iter().collect();
        let hash: [u8; Self::WIDTH] = data
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength {
                expected: Self::WIDTH,
                got: data.len(),
            })?;
        Self::new(hrp.as_str(), hash)
    }
}

impl AsRef<str> for AccountAddress {
    fn as_ref(&self) -> &str {
        &self.encoded
    }
}

/// A trait for objects that can generate an on-chain address.
pub trait AddressConvertible {
    /// Create an address with the given bech32 prefix.
    fn address(&self, prefix: &str) -> Result<AccountAddress, AddressError>;
}

impl AddressConvertible for secp256k1::PublicKey {
    fn address(&self, prefix: &str) -> Result<AccountAddress, AddressError> {
        //! Generate address from public key.
        //!
        //! Digest is computed over the compressed (33-byte) form.
        let digest = ripemd160(sha256(&[self.serialize()]));
        AccountAddress::new(prefix, digest)
    }
}

/// Address parsing and derivation errors.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum AddressError {
    /// Prefix is not a valid bech32 human-readable part.
    #[error("Invalid address prefix: {0:?}")]
    InvalidPrefix(String),
    /// Checksum or charset failure.
    #[error("Malformed bech32 address: {0}")]
    Bech32(String),
    /// Decoded payload has unexpected size.
    #[error("Invalid address length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Expected payload length
        expected: usize,
        /// Actual payload length
        got: usize,
    },
    /// Address belongs to another network.
    #[error("Address prefix mismatch: expected {expected:?}, got {got:?}")]
    PrefixMismatch {
        /// Expected prefix
        expected: String,
        /// Actual prefix
        got: String,
    },
}
