//! Key pairs and account addresses used to sign transactions.

use crate::address::{AccountAddress, AddressConvertible, AddressError, DEFAULT_PREFIX};
use crate::utils::decode_hex;
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey as PrivateKey};
use std::fmt;

/// Wallet: a secp256k1 key pair and the derived account address.
///
/// All fields are derived once during construction. Same private key
/// always yields byte-identical public key and address.
///
/// Wallet can also be built from a public key only: such wallet
/// can identify an account, but cannot sign transactions.
#[derive(Clone, PartialEq, Eq)]
pub struct Wallet {
    private_key: Option<PrivateKey>,
    public_key: PublicKey,
    address: AccountAddress,
}

impl Wallet {
    /// Size of private key in bytes.
    pub const PRIVATE_KEY_SIZE: usize = 32;

    pub fn from_private_key(private_key_hex: &str) -> Result<Self, WalletError> {
        //! Import a hex-encoded 32-byte private key using the default `akash` prefix.
        Self::from_private_key_with_prefix(private_key_hex, DEFAULT_PREFIX)
    }

    pub fn from_private_key_with_prefix(
        private_key_hex: &str,
        prefix: &str,
    ) -> Result<Self, WalletError> {
        //! Import a hex-encoded 32-byte private key.
        //!
        //! `0x` prefix and surrounding whitespace are accepted.
        let bytes = decode_hex(private_key_hex).map_err(|_| WalletError::InvalidHex)?;
        if bytes.len() != Self::PRIVATE_KEY_SIZE {
            return Err(WalletError::InvalidLength(bytes.len()));
        }
        let private_key = PrivateKey::from_slice(&bytes).map_err(|_| WalletError::InvalidScalar)?;
        Self::from_secret(private_key, prefix)
    }

    pub fn from_secret(private_key: PrivateKey, prefix: &str) -> Result<Self, WalletError> {
        //! Create a wallet from an already parsed private key.
        let secp = Secp256k1::signing_only();
        let public_key = PublicKey::from_secret_key(&secp, &private_key);
        let address = public_key.address(prefix)?;
        Ok(Self {
            private_key: Some(private_key),
            public_key,
            address,
        })
    }

    pub fn from_public_key(public_key: PublicKey, prefix: &str) -> Result<Self, WalletError> {
        //! Create a watch-only wallet.
        //!
        //! Beware that this wallet cannot be used to sign transactions.
        let address = public_key.address(prefix)?;
        Ok(Self {
            private_key: None,
            public_key,
            address,
        })
    }

    pub fn random(prefix: &str) -> Result<Self, WalletError> {
        //! Generate a new key pair from OS entropy.
        let private_key = PrivateKey::new(&mut rand::thread_rng());
        Self::from_secret(private_key, prefix)
    }

    pub const fn public_key(&self) -> &PublicKey {
        //! Get underlying public key.
        &self.public_key
    }

    pub fn public_key_bytes(&self) -> [u8; 33] {
        //! Compressed SEC1 encoding of the public key.
        self.public_key.serialize()
    }

    pub const fn address(&self) -> &AccountAddress {
        //! Get account address.
        &self.address
    }

    pub fn private_key(&self) -> Result<&PrivateKey, SigningError> {
        //! Get underlying private key.
        self.private_key
            .as_ref()
            .ok_or(SigningError::MissingPrivateKey)
    }

    pub const fn can_sign(&self) -> bool {
        //! Whether this wallet holds a private key.
        self.private_key.is_some()
    }

    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<[u8; 64], SigningError> {
        //! Sign a 32-byte digest with ECDSA.
        //!
        //! Nonce is derived per RFC6979, so the same key and digest always
        //! produce the same signature. Signature is returned in compact
        //! `r || s` form with low `s`.
        let private_key = self.private_key()?;
        let message =
            Message::from_slice(digest).map_err(|e| SigningError::Crypto(e.to_string()))?;
        let secp = Secp256k1::signing_only();
        Ok(secp.sign_ecdsa(&message, private_key).serialize_compact())
    }

    pub fn verify_digest(&self, digest: &[u8; 32], signature: &[u8]) -> bool {
        //! Check a compact signature against this wallet's public key.
        verify_digest(&self.public_key, digest, signature)
    }
}

pub(crate) fn verify_digest(public_key: &PublicKey, digest: &[u8; 32], signature: &[u8]) -> bool {
    let Ok(message) = Message::from_slice(digest) else {
        return false;
    };
    let Ok(signature) = Signature::from_compact(signature) else {
        return false;
    };
    Secp256k1::verification_only()
        .verify_ecdsa(&message, &signature, public_key)
        .is_ok()
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address.to_bech32())
            .field("public_key", &self.public_key)
            .field("can_sign", &self.can_sign())
            .finish()
    }
}

/// Key import errors.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum WalletError {
    /// Input is not valid hex.
    #[error("Invalid private key: not a hex string")]
    InvalidHex,
    /// Input decodes to a wrong number of bytes.
    #[error("Invalid private key: expected 32 bytes, got {0}")]
    InvalidLength(usize),
    /// Bytes are not a valid secp256k1 scalar (zero or above curve order).
    #[error("Invalid private key: not a valid secp256k1 scalar")]
    InvalidScalar,
    /// Address derivation failed (bad prefix).
    #[error("Failed to derive address: {0}")]
    Address(#[from] AddressError),
}

/// Signing errors.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum SigningError {
    /// Wallet is watch-only.
    #[error("Cannot sign: wallet has no private key")]
    MissingPrivateKey,
    /// Underlying cryptographic failure.
    #[error("Signing failed: {0}")]
    Crypto(String),
}
