//! Crate-level error taxonomy.

use crate::address::{AccountAddress, AddressError};
use crate::coin::AmountError;
use crate::config::ConfigError;
use crate::messages::MessageError;
use crate::transactions::TransactionError;
use crate::wallet::{SigningError, WalletError};
#[cfg(feature = "http")]
use crate::{
    broadcast::{BroadcastError, ChainRejection},
    network::{AccountError, NetworkError},
    transaction_builder::TransactionBuilderError,
};

/// Any failure of a high-level client operation.
///
/// Only [`Error::Network`] is worth retrying as is. Every other variant
/// requires changing the input first.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Private key is malformed.
    #[error("Invalid key: {0}")]
    InvalidKey(#[from] WalletError),
    /// Address is malformed.
    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] AddressError),
    /// Amount is malformed or in a foreign denomination.
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),
    /// Message parameters are inconsistent.
    #[error("Invalid message: {0}")]
    InvalidMessage(MessageError),
    /// Transaction has no messages.
    #[error("Cannot build an empty transaction")]
    EmptyTransaction,
    /// Transaction could not be signed.
    #[error(transparent)]
    Signing(SigningError),
    /// Transaction could not be assembled or encoded.
    #[error(transparent)]
    Transaction(TransactionError),
    /// Configuration is invalid.
    #[error(transparent)]
    Config(ConfigError),
    /// Node was not reached or answered garbage.
    #[cfg(feature = "http")]
    #[error(transparent)]
    Network(#[from] NetworkError),
    /// Chain refused the transaction.
    #[cfg(feature = "http")]
    #[error(transparent)]
    ChainRejection(#[from] ChainRejection),
    /// Account does not exist on chain yet.
    #[error("Account {0} does not exist on chain")]
    UnknownAccount(AccountAddress),
    /// Operation needs an endpoint that is not configured.
    #[error("Operation requires a configured {0}")]
    MissingCapability(&'static str),
}

impl Error {
    pub const fn is_retryable(&self) -> bool {
        //! Whether repeating the same call may succeed.
        match self {
            #[cfg(feature = "http")]
            Self::Network(_) => true,
            _ => false,
        }
    }
}

impl From<SigningError> for Error {
    fn from(err: SigningError) -> Self {
        Self::Signing(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Amount(e) => Self::InvalidAmount(e),
            other => Self::Config(other),
        }
    }
}

impl From<MessageError> for Error {
    fn from(err: MessageError) -> Self {
        match err {
            MessageError::InvalidAmount(e) => Self::InvalidAmount(e),
            MessageError::InvalidAddress(e) => Self::InvalidAddress(e),
            other => Self::InvalidMessage(other),
        }
    }
}

impl From<TransactionError> for Error {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::EmptyTransaction => Self::EmptyTransaction,
            TransactionError::Signing(e) => Self::Signing(e),
            TransactionError::Amount(e) => Self::InvalidAmount(e),
            other => Self::Transaction(other),
        }
    }
}

#[cfg(feature = "http")]
impl From<AccountError> for Error {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::UnknownAccount(address) => Self::UnknownAccount(address),
            AccountError::Network(e) => Self::Network(e),
        }
    }
}

#[cfg(feature = "http")]
impl From<BroadcastError> for Error {
    fn from(err: BroadcastError) -> Self {
        match err {
            BroadcastError::Transaction(e) => e.into(),
            BroadcastError::Network(e) => Self::Network(e),
            BroadcastError::Rejected(e) => Self::ChainRejection(e),
        }
    }
}

#[cfg(feature = "http")]
impl From<TransactionBuilderError> for Error {
    fn from(err: TransactionBuilderError) -> Self {
        match err {
            TransactionBuilderError::Account(e) => e.into(),
            TransactionBuilderError::Transaction(e) => e.into(),
            TransactionBuilderError::ForeignMessage {
                signer, wallet, ..
            } => Self::InvalidMessage(MessageError::Mismatch {
                field: "signer",
                expected: signer.to_bech32(),
                got: wallet.to_bech32(),
            }),
        }
    }
}
