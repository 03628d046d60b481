//! Akash transactions: assembly, canonical encoding, signing and verification.

use crate::canonical::{to_canonical_vec, CanonicalError};
use crate::coin::{AmountError, Coin, GasPrice, NATIVE_DENOM};
use crate::config::NetworkConfig;
use crate::messages::Message;
use crate::utils::sha256;
use crate::wallet::{verify_digest, SigningError, Wallet};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rustc_hex::ToHex;
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as, DisplayFromStr};

/// Type name of secp256k1 public keys in signer infos.
pub const SECP256K1_PUBKEY_TYPE: &str = "/cosmos.crypto.secp256k1.PubKey";
/// The only supported sign mode.
pub const SIGN_MODE_DIRECT: &str = "SIGN_MODE_DIRECT";

/// Account and chain metadata of a transaction.
///
/// `sequence` must equal the next sequence the chain expects from the
/// account at broadcast time. This cannot be verified locally: stale or
/// reused sequences are rejected by the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionInfo {
    /// Chain identifier, e.g. `akashnet-2`
    pub chain_id: String,
    /// On-chain account number of the signer
    pub account_number: u64,
    /// Account sequence (nonce)
    pub sequence: u64,
    /// Explicit fee. Computed from gas price when absent.
    pub fee: Option<Coin>,
    /// Transaction memo
    pub memo: String,
    /// Block height after which the transaction is invalid, 0 for none.
    pub timeout_height: u64,
}

impl TransactionInfo {
    pub fn new<S: Into<String>>(chain_id: S, account_number: u64, sequence: u64) -> Self {
        //! Create metadata with empty memo and automatic fee.
        Self {
            chain_id: chain_id.into(),
            account_number,
            sequence,
            fee: None,
            memo: String::new(),
            timeout_height: 0,
        }
    }
    #[must_use]
    pub fn memo<S: Into<String>>(mut self, memo: S) -> Self {
        //! Set a memo.
        self.memo = memo.into();
        self
    }
    #[must_use]
    pub fn fee(mut self, fee: Coin) -> Self {
        //! Set an explicit fee.
        self.fee = Some(fee);
        self
    }
    #[must_use]
    pub const fn timeout_height(mut self, timeout_height: u64) -> Self {
        //! Set a timeout height.
        self.timeout_height = timeout_height;
        self
    }
}

/// Transaction body: messages in execution order.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxBody {
    /// Messages, order is preserved
    pub messages: Vec<Message>,
    /// Memo
    pub memo: String,
    /// Timeout height, 0 for none
    #[serde_as(as = "DisplayFromStr")]
    pub timeout_height: u64,
    /// Extension options (unused)
    #[serde(default)]
    pub extension_options: Vec<serde_json::Value>,
    /// Non-critical extension options (unused)
    #[serde(default)]
    pub non_critical_extension_options: Vec<serde_json::Value>,
}

/// Public key with its type tag.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKey {
    /// Key type
    #[serde(rename = "@type")]
    pub type_url: String,
    /// Compressed key bytes
    #[serde_as(as = "Base64")]
    pub key: Vec<u8>,
}

/// Single signer sign mode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleMode {
    /// Sign mode name
    pub mode: String,
}

/// Sign mode of a signer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeInfo {
    /// Single signer mode
    pub single: SingleMode,
}

/// Signer description.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerInfo {
    /// Signer public key
    pub public_key: PubKey,
    /// Sign mode
    pub mode_info: ModeInfo,
    /// Signer account sequence
    #[serde_as(as = "DisplayFromStr")]
    pub sequence: u64,
}

/// Transaction fee.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    /// Paid amount
    pub amount: Vec<Coin>,
    /// Maximal gas to consume
    #[serde_as(as = "DisplayFromStr")]
    pub gas_limit: u64,
    /// Fee payer, empty for the first signer
    #[serde(default)]
    pub payer: String,
    /// Fee granter, empty for none
    #[serde(default)]
    pub granter: String,
}

/// Authorization data: signers and fee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    /// Signers, in signature order
    pub signer_infos: Vec<SignerInfo>,
    /// Fee
    pub fee: Fee,
}

/// Document that is hashed and signed.
///
/// Exists only for the duration of signing or verification.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SignDoc {
    /// Canonical encoding of the body
    #[serde_as(as = "Base64")]
    pub body_bytes: Vec<u8>,
    /// Canonical encoding of the auth info
    #[serde_as(as = "Base64")]
    pub auth_info_bytes: Vec<u8>,
    /// Chain identifier
    pub chain_id: String,
    /// Signer account number
    #[serde_as(as = "DisplayFromStr")]
    pub account_number: u64,
}

impl SignDoc {
    pub fn to_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        //! Canonical encoding of the document.
        Ok(to_canonical_vec(self)?)
    }

    pub fn hash(&self) -> Result<[u8; 32], TransactionError> {
        //! SHA-256 of the canonical encoding.
        Ok(sha256(&[self.to_bytes()?]))
    }
}

/// Transaction ready to be signed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    /// Body
    pub body: TxBody,
    /// Authorization data
    pub auth_info: AuthInfo,
}

impl UnsignedTransaction {
    pub fn body_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        //! Canonical encoding of the body.
        Ok(to_canonical_vec(&self.body)?)
    }

    pub fn auth_info_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        //! Canonical encoding of the auth info.
        Ok(to_canonical_vec(&self.auth_info)?)
    }

    pub fn sign_doc(
        &self,
        chain_id: &str,
        account_number: u64,
    ) -> Result<SignDoc, TransactionError> {
        //! Build the document to sign.
        Ok(SignDoc {
            body_bytes: self.body_bytes()?,
            auth_info_bytes: self.auth_info_bytes()?,
            chain_id: chain_id.to_string(),
            account_number,
        })
    }

    pub fn signing_hash(
        &self,
        chain_id: &str,
        account_number: u64,
    ) -> Result<[u8; 32], TransactionError> {
        //! Digest that signers sign.
        self.sign_doc(chain_id, account_number)?.hash()
    }

    pub fn sign(
        &self,
        wallet: &Wallet,
        tx_info: &TransactionInfo,
    ) -> Result<SignedTransaction, TransactionError> {
        //! Sign with the given wallet.
        //!
        //! Wallet key must match the only signer info of this transaction.
        let [signer] = self.auth_info.signer_infos.as_slice() else {
            return Err(TransactionError::UnsupportedSigners(
                self.auth_info.signer_infos.len(),
            ));
        };
        if signer.public_key.key != wallet.public_key_bytes() {
            return Err(TransactionError::SignerMismatch);
        }
        let digest = self.signing_hash(&tx_info.chain_id, tx_info.account_number)?;
        let signature = wallet.sign_digest(&digest)?;
        Ok(SignedTransaction {
            body: self.body.clone(),
            auth_info: self.auth_info.clone(),
            signatures: vec![signature.to_vec()],
        })
    }
}

pub fn sign(
    wallet: &Wallet,
    unsigned_tx: &UnsignedTransaction,
    tx_info: &TransactionInfo,
) -> Result<SignedTransaction, TransactionError> {
    //! Sign a transaction. See [`UnsignedTransaction::sign`].
    unsigned_tx.sign(wallet, tx_info)
}

/// Signed transaction: one signature per signer info, in the same order.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Body
    pub body: TxBody,
    /// Authorization data
    pub auth_info: AuthInfo,
    /// Compact 64-byte signatures
    #[serde_as(as = "Vec<Base64>")]
    pub signatures: Vec<Vec<u8>>,
}

impl SignedTransaction {
    pub fn unsigned(&self) -> UnsignedTransaction {
        //! Strip signatures.
        UnsignedTransaction {
            body: self.body.clone(),
            auth_info: self.auth_info.clone(),
        }
    }

    pub fn verify(&self, chain_id: &str, account_number: u64) -> Result<(), TransactionError> {
        //! Check every signature against the public key of its signer.
        if self.signatures.len() != self.auth_info.signer_infos.len() {
            return Err(TransactionError::MissingSignature);
        }
        let digest = self.unsigned().signing_hash(chain_id, account_number)?;
        self.auth_info
            .signer_infos
            .iter()
            .zip(&self.signatures)
            .try_for_each(|(signer, signature)| {
                let public_key = PublicKey::from_slice(&signer.public_key.key)
                    .map_err(|_| TransactionError::InvalidPublicKey)?;
                if verify_digest(&public_key, &digest, signature) {
                    Ok(())
                } else {
                    Err(TransactionError::InvalidSignature)
                }
            })
    }

    pub fn to_broadcastable_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        //! Canonical encoding of the signed transaction.
        if self.signatures.is_empty()
            || self.signatures.len() != self.auth_info.signer_infos.len()
        {
            return Err(TransactionError::MissingSignature);
        }
        Ok(to_canonical_vec(self)?)
    }

    pub fn to_base64(&self) -> Result<String, TransactionError> {
        //! Base64 of [`SignedTransaction::to_broadcastable_bytes`].
        Ok(STANDARD.encode(self.to_broadcastable_bytes()?))
    }

    pub fn hash(&self) -> Result<String, TransactionError> {
        //! Transaction hash: uppercase hex SHA-256 of broadcastable bytes.
        let digest = sha256(&[self.to_broadcastable_bytes()?]);
        Ok(digest.to_hex::<String>().to_uppercase())
    }
}

/// Combines messages, fee and account metadata into an [`UnsignedTransaction`].
///
/// Fees are always paid in the native denomination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionAssembler {
    gas_price: GasPrice,
    denom: String,
}

impl TransactionAssembler {
    pub fn new(gas_price: GasPrice) -> Self {
        //! Create an assembler charging `gas_price` per unit of gas,
        //! with fees in [`NATIVE_DENOM`].
        Self {
            gas_price,
            denom: NATIVE_DENOM.to_string(),
        }
    }

    pub fn from_config(config: &NetworkConfig) -> Self {
        //! Assembler with the gas price and denomination of a network.
        Self {
            gas_price: config.gas_price.clone(),
            denom: config.denom.clone(),
        }
    }

    #[must_use]
    pub fn with_denom<S: Into<String>>(mut self, denom: S) -> Self {
        //! Set the native denomination fees must be paid in.
        self.denom = denom.into();
        self
    }

    pub const fn gas_price(&self) -> &GasPrice {
        //! Configured gas price.
        &self.gas_price
    }

    pub fn denom(&self) -> &str {
        //! Native denomination.
        &self.denom
    }

    pub fn assemble(
        &self,
        wallet: &Wallet,
        messages: Vec<Message>,
        tx_info: &TransactionInfo,
        gas_limit: u64,
    ) -> Result<UnsignedTransaction, TransactionError> {
        //! Assemble a single-signer transaction.
        //!
        //! Fee is `ceil(gas_price * gas_limit)` unless `tx_info` carries
        //! an explicit one. Either way it must be in the native denomination.
        if messages.is_empty() {
            return Err(TransactionError::EmptyTransaction);
        }
        if gas_limit == 0 {
            return Err(TransactionError::ZeroGasLimit);
        }
        let fee = match &tx_info.fee {
            Some(fee) => fee.clone(),
            None => self.gas_price.fee_for(gas_limit)?,
        };
        if fee.denom != self.denom {
            return Err(AmountError::WrongDenom {
                expected: self.denom.clone(),
                got: fee.denom,
            }
            .into());
        }
        Ok(UnsignedTransaction {
            body: TxBody {
                messages,
                memo: tx_info.memo.clone(),
                timeout_height: tx_info.timeout_height,
                extension_options: vec![],
                non_critical_extension_options: vec![],
            },
            auth_info: AuthInfo {
                signer_infos: vec![SignerInfo {
                    public_key: PubKey {
                        type_url: SECP256K1_PUBKEY_TYPE.to_string(),
                        key: wallet.public_key_bytes().to_vec(),
                    },
                    mode_info: ModeInfo {
                        single: SingleMode {
                            mode: SIGN_MODE_DIRECT.to_string(),
                        },
                    },
                    sequence: tx_info.sequence,
                }],
                fee: Fee {
                    amount: vec![fee],
                    gas_limit,
                    payer: String::new(),
                    granter: String::new(),
                },
            },
        })
    }
}

/// Transaction assembly and signing errors
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum TransactionError {
    /// No messages provided
    #[error("Cannot build an empty transaction - make sure to add at least one message first.")]
    EmptyTransaction,
    /// Gas limit must be positive
    #[error("Gas limit must be positive")]
    ZeroGasLimit,
    /// Fee could not be computed
    #[error("Invalid fee: {0}")]
    Amount(#[from] AmountError),
    /// Signing failed
    #[error(transparent)]
    Signing(#[from] SigningError),
    /// Canonical encoding failed
    #[error("Encoding failed: {0}")]
    Encoding(#[from] CanonicalError),
    /// Only single-signer transactions are supported
    #[error("Expected exactly one signer, got {0}")]
    UnsupportedSigners(usize),
    /// Wallet key differs from the signer info key
    #[error("Wallet public key does not match transaction signer")]
    SignerMismatch,
    /// Signature list does not match signer infos
    #[error("Transaction is not signed by every signer")]
    MissingSignature,
    /// Signer info carries a malformed key
    #[error("Signer public key is malformed")]
    InvalidPublicKey,
    /// Signature verification failed
    #[error("Signature verification failed")]
    InvalidSignature,
}
