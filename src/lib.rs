#![doc(html_root_url = "https://docs.rs/akash-devkit/0.1.0-beta.1")]
#![warn(rust_2018_idioms, missing_docs)]
#![deny(dead_code, unused_imports, unused_mut)]

//! Rust library to aid coding with Akash Network: wallets, transaction
//! assembly, signing and verification, broadcasting and market queries.
//!
//! This library acts primary as a proxy to several underlying libraries,
//! with the addition of some Akash-specific toolchain components.
//!
//! ## Usage
//!
//! One of possible use cases can be transaction creation and signing.
//!
//! Here is how you may approach it. Let's close one of our deployments.
//!
//! To do so, we need to create a transaction and encode it into broadcastable bytes.
//!
//! ```rust
//! use akash_devkit::messages::MessageBuilder;
//! use akash_devkit::transactions::{TransactionAssembler, TransactionInfo};
//! use akash_devkit::Wallet;
//!
//! let wallet = Wallet::from_private_key(
//!     "1111111111111111111111111111111111111111111111111111111111111111",
//! )
//! .expect("Must be valid");
//! let message = MessageBuilder::default()
//!     .build_close_deployment(wallet.address().as_ref(), 1234)
//!     .expect("Must be valid");
//! let tx_info = TransactionInfo::new("akashnet-2", 5, 2);
//! let unsigned = TransactionAssembler::new("0.025uakt".parse().expect("Valid price"))
//!     .assemble(&wallet, vec![message], &tx_info, 200_000)
//!     .expect("Must assemble");
//! let signed = unsigned.sign(&wallet, &tx_info).expect("Must sign");
//! signed.verify("akashnet-2", 5).expect("Signature is valid");
//! println!("{}", signed.to_base64().expect("Must encode"));
//! ```
//!
//! With the `http` feature (enabled by default) [`client::AkashClient`]
//! resolves the account, signs and broadcasts in a single call.
//!
//! ## Encoding
//!
//! Transaction parts are encoded as canonical JSON (see [`canonical`]):
//! signatures produced here verify with this library, but a node expecting
//! protobuf-encoded transactions will reject them.
//!
//! ### MSRV
//!
//! Currently it requires rust `1.81.0` or higher to build.
//!
//! ## License
//!
//! This project is licensed under the GNU General Public License v3.

mod address;
pub use address::{
    AccountAddress, AddressConvertible, AddressError, PrivateKey, PublicKey, DEFAULT_PREFIX,
};
pub mod canonical;
pub mod coin;
pub use coin::{AmountError, Coin, GasPrice, NATIVE_DENOM};
pub mod config;
pub use config::NetworkConfig;
mod error;
pub use error::Error;
pub mod messages;
pub mod transactions;
mod utils;
pub use utils::{ripemd160, sha256};
mod wallet;
pub use wallet::{SigningError, Wallet, WalletError};

#[cfg(feature = "http")]
pub mod broadcast;
#[cfg(feature = "http")]
pub mod client;
#[cfg(feature = "http")]
pub mod network;
#[cfg(feature = "http")]
mod transaction_builder;
#[cfg(feature = "http")]
pub use transaction_builder::{TransactionBuilder, TransactionBuilderError};
