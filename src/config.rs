//! Network configuration.

use crate::address::DEFAULT_PREFIX;
use crate::coin::{AmountError, GasPrice, NATIVE_DENOM};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use std::{path::Path, time::Duration};

/// Parameters of an Akash network and the endpoints used to reach it.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Chain identifier
    pub chain_id: String,
    /// Native denomination
    #[serde(default = "default_denom")]
    pub denom: String,
    /// Bech32 prefix of account addresses
    #[serde(default = "default_prefix")]
    pub bech32_prefix: String,
    /// Price of one unit of gas
    pub gas_price: GasPrice,
    /// Gas limit used when none is given
    #[serde(default = "default_gas_limit")]
    pub default_gas_limit: u64,
    /// REST (LCD) API base url
    pub rest_url: String,
    /// Tendermint RPC url, required to broadcast
    #[serde(default)]
    pub rpc_url: Option<String>,
    /// gRPC url. Informational only: nothing in this crate speaks gRPC,
    /// it is kept for callers running their own gRPC clients.
    #[serde(default)]
    pub grpc_url: Option<String>,
    /// Timeout of every network request
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_timeout", rename = "timeout_secs")]
    pub timeout: Duration,
}

fn default_denom() -> String {
    NATIVE_DENOM.to_string()
}
fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}
const fn default_gas_limit() -> u64 {
    NetworkConfig::DEFAULT_GAS_LIMIT
}
const fn default_timeout() -> Duration {
    NetworkConfig::DEFAULT_TIMEOUT
}

impl NetworkConfig {
    /// Chain identifier of mainnet
    pub const MAINNET_CHAIN_ID: &'static str = "akashnet-2";
    /// REST API URL for mainnet (one possible)
    pub const MAINNET_REST_URL: &'static str = "https://api.akash.network/";
    /// RPC URL for mainnet (one possible)
    pub const MAINNET_RPC_URL: &'static str = "https://rpc.akash.network/";
    /// gRPC URL for mainnet (one possible)
    pub const MAINNET_GRPC_URL: &'static str = "grpc.akash.network:9090";
    /// Chain identifier of sandbox (testnet)
    pub const TESTNET_CHAIN_ID: &'static str = "sandbox-01";
    /// REST API URL for sandbox (one possible)
    pub const TESTNET_REST_URL: &'static str = "https://api.sandbox-01.aksh.pw/";
    /// RPC URL for sandbox (one possible)
    pub const TESTNET_RPC_URL: &'static str = "https://rpc.sandbox-01.aksh.pw/";
    /// Default gas price
    pub const DEFAULT_GAS_PRICE: &'static str = "0.025uakt";
    /// Default gas limit
    pub const DEFAULT_GAS_LIMIT: u64 = 200_000;
    /// Default request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    fn with_defaults(chain_id: &str, rest_url: &str, rpc_url: Option<&str>) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            denom: default_denom(),
            bech32_prefix: default_prefix(),
            gas_price: Self::DEFAULT_GAS_PRICE
                .parse()
                .expect("Preset gas price is valid"),
            default_gas_limit: Self::DEFAULT_GAS_LIMIT,
            rest_url: rest_url.to_string(),
            rpc_url: rpc_url.map(str::to_string),
            grpc_url: None,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn mainnet() -> Self {
        //! Mainnet parameters
        Self {
            grpc_url: Some(Self::MAINNET_GRPC_URL.to_string()),
            ..Self::with_defaults(
                Self::MAINNET_CHAIN_ID,
                Self::MAINNET_REST_URL,
                Some(Self::MAINNET_RPC_URL),
            )
        }
    }

    pub fn testnet() -> Self {
        //! Sandbox parameters
        Self::with_defaults(
            Self::TESTNET_CHAIN_ID,
            Self::TESTNET_REST_URL,
            Some(Self::TESTNET_RPC_URL),
        )
    }

    pub fn custom<S: Into<String>, T: Into<String>>(chain_id: S, rest_url: T) -> Self {
        //! Custom network with default denomination, gas and timeout; no RPC endpoint.
        Self::with_defaults(&chain_id.into(), &rest_url.into(), None)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        //! Load configuration from a JSON file.
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        //! Parse configuration from JSON text.
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        //! Check that the gas price is quoted in the native denomination.
        if self.gas_price.denom() != self.denom {
            return Err(ConfigError::Amount(AmountError::WrongDenom {
                expected: self.denom.clone(),
                got: self.gas_price.denom().to_string(),
            }));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_rest_url<S: Into<String>>(mut self, rest_url: S) -> Self {
        //! Set REST endpoint.
        self.rest_url = rest_url.into();
        self
    }

    #[must_use]
    pub fn with_rpc_url<S: Into<String>>(mut self, rpc_url: S) -> Self {
        //! Set RPC endpoint.
        self.rpc_url = Some(rpc_url.into());
        self
    }
    #[must_use]
    pub fn without_rpc(mut self) -> Self {
        //! Drop RPC endpoint (query-only configuration).
        self.rpc_url = None;
        self
    }
    #[must_use]
    pub fn with_gas_price(mut self, gas_price: GasPrice) -> Self {
        //! Set gas price.
        self.gas_price = gas_price;
        self
    }
    #[must_use]
    pub const fn with_default_gas_limit(mut self, gas_limit: u64) -> Self {
        //! Set default gas limit.
        self.default_gas_limit = gas_limit;
        self
    }
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        //! Set request timeout.
        self.timeout = timeout;
        self
    }
}

/// Configuration loading errors.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File could not be read.
    #[error("Failed to read {path}: {reason}")]
    Io {
        /// File path
        path: String,
        /// Underlying error
        reason: String,
    },
    /// Content is not a valid configuration.
    #[error("Invalid configuration: {0}")]
    Parse(String),
    /// Gas price does not match the native denomination.
    #[error("Invalid configuration: {0}")]
    Amount(#[from] AmountError),
}
