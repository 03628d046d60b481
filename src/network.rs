//! Module for interacting with node REST APIs.

use crate::address::AccountAddress;
use crate::broadcast::Broadcaster;
use crate::config::NetworkConfig;
use crate::error::Error;
use crate::transactions::TransactionInfo;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr};
use tracing::{debug, warn};

/// Transport-level failures. These are safe to retry.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum NetworkError {
    /// Endpoint URL cannot be parsed.
    #[error("Invalid endpoint url {url:?}: {reason}")]
    InvalidUrl {
        /// Offending url
        url: String,
        /// Parser error
        reason: String,
    },
    /// Connection failure or other transport error.
    #[error("Request to {endpoint} failed: {reason}")]
    Transport {
        /// Requested url
        endpoint: String,
        /// Underlying error
        reason: String,
    },
    /// No response within the configured timeout.
    #[error("Request to {endpoint} timed out")]
    Timeout {
        /// Requested url
        endpoint: String,
    },
    /// Non-2xx HTTP status.
    #[error("{endpoint} responded with HTTP {status}: {body}")]
    Status {
        /// Requested url
        endpoint: String,
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },
    /// Response body has unexpected shape.
    #[error("Unexpected response from {endpoint}: {reason}")]
    InvalidResponse {
        /// Requested url
        endpoint: String,
        /// Decoding error
        reason: String,
    },
}

impl NetworkError {
    pub(crate) fn from_reqwest(endpoint: &Url, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else {
            Self::Transport {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

/// Account resolution errors.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum AccountError {
    /// Account has never received funds, so the chain does not know it.
    #[error("Account {0} does not exist on chain")]
    UnknownAccount(AccountAddress),
    /// Query failed.
    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// On-chain account metadata needed to sign transactions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountInfo {
    /// Account address
    pub address: AccountAddress,
    /// Account number assigned on creation
    pub account_number: u64,
    /// Next expected sequence
    pub sequence: u64,
}

impl AccountInfo {
    pub fn transaction_info(&self, chain_id: &str) -> TransactionInfo {
        //! Transaction metadata for the next transaction of this account.
        TransactionInfo::new(chain_id, self.account_number, self.sequence)
    }
}

#[derive(Deserialize)]
struct AccountResponse {
    account: RawAccount,
}

/// Account in any of the SDK account flavours: base accounts carry
/// the numbers directly, vesting and module accounts nest a base account.
#[serde_as]
#[derive(Deserialize)]
struct RawAccount {
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    account_number: Option<u64>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    sequence: Option<u64>,
    #[serde(default)]
    base_account: Option<Box<RawAccount>>,
    #[serde(default)]
    base_vesting_account: Option<Box<RawAccount>>,
}

impl RawAccount {
    fn numbers(&self) -> Option<(u64, u64)> {
        match (self.account_number, self.sequence) {
            (Some(number), sequence) => Some((number, sequence.unwrap_or(0))),
            (None, _) => self
                .base_vesting_account
                .as_deref()
                .or(self.base_account.as_deref())
                .and_then(Self::numbers),
        }
    }
}

/// gRPC status code returned by the REST gateway for missing entities.
const GRPC_NOT_FOUND: i64 = 5;

#[derive(Deserialize)]
struct GatewayError {
    code: i64,
}

/// Deployment query filter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeploymentFilter {
    /// Deployment owner
    pub owner: Option<AccountAddress>,
    /// Deployment state (`active`, `closed`)
    pub state: Option<String>,
    /// Deployment sequence
    pub dseq: Option<u64>,
}

impl DeploymentFilter {
    fn as_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![];
        if let Some(owner) = &self.owner {
            query.push(("owner", owner.to_bech32()));
        }
        if let Some(state) = &self.state {
            query.push(("state", state.clone()));
        }
        if let Some(dseq) = self.dseq {
            query.push(("dseq", dseq.to_string()));
        }
        query
    }
}

/// Bid and lease query filter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarketFilter {
    /// Deployment owner
    pub owner: Option<AccountAddress>,
    /// Deployment sequence
    pub dseq: Option<u64>,
    /// Group sequence
    pub gseq: Option<u32>,
    /// Order sequence
    pub oseq: Option<u32>,
    /// Provider address
    pub provider: Option<AccountAddress>,
    /// Bid or lease state
    pub state: Option<String>,
}

impl MarketFilter {
    fn as_query(&self) -> Vec<(&'static str, String)> {
        [
            ("owner", self.owner.as_ref().map(AccountAddress::to_bech32)),
            ("dseq", self.dseq.map(|v| v.to_string())),
            ("gseq", self.gseq.map(|v| v.to_string())),
            ("oseq", self.oseq.map(|v| v.to_string())),
            ("provider", self.provider.as_ref().map(AccountAddress::to_bech32)),
            ("state", self.state.clone()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
    }
}

/// A connection to an Akash node.
///
/// Owns a single HTTP client (and its connection pool) configured with the
/// network timeout. Dropping the node releases its connections.
#[derive(Clone, Debug)]
pub struct AkashNode {
    config: NetworkConfig,
    rest_url: Url,
    rpc_url: Option<Url>,
    client: Client,
}

fn parse_url(url: &str) -> Result<Url, NetworkError> {
    Url::parse(url).map_err(|e| NetworkError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a base url so that relative joins keep its whole path.
fn parse_base_url(url: &str) -> Result<Url, NetworkError> {
    let mut base = parse_url(url)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

impl AkashNode {
    pub fn new(config: NetworkConfig) -> Result<Self, NetworkError> {
        //! Connect to the network described by `config`.
        let rest_url = parse_base_url(&config.rest_url)?;
        let rpc_url = config.rpc_url.as_deref().map(parse_url).transpose()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NetworkError::Transport {
                endpoint: rest_url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            config,
            rest_url,
            rpc_url,
            client,
        })
    }

    pub fn mainnet() -> Result<Self, NetworkError> {
        //! Mainnet node
        Self::new(NetworkConfig::mainnet())
    }

    pub fn testnet() -> Result<Self, NetworkError> {
        //! Sandbox node
        Self::new(NetworkConfig::testnet())
    }

    pub const fn config(&self) -> &NetworkConfig {
        //! Network configuration.
        &self.config
    }

    pub fn broadcaster(&self) -> Result<Broadcaster, Error> {
        //! Broadcaster bound to the configured RPC endpoint.
        //!
        //! Fails immediately when no RPC endpoint is configured.
        self.rpc_url
            .as_ref()
            .map(|url| Broadcaster::new(url.clone(), self.client.clone()))
            .ok_or(Error::MissingCapability("rpc endpoint"))
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<(Url, StatusCode, String), NetworkError> {
        let url = self
            .rest_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| NetworkError::InvalidUrl {
                url: path.to_string(),
                reason: e.to_string(),
            })?;
        debug!(endpoint = %url, "querying node");
        let response = self
            .client
            .get(url.clone())
            .query(query)
            .send()
            .await
            .map_err(|e| NetworkError::from_reqwest(&url, e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| NetworkError::from_reqwest(&url, e))?;
        Ok((url, status, text))
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, NetworkError> {
        let (url, status, text) = self.get(path, query).await?;
        if !status.is_success() {
            return Err(NetworkError::Status {
                endpoint: url.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(|e| NetworkError::InvalidResponse {
            endpoint: url.to_string(),
            reason: e.to_string(),
        })
    }

    pub async fn fetch_account(
        &self,
        address: &AccountAddress,
    ) -> Result<Option<AccountInfo>, NetworkError> {
        //! Retrieve account number and sequence.
        //!
        //! Returns [`None`] for accounts unknown to the chain.
        let path = format!("cosmos/auth/v1beta1/accounts/{address}");
        let (url, status, text) = self.get(&path, &[]).await?;
        if status == StatusCode::NOT_FOUND
            || serde_json::from_str::<GatewayError>(&text)
                .is_ok_and(|e| e.code == GRPC_NOT_FOUND)
        {
            debug!(%address, "account not found on chain");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(NetworkError::Status {
                endpoint: url.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }
        let decoded: AccountResponse =
            serde_json::from_str(&text).map_err(|e| NetworkError::InvalidResponse {
                endpoint: url.to_string(),
                reason: e.to_string(),
            })?;
        let (account_number, sequence) =
            decoded
                .account
                .numbers()
                .ok_or_else(|| NetworkError::InvalidResponse {
                    endpoint: url.to_string(),
                    reason: "account carries no account number".to_string(),
                })?;
        Ok(Some(AccountInfo {
            address: address.clone(),
            account_number,
            sequence,
        }))
    }

    pub async fn resolve_account(
        &self,
        address: &AccountAddress,
    ) -> Result<AccountInfo, AccountError> {
        //! Retrieve account number and sequence, failing for unknown accounts.
        //!
        //! Unknown accounts would sign with account number and sequence 0;
        //! that is left for the caller to decide (e.g. fund the account first).
        match self.fetch_account(address).await? {
            Some(info) => {
                debug!(
                    %address,
                    account_number = info.account_number,
                    sequence = info.sequence,
                    "resolved account"
                );
                Ok(info)
            }
            None => {
                warn!(%address, "account is not known to the chain");
                Err(AccountError::UnknownAccount(address.clone()))
            }
        }
    }

    pub async fn fetch_deployments(
        &self,
        filter: &DeploymentFilter,
    ) -> Result<Value, NetworkError> {
        //! List deployments matching the filter.
        self.get_json("akash/deployment/v1beta3/deployments", &filter.as_query())
            .await
    }

    pub async fn fetch_deployment(
        &self,
        owner: &AccountAddress,
        dseq: u64,
    ) -> Result<Value, NetworkError> {
        //! Retrieve a single deployment.
        let path = format!("akash/deployment/v1beta3/deployments/{owner}/{dseq}");
        self.get_json(&path, &[]).await
    }

    pub async fn fetch_bids(&self, filter: &MarketFilter) -> Result<Value, NetworkError> {
        //! List bids matching the filter.
        self.get_json("akash/market/v1beta4/bids/list", &filter.as_query())
            .await
    }

    pub async fn fetch_leases(&self, filter: &MarketFilter) -> Result<Value, NetworkError> {
        //! List leases matching the filter.
        self.get_json("akash/market/v1beta4/leases/list", &filter.as_query())
            .await
    }

    pub async fn fetch_providers(&self) -> Result<Value, NetworkError> {
        //! List providers.
        self.get_json("akash/provider/v1beta3/providers", &[]).await
    }

    pub async fn fetch_provider(&self, address: &AccountAddress) -> Result<Value, NetworkError> {
        //! Retrieve a single provider.
        let path = format!("akash/provider/v1beta3/providers/{address}");
        self.get_json(&path, &[]).await
    }

    pub async fn health_check(&self) -> bool {
        //! Whether the REST endpoint answers node info queries.
        match self
            .get("cosmos/base/tendermint/v1beta1/node_info", &[])
            .await
        {
            Ok((_, status, _)) => status.is_success(),
            Err(e) => {
                warn!(error = %e, "health check failed");
                false
            }
        }
    }
}
