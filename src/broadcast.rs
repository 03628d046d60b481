//! Submitting signed transactions over Tendermint JSON-RPC.

use crate::network::NetworkError;
use crate::transactions::{SignedTransaction, TransactionError};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use std::fmt;
use tracing::{debug, info, warn};

/// JSON-RPC method used for submission: waits for block inclusion.
pub const BROADCAST_METHOD: &str = "broadcast_tx_commit";

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: BroadcastParams<'a>,
}

#[derive(Serialize)]
struct BroadcastParams<'a> {
    tx: &'a str,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// JSON-RPC error object. Nodes and proxies disagree on field types,
/// so codes may come as strings and messages as arbitrary values.
#[serde_as]
#[derive(Deserialize)]
struct RpcErrorBody {
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    data: Option<Value>,
}

fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn rpc_rejection(error: Value) -> ChainRejection {
    let rejection = |code, message, data| ChainRejection {
        stage: RejectionStage::Rpc,
        code,
        codespace: None,
        message,
        data,
        hash: None,
    };
    if let Value::String(message) = error {
        return rejection(0, message, None);
    }
    let text = error.to_string();
    match serde_json::from_value::<RpcErrorBody>(error) {
        Ok(body) => rejection(
            body.code.unwrap_or(0),
            body.message.map(value_text).unwrap_or_default(),
            body.data.map(value_text),
        ),
        Err(_) => rejection(0, text, None),
    }
}

#[serde_as]
#[derive(Deserialize)]
struct BroadcastTxCommit {
    #[serde(default)]
    hash: Option<String>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    #[serde(default)]
    height: Option<u64>,
    #[serde(default)]
    check_tx: Option<TxOutcome>,
    #[serde(default)]
    deliver_tx: Option<TxOutcome>,
    #[serde(default)]
    tx_result: Option<TxOutcome>,
}

#[serde_as]
#[derive(Deserialize)]
struct TxOutcome {
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    codespace: Option<String>,
    #[serde(default)]
    log: Option<String>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    #[serde(default)]
    gas_wanted: Option<u64>,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    #[serde(default)]
    gas_used: Option<u64>,
    #[serde(default)]
    events: Option<Vec<Event>>,
}

/// ABCI event emitted while executing a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event type
    #[serde(rename = "type")]
    pub kind: String,
    /// Event attributes
    #[serde(default)]
    pub attributes: Vec<EventAttribute>,
}

/// Key-value pair of an [`Event`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttribute {
    /// Attribute key
    pub key: String,
    /// Attribute value
    #[serde(default)]
    pub value: Option<String>,
    /// Whether the node indexes the attribute
    #[serde(default)]
    pub index: bool,
}

/// Outcome of a transaction accepted by the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BroadcastResult {
    /// Transaction hash reported by the node
    pub hash: String,
    /// Inclusion height
    pub height: Option<u64>,
    /// Gas requested
    pub gas_wanted: Option<u64>,
    /// Gas consumed
    pub gas_used: Option<u64>,
    /// Execution events, check stage first
    pub events: Vec<Event>,
}

/// Stage at which the chain refused a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectionStage {
    /// RPC server refused the request itself.
    Rpc,
    /// Mempool admission (`CheckTx`).
    CheckTx,
    /// Block execution (`DeliverTx`).
    DeliverTx,
}

impl fmt::Display for RejectionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rpc => "rpc",
            Self::CheckTx => "check_tx",
            Self::DeliverTx => "deliver_tx",
        })
    }
}

/// Well-formed refusal of a transaction by the chain.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Transaction rejected at {stage} with code {code}: {message}")]
pub struct ChainRejection {
    /// Rejection stage
    pub stage: RejectionStage,
    /// Error code (ABCI code or JSON-RPC error code)
    pub code: i64,
    /// Module that produced the code
    pub codespace: Option<String>,
    /// Human readable message (raw log)
    pub message: String,
    /// Additional error data
    pub data: Option<String>,
    /// Transaction hash, if the node reported one
    pub hash: Option<String>,
}

/// Broadcast errors.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum BroadcastError {
    /// Transaction cannot be encoded.
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    /// Node was not reached or answered garbage.
    #[error(transparent)]
    Network(#[from] NetworkError),
    /// Chain refused the transaction.
    #[error(transparent)]
    Rejected(#[from] ChainRejection),
}

fn stage_rejection(
    stage: RejectionStage,
    outcome: &TxOutcome,
    hash: Option<&String>,
) -> Option<ChainRejection> {
    let code = outcome.code.unwrap_or(0);
    (code != 0).then(|| ChainRejection {
        stage,
        code: i64::from(code),
        codespace: outcome.codespace.clone().filter(|c| !c.is_empty()),
        message: outcome.log.clone().unwrap_or_default(),
        data: None,
        hash: hash.cloned(),
    })
}

/// Submits signed transactions to a Tendermint RPC endpoint.
///
/// Every call is a single attempt. Dropping the returned future abandons the
/// request, but the node may still have received the transaction.
#[derive(Clone, Debug)]
pub struct Broadcaster {
    rpc_url: Url,
    client: Client,
}

impl Broadcaster {
    pub const fn new(rpc_url: Url, client: Client) -> Self {
        //! Broadcaster posting to `rpc_url` with the given HTTP client.
        Self { rpc_url, client }
    }

    pub const fn rpc_url(&self) -> &Url {
        //! RPC endpoint.
        &self.rpc_url
    }

    pub async fn broadcast(
        &self,
        signed_tx: &SignedTransaction,
    ) -> Result<BroadcastResult, BroadcastError> {
        //! Submit a transaction and wait for its inclusion.
        let tx = signed_tx.to_base64()?;
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: BROADCAST_METHOD,
            params: BroadcastParams { tx: &tx },
        };
        debug!(endpoint = %self.rpc_url, "broadcasting transaction");
        let response = self
            .client
            .post(self.rpc_url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| NetworkError::from_reqwest(&self.rpc_url, e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| NetworkError::from_reqwest(&self.rpc_url, e))?;
        if !status.is_success() {
            warn!(endpoint = %self.rpc_url, status = status.as_u16(), "broadcast failed");
            return Err(NetworkError::Status {
                endpoint: self.rpc_url.to_string(),
                status: status.as_u16(),
                body: text,
            }
            .into());
        }
        let result = self.interpret(&text)?;
        info!(hash = %result.hash, height = ?result.height, "transaction committed");
        Ok(result)
    }

    fn interpret(&self, text: &str) -> Result<BroadcastResult, BroadcastError> {
        let invalid = |reason: String| NetworkError::InvalidResponse {
            endpoint: self.rpc_url.to_string(),
            reason,
        };
        let response: JsonRpcResponse =
            serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?;
        if let Some(error) = response.error {
            let rejection = rpc_rejection(error);
            warn!(
                code = rejection.code,
                message = %rejection.message,
                "transaction rejected by rpc"
            );
            return Err(rejection.into());
        }
        let result = response
            .result
            .ok_or_else(|| invalid("neither result nor error present".to_string()))?;
        let commit: BroadcastTxCommit =
            serde_json::from_value(result).map_err(|e| invalid(e.to_string()))?;
        let hash = commit.hash.as_ref();
        let deliver = commit.deliver_tx.as_ref().or(commit.tx_result.as_ref());
        let rejection = commit
            .check_tx
            .as_ref()
            .and_then(|o| stage_rejection(RejectionStage::CheckTx, o, hash))
            .or_else(|| {
                deliver.and_then(|o| stage_rejection(RejectionStage::DeliverTx, o, hash))
            });
        if let Some(rejection) = rejection {
            warn!(
                stage = %rejection.stage,
                code = rejection.code,
                log = %rejection.message,
                "transaction rejected by chain"
            );
            return Err(rejection.into());
        }
        let hash = commit
            .hash
            .clone()
            .ok_or_else(|| invalid("missing transaction hash".to_string()))?;
        let events = commit
            .check_tx
            .iter()
            .chain(deliver)
            .flat_map(|o| o.events.iter().flatten().cloned())
            .collect();
        Ok(BroadcastResult {
            hash,
            height: commit.height,
            gas_wanted: deliver.and_then(|o| o.gas_wanted),
            gas_used: deliver.and_then(|o| o.gas_used),
            events,
        })
    }
}
