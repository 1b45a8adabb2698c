//! Bitcoin Core block source.
//!
//! A thin JSON-RPC client: `getblockhash` by height, then `getblock` at
//! verbosity 0 and a consensus decode. The height-out-of-range error is
//! surfaced as its own variant because the pipeline treats "not mined yet"
//! differently from everything else.

use std::time::Duration;

use async_trait::async_trait;
use bitcoin::{consensus, hashes::hex::FromHex, Block};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Bitcoin Core's RPC_INVALID_PARAMETER, returned by `getblockhash` for a
/// height past the tip.
const RPC_INVALID_PARAMETER: i64 = -8;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("block at height {0} not found")]
    BlockNotFound(u64),

    #[error("network: {0}")]
    Network(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("failed to decode block: {0}")]
    Decode(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn block_count(&self) -> Result<u64, ClientError>;

    /// Fetches the full block at `height`.
    /// [`ClientError::BlockNotFound`] means the chain has not reached it yet.
    async fn block_at(&self, height: u64) -> Result<Block, ClientError>;
}

pub struct BitcoinCoreClient {
    http: reqwest::Client,
    url: String,
    auth: Option<(String, String)>,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl BitcoinCoreClient {
    /// `username`/`password` are cookie or rpcauth credentials; pass `None`
    /// for an unauthenticated endpoint.
    pub fn new(
        url: impl Into<String>,
        username: Option<String>,
        password: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
            auth: username.map(|user| (user, password.unwrap_or_default())),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        let body = json!({
            "jsonrpc": "1.0",
            "id": "ordbridge",
            "method": method,
            "params": params,
        });

        let mut request = self.http.post(&self.url).json(&body);
        if let Some((user, pass)) = &self.auth {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        if let Some(error) = parsed.error {
            return Err(ClientError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        parsed.result.ok_or_else(|| ClientError::Rpc {
            code: 0,
            message: "response carried neither result nor error".to_string(),
        })
    }
}

#[async_trait]
impl BlockSource for BitcoinCoreClient {
    async fn block_count(&self) -> Result<u64, ClientError> {
        let result = self.call("getblockcount", json!([])).await?;
        result
            .as_u64()
            .ok_or_else(|| ClientError::Decode(format!("getblockcount returned {result}")))
    }

    async fn block_at(&self, height: u64) -> Result<Block, ClientError> {
        let hash = match self.call("getblockhash", json!([height])).await {
            Err(ClientError::Rpc { code, .. }) if code == RPC_INVALID_PARAMETER => {
                return Err(ClientError::BlockNotFound(height));
            }
            other => other?,
        };
        let hash = hash
            .as_str()
            .ok_or_else(|| ClientError::Decode("getblockhash returned non-string".to_string()))?
            .to_string();

        // Verbosity 0: raw hex, decoded locally.
        let raw = self.call("getblock", json!([hash, 0])).await?;
        let hex = raw
            .as_str()
            .ok_or_else(|| ClientError::Decode("getblock returned non-string".to_string()))?;
        let bytes = Vec::<u8>::from_hex(hex).map_err(|e| ClientError::Decode(e.to_string()))?;
        consensus::deserialize(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }
}
