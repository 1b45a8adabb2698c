//! Contract transport adapter.
//!
//! Deployment glue between the attestation worker and the contract chain's
//! node: simulation and submission go out as JSON-RPC calls, with the
//! deployer key material included for the node to build and sign the actual
//! transaction. The node is assumed trusted (same host or private network);
//! nothing here ever logs the signer field.

use std::time::Duration;

use async_trait::async_trait;
use ordbridge_bridge::contract::{
    AttestBurnCall, ContractTransport, Simulation, TransportError, TxParams, TxReceipt,
    UnspentOutput,
};
use serde_json::{json, Value};

pub(crate) struct RpcContractTransport {
    http: reqwest::Client,
    url: String,
    contract_address: String,
    signer_mnemonic: String,
}

impl RpcContractTransport {
    pub(crate) fn new(
        url: impl Into<String>,
        contract_address: impl Into<String>,
        signer_mnemonic: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
            contract_address: contract_address.into(),
            signer_mnemonic: signer_mnemonic.into(),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": "ordbridge-worker",
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let parsed: Value = response
            .json()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if let Some(error) = parsed.get("error").filter(|e| !e.is_null()) {
            return Err(TransportError::Rpc(error.to_string()));
        }
        parsed
            .get("result")
            .cloned()
            .ok_or_else(|| TransportError::Rpc("response carried no result".to_string()))
    }

    fn call_body(&self, call: &AttestBurnCall) -> Value {
        json!({
            "contract": self.contract_address,
            "method": "attestBurn",
            "args": [
                format!("{}", call.sender),
                format!("{:#x}", call.inscription_hash),
                call.token_id.to_string(),
            ],
        })
    }
}

#[async_trait]
impl ContractTransport for RpcContractTransport {
    async fn simulate(&self, call: &AttestBurnCall) -> Result<Simulation, TransportError> {
        let result = self.call("contract_simulate", json!([self.call_body(call)])).await?;
        let revert = result
            .get("revert")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(Simulation { revert })
    }

    async fn submit(
        &self,
        call: &AttestBurnCall,
        params: &TxParams,
    ) -> Result<TxReceipt, TransportError> {
        let utxos: Option<Vec<Value>> = params.utxos.as_ref().map(|outputs| {
            outputs
                .iter()
                .map(|utxo| {
                    json!({
                        "txid": utxo.txid,
                        "vout": utxo.vout,
                        "value_sats": utxo.value_sats,
                    })
                })
                .collect()
        });

        let mut body = self.call_body(call);
        body["signer"] = json!(self.signer_mnemonic);
        body["max_sats_to_spend"] = json!(params.max_sats_to_spend);
        body["fee_rate"] = json!(params.fee_rate);
        body["priority_fee"] = json!(params.priority_fee);
        if let Some(utxos) = utxos {
            body["utxos"] = json!(utxos);
        }

        let result = self.call("contract_send", json!([body])).await?;

        let txid = result
            .get("txid")
            .and_then(Value::as_str)
            .ok_or_else(|| TransportError::Rpc("receipt carried no txid".to_string()))?
            .to_string();
        let new_outputs = result
            .get("new_outputs")
            .and_then(Value::as_array)
            .map(|outputs| {
                outputs
                    .iter()
                    .filter_map(|output| {
                        Some(UnspentOutput {
                            txid: output.get("txid")?.as_str()?.to_string(),
                            vout: output.get("vout")?.as_u64()? as u32,
                            value_sats: output.get("value_sats")?.as_u64()?,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(TxReceipt { txid, new_outputs })
    }
}
