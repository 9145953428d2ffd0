//! JSON-RPC adapter for the vote ledger contract.
//!
//! Reads go through `eth_call` against the contract; writes are signed
//! locally (`adapters::signer`) and submitted with
//! `eth_sendRawTransaction`, then confirmed by polling for a receipt
//! within a bounded window. `getVote` returns a dynamic tuple the RPC
//! layer will not decode, so its payload is handed back raw for
//! `domain::decoder`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use primitive_types::{H160, U256};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::adapters::abi::{self, Token};
use crate::adapters::signer::{LegacyTx, TxSigner};
use crate::domain::config::LedgerConfig;
use crate::domain::errors::LedgerError;
use crate::domain::types::{PendingWrite, WinningChoice, WriteReceipt};
use crate::ports::LedgerGateway;

// Contract method signatures; selectors are derived from these, so they
// must match the deployed contract exactly.
const HAS_VOTED: &str = "checkHasVoted(string)";
const CAST_VOTE: &str = "castVote(string,uint256)";
const VOTE_COUNT: &str = "getVoteCount()";
const GET_VOTE: &str = "getVote(uint256)";
const CHOICE_VOTES: &str = "getButtonVotes(uint256)";
const PICK_WINNER: &str = "pickWinner()";
const INITIALIZE: &str = "initialize()";
const RESET_VOTE: &str = "resetVote(string)";
const OWNER: &str = "owner()";

/// Gas ceiling used when the endpoint cannot estimate (it still bounds
/// the spend; unused gas is refunded).
const FALLBACK_GAS_LIMIT: u64 = 2_000_000;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, P: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    params: P,
    id: u64,
}

// `result` stays a raw value until the error field has been checked:
// `eth_getTransactionReceipt` answers `result: null` while a transaction
// is pending, and that null must deserialize into `Option::None` rather
// than read as a missing result.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: serde_json::Value,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Receipt fields we consume, as returned by `eth_getTransactionReceipt`.
#[derive(Debug, Deserialize)]
struct ReceiptJson {
    status: Option<String>,
    #[serde(rename = "blockNumber")]
    block_number: Option<String>,
    #[serde(rename = "gasUsed")]
    gas_used: Option<String>,
}

/// Production [`LedgerGateway`] speaking Ethereum JSON-RPC over HTTP.
pub struct RpcLedger {
    client: Client,
    endpoint: String,
    contract: H160,
    signer: TxSigner,
    confirmation_timeout: Duration,
    poll_interval: Duration,
    request_id: AtomicU64,
}

impl RpcLedger {
    /// Build the adapter from validated configuration.
    pub fn new(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let contract = parse_address(&config.contract_address)?;
        let signer = TxSigner::from_hex(&config.signer_key, config.chain_id)?;

        info!(
            contract = %format!("{contract:#x}"),
            from = %format!("{:#x}", signer.address()),
            endpoint = %config.rpc_url,
            "ledger adapter initialized"
        );

        Ok(Self {
            client,
            endpoint: config.rpc_url.clone(),
            contract,
            signer,
            confirmation_timeout: config.confirmation_timeout,
            poll_interval: config.poll_interval,
            request_id: AtomicU64::new(1),
        })
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Issue one JSON-RPC call.
    async fn rpc<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, LedgerError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let parsed: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Response(e.to_string()))?;

        if let Some(error) = parsed.error {
            return Err(LedgerError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        serde_json::from_value(parsed.result)
            .map_err(|e| LedgerError::Response(format!("{method}: {e}")))
    }

    /// Read-only contract call; returns the raw return payload.
    async fn eth_call(&self, data: Vec<u8>) -> Result<Vec<u8>, LedgerError> {
        let params = serde_json::json!([
            {
                "to": format!("{:#x}", self.contract),
                "data": format!("0x{}", hex::encode(&data)),
            },
            "latest"
        ]);
        let result: String = self.rpc("eth_call", params).await?;
        decode_hex_payload(&result)
    }

    /// Sign and submit a state-changing call.
    async fn send_transaction(&self, data: Vec<u8>) -> Result<PendingWrite, LedgerError> {
        let from = format!("{:#x}", self.signer.address());
        let to = format!("{:#x}", self.contract);
        let data_hex = format!("0x{}", hex::encode(&data));

        let nonce_hex: String = self
            .rpc("eth_getTransactionCount", serde_json::json!([from, "pending"]))
            .await?;
        let nonce = parse_quantity(&nonce_hex)?;

        let gas_price_hex: String = self.rpc("eth_gasPrice", serde_json::json!([])).await?;
        let gas_price = parse_u256(&gas_price_hex)?;

        // A revert here is the ledger refusing the write up front (for a
        // vote: the tag already voted and we lost the pre-check race).
        let gas_limit = match self
            .rpc::<_, String>(
                "eth_estimateGas",
                serde_json::json!([{ "from": from, "to": to, "data": data_hex }]),
            )
            .await
        {
            Ok(estimate) => parse_quantity(&estimate)?,
            Err(error) if error.is_rejection() => return Err(error),
            Err(other) => {
                warn!(%other, "gas estimation unavailable, using fallback limit");
                FALLBACK_GAS_LIMIT
            }
        };

        let raw = self.signer.sign_legacy(&LegacyTx {
            nonce,
            gas_price,
            gas_limit,
            to: self.contract,
            value: U256::zero(),
            data,
        })?;

        let tx_hash: String = self
            .rpc(
                "eth_sendRawTransaction",
                serde_json::json!([format!("0x{}", hex::encode(raw))]),
            )
            .await?;

        debug!(%tx_hash, nonce, gas_limit, "transaction submitted");
        Ok(PendingWrite { tx_hash })
    }
}

#[async_trait]
impl LedgerGateway for RpcLedger {
    async fn has_voted(&self, tag_id: &str) -> Result<bool, LedgerError> {
        let payload = self
            .eth_call(abi::encode_call(HAS_VOTED, &[Token::Str(tag_id)]))
            .await?;
        abi::decode_bool(&payload)
    }

    async fn cast_vote(&self, tag_id: &str, choice_id: u64) -> Result<PendingWrite, LedgerError> {
        self.send_transaction(abi::encode_call(
            CAST_VOTE,
            &[Token::Str(tag_id), Token::Uint(choice_id)],
        ))
        .await
    }

    async fn wait_for_confirmation(
        &self,
        pending: &PendingWrite,
    ) -> Result<WriteReceipt, LedgerError> {
        let deadline = tokio::time::Instant::now() + self.confirmation_timeout;

        loop {
            let receipt: Option<ReceiptJson> = self
                .rpc(
                    "eth_getTransactionReceipt",
                    serde_json::json!([pending.tx_hash]),
                )
                .await?;

            if let Some(receipt) = receipt {
                return finish_receipt(&pending.tx_hash, receipt);
            }

            if tokio::time::Instant::now() + self.poll_interval > deadline {
                return Err(LedgerError::ConfirmationTimeout {
                    tx_hash: pending.tx_hash.clone(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn vote_count(&self) -> Result<u64, LedgerError> {
        let payload = self.eth_call(abi::encode_call(VOTE_COUNT, &[])).await?;
        abi::decode_u64(&payload, 0)
    }

    async fn record_bytes(&self, index: u64) -> Result<Vec<u8>, LedgerError> {
        self.eth_call(abi::encode_call(GET_VOTE, &[Token::Uint(index)]))
            .await
    }

    async fn votes_for(&self, choice_id: u64) -> Result<u64, LedgerError> {
        let payload = self
            .eth_call(abi::encode_call(CHOICE_VOTES, &[Token::Uint(choice_id)]))
            .await?;
        abi::decode_u64(&payload, 0)
    }

    async fn winning_choice(&self) -> Result<WinningChoice, LedgerError> {
        let payload = self.eth_call(abi::encode_call(PICK_WINNER, &[])).await?;
        Ok(WinningChoice {
            choice_id: abi::decode_u64(&payload, 0)?,
            votes: abi::decode_u64(&payload, 1)?,
        })
    }

    async fn initialize(&self) -> Result<PendingWrite, LedgerError> {
        self.send_transaction(abi::encode_call(INITIALIZE, &[]))
            .await
    }

    async fn reset_vote(&self, tag_id: &str) -> Result<PendingWrite, LedgerError> {
        self.send_transaction(abi::encode_call(RESET_VOTE, &[Token::Str(tag_id)]))
            .await
    }

    async fn owner(&self) -> Result<String, LedgerError> {
        let payload = self.eth_call(abi::encode_call(OWNER, &[])).await?;
        abi::decode_address(&payload)
    }
}

/// Turn a fetched receipt into a [`WriteReceipt`], rejecting reverts.
fn finish_receipt(tx_hash: &str, receipt: ReceiptJson) -> Result<WriteReceipt, LedgerError> {
    if receipt.status.as_deref() == Some("0x0") {
        return Err(LedgerError::Reverted {
            tx_hash: tx_hash.to_string(),
        });
    }

    let block_number = receipt
        .block_number
        .as_deref()
        .map(parse_quantity)
        .transpose()?
        .ok_or_else(|| LedgerError::Response("receipt missing blockNumber".into()))?;
    let gas_used = receipt
        .gas_used
        .as_deref()
        .map(parse_quantity)
        .transpose()?
        .unwrap_or(0);

    Ok(WriteReceipt {
        tx_hash: tx_hash.to_string(),
        block_number,
        gas_used: gas_used.to_string(),
    })
}

fn parse_address(address: &str) -> Result<H160, LedgerError> {
    let stripped = address.strip_prefix("0x").unwrap_or(address);
    let bytes = hex::decode(stripped)
        .map_err(|e| LedgerError::Response(format!("invalid address hex: {e}")))?;
    if bytes.len() != 20 {
        return Err(LedgerError::Response(format!(
            "address must be 20 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(H160::from_slice(&bytes))
}

fn decode_hex_payload(payload: &str) -> Result<Vec<u8>, LedgerError> {
    let stripped = payload.strip_prefix("0x").unwrap_or(payload);
    hex::decode(stripped).map_err(|e| LedgerError::Response(format!("invalid hex payload: {e}")))
}

/// Parse a 0x-prefixed hex quantity into u64.
fn parse_quantity(quantity: &str) -> Result<u64, LedgerError> {
    let stripped = quantity.strip_prefix("0x").unwrap_or(quantity);
    u64::from_str_radix(stripped, 16)
        .map_err(|e| LedgerError::Response(format!("invalid quantity {quantity:?}: {e}")))
}

fn parse_u256(quantity: &str) -> Result<U256, LedgerError> {
    let stripped = quantity.strip_prefix("0x").unwrap_or(quantity);
    U256::from_str_radix(stripped, 16)
        .map_err(|e| LedgerError::Response(format!("invalid quantity {quantity:?}: {e}")))
}
