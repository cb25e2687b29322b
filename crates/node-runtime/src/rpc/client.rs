//! JSON-RPC client for the ledger provider.
//!
//! Implements both outbound ports the runtime needs: log scanning for the
//! indexer and `getConsent` reads for the evaluator.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mc_01_event_indexing::domain::abi::encode::{encode_tokens, Token};
use mc_01_event_indexing::{LedgerProvider, ScanWindow};
use mc_02_consent_evaluation::{ConsentLedger, ConsentTuple};
use primitive_types::U256;
use reqwest::{Client, StatusCode};
use shared_types::{
    function_selector, to_hex_prefixed, Address, BlockNumber, LogBatch, ProviderError,
    TransientKind,
};
use tracing::debug;

use super::types::*;

const WORD: usize = 32;

/// `getConsent(string,address)` on the consent registry.
pub const GET_CONSENT_SIGNATURE: &str = "getConsent(string,address)";

/// HTTP JSON-RPC client.
pub struct JsonRpcClient {
    client: Client,
    url: String,
    consent_manager: Address,
    request_id: AtomicU64,
}

impl JsonRpcClient {
    /// `timeout` bounds each HTTP exchange; the poller applies its own
    /// bound on top.
    pub fn new(
        url: impl Into<String>,
        consent_manager: Address,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(2))
            .build()
            .map_err(|e| ProviderError::Fatal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            consent_manager,
            request_id: AtomicU64::new(1),
        })
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Call a JSON-RPC method.
    async fn call<P: serde::Serialize, R: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, ProviderError> {
        let id = self.next_id();
        let request = JsonRpcRequest::new(method, params, id);
        debug!(method, id, "[mc-rpc] request");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_transport(method, &e))?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::transient(
                TransientKind::RateLimited,
                format!("{}: HTTP 429", method),
            ));
        }
        if !response.status().is_success() {
            return Err(ProviderError::Fatal(format!(
                "{}: HTTP {}",
                method,
                response.status()
            )));
        }

        let rpc_response: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(format!("{}: {}", method, e)))?;

        if let Some(error) = rpc_response.error {
            return Err(classify_rpc_error(method, &error));
        }

        rpc_response
            .result
            .ok_or_else(|| ProviderError::Malformed(format!("{}: missing result", method)))
    }
}

#[async_trait]
impl LedgerProvider for JsonRpcClient {
    async fn chain_height(&self) -> Result<BlockNumber, ProviderError> {
        let raw: String = self.call("eth_blockNumber", [(); 0]).await?;
        parse_quantity(&raw)
    }

    async fn get_logs(
        &self,
        addresses: &[Address],
        window: ScanWindow,
    ) -> Result<LogBatch, ProviderError> {
        let filter = LogFilter {
            address: addresses
                .iter()
                .map(|a| to_hex_prefixed(a.as_bytes()))
                .collect(),
            from_block: to_quantity(window.from),
            to_block: to_quantity(window.to),
        };
        // Only a non-array result fails the window; entries are read one by one.
        let entries: Vec<serde_json::Value> = self.call("eth_getLogs", [filter]).await?;
        let batch = read_logs(entries);
        if !batch.rejected.is_empty() {
            debug!(
                rejected = batch.rejected.len(),
                "[mc-rpc] eth_getLogs returned unreadable entries"
            );
        }
        Ok(batch)
    }
}

#[async_trait]
impl ConsentLedger for JsonRpcClient {
    async fn get_consent(
        &self,
        file_cid: &str,
        grantee: Address,
    ) -> Result<ConsentTuple, ProviderError> {
        let call = CallRequest {
            to: to_hex_prefixed(self.consent_manager.as_bytes()),
            data: to_hex_prefixed(&get_consent_calldata(file_cid, grantee)),
        };
        let raw: String = self.call("eth_call", (call, "latest")).await?;
        decode_consent_tuple(&parse_bytes(&raw)?)
    }
}

pub fn get_consent_calldata(file_cid: &str, grantee: Address) -> Vec<u8> {
    let mut data = function_selector(GET_CONSENT_SIGNATURE).to_vec();
    data.extend(encode_tokens(&[Token::Str(file_cid), Token::Address(grantee)]));
    data
}

/// Return data of `getConsent`:
/// `(address patient, address grantee, uint256 expiresAt, string encKeyCid, bool active)`.
pub fn decode_consent_tuple(data: &[u8]) -> Result<ConsentTuple, ProviderError> {
    let patient = Address::from_slice(&word(data, 0)?[12..]);
    let grantee = Address::from_slice(&word(data, 1)?[12..]);
    let expires_at = U256::from_big_endian(word(data, 2)?);
    let offset = word_to_usize(word(data, 3)?)?;
    let active = word(data, 4)?[WORD - 1] != 0;

    let len_word = data.get(offset..offset.saturating_add(WORD)).ok_or_else(|| {
        ProviderError::Malformed("getConsent: string offset past end".to_string())
    })?;
    let len = word_to_usize(len_word)?;
    let start = offset + WORD;
    let bytes = start
        .checked_add(len)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| ProviderError::Malformed("getConsent: string past end".to_string()))?;
    let enc_key_cid = String::from_utf8(bytes.to_vec())
        .map_err(|e| ProviderError::Malformed(format!("getConsent: {}", e)))?;

    Ok(ConsentTuple {
        patient,
        grantee,
        expires_at,
        enc_key_cid,
        active,
    })
}

fn word(data: &[u8], index: usize) -> Result<&[u8], ProviderError> {
    data.get(index * WORD..(index + 1) * WORD).ok_or_else(|| {
        ProviderError::Malformed(format!(
            "getConsent: return data too short ({} bytes)",
            data.len()
        ))
    })
}

fn word_to_usize(word: &[u8]) -> Result<usize, ProviderError> {
    let value = U256::from_big_endian(word);
    if value > U256::from(usize::MAX) {
        return Err(ProviderError::Malformed(
            "getConsent: offset out of range".to_string(),
        ));
    }
    Ok(value.as_usize())
}

/// Map a JSON-RPC error object onto the retry classes the poller uses.
pub fn classify_rpc_error(method: &str, error: &JsonRpcError) -> ProviderError {
    let message = error.message.to_lowercase();
    let text = format!("{}: {}", method, error);

    let kind = if message.contains("filter not found") {
        Some(TransientKind::FilterNotFound)
    } else if message.contains("block range")
        || message.contains("range too large")
        || message.contains("query returned more than")
        || message.contains("limit exceeded")
        || message.contains("too many results")
    {
        Some(TransientKind::RangeTooLarge)
    } else if message.contains("rate limit") || message.contains("too many requests") {
        Some(TransientKind::RateLimited)
    } else if message.contains("timeout") || message.contains("timed out") {
        Some(TransientKind::Timeout)
    } else {
        None
    };

    match kind {
        Some(kind) => ProviderError::transient(kind, text),
        // Generic server error: retry rather than give up.
        None if error.code == -32000 => ProviderError::transient(TransientKind::RateLimited, text),
        None => ProviderError::Fatal(text),
    }
}

fn classify_transport(method: &str, error: &reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::timeout(method)
    } else if error.is_connect() {
        ProviderError::Fatal(format!("{}: cannot connect: {}", method, error))
    } else {
        ProviderError::Fatal(format!("{}: {}", method, error))
    }
}
