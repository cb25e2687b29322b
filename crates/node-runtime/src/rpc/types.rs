//! Ethereum JSON-RPC wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{Address, LogBatch, ProviderError, RawLog, RejectedLog, H256};

/// JSON-RPC request structure
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<T> {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: T,
    pub id: u64,
}

impl<T> JsonRpcRequest<T> {
    pub fn new(method: impl Into<String>, params: T, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
            id,
        }
    }
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<T> {
    #[serde(default)]
    pub id: Option<u64>,
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RPC Error {}: {}", self.code, self.message)
    }
}

/// `eth_getLogs` filter object.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    pub address: Vec<String>,
    pub from_block: String,
    pub to_block: String,
}

/// `eth_call` transaction object.
#[derive(Debug, Serialize)]
pub struct CallRequest {
    pub to: String,
    pub data: String,
}

/// A log as providers return it: every number is a hex quantity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLog {
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
    /// Null for pending logs.
    pub block_number: Option<String>,
    pub transaction_hash: Option<String>,
    pub log_index: Option<String>,
    #[serde(default)]
    pub removed: bool,
}

impl WireLog {
    pub fn into_raw(self) -> Result<RawLog, ProviderError> {
        let block_number = parse_quantity(required(self.block_number, "blockNumber")?.as_str())?;
        let log_index = parse_quantity(required(self.log_index, "logIndex")?.as_str())?;
        let transaction_hash =
            parse_h256(required(self.transaction_hash, "transactionHash")?.as_str())?;
        let topics = self
            .topics
            .iter()
            .map(|t| parse_h256(t))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RawLog {
            address: parse_address(&self.address)?,
            topics,
            data: parse_bytes(&self.data)?,
            block_number,
            transaction_hash,
            log_index,
            removed: self.removed,
        })
    }
}

/// Read an `eth_getLogs` result one entry at a time. An entry that does not
/// convert is rejected on its own, keeping whatever identity it carries.
pub fn read_logs(entries: Vec<Value>) -> LogBatch {
    let mut batch = LogBatch::default();
    for entry in entries {
        let converted = WireLog::deserialize(&entry)
            .map_err(|e| ProviderError::Malformed(format!("log entry: {}", e)))
            .and_then(WireLog::into_raw);
        match converted {
            Ok(log) => batch.logs.push(log),
            Err(e) => batch.rejected.push(RejectedLog {
                transaction_hash: str_field(&entry, "transactionHash")
                    .and_then(|raw| parse_h256(raw).ok()),
                block_number: str_field(&entry, "blockNumber")
                    .and_then(|raw| parse_quantity(raw).ok()),
                log_index: str_field(&entry, "logIndex").and_then(|raw| parse_quantity(raw).ok()),
                reason: e.to_string(),
            }),
        }
    }
    batch
}

fn str_field<'a>(entry: &'a Value, name: &str) -> Option<&'a str> {
    entry.get(name).and_then(Value::as_str)
}

fn required(value: Option<String>, field: &str) -> Result<String, ProviderError> {
    value.ok_or_else(|| ProviderError::Malformed(format!("log without {}", field)))
}

pub fn to_quantity(value: u64) -> String {
    format!("0x{:x}", value)
}

pub fn parse_quantity(raw: &str) -> Result<u64, ProviderError> {
    let digits = strip_prefix(raw);
    if digits.is_empty() {
        return Err(ProviderError::Malformed(format!("empty quantity `{}`", raw)));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| ProviderError::Malformed(format!("quantity `{}`: {}", raw, e)))
}

pub fn parse_bytes(raw: &str) -> Result<Vec<u8>, ProviderError> {
    hex::decode(strip_prefix(raw))
        .map_err(|e| ProviderError::Malformed(format!("hex data `{}`: {}", raw, e)))
}

fn parse_fixed<const N: usize>(raw: &str) -> Result<[u8; N], ProviderError> {
    let bytes = parse_bytes(raw)?;
    bytes.as_slice().try_into().map_err(|_| {
        ProviderError::Malformed(format!("expected {} bytes, got {} in `{}`", N, bytes.len(), raw))
    })
}

pub fn parse_h256(raw: &str) -> Result<H256, ProviderError> {
    parse_fixed::<32>(raw).map(H256::from)
}

pub fn parse_address(raw: &str) -> Result<Address, ProviderError> {
    parse_fixed::<20>(raw).map(Address::from)
}

fn strip_prefix(raw: &str) -> &str {
    raw.strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw)
}
