//! # Contract Event Schemas
//!
//! Solidity event layouts and the word-level decoding of a log against them.
//!
//! Indexed parameters live in `topics[1..]` (dynamic indexed values are only
//! available as their Keccak hash); everything else is ABI-encoded in `data`
//! as a head of 32-byte words, with `string`/`bytes` heads pointing at a
//! length-prefixed tail.

use crate::domain::errors::{AbiError, DecodeError};
use primitive_types::U256;
use serde::Deserialize;
use shared_types::{event_topic, Address, ContractRole, RawLog, Topic, H160};

/// Size of one ABI word.
pub const WORD: usize = 32;

/// Solidity parameter types the indexer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiType {
    Address,
    Uint(u16),
    Bool,
    FixedBytes(u8),
    String,
    Bytes,
}

impl AbiType {
    pub fn parse(s: &str) -> Result<Self, AbiError> {
        let unsupported = || AbiError::UnsupportedType(s.to_string());
        match s {
            "address" => Ok(Self::Address),
            "bool" => Ok(Self::Bool),
            "string" => Ok(Self::String),
            "bytes" => Ok(Self::Bytes),
            "uint" => Ok(Self::Uint(256)),
            _ => {
                if let Some(bits) = s.strip_prefix("uint") {
                    let bits: u16 = bits.parse().map_err(|_| unsupported())?;
                    if bits == 0 || bits > 256 || bits % 8 != 0 {
                        return Err(unsupported());
                    }
                    Ok(Self::Uint(bits))
                } else if let Some(len) = s.strip_prefix("bytes") {
                    let len: u8 = len.parse().map_err(|_| unsupported())?;
                    if len == 0 || len > 32 {
                        return Err(unsupported());
                    }
                    Ok(Self::FixedBytes(len))
                } else {
                    Err(unsupported())
                }
            }
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::String | Self::Bytes)
    }

    /// Canonical name used in event signatures.
    pub fn canonical(&self) -> String {
        match self {
            Self::Address => "address".to_string(),
            Self::Uint(bits) => format!("uint{}", bits),
            Self::Bool => "bool".to_string(),
            Self::FixedBytes(len) => format!("bytes{}", len),
            Self::String => "string".to_string(),
            Self::Bytes => "bytes".to_string(),
        }
    }
}

/// One event parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: AbiType,
    pub indexed: bool,
}

impl ParamSpec {
    pub fn new(name: &str, kind: AbiType, indexed: bool) -> Self {
        Self {
            name: name.to_string(),
            kind,
            indexed,
        }
    }
}

/// A decoded argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Address(Address),
    Uint(U256),
    Bool(bool),
    FixedBytes(Vec<u8>),
    String(String),
    Bytes(Vec<u8>),
    /// Keccak hash of an indexed dynamic value.
    TopicHash(Topic),
}

/// Layout of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSchema {
    pub name: String,
    pub params: Vec<ParamSpec>,
    topic: Topic,
}

impl EventSchema {
    pub fn new(name: &str, params: Vec<ParamSpec>) -> Self {
        let mut schema = Self {
            name: name.to_string(),
            params,
            topic: Topic::zero(),
        };
        schema.topic = event_topic(&schema.signature());
        schema
    }

    /// `Name(type1,type2,...)`
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.params.iter().map(|p| p.kind.canonical()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Decode every parameter of `log`, in declaration order.
    pub fn decode(&self, log: &RawLog) -> Result<Vec<(String, AbiValue)>, DecodeError> {
        let mut out = Vec::with_capacity(self.params.len());
        let mut topic_index = 1;
        let mut head_index = 0;

        for param in &self.params {
            let value = if param.indexed {
                let topic = log.topics.get(topic_index).ok_or_else(|| DecodeError::MissingTopic {
                    event: self.name.clone(),
                    index: topic_index,
                })?;
                topic_index += 1;
                if param.kind.is_dynamic() {
                    AbiValue::TopicHash(*topic)
                } else {
                    decode_static(param.kind, topic.as_fixed_bytes())
                }
            } else {
                let head = word_at(&log.data, head_index * WORD, &self.name)?;
                head_index += 1;
                if param.kind.is_dynamic() {
                    let bytes = read_tail(&log.data, head, &self.name, &param.name)?;
                    match param.kind {
                        AbiType::String => {
                            AbiValue::String(String::from_utf8(bytes).map_err(|_| {
                                DecodeError::InvalidUtf8 {
                                    event: self.name.clone(),
                                    param: param.name.clone(),
                                }
                            })?)
                        }
                        _ => AbiValue::Bytes(bytes),
                    }
                } else {
                    decode_static(param.kind, head)
                }
            };
            out.push((param.name.clone(), value));
        }

        Ok(out)
    }
}

/// All events of one watched contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSchema {
    pub role: ContractRole,
    pub address: Address,
    pub events: Vec<EventSchema>,
}

impl ContractSchema {
    pub fn new(role: ContractRole, address: Address, events: Vec<EventSchema>) -> Self {
        Self {
            role,
            address,
            events,
        }
    }

    /// Built-in layout of the consent registry.
    pub fn consent_manager(address: Address) -> Self {
        use AbiType as T;
        Self::new(
            ContractRole::ConsentManager,
            address,
            vec![
                EventSchema::new(
                    "AccessGranted",
                    vec![
                        ParamSpec::new("patient", T::Address, true),
                        ParamSpec::new("grantee", T::Address, true),
                        ParamSpec::new("fileCid", T::String, false),
                        ParamSpec::new("expiresAt", T::Uint(256), false),
                        ParamSpec::new("encKeyCid", T::String, false),
                    ],
                ),
                EventSchema::new(
                    "AccessRevoked",
                    vec![
                        ParamSpec::new("patient", T::Address, true),
                        ParamSpec::new("grantee", T::Address, true),
                        ParamSpec::new("fileCid", T::String, false),
                    ],
                ),
                EventSchema::new(
                    "EmergencyAccess",
                    vec![
                        ParamSpec::new("requester", T::Address, true),
                        ParamSpec::new("fileCid", T::String, false),
                        ParamSpec::new("timestamp", T::Uint(256), false),
                    ],
                ),
            ],
        )
    }

    /// Built-in layout of the audit logger.
    pub fn audit_logger(address: Address) -> Self {
        use AbiType as T;
        Self::new(
            ContractRole::AuditLogger,
            address,
            vec![EventSchema::new(
                "AuditLogged",
                vec![
                    ParamSpec::new("entryId", T::Uint(256), true),
                    ParamSpec::new("actor", T::Address, true),
                    ParamSpec::new("action", T::String, false),
                    ParamSpec::new("fileCid", T::String, false),
                    ParamSpec::new("meta", T::String, false),
                    ParamSpec::new("timestamp", T::Uint(256), false),
                ],
            )],
        )
    }

    /// Build the schema from a Solidity ABI array (as found in deployment
    /// artifacts). Non-event entries and anonymous events are ignored.
    pub fn from_abi_json(
        role: ContractRole,
        address: Address,
        abi: &serde_json::Value,
    ) -> Result<Self, AbiError> {
        let entries: Vec<AbiEntry> =
            serde_json::from_value(abi.clone()).map_err(|e| AbiError::Malformed(e.to_string()))?;

        let mut events = Vec::new();
        for entry in entries {
            if entry.kind != "event" || entry.anonymous {
                continue;
            }
            let name = entry
                .name
                .ok_or_else(|| AbiError::Malformed("event without a name".to_string()))?;
            let params = entry
                .inputs
                .iter()
                .map(|input| {
                    Ok(ParamSpec {
                        name: input.name.clone(),
                        kind: AbiType::parse(&input.kind)?,
                        indexed: input.indexed,
                    })
                })
                .collect::<Result<Vec<_>, AbiError>>()?;
            events.push(EventSchema::new(&name, params));
        }

        if events.is_empty() {
            return Err(AbiError::Malformed("ABI declares no events".to_string()));
        }
        Ok(Self::new(role, address, events))
    }

    pub fn event_for_topic(&self, topic: &Topic) -> Option<&EventSchema> {
        self.events.iter().find(|e| e.topic() == topic)
    }
}

#[derive(Debug, Deserialize)]
struct AbiEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    inputs: Vec<AbiInput>,
    #[serde(default)]
    anonymous: bool,
}

#[derive(Debug, Deserialize)]
struct AbiInput {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    indexed: bool,
}

fn decode_static(kind: AbiType, word: &[u8; WORD]) -> AbiValue {
    match kind {
        AbiType::Address => AbiValue::Address(H160::from_slice(&word[12..])),
        AbiType::Uint(_) => AbiValue::Uint(U256::from_big_endian(word)),
        AbiType::Bool => AbiValue::Bool(word[WORD - 1] != 0),
        AbiType::FixedBytes(len) => AbiValue::FixedBytes(word[..len as usize].to_vec()),
        // Dynamic types never reach here.
        AbiType::String | AbiType::Bytes => AbiValue::Bytes(word.to_vec()),
    }
}

fn word_at<'a>(data: &'a [u8], offset: usize, event: &str) -> Result<&'a [u8; WORD], DecodeError> {
    let end = offset.checked_add(WORD).unwrap_or(usize::MAX);
    data.get(offset..end)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| DecodeError::DataTooShort {
            event: event.to_string(),
            needed: end,
            available: data.len(),
        })
}

fn word_to_usize(word: &[u8; WORD]) -> Option<usize> {
    let value = U256::from_big_endian(word);
    if value > U256::from(usize::MAX as u64) {
        return None;
    }
    Some(value.low_u64() as usize)
}

fn read_tail(data: &[u8], head: &[u8; WORD], event: &str, param: &str) -> Result<Vec<u8>, DecodeError> {
    let bad_offset = || DecodeError::InvalidOffset {
        event: event.to_string(),
        param: param.to_string(),
    };

    let offset = word_to_usize(head).ok_or_else(bad_offset)?;
    let len = word_to_usize(word_at(data, offset, event)?).ok_or_else(bad_offset)?;
    let start = offset + WORD;
    let end = start.checked_add(len).ok_or_else(bad_offset)?;
    data.get(start..end)
        .map(|b| b.to_vec())
        .ok_or_else(|| DecodeError::DataTooShort {
            event: event.to_string(),
            needed: end,
            available: data.len(),
        })
}

/// ABI encoding helpers, shared with tests and the RPC adapter.
pub mod encode {
    use super::WORD;
    use primitive_types::U256;
    use shared_types::{Address, H256};

    pub fn uint_word(value: U256) -> [u8; WORD] {
        let mut word = [0u8; WORD];
        value.to_big_endian(&mut word);
        word
    }

    pub fn address_word(address: &Address) -> [u8; WORD] {
        let mut word = [0u8; WORD];
        word[12..].copy_from_slice(address.as_bytes());
        word
    }

    pub fn address_topic(address: &Address) -> H256 {
        H256::from(address_word(address))
    }

    /// A dynamic value as it appears in the tail: length word, then the
    /// bytes right-padded to a word boundary.
    pub fn dynamic_tail(bytes: &[u8]) -> Vec<u8> {
        let mut out = uint_word(U256::from(bytes.len())).to_vec();
        out.extend_from_slice(bytes);
        let padding = (WORD - bytes.len() % WORD) % WORD;
        out.extend(std::iter::repeat(0u8).take(padding));
        out
    }

    /// Head/tail encoding of a parameter tuple.
    pub enum Token<'a> {
        Uint(U256),
        Address(Address),
        Bool(bool),
        Str(&'a str),
    }

    pub fn encode_tokens(tokens: &[Token<'_>]) -> Vec<u8> {
        let head_len = tokens.len() * WORD;
        let mut head = Vec::with_capacity(head_len);
        let mut tail = Vec::new();
        for token in tokens {
            match token {
                Token::Uint(v) => head.extend_from_slice(&uint_word(*v)),
                Token::Address(a) => head.extend_from_slice(&address_word(a)),
                Token::Bool(b) => head.extend_from_slice(&uint_word(U256::from(*b as u8))),
                Token::Str(s) => {
                    head.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
                    tail.extend(dynamic_tail(s.as_bytes()));
                }
            }
        }
        head.extend(tail);
        head
    }
}
