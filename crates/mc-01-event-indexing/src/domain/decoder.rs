//! # Event Decoder
//!
//! Pure mapping from a raw log to a [`DomainEvent`]. Matching is by contract
//! address first, then by the event's topic signature; the typed event is
//! built by an explicit per-event-name mapping over the decoded arguments.
//!
//! A topic the contract schema does not know, or knows but the indexer does
//! not model, yields `Ok(None)`: it is skipped and counted by the caller,
//! never treated as an error.

use crate::domain::abi::{AbiValue, ContractSchema};
use crate::domain::errors::DecodeError;
use crate::domain::events::{DecodedLog, DomainEvent, Provenance};
use crate::domain::normalize::{LedgerUint, Normalize};
use shared_types::{Address, ContractRole, RawLog};

/// Decoder over the set of watched contracts.
#[derive(Debug, Clone)]
pub struct EventDecoder {
    contracts: Vec<ContractSchema>,
}

impl EventDecoder {
    pub fn new(contracts: Vec<ContractSchema>) -> Self {
        Self { contracts }
    }

    /// Addresses to pass to the provider's log filter.
    pub fn watched_addresses(&self) -> Vec<Address> {
        self.contracts.iter().map(|c| c.address).collect()
    }

    pub fn watches(&self, address: &Address) -> bool {
        self.contract(address).is_some()
    }

    fn contract(&self, address: &Address) -> Option<&ContractSchema> {
        self.contracts.iter().find(|c| &c.address == address)
    }

    /// Decode one log. `ingested_at` is the local clock in milliseconds.
    pub fn decode(&self, log: &RawLog, ingested_at: u64) -> Result<Option<DecodedLog>, DecodeError> {
        let contract = self
            .contract(&log.address)
            .ok_or(DecodeError::UnwatchedContract {
                address: log.address,
            })?;

        let Some(schema) = log.signature().and_then(|t| contract.event_for_topic(t)) else {
            return Ok(None);
        };

        let args = Args {
            event: &schema.name,
            values: schema.decode(log)?,
        };

        let event = match (contract.role, schema.name.as_str()) {
            (ContractRole::ConsentManager, "AccessGranted") => DomainEvent::AccessGranted {
                patient: args.address("patient")?,
                grantee: args.address("grantee")?,
                file_cid: args.string("fileCid")?,
                expires_at: args.uint("expiresAt")?,
                enc_key_cid: args.string("encKeyCid")?,
            },
            (ContractRole::ConsentManager, "AccessRevoked") => DomainEvent::AccessRevoked {
                patient: args.address("patient")?,
                grantee: args.address("grantee")?,
                file_cid: args.string("fileCid")?,
            },
            (ContractRole::ConsentManager, "EmergencyAccess") => DomainEvent::EmergencyAccess {
                requester: args.address("requester")?,
                file_cid: args.string("fileCid")?,
                timestamp: args.uint("timestamp")?,
            },
            (ContractRole::AuditLogger, "AuditLogged") => DomainEvent::AuditLogged {
                entry_id: args.uint("entryId")?,
                actor: args.address("actor")?,
                action: args.text("action")?,
                file_cid: args.string("fileCid")?,
                meta: args.string("meta")?,
                timestamp: args.uint("timestamp")?,
            },
            _ => return Ok(None),
        };

        Ok(Some(DecodedLog {
            event: event.normalize(),
            provenance: Provenance {
                contract: contract.role,
                contract_address: contract.address,
                tx_hash: log.transaction_hash,
                block_number: log.block_number,
                log_index: log.log_index,
                ingested_at,
            },
        }))
    }
}

/// Named lookup over decoded arguments.
struct Args<'a> {
    event: &'a str,
    values: Vec<(String, AbiValue)>,
}

impl Args<'_> {
    fn get(&self, name: &str) -> Result<&AbiValue, DecodeError> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| DecodeError::MissingArgument {
                event: self.event.to_string(),
                param: name.to_string(),
            })
    }

    fn mismatch(&self, name: &str, expected: &'static str) -> DecodeError {
        DecodeError::ArgumentType {
            event: self.event.to_string(),
            param: name.to_string(),
            expected,
        }
    }

    fn address(&self, name: &str) -> Result<Address, DecodeError> {
        match self.get(name)? {
            AbiValue::Address(a) => Ok(*a),
            _ => Err(self.mismatch(name, "address")),
        }
    }

    fn uint(&self, name: &str) -> Result<LedgerUint, DecodeError> {
        match self.get(name)? {
            AbiValue::Uint(v) => Ok(LedgerUint::from_u256(*v)),
            _ => Err(self.mismatch(name, "uint")),
        }
    }

    fn string(&self, name: &str) -> Result<String, DecodeError> {
        match self.get(name)? {
            AbiValue::String(s) => Ok(s.clone()),
            _ => Err(self.mismatch(name, "string")),
        }
    }

    /// A string, or a numeric code rendered in decimal. Deployed audit
    /// loggers disagree on whether `action` is a label or an enum.
    fn text(&self, name: &str) -> Result<String, DecodeError> {
        match self.get(name)? {
            AbiValue::String(s) => Ok(s.clone()),
            AbiValue::Uint(v) => Ok(v.to_string()),
            _ => Err(self.mismatch(name, "string or uint")),
        }
    }
}
