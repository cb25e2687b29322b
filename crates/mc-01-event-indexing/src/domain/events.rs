//! # Domain Events
//!
//! The closed set of facts the indexer extracts from the ledger, plus the
//! records derived from them: the append-only [`AuditEntry`] and the
//! materialized [`GrantRecord`] per [`GrantKey`].

use crate::domain::normalize::{LedgerUint, Normalize};
use serde::{Deserialize, Serialize};
use shared_types::{Address, BlockNumber, ContractRole, LogId, LogPosition, TxHash};
use std::fmt;

/// A typed fact observed on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum DomainEvent {
    #[serde(rename_all = "camelCase")]
    AccessGranted {
        patient: Address,
        grantee: Address,
        file_cid: String,
        expires_at: LedgerUint,
        enc_key_cid: String,
    },
    #[serde(rename_all = "camelCase")]
    AccessRevoked {
        patient: Address,
        grantee: Address,
        file_cid: String,
    },
    /// Audit-only override; never changes a grant record.
    #[serde(rename_all = "camelCase")]
    EmergencyAccess {
        requester: Address,
        file_cid: String,
        timestamp: LedgerUint,
    },
    #[serde(rename_all = "camelCase")]
    AuditLogged {
        entry_id: LedgerUint,
        actor: Address,
        action: String,
        file_cid: String,
        meta: String,
        timestamp: LedgerUint,
    },
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::AccessGranted { .. } => EventKind::AccessGranted,
            Self::AccessRevoked { .. } => EventKind::AccessRevoked,
            Self::EmergencyAccess { .. } => EventKind::EmergencyAccess,
            Self::AuditLogged { .. } => EventKind::AuditLogged,
        }
    }

    pub fn file_cid(&self) -> &str {
        match self {
            Self::AccessGranted { file_cid, .. }
            | Self::AccessRevoked { file_cid, .. }
            | Self::EmergencyAccess { file_cid, .. }
            | Self::AuditLogged { file_cid, .. } => file_cid,
        }
    }

    /// The consent relationship this event changes, if any.
    pub fn grant_key(&self) -> Option<GrantKey> {
        match self {
            Self::AccessGranted {
                file_cid, grantee, ..
            }
            | Self::AccessRevoked {
                file_cid, grantee, ..
            } => Some(GrantKey::new(file_cid.clone(), *grantee)),
            Self::EmergencyAccess { .. } | Self::AuditLogged { .. } => None,
        }
    }
}

impl Normalize for DomainEvent {
    fn normalize(self) -> Self {
        match self {
            Self::AccessGranted {
                patient,
                grantee,
                file_cid,
                expires_at,
                enc_key_cid,
            } => Self::AccessGranted {
                patient,
                grantee,
                file_cid,
                expires_at: expires_at.normalize(),
                enc_key_cid,
            },
            Self::EmergencyAccess {
                requester,
                file_cid,
                timestamp,
            } => Self::EmergencyAccess {
                requester,
                file_cid,
                timestamp: timestamp.normalize(),
            },
            Self::AuditLogged {
                entry_id,
                actor,
                action,
                file_cid,
                meta,
                timestamp,
            } => Self::AuditLogged {
                entry_id: entry_id.normalize(),
                actor,
                action,
                file_cid,
                meta,
                timestamp: timestamp.normalize(),
            },
            revoked @ Self::AccessRevoked { .. } => revoked,
        }
    }
}

/// Event discriminant, used by filtered reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    AccessGranted,
    AccessRevoked,
    EmergencyAccess,
    AuditLogged,
}

impl EventKind {
    /// Short tags accepted by the audit query surface:
    /// `grants`, `revokes`, `emergency`, `audit`.
    pub fn from_query_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "grants" => Some(Self::AccessGranted),
            "revokes" => Some(Self::AccessRevoked),
            "emergency" => Some(Self::EmergencyAccess),
            "audit" => Some(Self::AuditLogged),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AccessGranted => "AccessGranted",
            Self::AccessRevoked => "AccessRevoked",
            Self::EmergencyAccess => "EmergencyAccess",
            Self::AuditLogged => "AuditLogged",
        };
        f.write_str(name)
    }
}

/// Where an event came from.
///
/// Block numbers, log indexes and the ingestion clock are written as plain
/// JSON numbers without passing through [`LedgerUint`]. They are exempt from
/// the normalizer: chain heights and millisecond timestamps stay many orders
/// of magnitude below [`MAX_EXACT_INTEGER`](crate::domain::normalize::MAX_EXACT_INTEGER).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub contract: ContractRole,
    pub contract_address: Address,
    pub tx_hash: TxHash,
    pub block_number: BlockNumber,
    pub log_index: u64,
    /// Local ingestion time, milliseconds since the Unix epoch.
    pub ingested_at: u64,
}

impl Provenance {
    pub fn position(&self) -> LogPosition {
        LogPosition::new(self.block_number, self.log_index)
    }

    pub fn log_id(&self) -> LogId {
        LogId {
            tx_hash: self.tx_hash,
            log_index: self.log_index,
        }
    }
}

/// A decoded event waiting to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLog {
    pub event: DomainEvent,
    pub provenance: Provenance,
}

/// One durable line of the audit trail. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Arrival order in the store, starting at 0. A plain number, like the
    /// positions in [`Provenance`].
    pub sequence: u64,
    pub event: DomainEvent,
    pub provenance: Provenance,
}

impl AuditEntry {
    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }

    pub fn position(&self) -> LogPosition {
        self.provenance.position()
    }
}

impl Normalize for AuditEntry {
    fn normalize(self) -> Self {
        Self {
            event: self.event.normalize(),
            ..self
        }
    }
}

/// Identity of one consent relationship: `(file_cid, grantee)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantKey {
    pub file_cid: String,
    pub grantee: Address,
}

impl GrantKey {
    pub fn new(file_cid: impl Into<String>, grantee: Address) -> Self {
        Self {
            file_cid: file_cid.into(),
            grantee,
        }
    }
}

impl fmt::Display for GrantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {:?})", self.file_cid, self.grantee)
    }
}

/// Materialized latest grant for a key.
///
/// Overwritten (never merged) by a newer `AccessGranted`; flagged by a newer
/// `AccessRevoked`, including one delivered before the grant it cancels.
/// History stays in the audit trail either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantRecord {
    pub patient: Address,
    pub grantee: Address,
    pub file_cid: String,
    pub enc_key_cid: String,
    pub expires_at: LedgerUint,
    pub last_tx_hash: TxHash,
    pub last_block_number: BlockNumber,
    pub last_log_index: u64,
    pub revoked: bool,
}

impl GrantRecord {
    pub fn key(&self) -> GrantKey {
        GrantKey::new(self.file_cid.clone(), self.grantee)
    }

    pub fn position(&self) -> LogPosition {
        LogPosition::new(self.last_block_number, self.last_log_index)
    }
}

impl Normalize for GrantRecord {
    fn normalize(self) -> Self {
        Self {
            expires_at: self.expires_at.normalize(),
            ..self
        }
    }
}
