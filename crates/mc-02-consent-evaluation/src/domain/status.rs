//! Consent status value objects.

use mc_01_event_indexing::{GrantKey, LedgerUint};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use shared_types::{Address, BlockNumber, TxHash};
use std::fmt;

/// Where a [`ConsentStatus`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    /// Read from the ledger now. The only mode fit to gate access.
    Authoritative,
    /// Folded from the local audit trail; lags the ledger by up to one poll
    /// interval. Display and audit only.
    Derived,
}

impl fmt::Display for EvaluationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authoritative => f.write_str("authoritative"),
            Self::Derived => f.write_str("derived"),
        }
    }
}

/// The consent record as stored by the consent contract:
/// `(patient, grantee, expiresAt, encKeyCid, active)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConsentTuple {
    pub patient: Address,
    pub grantee: Address,
    pub expires_at: U256,
    pub enc_key_cid: String,
    pub active: bool,
}

impl ConsentTuple {
    /// Contract storage returns a zeroed record for keys never granted.
    pub fn is_empty(&self) -> bool {
        self.patient.is_zero()
    }
}

/// Access decision for one `(file_cid, grantee)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentStatus {
    pub patient: Address,
    pub grantee: Address,
    pub file_cid: String,
    pub expires_at: LedgerUint,
    pub enc_key_cid: String,
    pub active: bool,
    pub mode: EvaluationMode,
}

impl ConsentStatus {
    /// Authoritative status from a ledger tuple: active only while the
    /// contract flags it active and the expiry lies strictly in the future.
    pub fn from_tuple(key: &GrantKey, tuple: ConsentTuple, now: u64) -> Option<Self> {
        if tuple.is_empty() {
            return None;
        }
        let expires_at = LedgerUint::from_u256(tuple.expires_at);
        Some(Self {
            active: tuple.active && expires_at.is_after(now),
            patient: tuple.patient,
            grantee: tuple.grantee,
            file_cid: key.file_cid.clone(),
            expires_at,
            enc_key_cid: tuple.enc_key_cid,
            mode: EvaluationMode::Authoritative,
        })
    }
}

/// One emergency override, as surfaced by history queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyRecord {
    pub requester: Address,
    pub file_cid: String,
    pub timestamp: LedgerUint,
    pub tx_hash: TxHash,
    pub block_number: BlockNumber,
}
