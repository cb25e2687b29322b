//! # Inbound Ports (Driving Ports)
//!
//! Read API of the audit store, consumed by the consent evaluator and by any
//! query layer in front of the indexer.

use crate::domain::{AuditEntry, EventKind, GrantKey, GrantRecord};

/// Predicate for [`AuditQueryApi::read_filtered`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditFilter {
    All,
    Kind(EventKind),
    /// Grant and revoke history of one consent relationship.
    Key(GrantKey),
    /// Every event mentioning a file.
    File(String),
    /// Emergency overrides on one file.
    EmergencyForFile(String),
}

impl AuditFilter {
    /// Map a query tag (`emergency`, `grants`, `revokes`, `audit`).
    /// Unknown or empty tags mean no filtering.
    pub fn from_query_tag(tag: Option<&str>) -> Self {
        tag.and_then(EventKind::from_query_tag)
            .map(Self::Kind)
            .unwrap_or(Self::All)
    }

    pub fn matches(&self, entry: &AuditEntry) -> bool {
        match self {
            Self::All => true,
            Self::Kind(kind) => entry.kind() == *kind,
            Self::Key(key) => entry.event.grant_key().as_ref() == Some(key),
            Self::File(cid) => entry.event.file_cid() == cid,
            Self::EmergencyForFile(cid) => {
                entry.kind() == EventKind::EmergencyAccess && entry.event.file_cid() == cid
            }
        }
    }
}

/// Consistent-snapshot reads over the audit trail.
///
/// Every call observes whole batches only; entries come back in arrival
/// order.
pub trait AuditQueryApi: Send + Sync {
    fn read_all(&self) -> Vec<AuditEntry>;

    fn read_filtered(&self, filter: &AuditFilter) -> Vec<AuditEntry>;

    /// Materialized latest grant for a key.
    fn grant(&self, key: &GrantKey) -> Option<GrantRecord>;

    fn list_grants(&self) -> Vec<GrantRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_tag_fallback() {
        assert_eq!(
            AuditFilter::from_query_tag(Some("emergency")),
            AuditFilter::Kind(EventKind::EmergencyAccess)
        );
        assert_eq!(AuditFilter::from_query_tag(Some("bogus")), AuditFilter::All);
        assert_eq!(AuditFilter::from_query_tag(None), AuditFilter::All);
    }
}
