//! # Numeric Normalizer
//!
//! Ledger integers are `uint256`. The audit document is JSON read by
//! consumers whose exact-integer range ends at `2^53 - 1`, so every ledger
//! integer is stored either as a native JSON number (inside that range) or
//! as a decimal string (outside it). Nothing else is ever written.
//!
//! The rule is applied structurally: every numeric field of a domain event
//! has type [`LedgerUint`], and [`Normalize`] walks documents, entries and
//! records so that a value loaded from disk in a non-canonical form
//! (a number above the range, a decimal string inside it) is canonicalised
//! before it is used.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Largest integer every downstream JSON consumer represents exactly.
pub const MAX_EXACT_INTEGER: u64 = (1 << 53) - 1;

/// A normalized ledger integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LedgerUint {
    /// `0 ..= MAX_EXACT_INTEGER`
    Native(u64),
    /// Base-10 digits of a value above `MAX_EXACT_INTEGER`.
    Decimal(String),
}

impl LedgerUint {
    pub fn from_u256(value: U256) -> Self {
        if value <= U256::from(MAX_EXACT_INTEGER) {
            Self::Native(value.low_u64())
        } else {
            Self::Decimal(value.to_string())
        }
    }

    /// Reconstruct the exact ledger value.
    pub fn to_u256(&self) -> Option<U256> {
        match self {
            Self::Native(v) => Some(U256::from(*v)),
            Self::Decimal(s) => U256::from_dec_str(s).ok(),
        }
    }

    /// `true` when this value is strictly greater than `other`.
    ///
    /// An unparsable decimal string compares as "not after": a corrupted
    /// expiry never makes a consent look active.
    pub fn is_after(&self, other: u64) -> bool {
        self.compare_u64(other) == Some(Ordering::Greater)
    }

    pub fn compare_u64(&self, other: u64) -> Option<Ordering> {
        self.to_u256().map(|v| v.cmp(&U256::from(other)))
    }
}

impl Default for LedgerUint {
    fn default() -> Self {
        Self::Native(0)
    }
}

impl From<u64> for LedgerUint {
    fn from(v: u64) -> Self {
        Self::from_u256(U256::from(v))
    }
}

impl From<U256> for LedgerUint {
    fn from(v: U256) -> Self {
        Self::from_u256(v)
    }
}

impl fmt::Display for LedgerUint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(v) => write!(f, "{}", v),
            Self::Decimal(s) => f.write_str(s),
        }
    }
}

/// Canonicalise every ledger integer reachable from a value.
///
/// Implementations must be idempotent.
pub trait Normalize {
    fn normalize(self) -> Self;
}

impl Normalize for LedgerUint {
    fn normalize(self) -> Self {
        match self {
            Self::Native(v) if v <= MAX_EXACT_INTEGER => Self::Native(v),
            Self::Native(v) => Self::Decimal(v.to_string()),
            Self::Decimal(s) => match U256::from_dec_str(&s) {
                Ok(v) => Self::from_u256(v),
                // Left untouched so the bad value stays visible in the audit trail.
                Err(_) => Self::Decimal(s),
            },
        }
    }
}

impl<T: Normalize> Normalize for Vec<T> {
    fn normalize(self) -> Self {
        self.into_iter().map(Normalize::normalize).collect()
    }
}

impl<T: Normalize> Normalize for Option<T> {
    fn normalize(self) -> Self {
        self.map(Normalize::normalize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_small_value_is_native() {
        let v = LedgerUint::from_u256(U256::from(1000u64));
        assert_eq!(v, LedgerUint::Native(1000));
        assert_eq!(v.to_u256(), Some(U256::from(1000u64)));
    }

    #[test]
    fn test_boundary() {
        assert_eq!(
            LedgerUint::from(MAX_EXACT_INTEGER),
            LedgerUint::Native(MAX_EXACT_INTEGER)
        );
        assert_eq!(
            LedgerUint::from(MAX_EXACT_INTEGER + 1),
            LedgerUint::Decimal("9007199254740992".to_string())
        );
    }

    #[test]
    fn test_wide_value_round_trips_through_decimal() {
        let v = U256::MAX;
        let n = LedgerUint::from_u256(v);
        assert!(matches!(n, LedgerUint::Decimal(_)));
        assert_eq!(n.to_u256(), Some(v));
    }

    #[test]
    fn test_json_shapes() {
        let native = serde_json::to_string(&LedgerUint::from(42u64)).unwrap();
        assert_eq!(native, "42");

        let wide = serde_json::to_string(&LedgerUint::from(u64::MAX)).unwrap();
        assert_eq!(wide, "\"18446744073709551615\"");

        let back: LedgerUint = serde_json::from_str(&wide).unwrap();
        assert_eq!(back.to_u256(), Some(U256::from(u64::MAX)));
    }

    #[test]
    fn test_normalize_repairs_non_canonical_forms() {
        assert_eq!(
            LedgerUint::Decimal("17".into()).normalize(),
            LedgerUint::Native(17)
        );
        assert_eq!(
            LedgerUint::Native(u64::MAX).normalize(),
            LedgerUint::Decimal(u64::MAX.to_string())
        );
        assert_eq!(
            LedgerUint::Decimal("not-a-number".into()).normalize(),
            LedgerUint::Decimal("not-a-number".into())
        );
    }

    #[test]
    fn test_is_after() {
        let exp = LedgerUint::from(1000u64);
        assert!(exp.is_after(999));
        assert!(!exp.is_after(1000));
        assert!(LedgerUint::from(U256::MAX).is_after(u64::MAX));
        assert!(!LedgerUint::Decimal("garbage".into()).is_after(0));
    }

    proptest! {
        #[test]
        fn prop_round_trip_is_exact(words in proptest::array::uniform4(any::<u64>())) {
            let value = U256(words);
            let normalized = LedgerUint::from_u256(value);
            prop_assert_eq!(normalized.to_u256(), Some(value));
        }

        #[test]
        fn prop_normalize_is_idempotent(words in proptest::array::uniform4(any::<u64>())) {
            let once = LedgerUint::from_u256(U256(words)).normalize();
            let twice = once.clone().normalize();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_native_only_within_exact_range(v in any::<u64>()) {
            match LedgerUint::from(v) {
                LedgerUint::Native(n) => prop_assert!(n <= MAX_EXACT_INTEGER),
                LedgerUint::Decimal(s) => prop_assert_eq!(s, v.to_string()),
            }
        }
    }
}
