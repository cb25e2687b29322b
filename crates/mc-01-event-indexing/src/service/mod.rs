//! # Service Layer
//!
//! - [`AuditStore`]: single-writer audit document with snapshot reads.
//! - [`LogPoller`]: the periodic scan loop feeding the store.

mod poller;
mod store;

pub use poller::{LogPoller, PollerDependencies};
pub use store::AuditStore;
