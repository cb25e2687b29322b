//! # MedChain Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Decoder and audit document throughput
//! └── src/
//!     ├── fixtures.rs   # Simulated consent contracts (logs + state)
//!     └── integration/  # Indexer → store → evaluator flows
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p mc-tests
//! cargo bench -p mc-tests
//! ```

pub mod fixtures;
pub mod integration;
