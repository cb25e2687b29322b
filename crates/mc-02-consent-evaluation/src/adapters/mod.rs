pub mod memory;

pub use memory::InMemoryConsentLedger;
