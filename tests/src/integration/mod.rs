//! Cross-subsystem flows: logs are indexed by mc-01 and answered by mc-02.

pub mod flows;
