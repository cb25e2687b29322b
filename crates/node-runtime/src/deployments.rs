//! Deployment artifacts written by the contract deploy step.
//!
//! One file per contract, `<Role>.json`, shaped as
//! `{ "address": "0x...", "abi": [...] }`. The ABI is optional.

use crate::config::parse_address;
use mc_01_event_indexing::ConfigError;
use serde::Deserialize;
use shared_types::{Address, ContractRole};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct DeploymentArtifact {
    pub address: Address,
    pub abi: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ArtifactFile {
    address: String,
    #[serde(default)]
    abi: Option<serde_json::Value>,
}

pub fn artifact_path(dir: &Path, role: ContractRole) -> std::path::PathBuf {
    dir.join(format!("{}.json", role.as_str()))
}

pub fn load_artifact(dir: &Path, role: ContractRole) -> Result<DeploymentArtifact, ConfigError> {
    let path = artifact_path(dir, role);
    let key = path.display().to_string();
    let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::invalid(&key, e.to_string()))?;
    let file: ArtifactFile =
        serde_json::from_str(&raw).map_err(|e| ConfigError::invalid(&key, e.to_string()))?;
    Ok(DeploymentArtifact {
        address: parse_address(&key, &file.address)?,
        abi: file.abi,
    })
}
