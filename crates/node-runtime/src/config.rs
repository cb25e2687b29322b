//! Runtime configuration from environment variables.
//!
//! # Environment Variables
//!
//! - `MEDCHAIN_RPC_URL` (or `AMOY_RPC_URL`): ledger JSON-RPC endpoint (required)
//! - `CONSENT_MANAGER_ADDRESS`, `AUDIT_LOGGER_ADDRESS`: watched contracts
//!   (required unless `MEDCHAIN_DEPLOYMENTS_DIR` provides them)
//! - `MEDCHAIN_DEPLOYMENTS_DIR`: directory with `ConsentManager.json` and
//!   `AuditLogger.json` deployment artifacts
//! - `MEDCHAIN_AUDIT_DB`: audit document path (default: audit_db.json)
//! - `MEDCHAIN_POLL_INTERVAL_MS`: tick interval (default: 4000)
//! - `MEDCHAIN_SEED_BACKLOG`: first-run look-back in blocks (default: 50)
//! - `MEDCHAIN_MAX_WINDOW`: widest block span per request (default: 2000)
//! - `MEDCHAIN_PROVIDER_TIMEOUT_MS`: bound on each RPC call (default: 10000)
//! - `MEDCHAIN_LOG_LEVEL` or `RUST_LOG`: log filter (default: info)
//! - `MEDCHAIN_LOG_FORMAT`: `json` or `pretty` (default: pretty)

use crate::deployments::{load_artifact, DeploymentArtifact};
use mc_01_event_indexing::{ConfigError, ContractSchema, IndexerConfig};
use shared_types::{Address, ContractRole};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Everything the binaries need to start.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub rpc_url: String,
    pub consent_manager: ContractSchema,
    pub audit_logger: ContractSchema,
    pub indexer: IndexerConfig,
    pub log: LogConfig,
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let rpc_url = get("MEDCHAIN_RPC_URL")
            .or_else(|| get("AMOY_RPC_URL"))
            .ok_or_else(|| ConfigError::missing("MEDCHAIN_RPC_URL"))?;
        if !(rpc_url.starts_with("http://") || rpc_url.starts_with("https://")) {
            return Err(ConfigError::invalid(
                "MEDCHAIN_RPC_URL",
                "must be an http(s) URL",
            ));
        }

        let deployments = get("MEDCHAIN_DEPLOYMENTS_DIR").map(PathBuf::from);
        let consent_manager = resolve_contract(
            ContractRole::ConsentManager,
            "CONSENT_MANAGER_ADDRESS",
            get("CONSENT_MANAGER_ADDRESS"),
            deployments.as_deref(),
        )?;
        let audit_logger = resolve_contract(
            ContractRole::AuditLogger,
            "AUDIT_LOGGER_ADDRESS",
            get("AUDIT_LOGGER_ADDRESS"),
            deployments.as_deref(),
        )?;

        let mut indexer = IndexerConfig::default();
        if let Some(path) = get("MEDCHAIN_AUDIT_DB") {
            indexer.store_path = PathBuf::from(path);
        }
        if let Some(ms) = parse_opt::<u64>(&get, "MEDCHAIN_POLL_INTERVAL_MS")? {
            indexer.poll_interval = Duration::from_millis(ms);
        }
        if let Some(blocks) = parse_opt(&get, "MEDCHAIN_SEED_BACKLOG")? {
            indexer.seed_backlog = blocks;
        }
        if let Some(blocks) = parse_opt(&get, "MEDCHAIN_MAX_WINDOW")? {
            indexer.max_window = blocks;
        }
        if let Some(ms) = parse_opt::<u64>(&get, "MEDCHAIN_PROVIDER_TIMEOUT_MS")? {
            indexer.provider_timeout = Duration::from_millis(ms);
        }
        indexer.validate()?;

        let log = LogConfig {
            level: get("MEDCHAIN_LOG_LEVEL").unwrap_or_else(|| LogConfig::default().level),
            json: match get("MEDCHAIN_LOG_FORMAT").as_deref() {
                None | Some("pretty") | Some("text") => false,
                Some("json") => true,
                Some(other) => {
                    return Err(ConfigError::invalid(
                        "MEDCHAIN_LOG_FORMAT",
                        format!("expected `json` or `pretty`, got `{}`", other),
                    ))
                }
            },
        };

        Ok(Self {
            rpc_url,
            consent_manager,
            audit_logger,
            indexer,
            log,
        })
    }

    pub fn contracts(&self) -> Vec<ContractSchema> {
        vec![self.consent_manager.clone(), self.audit_logger.clone()]
    }

    /// Scheme, host and port of the RPC endpoint. Hosted providers carry the
    /// API key in the path or query, so only this form is logged.
    pub fn rpc_endpoint(&self) -> String {
        redact_url(&self.rpc_url)
    }
}

pub fn redact_url(raw: &str) -> String {
    match reqwest::Url::parse(raw) {
        Ok(url) => match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}://{}:{}", url.scheme(), host, port),
            (Some(host), None) => format!("{}://{}", url.scheme(), host),
            (None, _) => format!("{}://<redacted>", url.scheme()),
        },
        Err(_) => "<redacted>".to_string(),
    }
}

fn parse_opt<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::invalid(key, e.to_string()))
        })
        .transpose()
}

pub fn parse_address(key: &str, raw: &str) -> Result<Address, ConfigError> {
    let digits = raw.trim().trim_start_matches("0x").trim_start_matches("0X");
    let bytes = hex::decode(digits).map_err(|e| ConfigError::invalid(key, e.to_string()))?;
    if bytes.len() != 20 {
        return Err(ConfigError::invalid(
            key,
            format!("expected 20 bytes, got {}", bytes.len()),
        ));
    }
    Ok(Address::from_slice(&bytes))
}

/// Address from the environment wins; the artifact supplies the ABI and,
/// when the variable is unset, the address.
fn resolve_contract(
    role: ContractRole,
    key: &str,
    address: Option<String>,
    deployments: Option<&Path>,
) -> Result<ContractSchema, ConfigError> {
    let artifact: Option<DeploymentArtifact> = match deployments {
        Some(dir) => Some(load_artifact(dir, role)?),
        None => None,
    };

    let address = match (address, &artifact) {
        (Some(raw), _) => parse_address(key, &raw)?,
        (None, Some(artifact)) => artifact.address,
        (None, None) => return Err(ConfigError::missing(key)),
    };
    if address.is_zero() {
        return Err(ConfigError::invalid(key, "zero address"));
    }

    match artifact.as_ref().and_then(|a| a.abi.as_ref()) {
        Some(abi) => ContractSchema::from_abi_json(role, address, abi)
            .map_err(|e| ConfigError::invalid(format!("{} ABI", role), e.to_string())),
        None => Ok(match role {
            ContractRole::ConsentManager => ContractSchema::consent_manager(address),
            ContractRole::AuditLogger => ContractSchema::audit_logger(address),
        }),
    }
}
