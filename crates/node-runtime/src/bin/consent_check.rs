//! `consent-check`: print the consent status of one `(fileCid, grantee)`.
//!
//! Reads the ledger by default; `--derived` also folds the local audit
//! document so the two answers can be compared.

use anyhow::{Context, Result};
use clap::Parser;

use mc_01_event_indexing::GrantKey;
use mc_02_consent_evaluation::{ConsentEvaluationApi, ConsentStatus, EvaluationMode};
use node_runtime::config::parse_address;
use node_runtime::telemetry::init_logging;
use node_runtime::{build_evaluator, open_store, RuntimeConfig};

/// Check patient consent for a file and grantee.
#[derive(Parser, Debug)]
#[command(name = "consent-check")]
#[command(about = "Check MedChain consent for a file and grantee")]
struct Args {
    /// Content identifier of the shared file
    #[arg(short, long)]
    file_cid: String,

    /// Grantee address (0x-prefixed)
    #[arg(short, long)]
    grantee: String,

    /// Also evaluate from the local audit document
    #[arg(short, long)]
    derived: bool,

    /// List emergency access recorded for the file
    #[arg(short, long)]
    emergency: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = RuntimeConfig::from_env().context("Invalid configuration")?;
    init_logging(&config.log).context("Failed to initialize logging")?;

    let grantee = parse_address("--grantee", &args.grantee)?;
    let key = GrantKey::new(args.file_cid.as_str(), grantee);

    let store = open_store(&config)?;
    let evaluator = build_evaluator(&config, store)?;

    let status = evaluator
        .evaluate(&key, EvaluationMode::Authoritative)
        .await
        .context("Ledger read failed")?;
    print_status(&key, EvaluationMode::Authoritative, status.as_ref())?;

    if args.derived {
        let status = evaluator.evaluate(&key, EvaluationMode::Derived).await?;
        print_status(&key, EvaluationMode::Derived, status.as_ref())?;
    }

    if args.emergency {
        let records = evaluator.emergency_history(&key.file_cid);
        println!("emergency access ({}):", records.len());
        println!("{}", serde_json::to_string_pretty(&records)?);
    }
    Ok(())
}

fn print_status(key: &GrantKey, mode: EvaluationMode, status: Option<&ConsentStatus>) -> Result<()> {
    match status {
        Some(status) => {
            println!("{} consent:", mode);
            println!("{}", serde_json::to_string_pretty(status)?);
        }
        None => println!("{} consent: none recorded for {}", mode, key),
    }
    Ok(())
}
