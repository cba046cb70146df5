// Copyright (c) 2026 Meridian Contributors. MIT License.
// See LICENSE for details.

//! # meridian-verify
//!
//! Offline chain integrity checker. Walks a node's file-backed chain,
//! recomputing every block hash, replaying every signature check and
//! cross-checking the latest finalization proof, then exits with a
//! code a supervisor can act on:
//!
//! - `0` — chain is intact
//! - `1` — chain-link failure (previous-block hash mismatch)
//! - `2` — block hash or signature failure
//! - `3` — finalization proof hash failure
//! - `4` — operational failure (unreadable resources, corrupt files)

mod file_storage;
mod resources;

#[cfg(test)]
mod test_fixtures;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use meridian_protocol::chain::{verify_chain, BlockExtensions, IntegrityReport};
use meridian_protocol::storage::BlockStorageCache;

use file_storage::{FileBlockStorage, FileProofStorage};

/// Offline chain integrity checker for Meridian resources directories.
#[derive(Parser, Debug)]
#[command(name = "meridian-verify", version)]
struct Args {
    /// Path to the resources directory (network.json, chain/, proof/).
    #[arg(long, short = 'r', env = "MERIDIAN_RESOURCES")]
    resources: PathBuf,

    /// Default log level when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Sends findings to stderr so stdout stays free for the report
/// summary. `RUST_LOG` overrides `default_level` when set.
fn init_logging(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> anyhow::Result<IntegrityReport> {
    let configuration = resources::load_network_configuration(&args.resources)?;
    tracing::info!(
        network = configuration.network.0,
        seed = %configuration.generation_hash_seed,
        "resources loaded"
    );

    let block_storage = FileBlockStorage::open(&resources::chain_directory(&args.resources))
        .context("cannot open chain directory")?;
    let proof_storage = FileProofStorage::open(&resources::proof_directory(&args.resources))
        .context("cannot open proof directory")?;

    let storage_cache = BlockStorageCache::new(Box::new(block_storage));
    let storage_view = storage_cache.view();
    tracing::info!(chain_height = %storage_view.chain_height(), "walking chain");

    let extensions = BlockExtensions::new(configuration.generation_hash_seed);
    let report = verify_chain(&storage_view, &proof_storage, &extensions)
        .context("chain walk aborted on unreadable block")?;

    Ok(report)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    match run(&args) {
        Ok(report) => {
            if report.is_clean() {
                println!("chain OK ({} blocks checked)", report.num_blocks_checked);
            } else {
                println!(
                    "chain FAILED ({} blocks checked, {} faults)",
                    report.num_blocks_checked,
                    report.faults.len()
                );
                for fault in &report.faults {
                    println!("  {}", fault);
                }
            }

            ExitCode::from(report.exit_code() as u8)
        }
        Err(error) => {
            tracing::error!("{:#}", error);
            ExitCode::from(4)
        }
    }
}
