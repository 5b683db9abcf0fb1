//! generate-coupons - write sample coupon sources
//!
//! Codes in at least two files: VALIDONE1, VALIDTWO12, ALLTHREE1, SUMMER2024,
//! WINTER2024. Codes in one file only: ONLYONE111, ONLYTWO222, ONLYTHREE3,
//! SPRING2024.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use minikart_api::sample::{write_sample_coupons, SAMPLE_COUPONS};

#[derive(Debug, Parser)]
#[command(name = "generate-coupons", version, about = "Write sample gzip coupon files")]
struct Args {
    /// Directory to write couponbase{1,2,3}.gz into
    #[arg(short, long, default_value = "data/coupons")]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let paths = write_sample_coupons(&args.output_dir)
        .with_context(|| format!("Failed to write coupons to {}", args.output_dir.display()))?;

    for (path, (_, codes)) in paths.iter().zip(SAMPLE_COUPONS.iter()) {
        info!("Created {} with {} codes", path.display(), codes.len());
    }

    Ok(())
}
