//! Bucket table generator
//!
//! Writes one boundary artifact per data type into the output directory,
//! where the server's `[buckets] artifact_dir` should point.
//!
//! Run with: cargo run --bin bucketgen -- --out ./buckets
//!
//! Any failure aborts the job with a non-zero exit.

use anyhow::Context;
use bucketdex::bucket::{write_artifact, BucketGenerator, BucketSpec};
use bucketdex::codec::FieldDataType;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bucketgen")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate bucket boundary artifacts")]
struct Cli {
    /// Output directory
    #[arg(short, long, default_value = "buckets")]
    out: PathBuf,

    /// Data types to generate (comma-separated, default: all)
    #[arg(short, long, value_delimiter = ',')]
    types: Vec<FieldDataType>,

    /// Override the number of seed candidates
    #[arg(long)]
    bucket_size: Option<usize>,

    /// Override the prune factor
    #[arg(long)]
    prune_factor: Option<f64>,

    /// Override the largest seeded token
    #[arg(long)]
    bucket_max: Option<i64>,

    /// Print the boundary counts without writing files
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn spec_for(&self, data_type: FieldDataType) -> BucketSpec {
        let mut spec = BucketSpec::for_type(data_type);
        if let Some(size) = self.bucket_size {
            spec.bucket_size = size;
        }
        if let Some(factor) = self.prune_factor {
            spec.prune_factor = factor;
        }
        if let Some(max) = self.bucket_max {
            spec.bucket_max = max;
        }
        spec
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bucketdex=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let types: Vec<FieldDataType> = if cli.types.is_empty() {
        FieldDataType::all().to_vec()
    } else {
        cli.types.clone()
    };
    println!(
        "{:<10} {:>8} {:>22} {:>22}  {}",
        "TYPE", "BUCKETS", "MIN", "MAX", "ARTIFACT"
    );

    for data_type in types {
        let spec = cli.spec_for(data_type);
        let table = BucketGenerator::new(spec.clone())
            .generate()
            .with_context(|| format!("generating {} buckets", data_type))?;

        let stats = table.stats();

        let artifact = if cli.dry_run {
            "-".to_string()
        } else {
            write_artifact(&cli.out, &spec, &table)
                .with_context(|| format!("writing {} artifact", data_type))?
                .display()
                .to_string()
        };

        println!(
            "{:<10} {:>8} {:>22} {:>22}  {}",
            data_type.as_str(),
            stats.count,
            stats.min,
            stats.max,
            artifact
        );
    }

    Ok(())
}
