use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use injectable_native::{transform, transform_tree, IncrementalCache, TransformOptions};

#[derive(Parser, Debug)]
#[command(name = "injectable")]
#[command(version)]
#[command(about = "Make a module's top-level bindings replaceable from tests")]
struct Cli {
    /// Module file, or a directory to transform recursively
    path: PathBuf,

    /// Comma-separated target names
    #[arg(long, value_delimiter = ',', conflicts_with = "query")]
    targets: Vec<String>,

    /// Loader query, e.g. `?fetch,defaultAdd` or `?{"fetch":true}`
    #[arg(long)]
    query: Option<String>,

    /// Output file, or output directory for a directory input
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Reuse results across runs (directory input only)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Print the full result (code, bindings, diagnostics) as JSON
    #[arg(long)]
    json: bool,
}

/// `INJECTABLE_LOG` wins over `RUST_LOG`; both use `EnvFilter` syntax.
fn init_tracing() {
    let filter = match std::env::var("INJECTABLE_LOG") {
        Ok(val) => EnvFilter::builder().parse_lossy(val),
        Err(_) => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("injectable_native=info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn options(cli: &Cli) -> Result<TransformOptions> {
    match &cli.query {
        Some(query) => Ok(TransformOptions::from_query(query)?),
        None => Ok(TransformOptions::new(cli.targets.iter().cloned())),
    }
}

fn run_file(cli: &Cli, options: TransformOptions) -> Result<()> {
    let source = fs::read_to_string(&cli.path)
        .with_context(|| format!("failed to read {}", cli.path.display()))?;
    let options = options.with_file_path(cli.path.to_string_lossy());
    let output = transform(&source, &options)?;

    let rendered = if cli.json {
        serde_json::to_string_pretty(&output)?
    } else {
        output.code
    };
    match &cli.out {
        Some(out) => fs::write(out, rendered)
            .with_context(|| format!("failed to write {}", out.display()))?,
        None => println!("{}", rendered),
    }
    Ok(())
}

fn run_dir(cli: &Cli, options: TransformOptions) -> Result<()> {
    let Some(out) = &cli.out else {
        bail!("--out <DIR> is required when transforming a directory");
    };
    let cache = match &cli.cache_dir {
        Some(dir) => Some(IncrementalCache::in_dir(dir)?),
        None => None,
    };
    let report = transform_tree(&cli.path, out, &options, cache.as_ref());

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    if !report.is_success() {
        bail!("{} file(s) failed to transform", report.failed.len());
    }
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let options = options(&cli)?;

    if cli.path.is_dir() {
        run_dir(&cli, options)
    } else {
        run_file(&cli, options)
    }
}
