//! Command-line front end: sample a CSV email corpus into mbox archives.

use anyhow::{Context, Result, bail};
use clap::Parser;
use mboxsample::config::SamplerConfig;
use mboxsample::{CsvCorpus, FromEscape, run};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "mboxsample")]
#[command(about = "Reservoir-sample emails from a CSV corpus into mbox files", long_about = None)]
struct Cli {
    /// Corpus CSV file (may be .gz, .zst, .bz2 or .xz)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory receiving samples_<n>.mbox
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Total number of messages to sample [default: 10000]
    #[arg(short = 'n', long)]
    sample_size: Option<usize>,

    /// Number of mbox files to split the sample into [default: 2]
    #[arg(short, long)]
    chunks: Option<usize>,

    /// Column holding the raw email [default: message]
    #[arg(short, long)]
    field: Option<String>,

    /// Seed for a reproducible sample
    #[arg(long)]
    seed: Option<u64>,

    /// Handling of body lines starting with "From " [default: mboxrd]
    #[arg(long, value_enum)]
    escape: Option<FromEscape>,

    /// Log progress every N rows, 0 to disable [default: 50000]
    #[arg(long)]
    progress_every: Option<u64>,

    /// JSON config file; flags given on the command line take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<(SamplerConfig, Option<PathBuf>)> {
        let mut cfg = match &self.config {
            Some(path) => SamplerConfig::from_json_file(path)
                .with_context(|| format!("load config {}", path.display()))?,
            None => SamplerConfig::default(),
        };
        if let Some(v) = self.input {
            cfg.input = Some(v);
        }
        if let Some(v) = self.output_dir {
            cfg.output_dir = v;
        }
        if let Some(v) = self.sample_size {
            cfg.sample_size = v;
        }
        if let Some(v) = self.chunks {
            cfg.chunks = v;
        }
        if let Some(v) = self.field {
            cfg.field = v;
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        if let Some(v) = self.escape {
            cfg.escape = v;
        }
        if let Some(v) = self.progress_every {
            cfg.progress_every = v;
        }
        Ok((cfg, self.report))
    }
}

fn execute(cli: Cli) -> Result<()> {
    let (cfg, report_path) = cli.into_config()?;
    let Some(input) = cfg.input.clone() else {
        bail!("no input corpus given (use --input or set \"input\" in the config file)");
    };

    let report = run(&cfg, &CsvCorpus::new(&input))
        .with_context(|| format!("sampling {} failed", input.display()))?;

    for archive in &report.archives {
        if archive.written {
            tracing::info!(
                path = %archive.path.display(),
                messages = archive.messages,
                "archive ready"
            );
        } else {
            tracing::info!(ordinal = archive.ordinal, "chunk empty, no archive");
        }
    }
    if let Some(path) = report_path {
        report
            .save_to_file(&path)
            .with_context(|| format!("write report {}", path.display()))?;
    }
    tracing::info!(
        obtained = report.obtained,
        elapsed_ms = report.elapsed_ms,
        "process complete"
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match execute(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
