use anyhow::Result;
use attendance_recon::{config::PipelineConfig, pipeline::clean_all};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Reconcile HR attendance CSV exports into one canonical table"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
    /// YAML file with `source_dir` / `dest_path`
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true, env = "RECON_SOURCE_DIR")]
    source_dir: Option<PathBuf>,
    #[arg(long, global = true, env = "RECON_DEST_PATH")]
    dest: Option<PathBuf>,
    /// Print the run summary as JSON on stdout
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Clean every source CSV and replace the canonical artifact (default)
    Clean,
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let base = match &args.config {
        Some(path) => PipelineConfig::from_yaml_file(path)?,
        None => PipelineConfig::default(),
    };
    let config = base.with_overrides(args.source_dir, args.dest);

    match args.command.unwrap_or(Command::Clean) {
        Command::Clean => {
            let report = clean_all(&config)?;
            if report.degraded() {
                warn!("artifact written in degraded state; identity columns are incomplete");
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                info!(
                    path = %report.artifact_path.display(),
                    rows = report.merge.rows_out,
                    sources = report.sources_read,
                    "done"
                );
            }
        }
    }
    Ok(())
}
