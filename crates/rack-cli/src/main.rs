//! `rack` — load result facts and rebuild the RackAI views.
//!
//! # Usage
//!
//! ```
//! rack load results.jsonl
//! rack build
//! rack build --only records --only athletes
//! rack runs --limit 20
//! ```
//!
//! Settings come from `config.toml` (or `--config`), overridden by `RACK_*`
//! environment variables.

use std::{
  io::BufRead,
  path::{Path, PathBuf},
  process::ExitCode,
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use rack_core::{
  build::{RunOutcome, ViewKind},
  fact::NewResultFact,
  store::{FactStore, ViewQuery},
};
use rack_rollup::{Pipeline, PipelineConfig};
use rack_store_sqlite::SqliteStore;
use serde::Deserialize;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "rack", version, about = "RackAI results pipeline")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Append result facts from a JSON-lines file.
  Load {
    /// One fact per line.
    file: PathBuf,
  },

  /// Rebuild the derived views.
  Build {
    /// Only rebuild these views (athletes, competitions, federations,
    /// records). Repeatable; defaults to all.
    #[arg(long = "only", value_name = "VIEW")]
    only: Vec<ViewKind>,
  },

  /// Show the most recent build runs.
  Runs {
    #[arg(long, default_value_t = 10)]
    limit: usize,
  },
}

// ─── Config file ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct RackConfig {
  /// SQLite database holding facts and views.
  store_path:         PathBuf,
  /// Run the builders of one `build` concurrently.
  #[serde(default = "default_concurrent")]
  concurrent_rollups: bool,
}

fn default_concurrent() -> bool { true }

fn load_config(path: &Path) -> anyhow::Result<RackConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("RACK"))
    .build()
    .context("failed to read config file")?;

  settings
    .try_deserialize()
    .context("failed to deserialise RackConfig")
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let config = load_config(&cli.config)?;

  let store_path = expand_tilde(&config.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);

  match cli.command {
    Command::Load { file } => load(&store, &file).await,
    Command::Build { only } => build(store, &config, &only).await,
    Command::Runs { limit } => runs(&store, limit).await,
  }
}

// ─── Commands ─────────────────────────────────────────────────────────────────

async fn load(store: &SqliteStore, file: &Path) -> anyhow::Result<ExitCode> {
  let reader = std::fs::File::open(file)
    .map(std::io::BufReader::new)
    .with_context(|| format!("failed to open {}", file.display()))?;

  let parsed = parse_facts(reader)?;
  if parsed.rejected > 0 {
    warn!(rejected = parsed.rejected, "some lines were skipped");
  }

  let stored = store
    .append_facts(parsed.facts)
    .await
    .context("failed to append facts")?;
  let total = store.count_facts().await?;

  info!(appended = stored.len(), total, "facts loaded");
  println!("appended {} facts ({} rejected, {total} stored)", stored.len(), parsed.rejected);
  Ok(ExitCode::SUCCESS)
}

async fn build(
  store: Arc<SqliteStore>,
  config: &RackConfig,
  only: &[ViewKind],
) -> anyhow::Result<ExitCode> {
  let pipeline = Pipeline::new(store, PipelineConfig {
    concurrent: config.concurrent_rollups,
  });
  let report = if only.is_empty() {
    pipeline.run_all().await
  } else {
    pipeline.run(only).await
  };

  for run in &report.runs {
    println!("{}", describe(run));
  }

  Ok(if report.all_succeeded() {
    ExitCode::SUCCESS
  } else {
    ExitCode::FAILURE
  })
}

async fn runs(store: &SqliteStore, limit: usize) -> anyhow::Result<ExitCode> {
  for run in store.recent_runs(limit).await? {
    println!(
      "{}  {}",
      run.started_at.format("%Y-%m-%d %H:%M:%S"),
      describe(&run)
    );
  }
  Ok(ExitCode::SUCCESS)
}

fn describe(run: &rack_core::build::BuildRun) -> String {
  let elapsed = (run.finished_at - run.started_at).num_milliseconds();
  match &run.outcome {
    RunOutcome::Succeeded => format!(
      "{:<12} ok      rows={} skipped={} {elapsed}ms",
      run.view, run.rows, run.skipped
    ),
    RunOutcome::Failed { error } => format!("{:<12} FAILED  {error}", run.view),
  }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

struct ParsedFacts {
  facts:    Vec<NewResultFact>,
  rejected: usize,
}

/// Parse JSON-lines facts. Blank lines are ignored; lines that do not parse
/// or lack an athlete or competition slug are logged and counted.
fn parse_facts(reader: impl BufRead) -> anyhow::Result<ParsedFacts> {
  let mut facts = Vec::new();
  let mut rejected = 0;

  for (index, line) in reader.lines().enumerate() {
    let line = line.context("failed to read input")?;
    if line.trim().is_empty() {
      continue;
    }
    let lineno = index + 1;
    match serde_json::from_str::<NewResultFact>(&line) {
      Ok(fact) => match fact.validate() {
        Ok(()) => facts.push(fact),
        Err(e) => {
          warn!(line = lineno, error = %e, "invalid fact");
          rejected += 1;
        }
      },
      Err(e) => {
        warn!(line = lineno, error = %e, "unparseable fact");
        rejected += 1;
      }
    }
  }

  Ok(ParsedFacts { facts, rejected })
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
