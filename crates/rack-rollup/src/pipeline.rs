//! Pipeline — runs the builders over one store and records every run.
//!
//! Each builder owns exactly one view, so the builders never contend for the
//! same output and may run concurrently. A failing builder is fatal only to
//! its own view; the others still complete.

use std::{sync::Arc, time::Instant};

use chrono::Utc;
use rack_core::{
  build::{BuildRun, RunOutcome, ViewKind},
  store::{FactStore, ViewStore},
};
use strum::IntoEnumIterator;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
  Result, athlete::AthleteRollup, competition::CompetitionRollup,
  federation::FederationRollup, records::RecordEngine,
};

/// What a successful builder run produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOutput {
  pub rows:    u64,
  pub skipped: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
  /// Run the requested builders as separate tasks instead of one after
  /// another.
  pub concurrent: bool,
}

impl Default for PipelineConfig {
  fn default() -> Self { Self { concurrent: true } }
}

/// The runs of one pipeline invocation, in the order they were requested.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
  pub runs: Vec<BuildRun>,
}

impl PipelineReport {
  pub fn all_succeeded(&self) -> bool {
    self.runs.iter().all(|r| r.outcome.is_success())
  }

  pub fn failures(&self) -> impl Iterator<Item = &BuildRun> {
    self.runs.iter().filter(|r| !r.outcome.is_success())
  }

  pub fn run(&self, view: ViewKind) -> Option<&BuildRun> {
    self.runs.iter().find(|r| r.view == view)
  }
}

pub struct Pipeline<S> {
  store:  Arc<S>,
  config: PipelineConfig,
}

impl<S> Pipeline<S>
where
  S: FactStore + ViewStore + 'static,
{
  pub fn new(store: Arc<S>, config: PipelineConfig) -> Self {
    Self { store, config }
  }

  /// Rebuild every view.
  pub async fn run_all(&self) -> PipelineReport {
    let views: Vec<ViewKind> = ViewKind::iter().collect();
    self.run(&views).await
  }

  /// Rebuild the given views. Duplicates are run once.
  pub async fn run(&self, views: &[ViewKind]) -> PipelineReport {
    let mut requested: Vec<ViewKind> = Vec::with_capacity(views.len());
    for view in views {
      if !requested.contains(view) {
        requested.push(*view);
      }
    }

    info!(
      views = ?requested,
      concurrent = self.config.concurrent,
      "pipeline started"
    );

    let runs = if self.config.concurrent {
      self.run_concurrent(&requested).await
    } else {
      let mut runs = Vec::with_capacity(requested.len());
      for &view in &requested {
        runs.push(run_view(&self.store, view).await);
      }
      runs
    };

    let report = PipelineReport { runs };
    let failed = report.failures().count();
    if failed == 0 {
      info!(runs = report.runs.len(), "pipeline finished");
    } else {
      warn!(runs = report.runs.len(), failed, "pipeline finished with failures");
    }
    report
  }

  async fn run_concurrent(&self, views: &[ViewKind]) -> Vec<BuildRun> {
    let started_at = Utc::now();
    let handles: Vec<(ViewKind, JoinHandle<BuildRun>)> = views
      .iter()
      .map(|&view| {
        let store = Arc::clone(&self.store);
        (view, tokio::spawn(async move { run_view(&store, view).await }))
      })
      .collect();

    let mut runs = Vec::with_capacity(handles.len());
    for (view, handle) in handles {
      match handle.await {
        Ok(run) => runs.push(run),
        Err(e) => {
          // The task died before it could record itself.
          error!(%view, error = %e, "builder task aborted");
          let run = BuildRun {
            run_id: Uuid::new_v4(),
            view,
            started_at,
            finished_at: Utc::now(),
            rows: 0,
            skipped: 0,
            outcome: RunOutcome::Failed { error: crate::Error::from(e).to_string() },
          };
          record(&self.store, &run).await;
          runs.push(run);
        }
      }
    }
    runs
  }
}

async fn build<S>(store: &Arc<S>, view: ViewKind) -> Result<BuildOutput>
where
  S: FactStore + ViewStore,
{
  let store = Arc::clone(store);
  match view {
    ViewKind::Athletes => AthleteRollup::new(store).run().await,
    ViewKind::Competitions => CompetitionRollup::new(store).run().await,
    ViewKind::Federations => FederationRollup::new(store).run().await,
    ViewKind::Records => RecordEngine::new(store).run().await,
  }
}

/// Run one builder and record its [`BuildRun`], whatever the outcome.
pub async fn run_view<S>(store: &Arc<S>, view: ViewKind) -> BuildRun
where
  S: FactStore + ViewStore,
{
  let started_at = Utc::now();
  let clock = Instant::now();
  let result = build(store, view).await;
  let finished_at = Utc::now();
  let elapsed_ms = clock.elapsed().as_millis() as u64;

  let (output, outcome) = match result {
    Ok(output) => {
      if output.rows == 0 {
        warn!(%view, "builder wrote no rows");
      } else {
        info!(%view, rows = output.rows, skipped = output.skipped, elapsed_ms, "builder succeeded");
      }
      (output, RunOutcome::Succeeded)
    }
    Err(e) => {
      error!(%view, error = %e, elapsed_ms, "builder failed");
      (BuildOutput::default(), RunOutcome::Failed { error: e.to_string() })
    }
  };

  let run = BuildRun {
    run_id: Uuid::new_v4(),
    view,
    started_at,
    finished_at,
    rows: output.rows,
    skipped: output.skipped,
    outcome,
  };
  record(store, &run).await;
  run
}

async fn record<S: ViewStore>(store: &Arc<S>, run: &BuildRun) {
  if let Err(e) = store.record_run(run.clone()).await {
    warn!(view = %run.view, error = %e, "could not record build run");
  }
}
