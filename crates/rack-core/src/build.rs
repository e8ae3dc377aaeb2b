//! Build-run bookkeeping.
//!
//! Every builder execution leaves one [`BuildRun`] behind, so an operator can
//! tell a run that wrote nothing apart from a run that never happened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

/// The four derived views, each owned by exactly one builder.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ViewKind {
  Athletes,
  Competitions,
  Federations,
  Records,
}

/// How a builder run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
  Succeeded,
  Failed { error: String },
}

impl RunOutcome {
  pub fn is_success(&self) -> bool { matches!(self, Self::Succeeded) }
}

/// One execution of one builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRun {
  pub run_id:      Uuid,
  pub view:        ViewKind,
  pub started_at:  DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
  /// Rows written to the view.
  pub rows:        u64,
  /// Facts the builder could not use (missing fields it depends on).
  pub skipped:     u64,
  pub outcome:     RunOutcome,
}
