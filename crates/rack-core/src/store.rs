//! Storage traits for facts and derived views.
//!
//! The traits are implemented by storage backends (e.g. `rack-store-sqlite`).
//! Builders receive an explicitly constructed store and depend only on these
//! abstractions, never on a concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  build::BuildRun,
  fact::{NewResultFact, ResultFact},
  view::{
    AthleteMetric, AthleteProfile, CategoryKey, CategoryRecord,
    CompetitionSummary, FederationActivity, LiftType, RecordCandidate,
  },
};

// ─── Facts ───────────────────────────────────────────────────────────────────

/// The append-only source of truth.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait FactStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Validate and append a batch of facts in one transaction. Either every
  /// fact in the batch is stored or none is.
  fn append_facts(
    &self,
    facts: Vec<NewResultFact>,
  ) -> impl Future<Output = Result<Vec<ResultFact>, Self::Error>> + Send + '_;

  /// Every stored fact, in the order it was appended.
  fn all_facts(
    &self,
  ) -> impl Future<Output = Result<Vec<ResultFact>, Self::Error>> + Send + '_;

  fn count_facts(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

// ─── View writes ─────────────────────────────────────────────────────────────

/// Write side of the derived views, used by the builders.
///
/// Every `replace_*` call swaps the whole view in a single step: readers see
/// the previous contents or the new contents, never a mixture.
pub trait ViewStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Replace the athlete view. Returns the number of rows written.
  fn replace_athletes(
    &self,
    profiles: Vec<AthleteProfile>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Replace the competition view. Returns the number of rows written.
  fn replace_competitions(
    &self,
    competitions: Vec<CompetitionSummary>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Replace the federation view. Returns the number of rows written.
  fn replace_federations(
    &self,
    federations: Vec<FederationActivity>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Drop everything staged under `staging`.
  fn discard_staged_records(
    &self,
    staging: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Merge one lift pass into the `staging` area with
  /// [`CategoryRecord::merge`]. Each document is updated atomically; only the
  /// `lift` entry is written. Returns the number of documents touched.
  ///
  /// Every rebuild stages under its own id, so overlapping rebuilds never see
  /// or clear each other's rows.
  fn merge_staged_records(
    &self,
    staging: Uuid,
    lift: LiftType,
    candidates: Vec<RecordCandidate>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Replace the live records view with the rows staged under `staging` and
  /// drop them from the staging area, in one step. Returns the number of
  /// live documents.
  fn publish_staged_records(
    &self,
    staging: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Append a build-run row.
  fn record_run(
    &self,
    run: BuildRun,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── View reads ──────────────────────────────────────────────────────────────

/// Read side of the derived views — the lookups the reporting layer relies
/// on.
pub trait ViewQuery: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Athletes ──────────────────────────────────────────────────────────

  fn athlete<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<Option<AthleteProfile>, Self::Error>> + Send + 'a;

  fn athletes_by_slugs<'a>(
    &'a self,
    slugs: &'a [String],
  ) -> impl Future<Output = Result<Vec<AthleteProfile>, Self::Error>> + Send + 'a;

  /// Case-insensitive substring match on the display name, most active
  /// athletes first.
  fn search_athletes<'a>(
    &'a self,
    name: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<AthleteProfile>, Self::Error>> + Send + 'a;

  /// Highest `metric` first; athletes without a value are excluded.
  fn top_athletes(
    &self,
    metric: AthleteMetric,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<AthleteProfile>, Self::Error>> + Send + '_;

  // ── Competitions ──────────────────────────────────────────────────────

  fn competition<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<Option<CompetitionSummary>, Self::Error>> + Send + 'a;

  /// Most recent meets first; undated meets last.
  fn recent_competitions(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<CompetitionSummary>, Self::Error>> + Send + '_;

  fn federation_competitions<'a>(
    &'a self,
    federation_slug: &'a str,
  ) -> impl Future<Output = Result<Vec<CompetitionSummary>, Self::Error>> + Send + 'a;

  // ── Federations ───────────────────────────────────────────────────────

  fn federation<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<Option<FederationActivity>, Self::Error>> + Send + 'a;

  /// All federations ordered by name.
  fn federations(
    &self,
  ) -> impl Future<Output = Result<Vec<FederationActivity>, Self::Error>> + Send + '_;

  // ── Records ───────────────────────────────────────────────────────────

  fn record<'a>(
    &'a self,
    key: &'a CategoryKey,
  ) -> impl Future<Output = Result<Option<CategoryRecord>, Self::Error>> + Send + 'a;

  /// The record table of one federation and equipment, ordered by weight
  /// class then age class.
  fn federation_records<'a>(
    &'a self,
    federation_slug: &'a str,
    equipment: &'a str,
  ) -> impl Future<Output = Result<Vec<CategoryRecord>, Self::Error>> + Send + 'a;

  /// Most recent build runs first.
  fn recent_runs(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<BuildRun>, Self::Error>> + Send + '_;
}
