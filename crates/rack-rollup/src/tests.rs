//! Pipeline tests against an in-memory `SqliteStore`.

use std::sync::Arc;

use rack_core::{
  build::{BuildRun, RunOutcome, ViewKind},
  fact::{NewResultFact, ResultFact},
  store::{FactStore, ViewQuery, ViewStore},
  view::{
    AthleteProfile, CategoryKey, CompetitionSummary, FederationActivity, LiftType,
    RecordCandidate,
  },
};
use rack_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::{
  fixture::{FactExt, fact},
  pipeline::{Pipeline, PipelineConfig},
  records::RecordEngine,
};

async fn seeded(facts: Vec<NewResultFact>) -> Arc<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  store.append_facts(facts).await.expect("append");
  Arc::new(store)
}

fn meet_facts() -> Vec<NewResultFact> {
  vec![
    fact("Ana Ruiz", "Copa", "2022-03-01").with_total(Some(520.0)),
    fact("Bea Gil", "Copa", "2022-03-01").with_total(Some(560.0)),
    fact("Ana Ruiz", "Liga", "2023-05-01").with_total(Some(590.0)),
    fact("Cris Sanz", "Liga", "2023-05-01").with_weight_class("105"),
    fact("Dan Mora", "Open", "2023-09-10").with_federation(Some("IPF")),
  ]
}

fn aep_raw_93() -> CategoryKey {
  CategoryKey {
    federation_slug: "aep".into(),
    sex:             "M".into(),
    equipment:       "Raw".into(),
    weight_class:    "93".into(),
    age_class:       "24-34".into(),
  }
}

/// Everything a reader can see, serialised for comparison.
async fn snapshot(store: &SqliteStore) -> String {
  let athletes = store
    .search_athletes("", 100)
    .await
    .expect("athletes");
  let competitions = store.recent_competitions(100).await.expect("competitions");
  let federations = store.federations().await.expect("federations");
  let mut records = Vec::new();
  for federation in ["aep", "ipf"] {
    records.extend(
      store
        .federation_records(federation, "Raw")
        .await
        .expect("records"),
    );
  }
  serde_json::to_string(&(athletes, competitions, federations, records)).expect("json")
}

#[tokio::test]
async fn full_build_populates_every_view() {
  let store = seeded(meet_facts()).await;
  let report = Pipeline::new(Arc::clone(&store), PipelineConfig::default())
    .run_all()
    .await;

  assert!(report.all_succeeded());
  assert_eq!(report.runs.len(), 4);

  let ana = store.athlete("ana-ruiz").await.unwrap().expect("ana");
  assert_eq!(ana.stats.total_competitions, 2);
  assert_eq!(ana.stats.best_total, Some(590.0));

  let liga = store.competition("liga").await.unwrap().expect("liga");
  assert_eq!(liga.total_athletes, 2);

  let feds: Vec<_> = store
    .federations()
    .await
    .unwrap()
    .into_iter()
    .map(|f| f.slug)
    .collect();
  assert_eq!(feds, ["aep", "ipf"]);

  let record = store.record(&aep_raw_93()).await.unwrap().expect("record");
  let total = record.total.expect("total holder");
  assert_eq!(total.holder_slug, "ana-ruiz");
  assert_eq!(total.value, 590.0);

  assert_eq!(report.run(ViewKind::Athletes).map(|r| r.rows), Some(4));
}

#[tokio::test]
async fn every_athlete_gets_exactly_one_profile() {
  let store = seeded(meet_facts()).await;
  Pipeline::new(Arc::clone(&store), PipelineConfig::default())
    .run(&[ViewKind::Athletes])
    .await;

  let facts = store.all_facts().await.unwrap();
  let profiles = store.search_athletes("", 100).await.unwrap();
  assert_eq!(profiles.len(), 4);
  for profile in &profiles {
    let count = facts
      .iter()
      .filter(|f| f.athlete.slug == profile.slug)
      .count() as u64;
    assert_eq!(profile.stats.total_competitions, count, "{}", profile.slug);
  }
}

#[tokio::test]
async fn rebuilding_unchanged_facts_is_idempotent() {
  let store = seeded(meet_facts()).await;
  let pipeline = Pipeline::new(Arc::clone(&store), PipelineConfig::default());

  pipeline.run_all().await;
  let first = snapshot(&store).await;
  pipeline.run_all().await;
  let second = snapshot(&store).await;

  assert_eq!(first, second);
}

#[tokio::test]
async fn sequential_and_concurrent_builds_agree() {
  let concurrent = seeded(meet_facts()).await;
  Pipeline::new(Arc::clone(&concurrent), PipelineConfig { concurrent: true })
    .run_all()
    .await;

  let sequential = seeded(meet_facts()).await;
  Pipeline::new(Arc::clone(&sequential), PipelineConfig { concurrent: false })
    .run_all()
    .await;

  assert_eq!(snapshot(&concurrent).await, snapshot(&sequential).await);
}

#[tokio::test]
async fn new_facts_show_up_after_rebuild() {
  let store = seeded(meet_facts()).await;
  let pipeline = Pipeline::new(Arc::clone(&store), PipelineConfig::default());
  pipeline.run_all().await;

  store
    .append_facts(vec![fact("Eva Paz", "Final", "2024-02-02").with_total(Some(640.0))])
    .await
    .unwrap();
  // Not visible until the next build.
  assert!(store.athlete("eva-paz").await.unwrap().is_none());

  pipeline.run_all().await;
  assert!(store.athlete("eva-paz").await.unwrap().is_some());
  let record = store.record(&aep_raw_93()).await.unwrap().unwrap();
  assert_eq!(record.total.unwrap().holder_slug, "eva-paz");
}

#[tokio::test]
async fn record_passes_commute() {
  let orders: [[LiftType; 4]; 4] = [
    [LiftType::Squat, LiftType::Bench, LiftType::Deadlift, LiftType::Total],
    [LiftType::Total, LiftType::Deadlift, LiftType::Bench, LiftType::Squat],
    [LiftType::Bench, LiftType::Total, LiftType::Squat, LiftType::Deadlift],
    [LiftType::Deadlift, LiftType::Squat, LiftType::Total, LiftType::Bench],
  ];

  let mut published = Vec::new();
  for order in orders {
    let store = seeded(meet_facts()).await;
    RecordEngine::new(Arc::clone(&store))
      .run_passes(&order)
      .await
      .expect("record passes");
    published.push(store.federation_records("aep", "Raw").await.unwrap());
  }

  assert_eq!(published[0].len(), 2);
  for other in &published[1..] {
    assert_eq!(other, &published[0]);
  }
}

#[tokio::test]
async fn overlapping_record_rebuilds_publish_complete_records() {
  let store = seeded(meet_facts()).await;
  let a = RecordEngine::new(Arc::clone(&store));
  let b = RecordEngine::new(Arc::clone(&store));

  for _ in 0..20 {
    let (ra, rb) = tokio::join!(a.run(), b.run());
    assert_eq!(ra.expect("first rebuild").rows, 2);
    assert_eq!(rb.expect("second rebuild").rows, 2);

    let record = store.record(&aep_raw_93()).await.unwrap().expect("live record");
    for lift in [LiftType::Squat, LiftType::Bench, LiftType::Deadlift, LiftType::Total] {
      assert!(record.entry(lift).is_some(), "{lift} missing");
    }
    assert_eq!(store.federation_records("aep", "Raw").await.unwrap().len(), 2);
  }
}

#[tokio::test]
async fn overlapping_pipelines_keep_the_records_view() {
  let store = seeded(meet_facts()).await;
  let first = Pipeline::new(Arc::clone(&store), PipelineConfig::default());
  let second = Pipeline::new(Arc::clone(&store), PipelineConfig { concurrent: false });

  let (a, b) = tokio::join!(first.run_all(), second.run_all());
  assert!(a.all_succeeded() && b.all_succeeded());
  assert_eq!(a.run(ViewKind::Records).map(|r| r.rows), Some(2));
  assert_eq!(b.run(ViewKind::Records).map(|r| r.rows), Some(2));
  assert!(store.record(&aep_raw_93()).await.unwrap().is_some());
}

#[tokio::test]
async fn tied_records_resolve_the_same_regardless_of_insert_order() {
  let tied = || {
    vec![
      fact("Zoe Vela", "Copa", "2022-03-01").with_total(Some(600.0)),
      fact("Abe Cano", "Copa", "2022-03-01").with_total(Some(600.0)),
    ]
  };
  let mut reversed = tied();
  reversed.reverse();

  let mut holders = Vec::new();
  for facts in [tied(), reversed] {
    let store = seeded(facts).await;
    RecordEngine::new(Arc::clone(&store)).run().await.unwrap();
    let record = store.record(&aep_raw_93()).await.unwrap().unwrap();
    holders.push(record.total.unwrap().holder_slug);
  }
  assert_eq!(holders, ["abe-cano", "abe-cano"]);
}

#[tokio::test]
async fn empty_store_records_zero_row_runs() {
  let store = seeded(Vec::new()).await;
  let report = Pipeline::new(Arc::clone(&store), PipelineConfig::default())
    .run_all()
    .await;

  assert!(report.all_succeeded());
  assert!(report.runs.iter().all(|r| r.rows == 0));

  let runs = store.recent_runs(10).await.unwrap();
  assert_eq!(runs.len(), 4);
  assert!(runs.iter().all(|r| r.outcome == RunOutcome::Succeeded));
}

#[tokio::test]
async fn duplicate_views_run_once() {
  let store = seeded(meet_facts()).await;
  let report = Pipeline::new(Arc::clone(&store), PipelineConfig::default())
    .run(&[ViewKind::Records, ViewKind::Records, ViewKind::Competitions])
    .await;

  let views: Vec<_> = report.runs.iter().map(|r| r.view).collect();
  assert_eq!(views, [ViewKind::Records, ViewKind::Competitions]);
  assert_eq!(store.recent_runs(10).await.unwrap().len(), 2);
}

// ─── Failure isolation ───────────────────────────────────────────────────────

/// Delegates to SQLite but refuses to write the athlete view.
struct BrokenAthletes {
  inner: SqliteStore,
}

impl FactStore for BrokenAthletes {
  type Error = rack_store_sqlite::Error;

  async fn append_facts(
    &self,
    facts: Vec<NewResultFact>,
  ) -> Result<Vec<ResultFact>, Self::Error> {
    self.inner.append_facts(facts).await
  }

  async fn all_facts(&self) -> Result<Vec<ResultFact>, Self::Error> {
    self.inner.all_facts().await
  }

  async fn count_facts(&self) -> Result<u64, Self::Error> {
    self.inner.count_facts().await
  }
}

impl ViewStore for BrokenAthletes {
  type Error = rack_store_sqlite::Error;

  async fn replace_athletes(&self, _: Vec<AthleteProfile>) -> Result<u64, Self::Error> {
    Err(rack_store_sqlite::Error::DateParse("athlete view offline".into()))
  }

  async fn replace_competitions(
    &self,
    competitions: Vec<CompetitionSummary>,
  ) -> Result<u64, Self::Error> {
    self.inner.replace_competitions(competitions).await
  }

  async fn replace_federations(
    &self,
    federations: Vec<FederationActivity>,
  ) -> Result<u64, Self::Error> {
    self.inner.replace_federations(federations).await
  }

  async fn discard_staged_records(&self, staging: Uuid) -> Result<(), Self::Error> {
    self.inner.discard_staged_records(staging).await
  }

  async fn merge_staged_records(
    &self,
    staging: Uuid,
    lift: LiftType,
    candidates: Vec<RecordCandidate>,
  ) -> Result<u64, Self::Error> {
    self.inner.merge_staged_records(staging, lift, candidates).await
  }

  async fn publish_staged_records(&self, staging: Uuid) -> Result<u64, Self::Error> {
    self.inner.publish_staged_records(staging).await
  }

  async fn record_run(&self, run: BuildRun) -> Result<(), Self::Error> {
    self.inner.record_run(run).await
  }
}

#[tokio::test]
async fn failing_builder_does_not_stop_the_others() {
  let inner = SqliteStore::open_in_memory().await.unwrap();
  inner.append_facts(meet_facts()).await.unwrap();
  let store = Arc::new(BrokenAthletes { inner });

  let report = Pipeline::new(Arc::clone(&store), PipelineConfig::default())
    .run_all()
    .await;

  assert!(!report.all_succeeded());
  let failed: Vec<_> = report.failures().map(|r| r.view).collect();
  assert_eq!(failed, [ViewKind::Athletes]);
  match &report.run(ViewKind::Athletes).unwrap().outcome {
    RunOutcome::Failed { error } => assert!(error.contains("athlete view offline")),
    other => panic!("expected failure, got {other:?}"),
  }

  assert!(store.inner.competition("copa").await.unwrap().is_some());
  assert!(store.inner.record(&aep_raw_93()).await.unwrap().is_some());

  let recorded = store.inner.recent_runs(10).await.unwrap();
  assert_eq!(recorded.len(), 4);
  assert_eq!(recorded.iter().filter(|r| !r.outcome.is_success()).count(), 1);
}
