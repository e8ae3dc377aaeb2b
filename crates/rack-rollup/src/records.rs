//! Record engine — all-time best performance per lift per category.
//!
//! Each lift is derived on its own and merged into the shared record view,
//! touching only that lift's entry. A full rebuild merges all four lifts into
//! its own staging area and then publishes it in one swap.

use std::{cmp::Ordering, sync::Arc};

use rack_core::{
  fact::{ResultFact, present},
  store::{FactStore, ViewStore},
  view::{CategoryKey, LiftType, RecordCandidate, RecordEntry},
};
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  group::{Derived, group_by},
  pipeline::BuildOutput,
};

/// A fact that may hold the `lift` record in its category.
struct Contender<'a> {
  value: f64,
  key:   CategoryKey,
  fact:  &'a ResultFact,
}

/// Best first. Equal values go to the earlier meet (undated counts as
/// earliest), then to the lexically smaller athlete slug; anything still tied
/// keeps store order because the sort is stable.
fn rank(a: &Contender<'_>, b: &Contender<'_>) -> Ordering {
  b.value
    .total_cmp(&a.value)
    .then_with(|| a.fact.sort_date().cmp(&b.fact.sort_date()))
    .then_with(|| a.fact.athlete.slug.cmp(&b.fact.athlete.slug))
}

fn entry(contender: &Contender<'_>) -> RecordCandidate {
  let fact = contender.fact;
  RecordCandidate {
    key:        contender.key.clone(),
    federation: present(&fact.competition.federation)
      .unwrap_or(&contender.key.federation_slug)
      .to_owned(),
    entry:      RecordEntry {
      value:       contender.value,
      holder_name: fact.athlete.name.clone(),
      holder_slug: fact.athlete.slug.clone(),
      date:        fact.competition.date,
      location:    fact.competition.country.clone(),
    },
  }
}

/// A bombed-out or disqualified entry holds no record in any lift, even for
/// the lifts it completed.
fn qualifies(fact: &ResultFact) -> bool {
  fact.results.place.qualifies_for_record()
    && fact.lift(LiftType::Total).is_some_and(|t| t > 0.0)
}

/// Derive the `lift` record holder of every category, sorted by key.
///
/// Only facts with a positive value for `lift`, a positive total, a placement
/// that counts for records and a complete category key take part. `skipped`
/// counts facts that had a qualifying value but an incomplete category key.
pub fn derive_lift(facts: &[ResultFact], lift: LiftType) -> Derived<RecordCandidate> {
  let mut skipped = 0;
  let mut contenders: Vec<Contender<'_>> = Vec::new();

  for fact in facts {
    let Some(value) = fact.lift(lift).filter(|v| *v > 0.0) else {
      continue;
    };
    if !qualifies(fact) {
      continue;
    }
    match fact.category_key() {
      Some(key) => contenders.push(Contender { value, key, fact }),
      None => skipped += 1,
    }
  }

  contenders.sort_by(rank);

  let mut items: Vec<RecordCandidate> = group_by(&contenders, |c| c.key.clone())
    .into_iter()
    .map(|(_, group)| entry(group[0]))
    .collect();
  items.sort_by(|a, b| a.key.cmp(&b.key));
  Derived { items, skipped }
}

/// Rebuilds the record view from the full fact store.
pub struct RecordEngine<S> {
  store: Arc<S>,
}

impl<S> RecordEngine<S>
where
  S: FactStore + ViewStore,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Full rebuild over all four lifts.
  pub async fn run(&self) -> Result<BuildOutput> {
    let lifts: Vec<LiftType> = LiftType::iter().collect();
    self.run_passes(&lifts).await
  }

  /// Full rebuild merging the given lift passes in the given order. Any order
  /// of the same lifts publishes the same view.
  ///
  /// The passes stage under a fresh id, so a rebuild overlapping this one
  /// can neither clear nor publish what this one staged.
  pub async fn run_passes(&self, lifts: &[LiftType]) -> Result<BuildOutput> {
    let facts = self.store.all_facts().await.map_err(Error::store)?;
    let staging = Uuid::new_v4();

    let result = self.stage_and_publish(staging, &facts, lifts).await;
    if let Err(e) = &result {
      warn!(%staging, error = %e, "record rebuild failed; discarding staged rows");
      if let Err(e) = self.store.discard_staged_records(staging).await {
        warn!(%staging, error = %e, "could not discard staged records");
      }
    }
    let output = result?;

    info!(facts = facts.len(), rows = output.rows, "category records rebuilt");
    Ok(output)
  }

  async fn stage_and_publish(
    &self,
    staging: Uuid,
    facts: &[ResultFact],
    lifts: &[LiftType],
  ) -> Result<BuildOutput> {
    let mut skipped = 0;
    for &lift in lifts {
      skipped = skipped.max(self.merge_lift(staging, facts, lift).await?);
    }
    let rows = self
      .store
      .publish_staged_records(staging)
      .await
      .map_err(Error::store)?;
    Ok(BuildOutput { rows, skipped })
  }

  /// Derive one lift and merge it into the `staging` area. Returns the
  /// number of facts skipped for an incomplete category key.
  pub async fn merge_lift(
    &self,
    staging: Uuid,
    facts: &[ResultFact],
    lift: LiftType,
  ) -> Result<u64> {
    let derived = derive_lift(facts, lift);
    let holders = derived.items.len();
    let touched = self
      .store
      .merge_staged_records(staging, lift, derived.items)
      .await
      .map_err(Error::store)?;
    debug!(%lift, holders, touched, skipped = derived.skipped, "record pass merged");
    Ok(derived.skipped)
  }
}
