//! Federation rollup — yearly activity per federation.
//!
//! Two-stage grouping: facts are first bucketed by (federation, year), then
//! the buckets of each federation are folded into one [`FederationActivity`].
//! Facts without a usable date share one undated bucket per federation, so
//! every entry a competition counts is also counted here.

use std::{collections::BTreeSet, sync::Arc};

use chrono::Datelike;
use rack_core::{
  fact::{ResultFact, present},
  slug::federation_slug,
  store::{FactStore, ViewStore},
  view::{FederationActivity, UNDATED_ACTIVITY},
};
use tracing::{debug, info};

use crate::{
  Error, Result,
  group::{Derived, group_by, union_all},
  pipeline::BuildOutput,
};

/// Stage-one output: one federation's activity in one year.
#[derive(Debug, Clone)]
struct YearBucket {
  slug:         String,
  name:         String,
  year:         Option<i32>,
  entries:      u64,
  competitions: BTreeSet<String>,
}

impl YearBucket {
  fn key(&self) -> String {
    self
      .year
      .map_or_else(|| UNDATED_ACTIVITY.to_owned(), |y| y.to_string())
  }
}

/// A fact reduced to the fields this rollup needs. Facts without a
/// federation cannot be placed in a bucket.
struct Placed<'a> {
  slug: String,
  name: &'a str,
  year: Option<i32>,
  fact: &'a ResultFact,
}

fn place(fact: &ResultFact) -> Option<Placed<'_>> {
  let name = present(&fact.competition.federation)?;
  let year = fact.competition.date.map(|d| d.year());
  Some(Placed { slug: federation_slug(name), name, year, fact })
}

fn year_buckets(placed: &[Placed<'_>]) -> Vec<YearBucket> {
  group_by(placed, |p| (p.slug.clone(), p.year))
    .into_iter()
    .map(|((slug, year), group)| YearBucket {
      slug,
      name: group[0].name.to_owned(),
      year,
      entries: group.len() as u64,
      competitions: group
        .iter()
        .map(|p| p.fact.competition.slug.clone())
        .collect(),
    })
    .collect()
}

fn fold_buckets(slug: String, buckets: &[&YearBucket]) -> FederationActivity {
  let years = buckets.iter().filter_map(|b| b.year);
  FederationActivity {
    // Buckets are in first-seen order, so this is the spelling of the
    // federation's first stored fact.
    name: buckets[0].name.clone(),
    slug,
    first_year: years.clone().min(),
    last_year: years.max(),
    total_entries: buckets.iter().map(|b| b.entries).sum(),
    activity_by_year: buckets
      .iter()
      .map(|b| (b.key(), b.entries))
      .collect(),
    competitions: union_all(buckets.iter().map(|b| b.competitions.clone())),
  }
}

/// Derive every federation's activity from `facts`, sorted by slug.
///
/// Federations are keyed by their lower-cased name, so spellings that differ
/// only in case are one federation. Undated facts count toward
/// `total_entries` and `competitions` under the [`UNDATED_ACTIVITY`] key but
/// never set `first_year` or `last_year`. Facts without a federation are
/// skipped.
pub fn build_federations(facts: &[ResultFact]) -> Derived<FederationActivity> {
  let placed: Vec<Placed<'_>> = facts.iter().filter_map(place).collect();
  let skipped = (facts.len() - placed.len()) as u64;
  if skipped > 0 {
    debug!(skipped, "facts without federation left out of federation rollup");
  }

  let buckets = year_buckets(&placed);
  let mut items: Vec<FederationActivity> = group_by(&buckets, |b| b.slug.clone())
    .into_iter()
    .map(|(slug, group)| fold_buckets(slug, &group))
    .collect();
  items.sort_by(|a, b| a.slug.cmp(&b.slug));
  Derived { items, skipped }
}

/// Rebuilds the federation view from the full fact store.
pub struct FederationRollup<S> {
  store: Arc<S>,
}

impl<S> FederationRollup<S>
where
  S: FactStore + ViewStore,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub async fn run(&self) -> Result<BuildOutput> {
    let facts = self.store.all_facts().await.map_err(Error::store)?;
    let derived = build_federations(&facts);
    let skipped = derived.skipped;
    let rows = self
      .store
      .replace_federations(derived.items)
      .await
      .map_err(Error::store)?;
    info!(facts = facts.len(), rows, skipped, "federation activity rebuilt");
    Ok(BuildOutput { rows, skipped })
  }
}
