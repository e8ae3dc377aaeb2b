//! Competition rollup — one summary per meet.

use std::sync::Arc;

use rack_core::{
  fact::{ResultFact, present},
  slug::federation_slug,
  store::{FactStore, ViewStore},
  view::CompetitionSummary,
};
use tracing::info;

use crate::{
  Error, Result,
  group::{Derived, group_by},
  pipeline::BuildOutput,
};

/// Derive every competition summary from `facts`, sorted by slug.
///
/// Descriptive fields come from the first stored fact of each meet. Facts of
/// one meet are expected to agree; when they do not, the first one wins.
pub fn build_competitions(facts: &[ResultFact]) -> Derived<CompetitionSummary> {
  let mut items: Vec<CompetitionSummary> = group_by(facts, |f| f.competition.slug.clone())
    .into_iter()
    .map(|(slug, group)| {
      let first = &group[0].competition;
      CompetitionSummary {
        slug,
        name: first.name.clone(),
        date: first.date,
        country: first.country.clone(),
        town: first.town.clone(),
        federation: first.federation.clone(),
        federation_slug: present(&first.federation).map(federation_slug),
        total_athletes: group.len() as u64,
      }
    })
    .collect();
  items.sort_by(|a, b| a.slug.cmp(&b.slug));
  Derived { items, skipped: 0 }
}

/// Rebuilds the competition view from the full fact store.
pub struct CompetitionRollup<S> {
  store: Arc<S>,
}

impl<S> CompetitionRollup<S>
where
  S: FactStore + ViewStore,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub async fn run(&self) -> Result<BuildOutput> {
    let facts = self.store.all_facts().await.map_err(Error::store)?;
    let derived = build_competitions(&facts);
    let skipped = derived.skipped;
    let rows = self
      .store
      .replace_competitions(derived.items)
      .await
      .map_err(Error::store)?;
    info!(facts = facts.len(), rows, "competition summaries rebuilt");
    Ok(BuildOutput { rows, skipped })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fixture::{FactExt, fact, stored};

  #[test]
  fn counts_entries_and_keeps_first_seen_fields() {
    let mut second = fact("Bea Gil", "Copa", "2023-02-01");
    second.competition.town = Some("Sevilla".into());
    let facts = vec![
      stored(fact("Ana Ruiz", "Copa", "2023-02-01")),
      stored(second),
      stored(fact("Ana Ruiz", "Copa", "2023-02-01")),
      stored(fact("Cris Sanz", "Liga", "2023-03-01").with_federation(Some("WRPF Spain"))),
    ];

    let comps = build_competitions(&facts).items;
    assert_eq!(comps.len(), 2);

    let copa = &comps[0];
    assert_eq!(copa.slug, "copa");
    assert_eq!(copa.total_athletes, 3);
    assert_eq!(copa.town.as_deref(), Some("Madrid"));
    assert_eq!(copa.federation_slug.as_deref(), Some("aep"));

    let liga = &comps[1];
    assert_eq!(liga.federation.as_deref(), Some("WRPF Spain"));
    assert_eq!(liga.federation_slug.as_deref(), Some("wrpf spain"));
  }

  #[test]
  fn missing_federation_has_no_slug() {
    let facts = vec![stored(fact("Ana Ruiz", "Copa", "2023-02-01").with_federation(None))];
    let comps = build_competitions(&facts).items;
    assert_eq!(comps[0].federation_slug, None);
  }
}
