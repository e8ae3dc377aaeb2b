//! Athlete rollup — one career profile per athlete slug.

use std::sync::Arc;

use rack_core::{
  fact::ResultFact,
  store::{FactStore, ViewStore},
  view::{AthleteProfile, AthleteStats},
};
use tracing::info;

use crate::{
  Error, Result,
  group::{Derived, by_date, group_by, max_present},
  pipeline::BuildOutput,
};

/// Derive every athlete profile from `facts`.
///
/// Facts are walked in date order. Mutable attributes come from the athlete's
/// last fact in that order; metrics are the maximum over every fact that has
/// a value. Output is sorted by slug.
pub fn build_profiles(facts: &[ResultFact]) -> Derived<AthleteProfile> {
  let ordered = by_date(facts);
  let mut items: Vec<AthleteProfile> = group_by(ordered, |f| f.athlete.slug.clone())
    .into_iter()
    .filter_map(|(slug, group)| profile(slug, &group))
    .collect();
  items.sort_by(|a, b| a.slug.cmp(&b.slug));
  Derived { items, skipped: 0 }
}

fn profile(slug: String, group: &[&ResultFact]) -> Option<AthleteProfile> {
  let latest = group.last()?;
  let best = |metric: fn(&ResultFact) -> Option<f64>| {
    max_present(group.iter().map(|f| metric(f)))
  };

  Some(AthleteProfile {
    slug,
    name: latest.athlete.name.clone(),
    sex: latest.athlete.sex.clone(),
    country: latest.athlete.country.clone(),
    age: latest.athlete.age,
    bodyweight: latest.athlete.bodyweight,
    division: latest.category.division.clone(),
    division_age: latest.category.age_class.clone(),
    weight_class: latest.category.weight_class.clone(),
    stats: AthleteStats {
      total_competitions: group.len() as u64,
      best_squat:         best(|f| f.results.squat),
      best_bench:         best(|f| f.results.bench),
      best_deadlift:      best(|f| f.results.deadlift),
      best_total:         best(|f| f.results.total),
      best_dots:          best(|f| f.points.dots),
      best_wilks:         best(|f| f.points.wilks),
      best_glossbrenner:  best(|f| f.points.glossbrenner),
      best_goodlift:      best(|f| f.points.goodlift),
    },
    competitions: group.iter().map(|f| f.competition.slug.clone()).collect(),
    last_active: latest.competition.date,
  })
}

/// Rebuilds the athlete view from the full fact store.
pub struct AthleteRollup<S> {
  store: Arc<S>,
}

impl<S> AthleteRollup<S>
where
  S: FactStore + ViewStore,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub async fn run(&self) -> Result<BuildOutput> {
    let facts = self.store.all_facts().await.map_err(Error::store)?;
    let derived = build_profiles(&facts);
    let skipped = derived.skipped;
    let rows = self
      .store
      .replace_athletes(derived.items)
      .await
      .map_err(Error::store)?;
    info!(facts = facts.len(), rows, "athlete profiles rebuilt");
    Ok(BuildOutput { rows, skipped })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fixture::{FactExt, fact, stored};

  #[test]
  fn one_profile_per_slug_with_fact_count() {
    let facts: Vec<_> = [
      fact("Ana Ruiz", "Meet A", "2021-01-01"),
      fact("Bea Gil", "Meet A", "2021-01-01"),
      fact("Ana Ruiz", "Meet B", "2022-01-01"),
      fact("Ana Ruiz", "Meet B", "2022-01-01"),
    ]
    .into_iter()
    .map(stored)
    .collect();

    let profiles = build_profiles(&facts).items;
    assert_eq!(profiles.len(), 2);
    let ana = &profiles[0];
    assert_eq!(ana.slug, "ana-ruiz");
    assert_eq!(ana.stats.total_competitions, 3);
    assert_eq!(ana.competitions, ["meet-a", "meet-b", "meet-b"]);
  }

  #[test]
  fn latest_fact_supplies_mutable_attributes() {
    let mut newer = fact("Ana Ruiz", "Meet B", "2023-06-01");
    newer.athlete.bodyweight = Some(84.0);
    newer.athlete.country = None;
    newer.category.weight_class = Some("83".into());
    let mut older = fact("Ana Ruiz", "Meet A", "2020-01-01");
    older.athlete.bodyweight = Some(95.0);

    // Newer fact stored first; date order must still win.
    let facts = vec![stored(newer), stored(older)];
    let ana = &build_profiles(&facts).items[0];

    assert_eq!(ana.bodyweight, Some(84.0));
    assert_eq!(ana.country, None);
    assert_eq!(ana.weight_class.as_deref(), Some("83"));
    assert_eq!(ana.competitions, ["meet-a", "meet-b"]);
    assert_eq!(ana.last_active, chrono::NaiveDate::from_ymd_opt(2023, 6, 1));
  }

  #[test]
  fn undated_facts_sort_first() {
    let facts = vec![
      stored(fact("Ana Ruiz", "Meet B", "2022-01-01")),
      stored(fact("Ana Ruiz", "Meet X", "garbage")),
    ];
    let ana = &build_profiles(&facts).items[0];
    assert_eq!(ana.competitions, ["meet-x", "meet-b"]);
    assert_eq!(ana.last_active, chrono::NaiveDate::from_ymd_opt(2022, 1, 1));
  }

  #[test]
  fn metrics_are_maxima_excluding_missing_values() {
    let mut a = fact("Ana Ruiz", "Meet A", "2021-01-01").with_total(Some(500.0));
    a.results.squat = None;
    a.points.dots = None;
    let mut b = fact("Ana Ruiz", "Meet B", "2022-01-01").with_total(None);
    b.results.squat = None;
    b.points.dots = Some(410.0);

    let ana = &build_profiles(&[stored(a), stored(b)]).items[0];
    assert_eq!(ana.stats.best_total, Some(500.0));
    assert_eq!(ana.stats.best_squat, None);
    assert_eq!(ana.stats.best_dots, Some(410.0));
  }
}
