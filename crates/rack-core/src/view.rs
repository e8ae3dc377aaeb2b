//! Derived views — the read models rebuilt from the fact store.
//!
//! None of these types is ever edited in place by callers. The rollup views
//! are regenerated wholesale; [`CategoryRecord`] is assembled through
//! [`CategoryRecord::merge`], one lift type at a time.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

// ─── Athletes ────────────────────────────────────────────────────────────────

/// Career bests and participation count for one athlete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AthleteStats {
  pub total_competitions: u64,
  pub best_squat:         Option<f64>,
  pub best_bench:         Option<f64>,
  pub best_deadlift:      Option<f64>,
  pub best_total:         Option<f64>,
  pub best_dots:          Option<f64>,
  pub best_wilks:         Option<f64>,
  pub best_glossbrenner:  Option<f64>,
  pub best_goodlift:      Option<f64>,
}

/// One athlete's career, rebuilt from every fact carrying their slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteProfile {
  pub slug:         String,
  /// Display name from the athlete's most recent meet. Not unique.
  pub name:         String,
  pub sex:          Option<String>,
  pub country:      Option<String>,
  pub age:          Option<f64>,
  pub bodyweight:   Option<f64>,
  pub division:     Option<String>,
  pub division_age: Option<String>,
  pub weight_class: Option<String>,
  pub stats:        AthleteStats,
  /// Competition slugs in date order; repeated entries at one meet repeat.
  pub competitions: Vec<String>,
  pub last_active:  Option<NaiveDate>,
}

/// Sortable athlete metrics for top-N scans.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter, EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum AthleteMetric {
  TotalCompetitions,
  BestSquat,
  BestBench,
  BestDeadlift,
  BestTotal,
  BestDots,
  BestWilks,
  BestGlossbrenner,
  BestGoodlift,
}

impl AthleteMetric {
  /// Read this metric from a profile's stats.
  pub fn value(self, stats: &AthleteStats) -> Option<f64> {
    match self {
      Self::TotalCompetitions => Some(stats.total_competitions as f64),
      Self::BestSquat => stats.best_squat,
      Self::BestBench => stats.best_bench,
      Self::BestDeadlift => stats.best_deadlift,
      Self::BestTotal => stats.best_total,
      Self::BestDots => stats.best_dots,
      Self::BestWilks => stats.best_wilks,
      Self::BestGlossbrenner => stats.best_glossbrenner,
      Self::BestGoodlift => stats.best_goodlift,
    }
  }
}

// ─── Competitions ────────────────────────────────────────────────────────────

/// One meet, as first described by its earliest stored fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionSummary {
  pub slug:            String,
  pub name:            String,
  pub date:            Option<NaiveDate>,
  pub country:         Option<String>,
  pub town:            Option<String>,
  pub federation:      Option<String>,
  pub federation_slug: Option<String>,
  /// Number of entries (facts), not distinct athletes.
  pub total_athletes:  u64,
}

// ─── Federations ─────────────────────────────────────────────────────────────

/// `activity_by_year` key for entries whose meet has no usable date.
pub const UNDATED_ACTIVITY: &str = "undated";

/// Year-by-year activity of one federation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederationActivity {
  pub name:             String,
  pub slug:             String,
  /// Earliest dated year; `None` when every entry is undated.
  pub first_year:       Option<i32>,
  pub last_year:        Option<i32>,
  pub total_entries:    u64,
  /// Year (as a string, e.g. `"2023"`, or [`UNDATED_ACTIVITY`]) to entry
  /// count. The counts always sum to `total_entries`.
  pub activity_by_year: BTreeMap<String, u64>,
  pub competitions:     BTreeSet<String>,
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// The four lifts a record can be held in.
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
pub enum LiftType {
  Squat,
  Bench,
  Deadlift,
  Total,
}

/// The partition records are kept in.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CategoryKey {
  pub federation_slug: String,
  pub sex:             String,
  pub equipment:       String,
  pub weight_class:    String,
  pub age_class:       String,
}

/// The best qualifying performance for one lift within one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEntry {
  pub value:       f64,
  pub holder_name: String,
  pub holder_slug: String,
  pub date:        Option<NaiveDate>,
  /// Country the record was set in.
  pub location:    Option<String>,
}

/// A record entry produced by one lift pass, ready to be merged.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordCandidate {
  pub key:        CategoryKey,
  /// Federation display name as written on the holder's fact.
  pub federation: String,
  pub entry:      RecordEntry,
}

/// All-time records for one category; each lift is filled independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
  pub key:        CategoryKey,
  pub federation: String,
  pub squat:      Option<RecordEntry>,
  pub bench:      Option<RecordEntry>,
  pub deadlift:   Option<RecordEntry>,
  pub total:      Option<RecordEntry>,
}

impl CategoryRecord {
  /// An empty record document for `key`.
  pub fn new(key: CategoryKey, federation: impl Into<String>) -> Self {
    Self {
      key,
      federation: federation.into(),
      squat: None,
      bench: None,
      deadlift: None,
      total: None,
    }
  }

  pub fn entry(&self, lift: LiftType) -> Option<&RecordEntry> {
    self.slot(lift).as_ref()
  }

  fn slot(&self, lift: LiftType) -> &Option<RecordEntry> {
    match lift {
      LiftType::Squat => &self.squat,
      LiftType::Bench => &self.bench,
      LiftType::Deadlift => &self.deadlift,
      LiftType::Total => &self.total,
    }
  }

  fn slot_mut(&mut self, lift: LiftType) -> &mut Option<RecordEntry> {
    match lift {
      LiftType::Squat => &mut self.squat,
      LiftType::Bench => &mut self.bench,
      LiftType::Deadlift => &mut self.deadlift,
      LiftType::Total => &mut self.total,
    }
  }

  /// Merge-upsert: set the `lift` entry on `existing`, or on a fresh document
  /// when there is none. Entries for other lifts are left untouched.
  ///
  /// Federation spellings can differ between holders of the same federation
  /// slug; the lexically smallest one is kept so the outcome does not depend
  /// on which lift was merged first.
  pub fn merge(
    existing: Option<Self>,
    lift: LiftType,
    candidate: RecordCandidate,
  ) -> Self {
    let RecordCandidate { key, federation, entry } = candidate;
    let mut record = match existing {
      Some(mut record) => {
        if federation < record.federation {
          record.federation = federation;
        }
        record
      }
      None => Self::new(key, federation),
    };
    *record.slot_mut(lift) = Some(entry);
    record
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  fn key() -> CategoryKey {
    CategoryKey {
      federation_slug: "aep".into(),
      sex:             "M".into(),
      equipment:       "Raw".into(),
      weight_class:    "93".into(),
      age_class:       "24-34".into(),
    }
  }

  fn candidate(federation: &str, holder: &str, value: f64) -> RecordCandidate {
    RecordCandidate {
      key:        key(),
      federation: federation.into(),
      entry:      RecordEntry {
        value,
        holder_name: holder.into(),
        holder_slug: holder.to_lowercase(),
        date: None,
        location: None,
      },
    }
  }

  #[test]
  fn merge_creates_missing_document() {
    let record =
      CategoryRecord::merge(None, LiftType::Bench, candidate("AEP", "Ana", 120.0));
    assert_eq!(record.key, key());
    assert_eq!(record.entry(LiftType::Bench).unwrap().value, 120.0);
    assert!(record.squat.is_none());
    assert!(record.deadlift.is_none());
    assert!(record.total.is_none());
  }

  #[test]
  fn merge_keeps_other_lifts() {
    let record =
      CategoryRecord::merge(None, LiftType::Squat, candidate("AEP", "Ana", 200.0));
    let record = CategoryRecord::merge(
      Some(record),
      LiftType::Total,
      candidate("AEP", "Bea", 550.0),
    );
    assert_eq!(record.squat.as_ref().unwrap().holder_name, "Ana");
    assert_eq!(record.total.as_ref().unwrap().holder_name, "Bea");
  }

  #[test]
  fn merge_is_order_independent() {
    let passes = [
      (LiftType::Squat, candidate("Aep", "Ana", 200.0)),
      (LiftType::Bench, candidate("AEP", "Bea", 130.0)),
      (LiftType::Deadlift, candidate("AEP", "Cris", 240.0)),
      (LiftType::Total, candidate("aep", "Ana", 560.0)),
    ];

    let forward = passes
      .iter()
      .cloned()
      .fold(None, |acc, (lift, c)| Some(CategoryRecord::merge(acc, lift, c)));
    let backward = passes
      .iter()
      .rev()
      .cloned()
      .fold(None, |acc, (lift, c)| Some(CategoryRecord::merge(acc, lift, c)));

    assert_eq!(forward, backward);
    assert_eq!(forward.unwrap().federation, "AEP");
  }

  #[test]
  fn lift_names_round_trip_through_strum() {
    let names: Vec<String> = LiftType::iter().map(|l| l.to_string()).collect();
    assert_eq!(names, ["squat", "bench", "deadlift", "total"]);
    assert_eq!("deadlift".parse::<LiftType>().unwrap(), LiftType::Deadlift);
  }

  #[test]
  fn metric_reads_stats() {
    let stats = AthleteStats {
      total_competitions: 4,
      best_dots: Some(410.5),
      ..AthleteStats::default()
    };
    assert_eq!(AthleteMetric::TotalCompetitions.value(&stats), Some(4.0));
    assert_eq!(AthleteMetric::BestDots.value(&stats), Some(410.5));
    assert_eq!(AthleteMetric::BestWilks.value(&stats), None);
    assert_eq!("best_dots".parse::<AthleteMetric>().unwrap(), AthleteMetric::BestDots);
  }
}
