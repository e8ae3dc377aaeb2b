//! Result facts — the fundamental unit of the RackAI results store.
//!
//! A fact is one athlete's performance at one meet. Facts are immutable and
//! append-only; every derived view is recomputed from them.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  slug::federation_slug,
  view::{CategoryKey, LiftType},
};

// ─── Dates ───────────────────────────────────────────────────────────────────

/// Sort position of an undated fact: before every real date.
pub const UNDATED: NaiveDate = NaiveDate::MIN;

/// Accepts `YYYY-MM-DD`, an RFC 3339 timestamp, or anything else. Anything
/// that does not parse becomes `None` rather than failing the whole fact.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw: Option<String> = Option::deserialize(deserializer)?;
  Ok(raw.as_deref().and_then(parse_date))
}

/// Parse a meet date, returning `None` for anything unrecognised.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
  let raw = raw.trim();
  NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
    DateTime::parse_from_rfc3339(raw)
      .ok()
      .map(|dt| dt.date_naive())
  })
}

/// Treat blank strings the same as absent ones.
pub fn present(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// ─── Placement ───────────────────────────────────────────────────────────────

/// Where the athlete finished, using the OpenPowerlifting place markers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Placement {
  Ranked(u32),
  /// `G` — competed as a guest, not eligible for placing.
  Guest,
  /// `DQ` — disqualified. Also the placement of facts whose source omitted
  /// the column.
  #[default]
  Disqualified,
  /// `DD` — disqualified for doping.
  DopingDisqualified,
  /// `NS` — registered but did not show.
  NoShow,
  /// Any marker not listed above, kept verbatim.
  Other(String),
}

impl Placement {
  pub fn is_disqualified(&self) -> bool {
    matches!(self, Self::Disqualified | Self::DopingDisqualified)
  }

  /// Whether the lifts attached to this placement may stand as records.
  pub fn qualifies_for_record(&self) -> bool {
    !self.is_disqualified() && !matches!(self, Self::NoShow)
  }
}

impl From<String> for Placement {
  fn from(raw: String) -> Self {
    let trimmed = raw.trim();
    match trimmed.to_ascii_uppercase().as_str() {
      "" | "DQ" => Self::Disqualified,
      "DD" => Self::DopingDisqualified,
      "G" => Self::Guest,
      "NS" => Self::NoShow,
      other => match other.parse() {
        Ok(n) => Self::Ranked(n),
        Err(_) => Self::Other(trimmed.to_owned()),
      },
    }
  }
}

impl From<Placement> for String {
  fn from(place: Placement) -> Self { place.to_string() }
}

impl fmt::Display for Placement {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Ranked(n) => write!(f, "{n}"),
      Self::Guest => f.write_str("G"),
      Self::Disqualified => f.write_str("DQ"),
      Self::DopingDisqualified => f.write_str("DD"),
      Self::NoShow => f.write_str("NS"),
      Self::Other(raw) => f.write_str(raw),
    }
  }
}

// ─── Fact sections ───────────────────────────────────────────────────────────

/// Who lifted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteIdentity {
  pub slug:       String,
  pub name:       String,
  #[serde(default)]
  pub sex:        Option<String>,
  #[serde(default)]
  pub country:    Option<String>,
  #[serde(default)]
  pub age:        Option<f64>,
  #[serde(default)]
  pub bodyweight: Option<f64>,
}

/// The meet the performance belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionIdentity {
  pub slug:       String,
  pub name:       String,
  #[serde(default, deserialize_with = "lenient_date")]
  pub date:       Option<NaiveDate>,
  #[serde(default)]
  pub country:    Option<String>,
  #[serde(default)]
  pub town:       Option<String>,
  #[serde(default)]
  pub federation: Option<String>,
}

/// The bracket the athlete competed in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
  #[serde(default)]
  pub division:     Option<String>,
  #[serde(default)]
  pub age_class:    Option<String>,
  #[serde(default)]
  pub weight_class: Option<String>,
  #[serde(default)]
  pub equipment:    Option<String>,
  /// Event type, e.g. `SBD` for full power or `B` for bench-only.
  #[serde(default)]
  pub event:        Option<String>,
  #[serde(default)]
  pub tested:       bool,
}

/// Best successful attempts, in kilograms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Performance {
  #[serde(default)]
  pub squat:    Option<f64>,
  #[serde(default)]
  pub bench:    Option<f64>,
  #[serde(default)]
  pub deadlift: Option<f64>,
  #[serde(default)]
  pub total:    Option<f64>,
  #[serde(default)]
  pub place:    Placement,
}

/// Bodyweight-adjusted scores computed upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Points {
  #[serde(default)]
  pub dots:         Option<f64>,
  #[serde(default)]
  pub wilks:        Option<f64>,
  #[serde(default)]
  pub glossbrenner: Option<f64>,
  #[serde(default)]
  pub goodlift:     Option<f64>,
}

// ─── ResultFact ──────────────────────────────────────────────────────────────

/// An immutable athlete-performance-in-meet record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultFact {
  pub fact_id:     Uuid,
  /// Server-assigned timestamp; never changes after creation.
  pub recorded_at: DateTime<Utc>,
  pub athlete:     AthleteIdentity,
  pub competition: CompetitionIdentity,
  #[serde(default)]
  pub category:    Category,
  #[serde(default)]
  pub results:     Performance,
  #[serde(default)]
  pub points:      Points,
}

impl ResultFact {
  /// The value of `lift` in this performance, if any.
  pub fn lift(&self, lift: LiftType) -> Option<f64> {
    match lift {
      LiftType::Squat => self.results.squat,
      LiftType::Bench => self.results.bench,
      LiftType::Deadlift => self.results.deadlift,
      LiftType::Total => self.results.total,
    }
  }

  /// The competition date, with undated facts sorting before everything.
  pub fn sort_date(&self) -> NaiveDate {
    self.competition.date.unwrap_or(UNDATED)
  }

  /// The record category this fact competes in, or `None` when any of the
  /// key fields is missing.
  pub fn category_key(&self) -> Option<CategoryKey> {
    Some(CategoryKey {
      federation_slug: federation_slug(present(&self.competition.federation)?),
      sex:             present(&self.athlete.sex)?.to_owned(),
      equipment:       present(&self.category.equipment)?.to_owned(),
      weight_class:    present(&self.category.weight_class)?.to_owned(),
      age_class:       present(&self.category.age_class)?.to_owned(),
    })
  }
}

// ─── NewResultFact ───────────────────────────────────────────────────────────

/// Input to [`crate::store::FactStore::append_facts`].
/// `fact_id` and `recorded_at` are always set by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewResultFact {
  pub athlete:     AthleteIdentity,
  pub competition: CompetitionIdentity,
  #[serde(default)]
  pub category:    Category,
  #[serde(default)]
  pub results:     Performance,
  #[serde(default)]
  pub points:      Points,
}

impl NewResultFact {
  /// Reject facts without identity; every view is keyed on these slugs.
  pub fn validate(&self) -> Result<()> {
    if self.athlete.slug.trim().is_empty() {
      return Err(Error::MissingAthleteSlug(self.athlete.name.clone()));
    }
    if self.competition.slug.trim().is_empty() {
      return Err(Error::MissingCompetitionSlug(self.competition.name.clone()));
    }
    Ok(())
  }

  /// Stamp the store-assigned fields onto the fact.
  pub fn into_fact(self, fact_id: Uuid, recorded_at: DateTime<Utc>) -> ResultFact {
    ResultFact {
      fact_id,
      recorded_at,
      athlete: self.athlete,
      competition: self.competition,
      category: self.category,
      results: self.results,
      points: self.points,
    }
  }
}
