//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, meet dates are `YYYY-MM-DD`, documents
//! and record entries are compact JSON and UUIDs are hyphenated lowercase.

use chrono::{DateTime, NaiveDate, Utc};
use rack_core::{
  build::{BuildRun, RunOutcome, ViewKind},
  fact::{NewResultFact, ResultFact},
  view::{CategoryKey, CategoryRecord, LiftType},
};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(date: Option<NaiveDate>) -> Option<String> {
  date.map(|d| d.format("%Y-%m-%d").to_string())
}

// ─── JSON documents ──────────────────────────────────────────────────────────

pub fn encode_json<T: Serialize>(value: &T) -> Result<String> {
  Ok(serde_json::to_string(value)?)
}

pub fn decode_json<T: DeserializeOwned>(s: &str) -> Result<T> {
  Ok(serde_json::from_str(s)?)
}

// ─── ViewKind / RunOutcome ───────────────────────────────────────────────────

pub fn decode_view(s: &str) -> Result<ViewKind> {
  s.parse().map_err(|_| Error::UnknownView(s.to_owned()))
}

pub fn encode_outcome(outcome: &RunOutcome) -> (&'static str, Option<String>) {
  match outcome {
    RunOutcome::Succeeded => ("succeeded", None),
    RunOutcome::Failed { error } => ("failed", Some(error.clone())),
  }
}

pub fn decode_outcome(outcome: &str, error: Option<String>) -> RunOutcome {
  match outcome {
    "succeeded" => RunOutcome::Succeeded,
    _ => RunOutcome::Failed {
      error: error.unwrap_or_else(|| format!("unrecorded failure ({outcome})")),
    },
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `facts` row.
pub struct RawFact {
  pub fact_id:     String,
  pub recorded_at: String,
  pub body_json:   String,
}

impl RawFact {
  pub fn into_fact(self) -> Result<ResultFact> {
    let body: NewResultFact = decode_json(&self.body_json)?;
    Ok(body.into_fact(decode_uuid(&self.fact_id)?, decode_dt(&self.recorded_at)?))
  }
}

/// Column values for one `facts` insert.
pub struct FactRow {
  pub fact_id:          String,
  pub recorded_at:      String,
  pub athlete_slug:     String,
  pub competition_slug: String,
  pub competition_date: Option<String>,
  pub body_json:        String,
}

impl FactRow {
  pub fn encode(fact: &ResultFact, body: &NewResultFact) -> Result<Self> {
    Ok(Self {
      fact_id:          encode_uuid(fact.fact_id),
      recorded_at:      encode_dt(fact.recorded_at),
      athlete_slug:     fact.athlete.slug.clone(),
      competition_slug: fact.competition.slug.clone(),
      competition_date: encode_date(fact.competition.date),
      body_json:        encode_json(body)?,
    })
  }
}

/// Raw strings read from either record table.
pub struct RawRecord {
  pub federation_slug: String,
  pub sex:             String,
  pub equipment:       String,
  pub weight_class:    String,
  pub age_class:       String,
  pub federation:      String,
  pub squat:           Option<String>,
  pub bench:           Option<String>,
  pub deadlift:        Option<String>,
  pub total:           Option<String>,
}

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      federation_slug: row.get(0)?,
      sex:             row.get(1)?,
      equipment:       row.get(2)?,
      weight_class:    row.get(3)?,
      age_class:       row.get(4)?,
      federation:      row.get(5)?,
      squat:           row.get(6)?,
      bench:           row.get(7)?,
      deadlift:        row.get(8)?,
      total:           row.get(9)?,
    })
  }

  pub fn encode(record: &CategoryRecord) -> Result<Self> {
    let entry = |lift: LiftType| record.entry(lift).map(encode_json).transpose();
    Ok(Self {
      federation_slug: record.key.federation_slug.clone(),
      sex:             record.key.sex.clone(),
      equipment:       record.key.equipment.clone(),
      weight_class:    record.key.weight_class.clone(),
      age_class:       record.key.age_class.clone(),
      federation:      record.federation.clone(),
      squat:           entry(LiftType::Squat)?,
      bench:           entry(LiftType::Bench)?,
      deadlift:        entry(LiftType::Deadlift)?,
      total:           entry(LiftType::Total)?,
    })
  }

  pub fn into_record(self) -> Result<CategoryRecord> {
    let entry = |e: Option<String>| e.as_deref().map(decode_json).transpose();
    Ok(CategoryRecord {
      key:        CategoryKey {
        federation_slug: self.federation_slug,
        sex:             self.sex,
        equipment:       self.equipment,
        weight_class:    self.weight_class,
        age_class:       self.age_class,
      },
      federation: self.federation,
      squat:      entry(self.squat)?,
      bench:      entry(self.bench)?,
      deadlift:   entry(self.deadlift)?,
      total:      entry(self.total)?,
    })
  }
}

/// Raw strings read directly from a `build_runs` row.
pub struct RawRun {
  pub run_id:      String,
  pub view:        String,
  pub started_at:  String,
  pub finished_at: String,
  pub rows:        i64,
  pub skipped:     i64,
  pub outcome:     String,
  pub error:       Option<String>,
}

impl RawRun {
  pub fn into_run(self) -> Result<BuildRun> {
    Ok(BuildRun {
      run_id:      decode_uuid(&self.run_id)?,
      view:        decode_view(&self.view)?,
      started_at:  decode_dt(&self.started_at)?,
      finished_at: decode_dt(&self.finished_at)?,
      rows:        self.rows.max(0) as u64,
      skipped:     self.skipped.max(0) as u64,
      outcome:     decode_outcome(&self.outcome, self.error),
    })
  }
}
