//! [`SqliteStore`] — the SQLite implementation of the fact and view traits.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use rack_core::{
  build::BuildRun,
  fact::{NewResultFact, ResultFact},
  store::{FactStore, ViewQuery, ViewStore},
  view::{
    AthleteMetric, AthleteProfile, CategoryKey, CategoryRecord,
    CompetitionSummary, FederationActivity, LiftType, RecordCandidate,
  },
};

use crate::{
  Error, Result,
  encode::{
    FactRow, RawFact, RawRecord, RawRun, decode_json, encode_date, encode_dt,
    encode_json, encode_outcome, encode_uuid,
  },
  schema::{RECORD_COLUMNS, SCHEMA},
};

/// Wrap a crate error so it can leave a `tokio_rusqlite` closure.
fn call_error(e: Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
fn like_contains(needle: &str) -> String {
  let mut pattern = String::with_capacity(needle.len() + 2);
  pattern.push('%');
  for c in needle.chars() {
    if matches!(c, '%' | '_' | '\\') {
      pattern.push('\\');
    }
    pattern.push(c);
  }
  pattern.push('%');
  pattern
}

/// The metrics stored as their own `athlete_profiles` columns, in DDL order.
/// `total_competitions` is an integer column and is written separately.
const METRIC_COLUMNS: [AthleteMetric; 8] = [
  AthleteMetric::BestSquat,
  AthleteMetric::BestBench,
  AthleteMetric::BestDeadlift,
  AthleteMetric::BestTotal,
  AthleteMetric::BestDots,
  AthleteMetric::BestWilks,
  AthleteMetric::BestGlossbrenner,
  AthleteMetric::BestGoodlift,
];

fn metric_column(metric: AthleteMetric) -> &'static str {
  match metric {
    AthleteMetric::TotalCompetitions => "total_competitions",
    AthleteMetric::BestSquat => "best_squat",
    AthleteMetric::BestBench => "best_bench",
    AthleteMetric::BestDeadlift => "best_deadlift",
    AthleteMetric::BestTotal => "best_total",
    AthleteMetric::BestDots => "best_dots",
    AthleteMetric::BestWilks => "best_wilks",
    AthleteMetric::BestGlossbrenner => "best_glossbrenner",
    AthleteMetric::BestGoodlift => "best_goodlift",
  }
}

/// Run a `SELECT body_json ...` statement and collect the column.
fn query_bodies<P: rusqlite::Params>(
  conn: &rusqlite::Connection,
  sql: &str,
  params: P,
) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt
    .query_map(params, |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;
  Ok(rows)
}

fn decode_bodies<T: serde::de::DeserializeOwned>(bodies: Vec<String>) -> Result<Vec<T>> {
  bodies.iter().map(|b| decode_json(b)).collect()
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A RackAI store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Replace every row of `table` with `rows` inside one transaction.
  ///
  /// `insert` is the parameterised INSERT for a single row; `bind` turns one
  /// row into its parameters.
  async fn replace_table<R, F>(
    &self,
    table: &'static str,
    insert: &'static str,
    rows: Vec<R>,
    bind: F,
  ) -> Result<u64>
  where
    R: Send + 'static,
    F: Fn(&mut rusqlite::Statement<'_>, &R) -> rusqlite::Result<usize> + Send + 'static,
  {
    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(&format!("DELETE FROM {table}"), [])?;
        {
          let mut stmt = tx.prepare(insert)?;
          for row in &rows {
            bind(&mut stmt, row)?;
          }
        }
        tx.commit()?;
        Ok(rows.len() as u64)
      })
      .await?;
    Ok(written)
  }
}

// ─── FactStore impl ──────────────────────────────────────────────────────────

impl FactStore for SqliteStore {
  type Error = Error;

  async fn append_facts(&self, facts: Vec<NewResultFact>) -> Result<Vec<ResultFact>> {
    let recorded_at = Utc::now();
    let mut stored = Vec::with_capacity(facts.len());
    let mut rows = Vec::with_capacity(facts.len());

    for input in facts {
      input.validate()?;
      let fact = input.clone().into_fact(Uuid::new_v4(), recorded_at);
      rows.push(FactRow::encode(&fact, &input)?);
      stored.push(fact);
    }

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO facts (
               fact_id, recorded_at, athlete_slug, competition_slug,
               competition_date, body_json
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          )?;
          for row in &rows {
            stmt.execute(rusqlite::params![
              row.fact_id,
              row.recorded_at,
              row.athlete_slug,
              row.competition_slug,
              row.competition_date,
              row.body_json,
            ])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(stored)
  }

  async fn all_facts(&self) -> Result<Vec<ResultFact>> {
    let raws: Vec<RawFact> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare("SELECT fact_id, recorded_at, body_json FROM facts ORDER BY seq")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawFact {
              fact_id:     row.get(0)?,
              recorded_at: row.get(1)?,
              body_json:   row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFact::into_fact).collect()
  }

  async fn count_facts(&self) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM facts", [], |r| r.get(0))?))
      .await?;
    Ok(count.max(0) as u64)
  }
}

// ─── ViewStore impl ──────────────────────────────────────────────────────────

/// Column values for one `athlete_profiles` insert.
struct AthleteRow {
  slug:               String,
  name:               String,
  name_folded:        String,
  total_competitions: i64,
  metrics:            [Option<f64>; 8],
  body_json:          String,
}

impl ViewStore for SqliteStore {
  type Error = Error;

  async fn replace_athletes(&self, profiles: Vec<AthleteProfile>) -> Result<u64> {
    let rows = profiles
      .iter()
      .map(|p| {
        Ok(AthleteRow {
          slug:               p.slug.clone(),
          name:               p.name.clone(),
          name_folded:        p.name.to_lowercase(),
          total_competitions: p.stats.total_competitions as i64,
          metrics:            METRIC_COLUMNS.map(|m| m.value(&p.stats)),
          body_json:          encode_json(p)?,
        })
      })
      .collect::<Result<Vec<_>>>()?;

    self
      .replace_table(
        "athlete_profiles",
        "INSERT INTO athlete_profiles (
           slug, name, name_folded, total_competitions,
           best_squat, best_bench, best_deadlift, best_total,
           best_dots, best_wilks, best_glossbrenner, best_goodlift,
           body_json
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        rows,
        |stmt, r| {
          let [sq, bp, dl, tot, dots, wilks, gloss, gl] = r.metrics;
          stmt.execute(rusqlite::params![
            r.slug,
            r.name,
            r.name_folded,
            r.total_competitions,
            sq,
            bp,
            dl,
            tot,
            dots,
            wilks,
            gloss,
            gl,
            r.body_json,
          ])
        },
      )
      .await
  }

  async fn replace_competitions(
    &self,
    competitions: Vec<CompetitionSummary>,
  ) -> Result<u64> {
    let rows = competitions
      .iter()
      .map(|c| {
        Ok((
          c.slug.clone(),
          c.name.clone(),
          encode_date(c.date),
          c.federation_slug.clone(),
          encode_json(c)?,
        ))
      })
      .collect::<Result<Vec<_>>>()?;

    self
      .replace_table(
        "competitions",
        "INSERT INTO competitions (slug, name, date, federation_slug, body_json)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rows,
        |stmt, (slug, name, date, fed, body)| {
          stmt.execute(rusqlite::params![slug, name, date, fed, body])
        },
      )
      .await
  }

  async fn replace_federations(
    &self,
    federations: Vec<FederationActivity>,
  ) -> Result<u64> {
    let rows = federations
      .iter()
      .map(|f| Ok((f.slug.clone(), f.name.clone(), encode_json(f)?)))
      .collect::<Result<Vec<_>>>()?;

    self
      .replace_table(
        "federations",
        "INSERT INTO federations (slug, name, body_json) VALUES (?1, ?2, ?3)",
        rows,
        |stmt, (slug, name, body)| stmt.execute(rusqlite::params![slug, name, body]),
      )
      .await
  }

  async fn discard_staged_records(&self, staging: Uuid) -> Result<()> {
    let staging = encode_uuid(staging);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM category_records_staging WHERE staging_id = ?1",
          rusqlite::params![staging],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn merge_staged_records(
    &self,
    staging: Uuid,
    lift: LiftType,
    candidates: Vec<RecordCandidate>,
  ) -> Result<u64> {
    let staging = encode_uuid(staging);
    let touched = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let touched = candidates.len() as u64;
        {
          let mut select = tx.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM category_records_staging
             WHERE staging_id = ?1
               AND federation_slug = ?2 AND sex = ?3 AND equipment = ?4
               AND weight_class = ?5 AND age_class = ?6"
          ))?;
          let mut upsert = tx.prepare(&format!(
            "INSERT OR REPLACE INTO category_records_staging (staging_id, {RECORD_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
          ))?;

          for candidate in candidates {
            let k = &candidate.key;
            let existing = select
              .query_row(
                rusqlite::params![
                  staging,
                  k.federation_slug,
                  k.sex,
                  k.equipment,
                  k.weight_class,
                  k.age_class,
                ],
                RawRecord::from_row,
              )
              .optional()?
              .map(RawRecord::into_record)
              .transpose()
              .map_err(call_error)?;

            let merged = CategoryRecord::merge(existing, lift, candidate);
            let r = RawRecord::encode(&merged).map_err(call_error)?;
            upsert.execute(rusqlite::params![
              staging,
              r.federation_slug,
              r.sex,
              r.equipment,
              r.weight_class,
              r.age_class,
              r.federation,
              r.squat,
              r.bench,
              r.deadlift,
              r.total,
            ])?;
          }
        }
        tx.commit()?;
        Ok(touched)
      })
      .await?;
    Ok(touched)
  }

  async fn publish_staged_records(&self, staging: Uuid) -> Result<u64> {
    let staging = encode_uuid(staging);
    let live: i64 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM category_records", [])?;
        tx.execute(
          &format!(
            "INSERT INTO category_records ({RECORD_COLUMNS})
             SELECT {RECORD_COLUMNS} FROM category_records_staging
             WHERE staging_id = ?1"
          ),
          rusqlite::params![staging],
        )?;
        tx.execute(
          "DELETE FROM category_records_staging WHERE staging_id = ?1",
          rusqlite::params![staging],
        )?;
        let live = tx.query_row("SELECT COUNT(*) FROM category_records", [], |r| r.get(0))?;
        tx.commit()?;
        Ok(live)
      })
      .await?;
    Ok(live.max(0) as u64)
  }

  async fn record_run(&self, run: BuildRun) -> Result<()> {
    let run_id = encode_uuid(run.run_id);
    let view = run.view.to_string();
    let started_at = encode_dt(run.started_at);
    let finished_at = encode_dt(run.finished_at);
    let (outcome, error) = encode_outcome(&run.outcome);
    let rows = run.rows as i64;
    let skipped = run.skipped as i64;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO build_runs (
             run_id, view, started_at, finished_at, rows, skipped, outcome, error
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            run_id,
            view,
            started_at,
            finished_at,
            rows,
            skipped,
            outcome,
            error
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── ViewQuery impl ──────────────────────────────────────────────────────────

impl ViewQuery for SqliteStore {
  type Error = Error;

  // ── Athletes ──────────────────────────────────────────────────────────────

  async fn athlete(&self, slug: &str) -> Result<Option<AthleteProfile>> {
    let slug = slug.to_owned();
    let body: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT body_json FROM athlete_profiles WHERE slug = ?1",
            rusqlite::params![slug],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;
    body.as_deref().map(decode_json).transpose()
  }

  async fn athletes_by_slugs(&self, slugs: &[String]) -> Result<Vec<AthleteProfile>> {
    if slugs.is_empty() {
      return Ok(Vec::new());
    }
    let slugs = slugs.to_vec();
    let bodies = self
      .conn
      .call(move |conn| {
        let placeholders = vec!["?"; slugs.len()].join(", ");
        let sql = format!(
          "SELECT body_json FROM athlete_profiles
           WHERE slug IN ({placeholders}) ORDER BY slug"
        );
        Ok(query_bodies(conn, &sql, rusqlite::params_from_iter(slugs.iter()))?)
      })
      .await?;
    decode_bodies(bodies)
  }

  async fn search_athletes(&self, name: &str, limit: usize) -> Result<Vec<AthleteProfile>> {
    // SQLite only folds ASCII case, so both sides are lower-cased in Rust.
    let pattern = like_contains(&name.to_lowercase());
    let limit = limit as i64;
    let bodies = self
      .conn
      .call(move |conn| {
        Ok(query_bodies(
          conn,
          "SELECT body_json FROM athlete_profiles
           WHERE name_folded LIKE ?1 ESCAPE '\\'
           ORDER BY total_competitions DESC, slug
           LIMIT ?2",
          rusqlite::params![pattern, limit],
        )?)
      })
      .await?;
    decode_bodies(bodies)
  }

  async fn top_athletes(
    &self,
    metric: AthleteMetric,
    limit: usize,
  ) -> Result<Vec<AthleteProfile>> {
    let column = metric_column(metric);
    let limit = limit as i64;
    let bodies = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT body_json FROM athlete_profiles
           WHERE {column} IS NOT NULL
           ORDER BY {column} DESC, slug
           LIMIT ?1"
        );
        Ok(query_bodies(conn, &sql, rusqlite::params![limit])?)
      })
      .await?;
    decode_bodies(bodies)
  }

  // ── Competitions ──────────────────────────────────────────────────────────

  async fn competition(&self, slug: &str) -> Result<Option<CompetitionSummary>> {
    let slug = slug.to_owned();
    let body: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT body_json FROM competitions WHERE slug = ?1",
            rusqlite::params![slug],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;
    body.as_deref().map(decode_json).transpose()
  }

  async fn recent_competitions(&self, limit: usize) -> Result<Vec<CompetitionSummary>> {
    let limit = limit as i64;
    let bodies = self
      .conn
      .call(move |conn| {
        Ok(query_bodies(
          conn,
          "SELECT body_json FROM competitions
           ORDER BY date IS NULL, date DESC, slug
           LIMIT ?1",
          rusqlite::params![limit],
        )?)
      })
      .await?;
    decode_bodies(bodies)
  }

  async fn federation_competitions(
    &self,
    federation_slug: &str,
  ) -> Result<Vec<CompetitionSummary>> {
    let federation_slug = federation_slug.to_owned();
    let bodies = self
      .conn
      .call(move |conn| {
        Ok(query_bodies(
          conn,
          "SELECT body_json FROM competitions
           WHERE federation_slug = ?1
           ORDER BY date IS NULL, date DESC, slug",
          rusqlite::params![federation_slug],
        )?)
      })
      .await?;
    decode_bodies(bodies)
  }

  // ── Federations ───────────────────────────────────────────────────────────

  async fn federation(&self, slug: &str) -> Result<Option<FederationActivity>> {
    let slug = slug.to_owned();
    let body: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT body_json FROM federations WHERE slug = ?1",
            rusqlite::params![slug],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;
    body.as_deref().map(decode_json).transpose()
  }

  async fn federations(&self) -> Result<Vec<FederationActivity>> {
    let bodies = self
      .conn
      .call(|conn| {
        Ok(query_bodies(
          conn,
          "SELECT body_json FROM federations ORDER BY name, slug",
          [],
        )?)
      })
      .await?;
    decode_bodies(bodies)
  }

  // ── Records ───────────────────────────────────────────────────────────────

  async fn record(&self, key: &CategoryKey) -> Result<Option<CategoryRecord>> {
    let key = key.clone();
    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {RECORD_COLUMNS} FROM category_records
               WHERE federation_slug = ?1 AND sex = ?2 AND equipment = ?3
                 AND weight_class = ?4 AND age_class = ?5"
            ),
            rusqlite::params![
              key.federation_slug,
              key.sex,
              key.equipment,
              key.weight_class,
              key.age_class,
            ],
            RawRecord::from_row,
          )
          .optional()?)
      })
      .await?;
    raw.map(RawRecord::into_record).transpose()
  }

  async fn federation_records(
    &self,
    federation_slug: &str,
    equipment: &str,
  ) -> Result<Vec<CategoryRecord>> {
    let federation_slug = federation_slug.to_lowercase();
    let equipment = equipment.to_owned();
    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RECORD_COLUMNS} FROM category_records
           WHERE federation_slug = ?1 AND equipment = ?2
           ORDER BY weight_class, age_class, sex"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![federation_slug, equipment], RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawRecord::into_record).collect()
  }

  async fn recent_runs(&self, limit: usize) -> Result<Vec<BuildRun>> {
    let limit = limit as i64;
    let raws: Vec<RawRun> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT run_id, view, started_at, finished_at, rows, skipped, outcome, error
           FROM build_runs
           ORDER BY started_at DESC, rowid DESC
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit], |row| {
            Ok(RawRun {
              run_id:      row.get(0)?,
              view:        row.get(1)?,
              started_at:  row.get(2)?,
              finished_at: row.get(3)?,
              rows:        row.get(4)?,
              skipped:     row.get(5)?,
              outcome:     row.get(6)?,
              error:       row.get(7)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawRun::into_run).collect()
  }
}
