//! SQL schema for the RackAI SQLite store.
//!
//! Executed once at connection startup. Views keep their full document in
//! `body_json`; the other columns exist for keys, indexes and sorting.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Facts are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS facts (
    seq              INTEGER PRIMARY KEY AUTOINCREMENT,
    fact_id          TEXT NOT NULL UNIQUE,
    recorded_at      TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    athlete_slug     TEXT NOT NULL CHECK (athlete_slug != ''),
    competition_slug TEXT NOT NULL CHECK (competition_slug != ''),
    competition_date TEXT,            -- YYYY-MM-DD or NULL when undated
    body_json        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS facts_athlete_idx     ON facts(athlete_slug);
CREATE INDEX IF NOT EXISTS facts_competition_idx ON facts(competition_slug);

CREATE TABLE IF NOT EXISTS athlete_profiles (
    slug               TEXT PRIMARY KEY,
    name               TEXT NOT NULL,
    name_folded        TEXT NOT NULL,  -- Unicode lower case, for search
    total_competitions INTEGER NOT NULL,
    best_squat         REAL,
    best_bench         REAL,
    best_deadlift      REAL,
    best_total         REAL,
    best_dots          REAL,
    best_wilks         REAL,
    best_glossbrenner  REAL,
    best_goodlift      REAL,
    body_json          TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS athlete_profiles_name_idx   ON athlete_profiles(name);
CREATE INDEX IF NOT EXISTS athlete_profiles_folded_idx ON athlete_profiles(name_folded);

CREATE TABLE IF NOT EXISTS competitions (
    slug            TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    date            TEXT,
    federation_slug TEXT,
    body_json       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS competitions_date_idx       ON competitions(date);
CREATE INDEX IF NOT EXISTS competitions_federation_idx ON competitions(federation_slug);

CREATE TABLE IF NOT EXISTS federations (
    slug      TEXT PRIMARY KEY,
    name      TEXT NOT NULL,
    body_json TEXT NOT NULL
);

-- Live records view. Each lift column holds a JSON RecordEntry or NULL.
CREATE TABLE IF NOT EXISTS category_records (
    federation_slug TEXT NOT NULL,
    sex             TEXT NOT NULL,
    equipment       TEXT NOT NULL,
    weight_class    TEXT NOT NULL,
    age_class       TEXT NOT NULL,
    federation      TEXT NOT NULL,
    squat           TEXT,
    bench           TEXT,
    deadlift        TEXT,
    total           TEXT,
    PRIMARY KEY (federation_slug, sex, equipment, weight_class, age_class)
);

-- Lift passes merge here, keyed by the rebuild that staged them; one
-- rebuild's rows are swapped into category_records as a whole.
CREATE TABLE IF NOT EXISTS category_records_staging (
    staging_id      TEXT NOT NULL,
    federation_slug TEXT NOT NULL,
    sex             TEXT NOT NULL,
    equipment       TEXT NOT NULL,
    weight_class    TEXT NOT NULL,
    age_class       TEXT NOT NULL,
    federation      TEXT NOT NULL,
    squat           TEXT,
    bench           TEXT,
    deadlift        TEXT,
    total           TEXT,
    PRIMARY KEY (staging_id, federation_slug, sex, equipment, weight_class, age_class)
);

CREATE TABLE IF NOT EXISTS build_runs (
    run_id      TEXT PRIMARY KEY,
    view        TEXT NOT NULL,     -- 'athletes' | 'competitions' | 'federations' | 'records'
    started_at  TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    rows        INTEGER NOT NULL,
    skipped     INTEGER NOT NULL,
    outcome     TEXT NOT NULL,     -- 'succeeded' | 'failed'
    error       TEXT
);

CREATE INDEX IF NOT EXISTS build_runs_started_idx ON build_runs(started_at);

PRAGMA user_version = 2;
";

/// Record columns shared by both record tables, in DDL order. The staging
/// table prefixes them with `staging_id`.
pub const RECORD_COLUMNS: &str = "federation_slug, sex, equipment, weight_class, \
                                  age_class, federation, squat, bench, deadlift, total";
