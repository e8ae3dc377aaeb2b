//! Error types for `rack-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("fact is missing its athlete slug (athlete name: {0:?})")]
  MissingAthleteSlug(String),

  #[error("fact is missing its competition slug (meet name: {0:?})")]
  MissingCompetitionSlug(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
