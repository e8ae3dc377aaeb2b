//! Rollup builders for RackAI.
//!
//! Every builder reads the complete fact store, derives its view with a pure
//! function and swaps the result in atomically. The pure derivations
//! (`build_profiles`, `build_competitions`, `build_federations`,
//! `derive_lift`) are exported so they can be tested and reused without a
//! store.

pub mod athlete;
pub mod competition;
pub mod error;
pub mod federation;
pub mod group;
pub mod pipeline;
pub mod records;

pub use athlete::{AthleteRollup, build_profiles};
pub use competition::{CompetitionRollup, build_competitions};
pub use error::{Error, Result};
pub use federation::{FederationRollup, build_federations};
pub use pipeline::{BuildOutput, Pipeline, PipelineConfig, PipelineReport};
pub use records::{RecordEngine, derive_lift};

#[cfg(test)]
mod fixture;
#[cfg(test)]
mod tests;
