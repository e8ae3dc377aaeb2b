//! Fact builders shared by the unit tests.

use chrono::Utc;
use rack_core::{
  fact::{
    AthleteIdentity, Category, CompetitionIdentity, NewResultFact, Performance,
    Placement, Points, ResultFact, parse_date,
  },
  slug::slugify,
};
use uuid::Uuid;

/// A fully-populated qualifying fact for `athlete` at `meet` on `date`.
pub fn fact(athlete: &str, meet: &str, date: &str) -> NewResultFact {
  NewResultFact {
    athlete:     AthleteIdentity {
      slug:       slugify(athlete),
      name:       athlete.into(),
      sex:        Some("M".into()),
      country:    Some("Spain".into()),
      age:        Some(30.0),
      bodyweight: Some(90.0),
    },
    competition: CompetitionIdentity {
      slug:       slugify(meet),
      name:       meet.into(),
      date:       parse_date(date),
      country:    Some("Spain".into()),
      town:       Some("Madrid".into()),
      federation: Some("AEP".into()),
    },
    category:    Category {
      division:     Some("Open".into()),
      age_class:    Some("24-34".into()),
      weight_class: Some("93".into()),
      equipment:    Some("Raw".into()),
      event:        Some("SBD".into()),
      tested:       true,
    },
    results:     Performance {
      squat:    Some(200.0),
      bench:    Some(130.0),
      deadlift: Some(240.0),
      total:    Some(570.0),
      place:    Placement::Ranked(1),
    },
    points:      Points {
      dots:         Some(380.0),
      wilks:        Some(370.0),
      glossbrenner: Some(350.0),
      goodlift:     Some(75.0),
    },
  }
}

/// Stamp store-assigned fields so pure builders can consume the fact.
pub fn stored(input: NewResultFact) -> ResultFact {
  input.into_fact(Uuid::new_v4(), Utc::now())
}

pub trait FactExt {
  fn with_total(self, total: Option<f64>) -> Self;
  fn with_place(self, place: Placement) -> Self;
  fn with_federation(self, federation: Option<&str>) -> Self;
  fn with_weight_class(self, weight_class: &str) -> Self;
}

impl FactExt for NewResultFact {
  fn with_total(mut self, total: Option<f64>) -> Self {
    self.results.total = total;
    self
  }

  fn with_place(mut self, place: Placement) -> Self {
    self.results.place = place;
    self
  }

  fn with_federation(mut self, federation: Option<&str>) -> Self {
    self.competition.federation = federation.map(str::to_owned);
    self
  }

  fn with_weight_class(mut self, weight_class: &str) -> Self {
    self.category.weight_class = Some(weight_class.into());
    self
  }
}
