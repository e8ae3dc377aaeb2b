//! Slug normalisation — the stable identifiers for athletes and meets.
//!
//! Identity across the whole pipeline hinges on these functions being total
//! and deterministic. Two different people whose names normalise to the same
//! slug are merged into one athlete; that is a known limitation, not an error.

use chrono::{Datelike, NaiveDate};

/// Returned for empty input, or input with no ASCII letters or digits.
pub const UNKNOWN_SLUG: &str = "unknown";

/// Normalise free text into a slug.
///
/// Lower-cases the input and collapses every maximal run of characters that
/// are not ASCII letters or digits into a single hyphen, trimming hyphens at
/// both ends. Accented letters are not transliterated, so
/// `"Jesús Olivares"` becomes `"jes-s-olivares"`.
pub fn slugify(text: &str) -> String {
  let mut slug = String::with_capacity(text.len());
  let mut pending_hyphen = false;

  for c in text.chars().flat_map(char::to_lowercase) {
    if c.is_ascii_alphanumeric() {
      if pending_hyphen && !slug.is_empty() {
        slug.push('-');
      }
      pending_hyphen = false;
      slug.push(c);
    } else {
      pending_hyphen = true;
    }
  }

  if slug.is_empty() {
    UNKNOWN_SLUG.to_owned()
  } else {
    slug
  }
}

/// [`slugify`] for optional input; `None` maps to [`UNKNOWN_SLUG`].
pub fn slugify_opt(text: Option<&str>) -> String {
  text.map_or_else(|| UNKNOWN_SLUG.to_owned(), slugify)
}

/// Identity of a meet: its name, year and country.
///
/// Many federations reuse a meet name every year ("Nationals"), so the year
/// and host country are folded into the slug.
pub fn competition_slug(
  meet_name: &str,
  date: Option<NaiveDate>,
  country: Option<&str>,
) -> String {
  let year = date.map(|d| d.year().to_string()).unwrap_or_default();
  slugify(&format!("{meet_name} {year} {}", country.unwrap_or_default()))
}

/// Federation slugs are the lower-cased federation name.
pub fn federation_slug(federation: &str) -> String {
  federation.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lowercases_and_hyphenates() {
    assert_eq!(slugify("AEP 3 - Campeonato"), "aep-3-campeonato");
    assert_eq!(slugify("John  Smith"), "john-smith");
  }

  #[test]
  fn accented_letters_become_separators() {
    assert_eq!(slugify("Jesús Olivares"), "jes-s-olivares");
    assert_eq!(slugify("Ñoño"), "o-o");
  }

  #[test]
  fn trims_edge_separators() {
    assert_eq!(slugify("  (Open) "), "open");
    assert_eq!(slugify("--x--"), "x");
  }

  #[test]
  fn empty_and_symbol_only_input_is_unknown() {
    assert_eq!(slugify(""), UNKNOWN_SLUG);
    assert_eq!(slugify(" - / "), UNKNOWN_SLUG);
    assert_eq!(slugify_opt(None), UNKNOWN_SLUG);
  }

  #[test]
  fn deterministic() {
    assert_eq!(slugify("Jane Doe #2"), slugify("Jane Doe #2"));
  }

  #[test]
  fn competition_slug_includes_year_and_country() {
    let date = NaiveDate::from_ymd_opt(2019, 3, 2);
    assert_eq!(
      competition_slug("Spanish Nationals", date, Some("Spain")),
      "spanish-nationals-2019-spain"
    );
    assert_eq!(
      competition_slug("Spanish Nationals", None, None),
      "spanish-nationals"
    );
  }

  #[test]
  fn federation_slug_is_lowercase() {
    assert_eq!(federation_slug(" AEP "), "aep");
    assert_eq!(federation_slug("USAPL"), "usapl");
  }
}
