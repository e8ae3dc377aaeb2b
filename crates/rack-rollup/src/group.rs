//! Grouping and reduction helpers shared by the builders.

use std::{
  collections::{BTreeSet, HashMap},
  hash::Hash,
};

use rack_core::fact::ResultFact;

/// The output of one pure derivation, plus how many facts it had to leave out.
#[derive(Debug, Clone, PartialEq)]
pub struct Derived<T> {
  pub items:   Vec<T>,
  /// Facts excluded because a field this derivation depends on is missing.
  pub skipped: u64,
}

/// Group `items` by `key`.
///
/// Groups appear in the order their key was first seen, and each group keeps
/// the input order of its members, so "first" and "last" within a group mean
/// first and last in the input.
pub fn group_by<'a, T, K, F>(
  items: impl IntoIterator<Item = &'a T>,
  mut key: F,
) -> Vec<(K, Vec<&'a T>)>
where
  T: 'a,
  K: Eq + Hash + Clone,
  F: FnMut(&T) -> K,
{
  let mut index: HashMap<K, usize> = HashMap::new();
  let mut groups: Vec<(K, Vec<&'a T>)> = Vec::new();

  for item in items {
    let k = key(item);
    match index.get(&k) {
      Some(&i) => groups[i].1.push(item),
      None => {
        index.insert(k.clone(), groups.len());
        groups.push((k, vec![item]));
      }
    }
  }

  groups
}

/// Facts in competition-date order. The sort is stable, so facts on the same
/// date (and undated facts, which come first) keep their store order.
pub fn by_date(facts: &[ResultFact]) -> Vec<&ResultFact> {
  let mut ordered: Vec<&ResultFact> = facts.iter().collect();
  ordered.sort_by_key(|f| f.sort_date());
  ordered
}

/// Maximum of the present values; `None` when there are none.
pub fn max_present(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
  values
    .into_iter()
    .flatten()
    .filter(|v| !v.is_nan())
    .fold(None, |best, v| match best {
      Some(b) if b >= v => Some(b),
      _ => Some(v),
    })
}

/// Union of all `sets`. Union is associative and commutative, so the result
/// does not depend on how the sets were partitioned or ordered.
pub fn union_all<T: Ord>(sets: impl IntoIterator<Item = BTreeSet<T>>) -> BTreeSet<T> {
  sets.into_iter().fold(BTreeSet::new(), |mut acc, set| {
    acc.extend(set);
    acc
  })
}
