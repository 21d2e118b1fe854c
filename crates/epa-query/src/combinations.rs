//! Power-set enumeration of candidate target states.

use std::collections::BTreeSet;
use thiserror::Error;

/// Largest set the generator will expand (2^30 subsets).
pub const MAX_COMBINATION_SIZE: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CombinationsError {
    #[error("cannot enumerate subsets of {count} elements (limit {max}); prune with necessity facts first")]
    TooManyElements { count: usize, max: usize },
}

/// Enumerates every subset of a finite set.
#[derive(Debug, Clone, Copy)]
pub struct CombinationsGenerator {
    max_size: usize,
}

impl Default for CombinationsGenerator {
    fn default() -> Self {
        Self {
            max_size: MAX_COMBINATION_SIZE,
        }
    }
}

impl CombinationsGenerator {
    /// A generator with a custom size bound, capped at [`MAX_COMBINATION_SIZE`].
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            max_size: max_size.min(MAX_COMBINATION_SIZE),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// All `2^|elements|` subsets, including the empty set and `elements` itself.
    /// No ordering is guaranteed.
    pub fn combinations<T: Ord + Clone>(
        &self,
        elements: &BTreeSet<T>,
    ) -> Result<Vec<BTreeSet<T>>, CombinationsError> {
        let count = elements.len();
        if count > self.max_size {
            return Err(CombinationsError::TooManyElements {
                count,
                max: self.max_size,
            });
        }

        let items: Vec<&T> = elements.iter().collect();
        let subsets = (0u64..(1u64 << count))
            .map(|mask| {
                items
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, item)| (*item).clone())
                    .collect()
            })
            .collect();
        Ok(subsets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_set_has_one_subset() {
        let subsets = CombinationsGenerator::default()
            .combinations(&BTreeSet::<u8>::new())
            .unwrap();
        assert_eq!(subsets, vec![BTreeSet::new()]);
    }

    #[test]
    fn test_three_elements() {
        let set: BTreeSet<_> = ["a", "b", "c"].into_iter().collect();
        let subsets = CombinationsGenerator::default().combinations(&set).unwrap();
        assert_eq!(subsets.len(), 8);
        assert!(subsets.contains(&BTreeSet::new()));
        assert!(subsets.contains(&set));
    }

    #[test]
    fn test_rejects_oversized_sets() {
        let set: BTreeSet<u32> = (0..5).collect();
        let err = CombinationsGenerator::with_max_size(4)
            .combinations(&set)
            .unwrap_err();
        assert_eq!(err, CombinationsError::TooManyElements { count: 5, max: 4 });

        let set: BTreeSet<u32> = (0..31).collect();
        assert!(CombinationsGenerator::default().combinations(&set).is_err());
    }

    proptest! {
        #[test]
        fn power_set_has_exactly_2_pow_n_distinct_subsets(
            elements in prop::collection::btree_set(0u16..1000, 0..10)
        ) {
            let subsets = CombinationsGenerator::default().combinations(&elements).unwrap();
            let distinct: BTreeSet<_> = subsets.iter().cloned().collect();
            prop_assert_eq!(subsets.len(), 1usize << elements.len());
            prop_assert_eq!(distinct.len(), subsets.len());
            prop_assert!(distinct.contains(&BTreeSet::new()));
            prop_assert!(distinct.contains(&elements));
            prop_assert!(subsets.iter().all(|s| s.is_subset(&elements)));
        }
    }
}
