use pretraining_data::PoolEntry;
use rand::{seq::index, Rng};

use crate::errors::{CurriculumError, Result};
use crate::schedule::StepPlan;

/// Sentences drawn for one step, in sampling order.
#[derive(Debug, Clone, PartialEq)]
pub struct StepBatch<'a> {
    pub step: usize,
    pub proportion: f64,
    pub prefix_size: usize,
    pub entries: Vec<&'a PoolEntry>,
}

impl<'a> StepBatch<'a> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a PoolEntry> + '_ {
        self.entries.iter().copied()
    }
}

/// Draws `batch_size` distinct entries uniformly from `prefix`.
///
/// Fails with `InsufficientPrefix` when the prefix holds fewer entries than
/// requested; the generator is left untouched in that case.
pub fn sample_batch<'a, R: Rng + ?Sized>(
    step: usize,
    prefix: &'a [PoolEntry],
    batch_size: usize,
    rng: &mut R,
) -> Result<Vec<&'a PoolEntry>> {
    if batch_size > prefix.len() {
        return Err(CurriculumError::InsufficientPrefix {
            step,
            prefix_size: prefix.len(),
            batch_size,
        });
    }

    Ok(index::sample(rng, prefix.len(), batch_size)
        .into_iter()
        .map(|position| &prefix[position])
        .collect())
}

/// Samples the prefix of `pool` described by `plan`.
pub(crate) fn sample_step<'a, R: Rng + ?Sized>(
    plan: StepPlan,
    pool: &'a [PoolEntry],
    batch_size: usize,
    rng: &mut R,
) -> Result<StepBatch<'a>> {
    let prefix = &pool[..plan.prefix_size.min(pool.len())];
    let entries = sample_batch(plan.step, prefix, batch_size, rng)?;
    Ok(StepBatch {
        step: plan.step,
        proportion: plan.proportion,
        prefix_size: plan.prefix_size,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    fn entries(count: usize) -> Vec<PoolEntry> {
        (0..count)
            .map(|i| PoolEntry::new(i.to_string(), format!("sentence {i}")))
            .collect()
    }

    #[test]
    fn single_entry_prefix_always_yields_that_entry() {
        let pool = entries(100);
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..20 {
            let batch = sample_batch(0, &pool[..1], 1, &mut rng).unwrap();
            assert_eq!(batch[0].id, "0");
        }
    }

    #[test]
    fn full_prefix_batch_is_a_permutation() {
        let pool = entries(8);
        let mut rng = StdRng::seed_from_u64(3);
        let batch = sample_batch(2, &pool, 8, &mut rng).unwrap();
        let ids: HashSet<&str> = batch.iter().map(|entry| entry.id.as_str()).collect();
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn oversized_batch_reports_step_and_sizes() {
        let pool = entries(10);
        let mut rng = StdRng::seed_from_u64(17);
        let err = sample_batch(4, &pool[..3], 5, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            CurriculumError::InsufficientPrefix {
                step: 4,
                prefix_size: 3,
                batch_size: 5
            }
        ));
    }

    #[test]
    fn empty_prefix_cannot_supply_any_batch() {
        let mut rng = StdRng::seed_from_u64(17);
        assert!(sample_batch(0, &[], 1, &mut rng).is_err());
    }

    #[test]
    fn same_seed_same_sample() {
        let pool = entries(50);
        let first = sample_batch(0, &pool, 10, &mut StdRng::seed_from_u64(17)).unwrap();
        let second = sample_batch(0, &pool, 10, &mut StdRng::seed_from_u64(17)).unwrap();
        assert_eq!(first, second);
    }

    proptest! {
        #[test]
        fn samples_are_distinct_and_inside_the_prefix(
            pool_len in 1usize..300,
            prefix_fraction in 0.0f64..=1.0,
            seed in any::<u64>(),
        ) {
            let pool = entries(pool_len);
            let prefix_len = ((pool_len as f64 * prefix_fraction) as usize).max(1);
            let batch_size = (prefix_len / 2).max(1);
            let mut rng = StdRng::seed_from_u64(seed);

            let batch = sample_batch(0, &pool[..prefix_len], batch_size, &mut rng).unwrap();
            prop_assert_eq!(batch.len(), batch_size);

            let mut seen = HashSet::new();
            for entry in batch {
                let rank: usize = entry.id.parse().unwrap();
                prop_assert!(rank < prefix_len);
                prop_assert!(seen.insert(rank));
            }
        }
    }
}
