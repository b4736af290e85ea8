use serde::Serialize;

use crate::config::ScheduleConfig;

/// Fraction of the ranked pool visible at step `t`.
///
/// `v = t * (1 - c0^p) / T + c0^p`, result `min(1, v^(1/p))`. Starts at `c0`
/// for `t = 0` and grows towards 1 as `t` approaches `T`. The result is
/// clamped above but never below, so out-of-domain inputs surface as
/// nonsensical values rather than being hidden.
pub fn visible_proportion(step: usize, initial_proportion: f64, total_steps: usize, root: f64) -> f64 {
    let start = initial_proportion.powf(root);
    let v = step as f64 * (1.0 - start) / total_steps as f64 + start;
    v.powf(1.0 / root).min(1.0)
}

/// Number of leading pool entries visible for `proportion`: `floor(pool_len * proportion)`.
pub fn prefix_size(pool_len: usize, proportion: f64) -> usize {
    if proportion.is_nan() || proportion <= 0.0 {
        return 0;
    }
    ((pool_len as f64 * proportion) as usize).min(pool_len)
}

/// Visible prefix of one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepPlan {
    pub step: usize,
    pub proportion: f64,
    pub prefix_size: usize,
}

impl StepPlan {
    pub fn fits(&self, batch_size: usize) -> bool {
        batch_size <= self.prefix_size
    }
}

impl ScheduleConfig {
    pub fn proportion_at(&self, step: usize) -> f64 {
        visible_proportion(
            step,
            self.initial_proportion(),
            self.total_steps(),
            self.root(),
        )
    }

    pub fn step_plan(&self, step: usize, pool_len: usize) -> StepPlan {
        let proportion = self.proportion_at(step);
        StepPlan {
            step,
            proportion,
            prefix_size: prefix_size(pool_len, proportion),
        }
    }

    /// Plans every step `0..T` for a pool of `pool_len` entries.
    pub fn plan(&self, pool_len: usize) -> impl Iterator<Item = StepPlan> + '_ {
        (0..self.total_steps()).map(move |step| self.step_plan(step, pool_len))
    }

    /// First step whose prefix is smaller than the batch size, if any.
    pub fn first_insufficient_step(&self, pool_len: usize) -> Option<StepPlan> {
        let batch_size = self.batch_size();
        self.plan(pool_len).find(|plan| !plan.fits(batch_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn reference_scenario_prefix_sizes() {
        let schedule = ScheduleConfig::new(10, 0.01, 2.0, 1).unwrap();
        let plan: Vec<StepPlan> = schedule.plan(100).collect();

        assert_eq!(plan.len(), 10);
        assert_eq!(plan[0].prefix_size, 1);
        assert!((plan[9].proportion - 0.9487).abs() < 1e-4);
        assert_eq!(plan[9].prefix_size, 94);
        assert!(schedule.first_insufficient_step(100).is_none());
    }

    #[test]
    fn small_pool_is_insufficient_at_step_zero() {
        let schedule = ScheduleConfig::new(5, 0.01, 2.0, 5).unwrap();
        let first = schedule.first_insufficient_step(10).unwrap();
        assert_eq!(first.step, 0);
        assert_eq!(first.prefix_size, 0);
    }

    #[test]
    fn proportion_reaches_one_only_asymptotically() {
        let last = visible_proportion(999, 0.01, 1000, 2.0);
        assert!(last < 1.0);
        assert!(last > 0.999);
        assert_eq!(visible_proportion(1000, 0.01, 1000, 2.0), 1.0);
        assert_eq!(visible_proportion(5000, 0.01, 1000, 2.0), 1.0);
    }

    #[test]
    fn linear_root_grows_linearly() {
        let half = visible_proportion(5, 0.0, 10, 1.0);
        assert!((half - 0.5).abs() < 1e-12);
    }

    #[test]
    fn prefix_size_truncates_and_caps() {
        assert_eq!(prefix_size(10, 0.01), 0);
        assert_eq!(prefix_size(10, 0.39), 3);
        assert_eq!(prefix_size(10, 1.0), 10);
        assert_eq!(prefix_size(0, 0.5), 0);
        assert_eq!(prefix_size(10, f64::NAN), 0);
    }

    proptest! {
        #[test]
        fn proportion_is_non_decreasing(
            c0 in 0.001f64..1.0,
            root in 0.1f64..8.0,
            total in 1usize..400,
        ) {
            let mut previous = visible_proportion(0, c0, total, root);
            for step in 1..total {
                let current = visible_proportion(step, c0, total, root);
                prop_assert!(current >= previous, "step {} dropped from {} to {}", step, previous, current);
                previous = current;
            }
        }

        #[test]
        fn step_zero_starts_at_initial_proportion(
            c0 in 0.001f64..=1.0,
            root in 0.1f64..8.0,
            total in 1usize..10_000,
        ) {
            let start = visible_proportion(0, c0, total, root);
            prop_assert!((start - c0).abs() <= 1e-9 * c0.max(1.0));
        }

        #[test]
        fn proportion_never_exceeds_one(
            c0 in 0.0f64..=1.0,
            root in 0.1f64..8.0,
            total in 1usize..1000,
            step in 0usize..2000,
        ) {
            prop_assert!(visible_proportion(step, c0, total, root) <= 1.0);
        }

        #[test]
        fn prefix_sizes_never_shrink(
            c0 in 0.001f64..1.0,
            root in 0.1f64..8.0,
            total in 1usize..200,
            pool_len in 0usize..5000,
        ) {
            let schedule = ScheduleConfig::new(total, c0, root, 1).unwrap();
            let sizes: Vec<usize> = schedule.plan(pool_len).map(|plan| plan.prefix_size).collect();
            prop_assert!(sizes.windows(2).all(|pair| pair[0] <= pair[1]));
            prop_assert!(sizes.iter().all(|&size| size <= pool_len));
        }
    }
}
