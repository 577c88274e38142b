//! Property-based tests for work partitioning.

use proptest::prelude::*;

use crate::partition::WorkAssignment;

proptest! {
    /// Every item is owned by exactly one worker.
    #[test]
    fn partition_is_exact_cover(divisor in 1usize..12, len in 0usize..300) {
        let mut owners = vec![0u32; len];
        for assignment in WorkAssignment::all(divisor).unwrap() {
            for index in assignment.partition(0..len) {
                owners[index] += 1;
            }
        }
        prop_assert!(owners.iter().all(|&n| n == 1));
    }

    /// A worker's share preserves input order.
    #[test]
    fn partition_preserves_order(divisor in 1usize..8, step_seed in 0usize..8, len in 0usize..200) {
        let step = step_seed % divisor;
        let owned: Vec<usize> = WorkAssignment::new(divisor, step)
            .unwrap()
            .partition(0..len)
            .collect();
        prop_assert!(owned.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(owned.iter().all(|i| i % divisor == step));
    }

    /// Shares differ in size by at most one.
    #[test]
    fn partition_is_balanced(divisor in 1usize..10, len in 0usize..200) {
        let sizes: Vec<usize> = WorkAssignment::all(divisor)
            .unwrap()
            .into_iter()
            .map(|a| a.partition(0..len).count())
            .collect();
        let max = sizes.iter().max().copied().unwrap_or(0);
        let min = sizes.iter().min().copied().unwrap_or(0);
        prop_assert!(max - min <= 1);
    }
}
