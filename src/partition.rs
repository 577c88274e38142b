//! Splitting one item stream across independent workers.
//!
//! Every worker enumerates the full stream and keeps the items whose index
//! leaves residue `step` modulo `divisor`. No counter is shared: the same
//! input gives every worker the same indices, so the subsets are disjoint
//! and together cover the stream exactly once.

use crate::error::{Error, Result};

/// Which residue class of the item stream a worker owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkAssignment {
    divisor: usize,
    step: usize,
}

impl WorkAssignment {
    pub fn new(divisor: usize, step: usize) -> Result<Self> {
        if divisor == 0 {
            return Err(Error::Worker {
                message: "worker count must be at least 1".to_string(),
            });
        }
        if step >= divisor {
            return Err(Error::Worker {
                message: format!("worker index {} out of range for {} workers", step, divisor),
            });
        }
        Ok(Self { divisor, step })
    }

    /// The only worker of a single-worker run.
    pub fn single() -> Self {
        Self {
            divisor: 1,
            step: 0,
        }
    }

    /// All assignments for `divisor` workers, in step order.
    pub fn all(divisor: usize) -> Result<Vec<Self>> {
        (0..divisor).map(|step| Self::new(divisor, step)).collect()
    }

    pub fn divisor(&self) -> usize {
        self.divisor
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn owns(&self, index: usize) -> bool {
        index % self.divisor == self.step
    }

    /// Items of `iter` owned by this assignment.
    pub fn partition<I: Iterator>(self, iter: I) -> Partitioned<I> {
        Partitioned {
            inner: iter,
            assignment: self,
            seen: 0,
            always: |_| false,
        }
    }

    /// Like `partition`, but errors are passed to every worker regardless of
    /// their index so none of them mistakes a failed listing for a short one.
    pub fn partition_results<I, T, E>(self, iter: I) -> Partitioned<I>
    where
        I: Iterator<Item = std::result::Result<T, E>>,
    {
        Partitioned {
            inner: iter,
            assignment: self,
            seen: 0,
            always: |item| item.is_err(),
        }
    }
}

/// Iterator adapter returned by `WorkAssignment::partition`.
pub struct Partitioned<I: Iterator> {
    inner: I,
    assignment: WorkAssignment,
    /// Items observed so far, owned or not.
    seen: usize,
    always: fn(&I::Item) -> bool,
}

impl<I: Iterator> Iterator for Partitioned<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        loop {
            let item = self.inner.next()?;
            let index = self.seen;
            self.seen += 1;
            if self.assignment.owns(index) || (self.always)(&item) {
                return Some(item);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assigned(divisor: usize, step: usize, len: usize) -> Vec<usize> {
        WorkAssignment::new(divisor, step)
            .unwrap()
            .partition(0..len)
            .collect()
    }

    #[test]
    fn test_two_workers_five_items() {
        assert_eq!(assigned(2, 0, 5), vec![0, 2, 4]);
        assert_eq!(assigned(2, 1, 5), vec![1, 3]);
    }

    #[test]
    fn test_single_worker_gets_everything() {
        let all: Vec<usize> = WorkAssignment::single().partition(0..7).collect();
        assert_eq!(all, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_union_is_exact_for_small_divisors() {
        for divisor in [1, 2, 5] {
            let mut union: Vec<usize> = WorkAssignment::all(divisor)
                .unwrap()
                .into_iter()
                .flat_map(|a| a.partition(0..23).collect::<Vec<_>>())
                .collect();
            union.sort_unstable();
            assert_eq!(union, (0..23).collect::<Vec<_>>(), "divisor {}", divisor);
        }
    }

    #[test]
    fn test_more_workers_than_items() {
        assert_eq!(assigned(5, 4, 3), Vec::<usize>::new());
        assert_eq!(assigned(5, 2, 3), vec![2]);
    }

    #[test]
    fn test_counts_items_before_any_filtering() {
        // The index is over the raw stream, so what a later filter drops
        // does not shift the assignment.
        let items = vec!["a", "skip", "b", "skip", "c"];
        let owned: Vec<&str> = WorkAssignment::new(2, 0)
            .unwrap()
            .partition(items.into_iter())
            .collect();
        assert_eq!(owned, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_partition_results_passes_errors_to_everyone() {
        let items: Vec<std::result::Result<u32, &str>> = vec![Ok(0), Ok(1), Err("listing failed")];
        let worker0: Vec<_> = WorkAssignment::new(2, 0)
            .unwrap()
            .partition_results(items.clone().into_iter())
            .collect();
        let worker1: Vec<_> = WorkAssignment::new(2, 1)
            .unwrap()
            .partition_results(items.into_iter())
            .collect();
        assert_eq!(worker0, vec![Ok(0), Err("listing failed")]);
        assert_eq!(worker1, vec![Ok(1), Err("listing failed")]);
    }

    #[test]
    fn test_invalid_assignments() {
        assert!(WorkAssignment::new(0, 0).is_err());
        assert!(WorkAssignment::new(2, 2).is_err());
    }
}
