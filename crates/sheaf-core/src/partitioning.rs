use std::fmt;

use crate::error::{Error, Result};

// Partitioning — the batch layout of a container
//
// A container stores its elements in batches. The partitioning is the ordered
// list of batch sizes, e.g. [3, 2] for five elements split 3 + 2. Two
// containers that are stored side by side (inputs/labels, data/weights) must
// always have equal partitionings so that batch i of one lines up with
// batch i of the other.
//
// Element addressing is derived from the partitioning alone: the global index
// of the first element of batch b is the sum of all sizes before b.

/// Location of one element inside batch-granular storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementPosition {
    /// Index of the owning batch.
    pub batch: usize,
    /// Offset of the element within that batch.
    pub offset: usize,
}

impl ElementPosition {
    pub fn new(batch: usize, offset: usize) -> Self {
        Self { batch, offset }
    }
}

/// Ordered sequence of batch sizes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Partitioning(Vec<usize>);

impl Partitioning {
    /// Create a partitioning from explicit batch sizes.
    pub fn new(sizes: Vec<usize>) -> Self {
        Partitioning(sizes)
    }

    /// Split `num_elements` into the fewest batches of at most
    /// `max_batch_size` elements, with sizes differing by at most one.
    ///
    /// Larger batches come first. A `max_batch_size` of 0 means unlimited,
    /// i.e. a single batch. Zero elements give an empty partitioning.
    ///
    /// ```
    /// use sheaf_core::Partitioning;
    ///
    /// assert_eq!(Partitioning::balanced(10, 4).sizes(), &[4, 3, 3]);
    /// assert_eq!(Partitioning::balanced(10, 0).sizes(), &[10]);
    /// ```
    pub fn balanced(num_elements: usize, max_batch_size: usize) -> Self {
        if num_elements == 0 {
            return Partitioning(Vec::new());
        }
        let max = if max_batch_size == 0 {
            num_elements
        } else {
            max_batch_size.min(num_elements)
        };
        let num_batches = num_elements.div_ceil(max);
        let base = num_elements / num_batches;
        let remainder = num_elements % num_batches;
        let sizes = (0..num_batches)
            .map(|b| if b < remainder { base + 1 } else { base })
            .collect();
        Partitioning(sizes)
    }

    /// The batch sizes as a slice.
    pub fn sizes(&self) -> &[usize] {
        &self.0
    }

    /// Number of batches.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no batches at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of elements (sum of batch sizes).
    pub fn number_of_elements(&self) -> usize {
        self.0.iter().sum()
    }

    /// Size of the largest batch, 0 for an empty partitioning.
    pub fn max_batch_size(&self) -> usize {
        self.0.iter().copied().max().unwrap_or(0)
    }

    /// Size of batch `batch`.
    pub fn batch_size(&self, batch: usize) -> Result<usize> {
        self.0.get(batch).copied().ok_or(Error::BatchOutOfRange {
            index: batch,
            size: self.0.len(),
        })
    }

    /// Global index of the first element of `batch`.
    pub fn batch_start(&self, batch: usize) -> Result<usize> {
        if batch > self.0.len() {
            return Err(Error::BatchOutOfRange {
                index: batch,
                size: self.0.len(),
            });
        }
        Ok(self.0[..batch].iter().sum())
    }

    /// Map a global element index to its batch and offset.
    ///
    /// Scans cumulative sizes from the front, so this costs O(batches).
    /// Sequential walks should use an indexing iterator instead.
    pub fn locate(&self, index: usize) -> Result<ElementPosition> {
        let mut start = 0;
        for (batch, &size) in self.0.iter().enumerate() {
            if index < start + size {
                return Ok(ElementPosition::new(batch, index - start));
            }
            start += size;
        }
        Err(Error::ElementOutOfRange { index, len: start })
    }

    /// Iterate over the batch sizes.
    pub fn iter(&self) -> std::slice::Iter<'_, usize> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<usize> {
        self.0
    }
}

impl fmt::Display for Partitioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

impl From<Vec<usize>> for Partitioning {
    fn from(v: Vec<usize>) -> Self {
        Partitioning(v)
    }
}

impl From<&[usize]> for Partitioning {
    fn from(s: &[usize]) -> Self {
        Partitioning(s.to_vec())
    }
}

impl FromIterator<usize> for Partitioning {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Partitioning(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Partitioning {
    type Item = &'a usize;
    type IntoIter = std::slice::Iter<'a, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_balanced_even() {
        let p = Partitioning::balanced(12, 4);
        assert_eq!(p.sizes(), &[4, 4, 4]);
        assert_eq!(p.number_of_elements(), 12);
    }

    #[test]
    fn test_balanced_uneven() {
        // ceil(5/3) = 2 batches of 3 + 2
        assert_eq!(Partitioning::balanced(5, 3).sizes(), &[3, 2]);
        assert_eq!(Partitioning::balanced(7, 3).sizes(), &[3, 2, 2]);
    }

    #[test]
    fn test_balanced_edge_cases() {
        assert!(Partitioning::balanced(0, 4).is_empty());
        assert_eq!(Partitioning::balanced(3, 0).sizes(), &[3]);
        assert_eq!(Partitioning::balanced(3, 100).sizes(), &[3]);
    }

    #[test]
    fn test_locate() {
        let p = Partitioning::from(vec![3, 2]);
        assert_eq!(p.locate(0).unwrap(), ElementPosition::new(0, 0));
        assert_eq!(p.locate(2).unwrap(), ElementPosition::new(0, 2));
        assert_eq!(p.locate(3).unwrap(), ElementPosition::new(1, 0));
        assert_eq!(p.locate(4).unwrap(), ElementPosition::new(1, 1));
        assert!(matches!(
            p.locate(5),
            Err(Error::ElementOutOfRange { index: 5, len: 5 })
        ));
    }

    #[test]
    fn test_locate_skips_empty_batches() {
        let p = Partitioning::from(vec![0, 2, 0, 1]);
        assert_eq!(p.locate(0).unwrap(), ElementPosition::new(1, 0));
        assert_eq!(p.locate(2).unwrap(), ElementPosition::new(3, 0));
    }

    #[test]
    fn test_batch_start() {
        let p = Partitioning::from(vec![3, 2, 4]);
        assert_eq!(p.batch_start(0).unwrap(), 0);
        assert_eq!(p.batch_start(2).unwrap(), 5);
        assert_eq!(p.batch_start(3).unwrap(), 9);
        assert!(p.batch_start(4).is_err());
    }

    proptest! {
        #[test]
        fn balanced_respects_bounds(n in 0usize..2000, max in 0usize..300) {
            let p = Partitioning::balanced(n, max);
            prop_assert_eq!(p.number_of_elements(), n);
            if max > 0 {
                prop_assert!(p.max_batch_size() <= max);
            }
            let min = p.iter().copied().min().unwrap_or(0);
            prop_assert!(p.max_batch_size() - min <= 1);
        }
    }
}
