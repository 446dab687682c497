// Element addressing over batch-granular storage
//
// Containers store batches, but consumers often want elements. An
// IndexingIterator walks the (batch, offset) positions of a partitioning in
// order. It locates its starting point once by scanning cumulative batch
// sizes and from then on only steps the offset, moving to the next batch when
// it crosses a boundary, so sequential access is amortized O(1) per element.
//
// The iterator owns a snapshot of the partitioning. Element views built on top
// of it borrow their container, which rules out structural changes while a
// view is alive.

use std::iter::FusedIterator;

use sheaf_core::{ElementPosition, Partitioning, Result};

use crate::container::Container;

/// Iterator over the element positions of a partitioning.
#[derive(Debug, Clone)]
pub struct IndexingIterator {
    partitioning: Partitioning,
    batch: usize,
    offset: usize,
    remaining: usize,
}

impl IndexingIterator {
    /// Start at the first element.
    pub fn new(partitioning: Partitioning) -> Self {
        let remaining = partitioning.number_of_elements();
        let mut it = Self {
            partitioning,
            batch: 0,
            offset: 0,
            remaining,
        };
        it.skip_exhausted_batches();
        it
    }

    /// Start at global element `index`.
    ///
    /// `index` may equal the number of elements, which yields an exhausted
    /// iterator. Anything larger is out of range.
    pub fn at(partitioning: Partitioning, index: usize) -> Result<Self> {
        let total = partitioning.number_of_elements();
        if index == total {
            return Ok(Self {
                batch: partitioning.len(),
                partitioning,
                offset: 0,
                remaining: 0,
            });
        }
        let position = partitioning.locate(index)?;
        Ok(Self {
            partitioning,
            batch: position.batch,
            offset: position.offset,
            remaining: total - index,
        })
    }

    /// The position the next call to `next` will yield.
    pub fn position(&self) -> Option<ElementPosition> {
        (self.remaining > 0).then(|| ElementPosition::new(self.batch, self.offset))
    }

    /// Global index of the next element.
    pub fn index(&self) -> usize {
        self.partitioning.number_of_elements() - self.remaining
    }

    pub fn partitioning(&self) -> &Partitioning {
        &self.partitioning
    }

    fn skip_exhausted_batches(&mut self) {
        let sizes = self.partitioning.sizes();
        while self.batch < sizes.len() && self.offset >= sizes[self.batch] {
            self.batch += 1;
            self.offset = 0;
        }
    }
}

impl Iterator for IndexingIterator {
    type Item = ElementPosition;

    fn next(&mut self) -> Option<ElementPosition> {
        if self.remaining == 0 {
            return None;
        }
        let position = ElementPosition::new(self.batch, self.offset);
        self.remaining -= 1;
        self.offset += 1;
        self.skip_exhausted_batches();
        Some(position)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for IndexingIterator {}

impl FusedIterator for IndexingIterator {}

/// Lazy element view over a container.
///
/// Yields one read view per element without copying storage. Each view holds
/// a read lock on its batch for as long as it is alive.
pub struct Elements<'a, C: Container> {
    container: &'a C,
    positions: IndexingIterator,
}

impl<'a, C: Container> Elements<'a, C> {
    pub fn new(container: &'a C) -> Self {
        Self {
            container,
            positions: IndexingIterator::new(container.partitioning()),
        }
    }

    /// Restart the view at global element `index`.
    pub fn starting_at(container: &'a C, index: usize) -> Result<Self> {
        Ok(Self {
            container,
            positions: IndexingIterator::at(container.partitioning(), index)?,
        })
    }

    /// Clone every remaining element out of the container.
    pub fn cloned(self) -> Result<Vec<C::Element>> {
        let container = self.container;
        self.positions
            .map(|position| container.get_at(position))
            .collect()
    }
}

impl<'a, C: Container> Iterator for Elements<'a, C> {
    type Item = Result<C::Ref<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let position = self.positions.next()?;
        Some(self.container.element_at(position))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.positions.size_hint()
    }
}

impl<'a, C: Container> ExactSizeIterator for Elements<'a, C> {}

impl<'a, C: Container> FusedIterator for Elements<'a, C> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(p: &[usize]) -> Vec<(usize, usize)> {
        IndexingIterator::new(Partitioning::from(p))
            .map(|pos| (pos.batch, pos.offset))
            .collect()
    }

    #[test]
    fn test_walks_all_positions() {
        assert_eq!(
            positions(&[3, 2]),
            vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1)]
        );
    }

    #[test]
    fn test_skips_empty_batches() {
        assert_eq!(positions(&[0, 1, 0, 0, 2]), vec![(1, 0), (4, 0), (4, 1)]);
        assert!(positions(&[0, 0]).is_empty());
        assert!(positions(&[]).is_empty());
    }

    #[test]
    fn test_at() {
        let p = Partitioning::from(vec![3, 2]);
        let mut it = IndexingIterator::at(p.clone(), 3).unwrap();
        assert_eq!(it.index(), 3);
        assert_eq!(it.len(), 2);
        assert_eq!(it.next(), Some(ElementPosition::new(1, 0)));

        let end = IndexingIterator::at(p.clone(), 5).unwrap();
        assert_eq!(end.len(), 0);
        assert_eq!(end.position(), None);

        assert!(IndexingIterator::at(p, 6).is_err());
    }

    #[test]
    fn test_matches_locate() {
        let p = Partitioning::from(vec![4, 1, 0, 3, 2]);
        for (index, position) in IndexingIterator::new(p.clone()).enumerate() {
            assert_eq!(p.locate(index).unwrap(), position);
        }
    }
}
