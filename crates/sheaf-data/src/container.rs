// Container trait — the shared interface of every batched dataset container

use std::fmt::Debug;

use sheaf_core::{ElementPosition, Error, Partitioning, Result};

use crate::indexing::Elements;

/// An ordered sequence of batches whose layout can only be changed through
/// the structural operations below.
///
/// Cloning a container is cheap and produces an alias: both clones refer to
/// the same batch storage, so writes through one are visible through the
/// other until [`make_independent`](Container::make_independent) is called
/// on either of them.
///
/// Composite containers (labeled, weighted) apply every structural operation
/// to all of their parts or to none of them, so their parts always share one
/// partitioning.
pub trait Container: Clone {
    /// Owned form of one element, used as a blueprint and by `get`.
    type Element: Clone;
    /// Per-element metadata carried by the container.
    type Shape: Clone + Debug + Default + PartialEq;
    /// Read view of one batch.
    type Batch<'a>
    where
        Self: 'a;
    /// Write view of one batch. Batch length can not be changed through it.
    type BatchMut<'a>
    where
        Self: 'a;
    /// Read view of one element.
    type Ref<'a>
    where
        Self: 'a;
    /// Write view of one element.
    type Mut<'a>
    where
        Self: 'a;

    // Construction

    /// Create a container with the given layout, every element a clone of
    /// `blueprint`.
    fn with_partitioning(partitioning: &Partitioning, blueprint: &Self::Element) -> Self;

    /// Create `size` clones of `blueprint`, packed into balanced batches of at
    /// most `max_batch_size` elements (0 means a single batch).
    fn with_blueprint(size: usize, blueprint: &Self::Element, max_batch_size: usize) -> Self {
        Self::with_partitioning(&Partitioning::balanced(size, max_batch_size), blueprint)
    }

    /// Pack a sequence of elements into the given layout.
    ///
    /// Fails if the sequence length differs from the partitioning's element
    /// count.
    fn from_elements<I>(elements: I, partitioning: &Partitioning) -> Result<Self>
    where
        I: IntoIterator<Item = Self::Element>;

    // Queries

    /// Number of batches.
    fn size(&self) -> usize;

    /// Whether the container holds no batches.
    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Total number of elements over all batches.
    fn number_of_elements(&self) -> usize;

    /// The ordered batch sizes.
    fn partitioning(&self) -> Partitioning;

    fn shape(&self) -> Self::Shape;

    fn set_shape(&mut self, shape: Self::Shape);

    // Access

    /// Read access to batch `index`.
    fn batch(&self, index: usize) -> Result<Self::Batch<'_>>;

    /// Write access to batch `index`.
    fn batch_mut(&mut self, index: usize) -> Result<Self::BatchMut<'_>>;

    /// Read access to the element at a known position.
    fn element_at(&self, position: ElementPosition) -> Result<Self::Ref<'_>>;

    /// Write access to the element at a known position.
    fn element_mut_at(&mut self, position: ElementPosition) -> Result<Self::Mut<'_>>;

    /// Clone out the element at a known position.
    fn get_at(&self, position: ElementPosition) -> Result<Self::Element>;

    /// Read access to the element with global index `index`.
    ///
    /// Locating the element scans the batch sizes; use
    /// [`elements`](Container::elements) for sequential access.
    fn element(&self, index: usize) -> Result<Self::Ref<'_>> {
        let position = self.partitioning().locate(index)?;
        self.element_at(position)
    }

    /// Write access to the element with global index `index`.
    fn element_mut(&mut self, index: usize) -> Result<Self::Mut<'_>> {
        let position = self.partitioning().locate(index)?;
        self.element_mut_at(position)
    }

    /// Clone out the element with global index `index`.
    fn get(&self, index: usize) -> Result<Self::Element> {
        let position = self.partitioning().locate(index)?;
        self.get_at(position)
    }

    /// Lazy, restartable view over all elements in order.
    fn elements(&self) -> Elements<'_, Self>
    where
        Self: Sized,
    {
        Elements::new(self)
    }

    // Structural operations

    /// Build a container holding exactly the elements at `indices`, in that
    /// order, packed into balanced batches no larger than this container's
    /// largest batch.
    fn indexed_subset(&self, indices: &[usize]) -> Result<Self> {
        let partitioning =
            Partitioning::balanced(indices.len(), self.partitioning().max_batch_size());
        self.indexed_subset_with(indices, &partitioning)
    }

    /// Like [`indexed_subset`](Container::indexed_subset) with an explicit
    /// layout for the result.
    fn indexed_subset_with(&self, indices: &[usize], partitioning: &Partitioning)
        -> Result<Self>;

    /// Append the batches of `other` without copying; the appended batches
    /// are shared with `other` afterwards.
    fn append(&mut self, other: &Self);

    /// Check that `split_batch(batch, offset)` would succeed.
    fn validate_split(&self, batch: usize, offset: usize) -> Result<()>;

    /// Split batch `batch` into `[0, offset)` and `[offset, len)`.
    fn split_batch(&mut self, batch: usize, offset: usize) -> Result<()>;

    /// Check that `splice(batch)` would succeed.
    fn validate_splice(&self, batch: usize) -> Result<()> {
        if batch > self.size() {
            return Err(Error::BatchOutOfRange {
                index: batch,
                size: self.size(),
            });
        }
        Ok(())
    }

    /// Keep batches `[0, batch)` and return `[batch, size)` as a new container.
    fn splice(&mut self, batch: usize) -> Result<Self>;

    /// Rebuild the batch layout to match `partitioning`, copying elements.
    fn repartition(&mut self, partitioning: &Partitioning) -> Result<()>;

    /// Check that `merge_batches(first, count)` would succeed.
    fn validate_merge(&self, first: usize, count: usize) -> Result<()> {
        let size = self.size();
        let end = first.saturating_add(count);
        if first >= size || end > size {
            return Err(Error::BatchOutOfRange {
                index: first.max(end.saturating_sub(1)),
                size,
            });
        }
        Ok(())
    }

    /// Fuse `count` consecutive batches starting at `first` into one.
    ///
    /// Only the merged batches are copied; every other batch keeps its
    /// storage and thus its aliases.
    fn merge_batches(&mut self, first: usize, count: usize) -> Result<()>;

    /// Deep-copy every batch that is still shared with another container.
    fn make_independent(&mut self) -> Result<()>;
}

/// Apply a structural change to two co-located parts as one transaction.
///
/// Both operations run on aliases of the parts; the parts are only replaced
/// once both succeeded, so a failure on either side leaves both untouched.
pub(crate) fn transact<A, B>(
    a: &mut A,
    b: &mut B,
    op_a: impl FnOnce(&mut A) -> Result<()>,
    op_b: impl FnOnce(&mut B) -> Result<()>,
) -> Result<()>
where
    A: Clone,
    B: Clone,
{
    let mut next_a = a.clone();
    op_a(&mut next_a)?;
    let mut next_b = b.clone();
    op_b(&mut next_b)?;
    *a = next_a;
    *b = next_b;
    Ok(())
}

/// Check that two co-located parts have the same layout.
pub(crate) fn check_partitioning(
    context: &'static str,
    left: Partitioning,
    right: Partitioning,
) -> Result<()> {
    if left.number_of_elements() != right.number_of_elements() {
        return Err(Error::ElementCountMismatch {
            context,
            expected: left.number_of_elements(),
            got: right.number_of_elements(),
        });
    }
    if left != right {
        return Err(Error::PartitioningMismatch {
            context,
            left,
            right,
        });
    }
    Ok(())
}

/// Check that every entry of an index set addresses one of `len` elements.
pub(crate) fn check_indices(indices: &[usize], len: usize) -> Result<()> {
    match indices.iter().find(|&&i| i >= len) {
        Some(&index) => Err(Error::InvalidIndex { index, len }),
        None => Ok(()),
    }
}
