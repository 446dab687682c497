// BatchContainer — an ordered sequence of shared batches
//
// MEMORY MODEL:
//
//   Every batch is a Vec<T> behind Arc<RwLock<_>>. Containers hold handles to
//   batches, not the batches themselves, so:
//   - Cloning a container only clones handles (the clone aliases every batch)
//   - append/splice move or copy handles, never elements
//   - Writing through a batch handle is visible to every container holding it
//
//   make_independent() is the only way to break sharing: it replaces every
//   handle that has other owners with a handle to a fresh deep copy.
//
//   A batch never changes length after it is created. Operations that change
//   the layout (split, repartition) build new batches instead of resizing
//   shared ones, so a container's partitioning can be read without locking.
//
// LOCKING:
//
//   Locks are only taken with try_read/try_write. A batch that is locked
//   elsewhere (e.g. a read guard obtained through an alias is still alive)
//   produces Error::Busy instead of blocking.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};

use tracing::{debug, trace};

use sheaf_core::{ElementPosition, Error, Partitioning, Result, Shape};

use crate::container::{check_indices, Container};

/// Handle to one shared batch.
pub(crate) struct SharedBatch<T> {
    len: usize,
    storage: Arc<RwLock<Vec<T>>>,
}

impl<T> Clone for SharedBatch<T> {
    fn clone(&self) -> Self {
        Self {
            len: self.len,
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<T> SharedBatch<T> {
    pub(crate) fn new(elements: Vec<T>) -> Self {
        Self {
            len: elements.len(),
            storage: Arc::new(RwLock::new(elements)),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Whether any other handle refers to the same storage.
    pub(crate) fn is_shared(&self) -> bool {
        Arc::strong_count(&self.storage) > 1
    }

    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }

    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, Vec<T>>> {
        self.storage.try_read().map_err(|e| match e {
            TryLockError::Poisoned(_) => Error::Poisoned,
            TryLockError::WouldBlock => Error::Busy,
        })
    }

    pub(crate) fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<T>>> {
        self.storage.try_write().map_err(|e| match e {
            TryLockError::Poisoned(_) => Error::Poisoned,
            TryLockError::WouldBlock => Error::Busy,
        })
    }
}

impl<T: Clone> SharedBatch<T> {
    /// A new, unshared batch with the same contents.
    fn deep_copy(&self) -> Result<Self> {
        Ok(Self::new(self.read()?.clone()))
    }
}

// Guards

/// Read view of one batch.
pub struct BatchRef<'a, T> {
    guard: RwLockReadGuard<'a, Vec<T>>,
}

impl<T> Deref for BatchRef<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.guard
    }
}

impl<T: fmt::Debug> fmt::Debug for BatchRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Write view of one batch.
///
/// Dereferences to a slice: elements can be overwritten, but the batch can
/// not grow or shrink.
pub struct BatchMut<'a, T> {
    guard: RwLockWriteGuard<'a, Vec<T>>,
}

impl<T> Deref for BatchMut<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.guard
    }
}

impl<T> DerefMut for BatchMut<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.guard
    }
}

impl<T: fmt::Debug> fmt::Debug for BatchMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Read view of one element.
pub struct ElementRef<'a, T> {
    guard: RwLockReadGuard<'a, Vec<T>>,
    offset: usize,
}

impl<T> Deref for ElementRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard[self.offset]
    }
}

impl<T: fmt::Debug> fmt::Debug for ElementRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: fmt::Display> fmt::Display for ElementRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

/// Write view of one element.
pub struct ElementMut<'a, T> {
    guard: RwLockWriteGuard<'a, Vec<T>>,
    offset: usize,
}

impl<T> Deref for ElementMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard[self.offset]
    }
}

impl<T> DerefMut for ElementMut<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard[self.offset]
    }
}

impl<T: fmt::Debug> fmt::Debug for ElementMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

// BatchContainer

/// Ordered sequence of batches of `T`.
///
/// ```
/// use sheaf_data::{BatchContainer, Container};
///
/// let mut data = BatchContainer::from_range(0..5, 3);
/// assert_eq!(data.partitioning().sizes(), &[3, 2]);
///
/// let tail = data.splice(1).unwrap();
/// assert_eq!(data.number_of_elements(), 3);
/// assert_eq!(tail.number_of_elements(), 2);
/// ```
pub struct BatchContainer<T> {
    batches: Vec<SharedBatch<T>>,
    shape: Shape,
}

impl<T> Clone for BatchContainer<T> {
    fn clone(&self) -> Self {
        Self {
            batches: self.batches.clone(),
            shape: self.shape.clone(),
        }
    }
}

impl<T> Default for BatchContainer<T> {
    fn default() -> Self {
        Self {
            batches: Vec::new(),
            shape: Shape::default(),
        }
    }
}

impl<T> fmt::Debug for BatchContainer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchContainer")
            .field("partitioning", &self.partitioning_sizes())
            .field("shape", &self.shape)
            .finish()
    }
}

impl<T> BatchContainer<T> {
    /// An empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap already-formed batches, one `Vec` per batch.
    pub fn from_batches(batches: Vec<Vec<T>>) -> Self {
        Self {
            batches: batches.into_iter().map(SharedBatch::new).collect(),
            shape: Shape::default(),
        }
    }

    /// Pack a range of elements into balanced batches of at most
    /// `max_batch_size` elements (0 means a single batch).
    pub fn from_range<I>(elements: I, max_batch_size: usize) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let elements: Vec<T> = elements.into_iter().collect();
        let partitioning = Partitioning::balanced(elements.len(), max_batch_size);
        Self::pack(elements, &partitioning)
    }

    /// Set the element shape, builder style.
    pub fn with_shape(mut self, shape: impl Into<Shape>) -> Self {
        self.shape = shape.into();
        self
    }

    /// Whether this container shares at least one batch with `other`.
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        self.batches
            .iter()
            .any(|a| other.batches.iter().any(|b| a.ptr_eq(b)))
    }

    /// Whether no batch is shared with any other container.
    pub fn is_independent(&self) -> bool {
        self.batches.iter().all(|b| !b.is_shared())
    }

    pub(crate) fn shared_batches(&self) -> &[SharedBatch<T>] {
        &self.batches
    }

    pub(crate) fn shape_ref(&self) -> &Shape {
        &self.shape
    }

    fn partitioning_sizes(&self) -> Vec<usize> {
        self.batches.iter().map(SharedBatch::len).collect()
    }

    fn shared_batch(&self, index: usize) -> Result<&SharedBatch<T>> {
        self.batches.get(index).ok_or(Error::BatchOutOfRange {
            index,
            size: self.batches.len(),
        })
    }

    fn checked_position(&self, position: ElementPosition) -> Result<&SharedBatch<T>> {
        let batch = self.shared_batch(position.batch)?;
        if position.offset >= batch.len() {
            return Err(Error::ElementOutOfRange {
                index: position.offset,
                len: batch.len(),
            });
        }
        Ok(batch)
    }

    /// Split an owned element vector into batches. The caller guarantees the
    /// element count matches.
    fn pack(elements: Vec<T>, partitioning: &Partitioning) -> Self {
        let mut batches = Vec::with_capacity(partitioning.len());
        let mut rest = elements.into_iter();
        for &size in partitioning {
            batches.push(SharedBatch::new(rest.by_ref().take(size).collect()));
        }
        Self {
            batches,
            shape: Shape::default(),
        }
    }
}

impl<T: Clone> BatchContainer<T> {
    /// Clone every element out, in order.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        let mut out = Vec::with_capacity(self.number_of_elements());
        for batch in &self.batches {
            out.extend_from_slice(&batch.read()?);
        }
        Ok(out)
    }
}

impl<T: Clone> Container for BatchContainer<T> {
    type Element = T;
    type Shape = Shape;
    type Batch<'a> = BatchRef<'a, T> where Self: 'a;
    type BatchMut<'a> = BatchMut<'a, T> where Self: 'a;
    type Ref<'a> = ElementRef<'a, T> where Self: 'a;
    type Mut<'a> = ElementMut<'a, T> where Self: 'a;

    fn with_partitioning(partitioning: &Partitioning, blueprint: &T) -> Self {
        Self {
            batches: partitioning
                .iter()
                .map(|&size| SharedBatch::new(vec![blueprint.clone(); size]))
                .collect(),
            shape: Shape::default(),
        }
    }

    fn from_elements<I>(elements: I, partitioning: &Partitioning) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
    {
        let elements: Vec<T> = elements.into_iter().collect();
        if elements.len() != partitioning.number_of_elements() {
            return Err(Error::ElementCountMismatch {
                context: "from_elements",
                expected: partitioning.number_of_elements(),
                got: elements.len(),
            });
        }
        Ok(Self::pack(elements, partitioning))
    }

    fn size(&self) -> usize {
        self.batches.len()
    }

    fn number_of_elements(&self) -> usize {
        self.batches.iter().map(SharedBatch::len).sum()
    }

    fn partitioning(&self) -> Partitioning {
        Partitioning::new(self.partitioning_sizes())
    }

    fn shape(&self) -> Shape {
        self.shape.clone()
    }

    fn set_shape(&mut self, shape: Shape) {
        self.shape = shape;
    }

    fn batch(&self, index: usize) -> Result<BatchRef<'_, T>> {
        let guard = self.shared_batch(index)?.read()?;
        Ok(BatchRef { guard })
    }

    fn batch_mut(&mut self, index: usize) -> Result<BatchMut<'_, T>> {
        let guard = self.shared_batch(index)?.write()?;
        Ok(BatchMut { guard })
    }

    fn element_at(&self, position: ElementPosition) -> Result<ElementRef<'_, T>> {
        let guard = self.checked_position(position)?.read()?;
        Ok(ElementRef {
            guard,
            offset: position.offset,
        })
    }

    fn element_mut_at(&mut self, position: ElementPosition) -> Result<ElementMut<'_, T>> {
        let guard = self.checked_position(position)?.write()?;
        Ok(ElementMut {
            guard,
            offset: position.offset,
        })
    }

    fn get_at(&self, position: ElementPosition) -> Result<T> {
        Ok(self.element_at(position)?.clone())
    }

    fn indexed_subset_with(&self, indices: &[usize], partitioning: &Partitioning) -> Result<Self> {
        let len = self.number_of_elements();
        check_indices(indices, len)?;
        if indices.len() != partitioning.number_of_elements() {
            return Err(Error::ElementCountMismatch {
                context: "indexed_subset",
                expected: partitioning.number_of_elements(),
                got: indices.len(),
            });
        }

        // Cumulative batch ends, so each index is located by binary search.
        let ends: Vec<usize> = self
            .batches
            .iter()
            .scan(0, |end, b| {
                *end += b.len();
                Some(*end)
            })
            .collect();

        let guards = self
            .batches
            .iter()
            .map(SharedBatch::read)
            .collect::<Result<Vec<_>>>()?;

        let elements: Vec<T> = indices
            .iter()
            .map(|&index| {
                let batch = ends.partition_point(|&end| end <= index);
                let start = if batch == 0 { 0 } else { ends[batch - 1] };
                guards[batch][index - start].clone()
            })
            .collect();
        drop(guards);

        let mut subset = Self::pack(elements, partitioning);
        subset.shape = self.shape.clone();
        Ok(subset)
    }

    fn append(&mut self, other: &Self) {
        self.batches.extend(other.batches.iter().cloned());
    }

    fn validate_split(&self, batch: usize, offset: usize) -> Result<()> {
        let size = self.shared_batch(batch)?.len();
        if offset == 0 || offset >= size {
            return Err(Error::InvalidSplit {
                batch,
                offset,
                size,
            });
        }
        Ok(())
    }

    fn split_batch(&mut self, batch: usize, offset: usize) -> Result<()> {
        self.validate_split(batch, offset)?;
        let (front, back) = {
            let elements = self.batches[batch].read()?;
            (elements[..offset].to_vec(), elements[offset..].to_vec())
        };
        trace!(batch, offset, "splitting batch");
        self.batches[batch] = SharedBatch::new(front);
        self.batches.insert(batch + 1, SharedBatch::new(back));
        Ok(())
    }

    fn splice(&mut self, batch: usize) -> Result<Self> {
        self.validate_splice(batch)?;
        let tail = self.batches.split_off(batch);
        debug!(
            kept = self.batches.len(),
            moved = tail.len(),
            "spliced batch container"
        );
        Ok(Self {
            batches: tail,
            shape: self.shape.clone(),
        })
    }

    fn repartition(&mut self, partitioning: &Partitioning) -> Result<()> {
        let len = self.number_of_elements();
        if partitioning.number_of_elements() != len {
            return Err(Error::ElementCountMismatch {
                context: "repartition",
                expected: len,
                got: partitioning.number_of_elements(),
            });
        }
        let elements = self.to_vec()?;
        debug!(
            from = %self.partitioning(),
            to = %partitioning,
            "repartitioning batch container"
        );
        self.batches = Self::pack(elements, partitioning).batches;
        Ok(())
    }

    fn merge_batches(&mut self, first: usize, count: usize) -> Result<()> {
        self.validate_merge(first, count)?;
        if count <= 1 {
            return Ok(());
        }
        let end = first + count;
        let merged = {
            let mut elements = Vec::with_capacity(
                self.batches[first..end].iter().map(SharedBatch::len).sum(),
            );
            for batch in &self.batches[first..end] {
                elements.extend_from_slice(&batch.read()?);
            }
            elements
        };
        trace!(first, count, "merging batches");
        self.batches.drain(first + 1..end);
        self.batches[first] = SharedBatch::new(merged);
        Ok(())
    }

    fn make_independent(&mut self) -> Result<()> {
        let mut copied = 0;
        for batch in &mut self.batches {
            if batch.is_shared() {
                *batch = batch.deep_copy()?;
                copied += 1;
            }
        }
        if copied > 0 {
            debug!(copied, batches = self.batches.len(), "made container independent");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes<T: Clone>(c: &BatchContainer<T>) -> Vec<usize> {
        c.partitioning().into_inner()
    }

    #[test]
    fn test_from_range() {
        let c = BatchContainer::from_range(0..10, 4);
        assert_eq!(c.size(), 3);
        assert_eq!(sizes(&c), vec![4, 3, 3]);
        assert_eq!(c.number_of_elements(), 10);
        assert_eq!(c.to_vec().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_with_blueprint() {
        let c = BatchContainer::with_blueprint(7, &vec![0.0f64; 3], 3);
        assert_eq!(sizes(&c), vec![3, 2, 2]);
        assert_eq!(c.get(6).unwrap(), vec![0.0; 3]);
    }

    #[test]
    fn test_batch_out_of_range() {
        let c = BatchContainer::from_batches(vec![vec![1, 2, 3], vec![4, 5]]);
        assert!(c.batch(1).is_ok());
        assert!(matches!(
            c.batch(2),
            Err(Error::BatchOutOfRange { index: 2, size: 2 })
        ));
    }

    #[test]
    fn test_element_access() {
        let mut c = BatchContainer::from_batches(vec![vec![1, 2, 3], vec![4, 5]]);
        assert_eq!(*c.element(3).unwrap(), 4);
        *c.element_mut(4).unwrap() = 50;
        assert_eq!(&*c.batch(1).unwrap(), &[4, 50]);
        assert!(matches!(
            c.element(5),
            Err(Error::ElementOutOfRange { index: 5, len: 5 })
        ));
    }

    #[test]
    fn test_batch_mut_writes_through() {
        let mut c = BatchContainer::from_batches(vec![vec![1, 2, 3]]);
        {
            let mut b = c.batch_mut(0).unwrap();
            b[1] = 20;
            b.reverse();
        }
        assert_eq!(c.to_vec().unwrap(), vec![3, 20, 1]);
    }

    #[test]
    fn test_split_batch() {
        let mut c = BatchContainer::from_batches(vec![vec![1, 2, 3], vec![4, 5]]);
        c.split_batch(0, 1).unwrap();
        assert_eq!(sizes(&c), vec![1, 2, 2]);
        assert_eq!(c.to_vec().unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_split_batch_rejects_boundaries() {
        let mut c = BatchContainer::from_batches(vec![vec![1, 2, 3], vec![4, 5]]);
        for offset in [0, 3, 4] {
            let err = c.split_batch(0, offset).unwrap_err();
            assert!(matches!(err, Error::InvalidSplit { batch: 0, .. }));
        }
        assert!(matches!(
            c.split_batch(2, 1),
            Err(Error::BatchOutOfRange { .. })
        ));
        assert_eq!(sizes(&c), vec![3, 2]);
    }

    #[test]
    fn test_split_does_not_touch_aliases() {
        let mut a = BatchContainer::from_batches(vec![vec![1, 2, 3]]);
        let b = a.clone();
        a.split_batch(0, 2).unwrap();
        assert_eq!(sizes(&a), vec![2, 1]);
        assert_eq!(sizes(&b), vec![3]);
    }

    #[test]
    fn test_merge_batches_restores_layout() {
        let mut c = BatchContainer::from_batches(vec![vec![1, 2, 3], vec![4, 5]]);
        c.split_batch(0, 1).unwrap();
        c.merge_batches(0, 2).unwrap();
        assert_eq!(sizes(&c), vec![3, 2]);
        assert_eq!(c.to_vec().unwrap(), vec![1, 2, 3, 4, 5]);
        assert!(c.merge_batches(1, 2).is_err());
    }

    #[test]
    fn test_merge_keeps_other_batches_shared() {
        let mut a = BatchContainer::from_batches(vec![vec![1], vec![2]]);
        let mut b = BatchContainer::from_batches(vec![vec![3, 4]]);
        a.append(&b);
        a.merge_batches(0, 2).unwrap();
        assert_eq!(sizes(&a), vec![2, 2]);
        assert!(a.shares_storage_with(&b));

        *b.element_mut(0).unwrap() = 30;
        assert_eq!(a.to_vec().unwrap(), vec![1, 2, 30, 4]);
    }

    #[test]
    fn test_merge_does_not_touch_aliases() {
        let mut a = BatchContainer::from_batches(vec![vec![1], vec![2], vec![3]]);
        let b = a.clone();
        a.merge_batches(1, 2).unwrap();
        assert_eq!(sizes(&a), vec![1, 2]);
        assert_eq!(sizes(&b), vec![1, 1, 1]);
        // the untouched first batch is still shared
        assert!(a.shares_storage_with(&b));
        a.merge_batches(0, 1).unwrap();
        assert_eq!(sizes(&a), vec![1, 2]);
    }

    #[test]
    fn test_splice() {
        let mut c = BatchContainer::from_batches(vec![vec![1], vec![2, 3], vec![4]]).with_shape(4);
        let tail = c.splice(1).unwrap();
        assert_eq!(c.to_vec().unwrap(), vec![1]);
        assert_eq!(tail.to_vec().unwrap(), vec![2, 3, 4]);
        assert_eq!(tail.shape(), Shape::from(4));

        let empty = c.splice(1).unwrap();
        assert!(empty.is_empty());
        assert!(matches!(c.splice(2), Err(Error::BatchOutOfRange { .. })));
    }

    #[test]
    fn test_indexed_subset() {
        let c = BatchContainer::from_batches(vec![vec![10, 11, 12], vec![13, 14]]);
        let s = c.indexed_subset(&[4, 0, 3, 3]).unwrap();
        assert_eq!(s.to_vec().unwrap(), vec![14, 10, 13, 13]);
        // balanced into batches no larger than the source's largest batch
        assert_eq!(sizes(&s), vec![2, 2]);

        let err = c.indexed_subset(&[1, 5]).unwrap_err();
        assert!(matches!(err, Error::InvalidIndex { index: 5, len: 5 }));
    }

    #[test]
    fn test_indexed_subset_with_layout() {
        let c = BatchContainer::from_range(0..6, 3);
        let s = c
            .indexed_subset_with(&[5, 4, 3], &Partitioning::from(vec![1, 2]))
            .unwrap();
        assert_eq!(sizes(&s), vec![1, 2]);
        assert_eq!(s.to_vec().unwrap(), vec![5, 4, 3]);
        assert!(c
            .indexed_subset_with(&[0], &Partitioning::from(vec![2]))
            .is_err());
    }

    #[test]
    fn test_append_aliases_until_independent() {
        let mut a = BatchContainer::from_batches(vec![vec![1, 2]]);
        let mut b = BatchContainer::from_batches(vec![vec![3], vec![4, 5]]);
        a.append(&b);
        assert!(a.shares_storage_with(&b));

        *a.element_mut(2).unwrap() = 30;
        assert_eq!(b.to_vec().unwrap(), vec![30, 4, 5]);

        a.make_independent().unwrap();
        assert!(!a.shares_storage_with(&b));
        *b.element_mut(0).unwrap() = 300;
        assert_eq!(a.to_vec().unwrap(), vec![1, 2, 30, 4, 5]);
    }

    #[test]
    fn test_make_independent_is_idempotent() {
        let mut a = BatchContainer::from_range(0..4, 2);
        let b = a.clone();
        assert!(!a.is_independent());
        a.make_independent().unwrap();
        assert!(a.is_independent());
        a.make_independent().unwrap();
        assert_eq!(a.to_vec().unwrap(), b.to_vec().unwrap());
    }

    #[test]
    fn test_busy_alias_does_not_block() {
        let a = BatchContainer::from_batches(vec![vec![1, 2]]);
        let mut b = a.clone();
        let guard = a.batch(0).unwrap();
        assert!(matches!(b.batch_mut(0), Err(Error::Busy)));
        drop(guard);
        assert!(b.batch_mut(0).is_ok());
    }

    #[test]
    fn test_repartition() {
        let mut c = BatchContainer::from_range(0..5, 0);
        c.repartition(&Partitioning::from(vec![2, 2, 1])).unwrap();
        assert_eq!(sizes(&c), vec![2, 2, 1]);
        assert_eq!(c.to_vec().unwrap(), vec![0, 1, 2, 3, 4]);
        assert!(c.repartition(&Partitioning::from(vec![4])).is_err());
    }
}
