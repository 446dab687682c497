// LabeledContainer — inputs and labels stored side by side

use std::fmt;

use sheaf_core::{ElementPosition, Error, Partitioning, Result, Shape};

use crate::batch::{BatchContainer, BatchMut, BatchRef, ElementMut, ElementRef};
use crate::container::{check_partitioning, transact, Container};

/// A pair of an input and its label.
///
/// Used for owned elements (`InputLabelPair<I, L>`) as well as for batch and
/// element views, where both fields are guards into the two containers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct InputLabelPair<I, L> {
    pub input: I,
    pub label: L,
}

impl<I, L> InputLabelPair<I, L> {
    pub fn new(input: I, label: L) -> Self {
        Self { input, label }
    }
}

/// Shapes of the input and label side.
pub type LabeledShape = InputLabelPair<Shape, Shape>;

/// Inputs and labels with identical partitioning.
///
/// Every structural operation is applied to both sides or to neither.
pub struct LabeledContainer<I, L> {
    inputs: BatchContainer<I>,
    labels: BatchContainer<L>,
}

impl<I, L> Clone for LabeledContainer<I, L> {
    fn clone(&self) -> Self {
        Self {
            inputs: self.inputs.clone(),
            labels: self.labels.clone(),
        }
    }
}

impl<I, L> Default for LabeledContainer<I, L> {
    fn default() -> Self {
        Self {
            inputs: BatchContainer::default(),
            labels: BatchContainer::default(),
        }
    }
}

impl<I, L> fmt::Debug for LabeledContainer<I, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabeledContainer")
            .field("inputs", &self.inputs)
            .field("labels", &self.labels)
            .finish()
    }
}

impl<I: Clone, L: Clone> LabeledContainer<I, L> {
    /// Pair existing input and label containers.
    ///
    /// Both must have the same partitioning; nothing is reorganised.
    pub fn new(inputs: BatchContainer<I>, labels: BatchContainer<L>) -> Result<Self> {
        check_partitioning(
            "labeled container",
            inputs.partitioning(),
            labels.partitioning(),
        )?;
        Ok(Self { inputs, labels })
    }

    /// Pack input and label ranges of equal length into balanced batches.
    pub fn from_ranges<RI, RL>(inputs: RI, labels: RL, max_batch_size: usize) -> Result<Self>
    where
        RI: IntoIterator<Item = I>,
        RL: IntoIterator<Item = L>,
    {
        let inputs: Vec<I> = inputs.into_iter().collect();
        let labels: Vec<L> = labels.into_iter().collect();
        if inputs.len() != labels.len() {
            return Err(Error::ElementCountMismatch {
                context: "labeled ranges",
                expected: inputs.len(),
                got: labels.len(),
            });
        }
        Ok(Self {
            inputs: BatchContainer::from_range(inputs, max_batch_size),
            labels: BatchContainer::from_range(labels, max_batch_size),
        })
    }
}

impl<I, L> LabeledContainer<I, L> {
    pub fn inputs(&self) -> &BatchContainer<I> {
        &self.inputs
    }

    pub fn labels(&self) -> &BatchContainer<L> {
        &self.labels
    }

    pub fn into_parts(self) -> (BatchContainer<I>, BatchContainer<L>) {
        (self.inputs, self.labels)
    }
}

impl<I: Clone, L: Clone> Container for LabeledContainer<I, L> {
    type Element = InputLabelPair<I, L>;
    type Shape = LabeledShape;
    type Batch<'a> = InputLabelPair<BatchRef<'a, I>, BatchRef<'a, L>> where Self: 'a;
    type BatchMut<'a> = InputLabelPair<BatchMut<'a, I>, BatchMut<'a, L>> where Self: 'a;
    type Ref<'a> = InputLabelPair<ElementRef<'a, I>, ElementRef<'a, L>> where Self: 'a;
    type Mut<'a> = InputLabelPair<ElementMut<'a, I>, ElementMut<'a, L>> where Self: 'a;

    fn with_partitioning(partitioning: &Partitioning, blueprint: &Self::Element) -> Self {
        Self {
            inputs: BatchContainer::with_partitioning(partitioning, &blueprint.input),
            labels: BatchContainer::with_partitioning(partitioning, &blueprint.label),
        }
    }

    fn from_elements<E>(elements: E, partitioning: &Partitioning) -> Result<Self>
    where
        E: IntoIterator<Item = Self::Element>,
    {
        let (inputs, labels): (Vec<I>, Vec<L>) = elements
            .into_iter()
            .map(|pair| (pair.input, pair.label))
            .unzip();
        Ok(Self {
            inputs: BatchContainer::from_elements(inputs, partitioning)?,
            labels: BatchContainer::from_elements(labels, partitioning)?,
        })
    }

    fn size(&self) -> usize {
        self.inputs.size()
    }

    fn number_of_elements(&self) -> usize {
        self.inputs.number_of_elements()
    }

    fn partitioning(&self) -> Partitioning {
        self.inputs.partitioning()
    }

    fn shape(&self) -> LabeledShape {
        InputLabelPair::new(self.inputs.shape(), self.labels.shape())
    }

    fn set_shape(&mut self, shape: LabeledShape) {
        self.inputs.set_shape(shape.input);
        self.labels.set_shape(shape.label);
    }

    fn batch(&self, index: usize) -> Result<Self::Batch<'_>> {
        Ok(InputLabelPair {
            input: self.inputs.batch(index)?,
            label: self.labels.batch(index)?,
        })
    }

    fn batch_mut(&mut self, index: usize) -> Result<Self::BatchMut<'_>> {
        Ok(InputLabelPair {
            input: self.inputs.batch_mut(index)?,
            label: self.labels.batch_mut(index)?,
        })
    }

    fn element_at(&self, position: ElementPosition) -> Result<Self::Ref<'_>> {
        Ok(InputLabelPair {
            input: self.inputs.element_at(position)?,
            label: self.labels.element_at(position)?,
        })
    }

    fn element_mut_at(&mut self, position: ElementPosition) -> Result<Self::Mut<'_>> {
        Ok(InputLabelPair {
            input: self.inputs.element_mut_at(position)?,
            label: self.labels.element_mut_at(position)?,
        })
    }

    fn get_at(&self, position: ElementPosition) -> Result<Self::Element> {
        Ok(InputLabelPair {
            input: self.inputs.get_at(position)?,
            label: self.labels.get_at(position)?,
        })
    }

    fn indexed_subset_with(&self, indices: &[usize], partitioning: &Partitioning) -> Result<Self> {
        Ok(Self {
            inputs: self.inputs.indexed_subset_with(indices, partitioning)?,
            labels: self.labels.indexed_subset_with(indices, partitioning)?,
        })
    }

    fn append(&mut self, other: &Self) {
        self.inputs.append(&other.inputs);
        self.labels.append(&other.labels);
    }

    fn validate_split(&self, batch: usize, offset: usize) -> Result<()> {
        self.inputs.validate_split(batch, offset)?;
        self.labels.validate_split(batch, offset)
    }

    fn split_batch(&mut self, batch: usize, offset: usize) -> Result<()> {
        self.validate_split(batch, offset)?;
        transact(
            &mut self.inputs,
            &mut self.labels,
            |inputs| inputs.split_batch(batch, offset),
            |labels| labels.split_batch(batch, offset),
        )
    }

    fn splice(&mut self, batch: usize) -> Result<Self> {
        self.inputs.validate_splice(batch)?;
        self.labels.validate_splice(batch)?;
        Ok(Self {
            inputs: self.inputs.splice(batch)?,
            labels: self.labels.splice(batch)?,
        })
    }

    fn repartition(&mut self, partitioning: &Partitioning) -> Result<()> {
        transact(
            &mut self.inputs,
            &mut self.labels,
            |inputs| inputs.repartition(partitioning),
            |labels| labels.repartition(partitioning),
        )
    }

    fn merge_batches(&mut self, first: usize, count: usize) -> Result<()> {
        self.validate_merge(first, count)?;
        transact(
            &mut self.inputs,
            &mut self.labels,
            |inputs| inputs.merge_batches(first, count),
            |labels| labels.merge_batches(first, count),
        )
    }

    fn make_independent(&mut self) -> Result<()> {
        self.inputs.make_independent()?;
        self.labels.make_independent()
    }
}

// Class statistics for integer labels

/// Label types that encode a class index.
///
/// Implemented only for integer types that fit into `usize` on the target,
/// so the conversion never truncates.
pub trait ClassLabel: Copy {
    fn class_index(self) -> usize;
}

macro_rules! class_label {
    ( $($t:ty)* ) => {
        $(
            impl ClassLabel for $t {
                fn class_index(self) -> usize {
                    self as usize
                }
            }
        )*
    };
}

class_label!(u8 u16 usize);

#[cfg(any(target_pointer_width = "32", target_pointer_width = "64"))]
class_label!(u32);

#[cfg(target_pointer_width = "64")]
class_label!(u64);

impl<L: ClassLabel> BatchContainer<L> {
    /// Highest label plus one, or 0 when there are no labels.
    pub fn number_of_classes(&self) -> Result<usize> {
        let mut classes = 0;
        for batch in self.shared_batches() {
            for &label in batch.read()?.iter() {
                classes = classes.max(label.class_index() + 1);
            }
        }
        Ok(classes)
    }

    /// Number of elements of every class.
    pub fn class_sizes(&self) -> Result<Vec<usize>> {
        let mut sizes = vec![0; self.number_of_classes()?];
        for batch in self.shared_batches() {
            for &label in batch.read()?.iter() {
                sizes[label.class_index()] += 1;
            }
        }
        Ok(sizes)
    }
}

impl<I: Clone, L: ClassLabel> LabeledContainer<I, L> {
    pub fn number_of_classes(&self) -> Result<usize> {
        self.labels.number_of_classes()
    }

    pub fn class_sizes(&self) -> Result<Vec<usize>> {
        self.labels.class_sizes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy(n: usize, batch_size: usize) -> LabeledContainer<f64, u32> {
        LabeledContainer::from_ranges(
            (0..n).map(|i| i as f64),
            (0..n).map(|i| (i % 3) as u32),
            batch_size,
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_mismatched_partitioning() {
        let inputs = BatchContainer::from_batches(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0]]);
        let labels = BatchContainer::from_batches(vec![vec![0u32, 1], vec![0, 1, 0]]);
        let err = LabeledContainer::new(inputs.clone(), labels).unwrap_err();
        assert!(matches!(err, Error::PartitioningMismatch { .. }));

        let labels = BatchContainer::from_batches(vec![vec![0u32, 1, 1]]);
        let err = LabeledContainer::new(inputs, labels).unwrap_err();
        assert!(matches!(err, Error::ElementCountMismatch { .. }));
    }

    #[test]
    fn test_from_ranges_length_mismatch() {
        let err = LabeledContainer::<f64, u32>::from_ranges(vec![1.0, 2.0], vec![0], 4)
            .unwrap_err();
        assert!(matches!(err, Error::ElementCountMismatch { .. }));
    }

    #[test]
    fn test_element_views() {
        let mut ds = toy(5, 3);
        let e = ds.element(4).unwrap();
        assert_eq!(*e.input, 4.0);
        assert_eq!(*e.label, 1);
        drop(e);

        {
            let mut e = ds.element_mut(4).unwrap();
            *e.label = 2;
        }
        assert_eq!(*ds.labels().element(4).unwrap(), 2);
    }

    #[test]
    fn test_batch_views() {
        let ds = toy(5, 3);
        let b = ds.batch(1).unwrap();
        assert_eq!(&*b.input, &[3.0, 4.0]);
        assert_eq!(&*b.label, &[0, 1]);
    }

    #[test]
    fn test_split_keeps_sides_in_sync() {
        let mut ds = toy(5, 3);
        ds.split_batch(0, 2).unwrap();
        assert_eq!(ds.partitioning().sizes(), &[2, 1, 2]);
        assert_eq!(ds.inputs().partitioning(), ds.labels().partitioning());

        assert!(ds.split_batch(1, 1).is_err());
        assert_eq!(ds.inputs().partitioning(), ds.labels().partitioning());
    }

    #[test]
    fn test_failed_split_leaves_both_sides() {
        let mut ds = toy(5, 3);
        // hold a guard on the label batch so the label side cannot be read for
        // the split; the input side must not be split either
        let labels = ds.labels().clone();
        let mut labels_alias = labels.clone();
        let guard = labels_alias.batch_mut(0).unwrap();
        assert!(matches!(ds.split_batch(0, 1), Err(Error::Busy)));
        drop(guard);
        assert_eq!(ds.inputs().partitioning().sizes(), &[3, 2]);
        assert_eq!(ds.labels().partitioning().sizes(), &[3, 2]);
    }

    #[test]
    fn test_splice_and_append() {
        let mut ds = toy(9, 3);
        let tail = ds.splice(2).unwrap();
        assert_eq!(ds.number_of_elements(), 6);
        assert_eq!(tail.number_of_elements(), 3);
        ds.append(&tail);
        let inputs = ds.inputs().to_vec().unwrap();
        assert_eq!(inputs, (0..9).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn test_from_elements() {
        let pairs = vec![
            InputLabelPair::new(1.0, 0u32),
            InputLabelPair::new(2.0, 1),
            InputLabelPair::new(3.0, 1),
        ];
        let ds = LabeledContainer::from_elements(pairs, &Partitioning::from(vec![1, 2])).unwrap();
        assert_eq!(ds.get(2).unwrap(), InputLabelPair::new(3.0, 1));
    }

    #[test]
    fn test_class_statistics() {
        let ds = toy(7, 3);
        assert_eq!(ds.number_of_classes().unwrap(), 3);
        assert_eq!(ds.class_sizes().unwrap(), vec![3, 2, 2]);

        let empty = LabeledContainer::<f64, u32>::default();
        assert_eq!(empty.number_of_classes().unwrap(), 0);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_wide_labels_keep_their_value() {
        let big = u64::from(u32::MAX) + 2;
        assert_eq!(big.class_index(), 4_294_967_297);

        let labels = BatchContainer::from_range(vec![0u64, 3, 3], 2);
        assert_eq!(labels.number_of_classes().unwrap(), 4);
        assert_eq!(labels.class_sizes().unwrap(), vec![1, 0, 0, 2]);
    }

    #[test]
    fn test_merge_keeps_sides_in_sync() {
        let mut ds = toy(9, 3);
        ds.merge_batches(1, 2).unwrap();
        assert_eq!(ds.partitioning().sizes(), &[3, 6]);
        assert_eq!(ds.labels().partitioning().sizes(), &[3, 6]);
        assert_eq!(ds.get(8).unwrap(), InputLabelPair::new(8.0, 2));
        assert!(ds.merge_batches(1, 2).is_err());
        assert_eq!(ds.inputs().partitioning(), ds.labels().partitioning());
    }

    #[test]
    fn test_shape() {
        let mut ds = toy(3, 0);
        ds.set_shape(InputLabelPair::new(Shape::from(1), Shape::scalar()));
        let subset = ds.indexed_subset(&[2, 1]).unwrap();
        assert_eq!(subset.shape().input, Shape::from(1));
    }
}
