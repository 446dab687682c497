// WeightedContainer — any data container paired with per-element weights
//
// The data side may be a plain BatchContainer or a LabeledContainer; the
// weight side is always a BatchContainer<f64> with the same partitioning.
// WeightedData<T> and WeightedLabeledData<I, L> are aliases of this one
// generic type, with extra views defined in `facades`.

use std::fmt;

use rayon::prelude::*;

use sheaf_core::{ElementPosition, Partitioning, Result};

use crate::batch::{BatchContainer, BatchMut, BatchRef, ElementMut, ElementRef};
use crate::container::{check_partitioning, transact, Container};

/// A data item (or view) and its weight (or view).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightedPair<D, W = f64> {
    pub data: D,
    pub weight: W,
}

impl<D, W> WeightedPair<D, W> {
    pub fn new(data: D, weight: W) -> Self {
        Self { data, weight }
    }
}

/// A data container with a parallel container of weights.
///
/// ```
/// use sheaf_data::{BatchContainer, Container, WeightedData};
///
/// let data = BatchContainer::from_range(0..5, 2);
/// let weighted = WeightedData::from_data(data, 2.0);
/// assert_eq!(weighted.partitioning().sizes(), &[2, 2, 1]);
/// assert_eq!(weighted.sum_of_weights().unwrap(), 10.0);
/// ```
pub struct WeightedContainer<C> {
    data: C,
    weights: BatchContainer<f64>,
}

impl<C: Clone> Clone for WeightedContainer<C> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            weights: self.weights.clone(),
        }
    }
}

impl<C: Default> Default for WeightedContainer<C> {
    fn default() -> Self {
        Self {
            data: C::default(),
            weights: BatchContainer::default(),
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for WeightedContainer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeightedContainer")
            .field("data", &self.data)
            .field("weights", &self.weights)
            .finish()
    }
}

impl<C: Container> WeightedContainer<C> {
    /// Pair a data container with an existing weight container.
    ///
    /// Element counts and per-batch sizes must agree. The batches are not
    /// reorganised to make them agree.
    pub fn new(data: C, weights: BatchContainer<f64>) -> Result<Self> {
        check_partitioning(
            "weighted container",
            data.partitioning(),
            weights.partitioning(),
        )?;
        Ok(Self { data, weights })
    }

    /// Give every element of `data` the same weight.
    pub fn from_data(data: C, weight: f64) -> Self {
        let weights = BatchContainer::with_partitioning(&data.partitioning(), &weight);
        Self { data, weights }
    }

    /// Pair parts that are known to share a partitioning.
    pub(crate) fn from_parts_unchecked(data: C, weights: BatchContainer<f64>) -> Self {
        debug_assert_eq!(data.partitioning(), weights.partitioning());
        Self { data, weights }
    }

    /// The data side.
    pub fn data(&self) -> &C {
        &self.data
    }

    /// The weight side.
    pub fn weights(&self) -> &BatchContainer<f64> {
        &self.weights
    }

    pub(crate) fn weights_mut(&mut self) -> &mut BatchContainer<f64> {
        &mut self.weights
    }

    pub fn into_parts(self) -> (C, BatchContainer<f64>) {
        (self.data, self.weights)
    }

    /// Sum of all weights.
    ///
    /// Batches are summed in parallel and the partial sums combined in batch
    /// order, so the result does not depend on thread scheduling.
    pub fn sum_of_weights(&self) -> Result<f64> {
        let partial = self
            .weights
            .shared_batches()
            .par_iter()
            .map(|batch| batch.read().map(|w| w.iter().sum::<f64>()))
            .collect::<Result<Vec<f64>>>()?;
        Ok(partial.iter().sum())
    }
}

impl<C: Container> Container for WeightedContainer<C> {
    type Element = WeightedPair<C::Element>;
    type Shape = C::Shape;
    type Batch<'a> = WeightedPair<C::Batch<'a>, BatchRef<'a, f64>> where Self: 'a;
    type BatchMut<'a> = WeightedPair<C::BatchMut<'a>, BatchMut<'a, f64>> where Self: 'a;
    type Ref<'a> = WeightedPair<C::Ref<'a>, ElementRef<'a, f64>> where Self: 'a;
    type Mut<'a> = WeightedPair<C::Mut<'a>, ElementMut<'a, f64>> where Self: 'a;

    fn with_partitioning(partitioning: &Partitioning, blueprint: &Self::Element) -> Self {
        Self {
            data: C::with_partitioning(partitioning, &blueprint.data),
            weights: BatchContainer::with_partitioning(partitioning, &blueprint.weight),
        }
    }

    fn from_elements<E>(elements: E, partitioning: &Partitioning) -> Result<Self>
    where
        E: IntoIterator<Item = Self::Element>,
    {
        let (data, weights): (Vec<C::Element>, Vec<f64>) = elements
            .into_iter()
            .map(|pair| (pair.data, pair.weight))
            .unzip();
        Ok(Self {
            data: C::from_elements(data, partitioning)?,
            weights: BatchContainer::from_elements(weights, partitioning)?,
        })
    }

    fn size(&self) -> usize {
        self.data.size()
    }

    fn number_of_elements(&self) -> usize {
        self.data.number_of_elements()
    }

    fn partitioning(&self) -> Partitioning {
        self.data.partitioning()
    }

    fn shape(&self) -> C::Shape {
        self.data.shape()
    }

    fn set_shape(&mut self, shape: C::Shape) {
        self.data.set_shape(shape);
    }

    fn batch(&self, index: usize) -> Result<Self::Batch<'_>> {
        Ok(WeightedPair {
            data: self.data.batch(index)?,
            weight: self.weights.batch(index)?,
        })
    }

    fn batch_mut(&mut self, index: usize) -> Result<Self::BatchMut<'_>> {
        Ok(WeightedPair {
            data: self.data.batch_mut(index)?,
            weight: self.weights.batch_mut(index)?,
        })
    }

    fn element_at(&self, position: ElementPosition) -> Result<Self::Ref<'_>> {
        Ok(WeightedPair {
            data: self.data.element_at(position)?,
            weight: self.weights.element_at(position)?,
        })
    }

    fn element_mut_at(&mut self, position: ElementPosition) -> Result<Self::Mut<'_>> {
        Ok(WeightedPair {
            data: self.data.element_mut_at(position)?,
            weight: self.weights.element_mut_at(position)?,
        })
    }

    fn get_at(&self, position: ElementPosition) -> Result<Self::Element> {
        Ok(WeightedPair {
            data: self.data.get_at(position)?,
            weight: self.weights.get_at(position)?,
        })
    }

    fn indexed_subset_with(&self, indices: &[usize], partitioning: &Partitioning) -> Result<Self> {
        Ok(Self {
            data: self.data.indexed_subset_with(indices, partitioning)?,
            weights: self.weights.indexed_subset_with(indices, partitioning)?,
        })
    }

    fn append(&mut self, other: &Self) {
        self.data.append(&other.data);
        self.weights.append(&other.weights);
    }

    fn validate_split(&self, batch: usize, offset: usize) -> Result<()> {
        self.data.validate_split(batch, offset)?;
        self.weights.validate_split(batch, offset)
    }

    fn split_batch(&mut self, batch: usize, offset: usize) -> Result<()> {
        self.validate_split(batch, offset)?;
        transact(
            &mut self.data,
            &mut self.weights,
            |data| data.split_batch(batch, offset),
            |weights| weights.split_batch(batch, offset),
        )
    }

    fn splice(&mut self, batch: usize) -> Result<Self> {
        self.data.validate_splice(batch)?;
        self.weights.validate_splice(batch)?;
        Ok(Self {
            data: self.data.splice(batch)?,
            weights: self.weights.splice(batch)?,
        })
    }

    fn repartition(&mut self, partitioning: &Partitioning) -> Result<()> {
        transact(
            &mut self.data,
            &mut self.weights,
            |data| data.repartition(partitioning),
            |weights| weights.repartition(partitioning),
        )
    }

    fn merge_batches(&mut self, first: usize, count: usize) -> Result<()> {
        self.validate_merge(first, count)?;
        transact(
            &mut self.data,
            &mut self.weights,
            |data| data.merge_batches(first, count),
            |weights| weights.merge_batches(first, count),
        )
    }

    fn make_independent(&mut self) -> Result<()> {
        self.weights.make_independent()?;
        self.data.make_independent()
    }
}
