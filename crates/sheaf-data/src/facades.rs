// WeightedData / WeightedLabeledData — derived views on weighted containers

use std::fmt;

use sheaf_core::{Error, Result};

use crate::batch::BatchContainer;
use crate::container::Container;
use crate::labeled::{ClassLabel, LabeledContainer};
use crate::weighted::WeightedContainer;

/// Weighted data for unsupervised learning.
pub type WeightedData<T> = WeightedContainer<BatchContainer<T>>;

/// Weighted input-label pairs for supervised learning.
pub type WeightedLabeledData<I, L> = WeightedContainer<LabeledContainer<I, L>>;

fn check_weight_count(data: usize, weights: usize) -> Result<()> {
    if data != weights {
        return Err(Error::ElementCountMismatch {
            context: "weighted ranges",
            expected: data,
            got: weights,
        });
    }
    Ok(())
}

// WeightedData

impl<T: Clone> WeightedData<T> {
    /// Pack data and weight ranges of equal length into balanced batches.
    pub fn from_ranges<D, W>(data: D, weights: W, max_batch_size: usize) -> Result<Self>
    where
        D: IntoIterator<Item = T>,
        W: IntoIterator<Item = f64>,
    {
        let data: Vec<T> = data.into_iter().collect();
        let weights: Vec<f64> = weights.into_iter().collect();
        check_weight_count(data.len(), weights.len())?;
        Ok(Self::from_parts_unchecked(
            BatchContainer::from_range(data, max_batch_size),
            BatchContainer::from_range(weights, max_batch_size),
        ))
    }

    /// Number of values in one data element, from the data shape.
    pub fn data_dimension(&self) -> usize {
        self.data().shape().elem_count()
    }
}

impl<T: ClassLabel> WeightedData<T> {
    pub fn number_of_classes(&self) -> Result<usize> {
        self.data().number_of_classes()
    }

    pub fn class_sizes(&self) -> Result<Vec<usize>> {
        self.data().class_sizes()
    }
}

impl<T: Clone + fmt::Display> fmt::Display for WeightedData<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in self.elements() {
            let element = element.map_err(|_| fmt::Error)?;
            writeln!(f, "{} [{}]", element.weight, element.data)?;
        }
        Ok(())
    }
}

// WeightedLabeledData

impl<I: Clone, L: Clone> WeightedLabeledData<I, L> {
    /// Pack input, label and weight ranges of equal length into balanced
    /// batches.
    pub fn from_ranges<RI, RL, W>(
        inputs: RI,
        labels: RL,
        weights: W,
        max_batch_size: usize,
    ) -> Result<Self>
    where
        RI: IntoIterator<Item = I>,
        RL: IntoIterator<Item = L>,
        W: IntoIterator<Item = f64>,
    {
        let data = LabeledContainer::from_ranges(inputs, labels, max_batch_size)?;
        let weights: Vec<f64> = weights.into_iter().collect();
        check_weight_count(data.number_of_elements(), weights.len())?;
        Ok(Self::from_parts_unchecked(
            data,
            BatchContainer::from_range(weights, max_batch_size),
        ))
    }

    pub fn inputs(&self) -> &BatchContainer<I> {
        self.data().inputs()
    }

    pub fn labels(&self) -> &BatchContainer<L> {
        self.data().labels()
    }

    /// The inputs with their weights. Shares storage with this container.
    pub fn weighted_inputs(&self) -> WeightedData<I> {
        WeightedContainer::from_parts_unchecked(self.inputs().clone(), self.weights().clone())
    }

    /// The labels with their weights. Shares storage with this container.
    pub fn weighted_labels(&self) -> WeightedData<L> {
        WeightedContainer::from_parts_unchecked(self.labels().clone(), self.weights().clone())
    }

    pub fn input_dimension(&self) -> usize {
        self.inputs().shape().elem_count()
    }

    pub fn label_dimension(&self) -> usize {
        self.labels().shape().elem_count()
    }
}

impl<I: Clone, L: ClassLabel> WeightedLabeledData<I, L> {
    pub fn number_of_classes(&self) -> Result<usize> {
        self.labels().number_of_classes()
    }

    pub fn class_sizes(&self) -> Result<Vec<usize>> {
        self.labels().class_sizes()
    }

    /// Accumulated weight of every class, one bin per class up to the highest
    /// label.
    pub fn class_weight(&self) -> Result<Vec<f64>> {
        self.class_weight_with(self.number_of_classes()?)
    }

    /// Accumulated weight of every class for a declared number of classes.
    ///
    /// A label that is not below `num_classes` is a precondition violation.
    pub fn class_weight_with(&self, num_classes: usize) -> Result<Vec<f64>> {
        let mut bins = vec![0.0; num_classes];
        for b in 0..self.size() {
            let labels = self.labels().batch(b)?;
            let weights = self.weights().batch(b)?;
            for (&label, &weight) in labels.iter().zip(weights.iter()) {
                let class = label.class_index();
                let bin = bins.get_mut(class).ok_or(Error::LabelOutOfRange {
                    label: class,
                    num_classes,
                })?;
                *bin += weight;
            }
        }
        Ok(bins)
    }
}

impl<I, L> fmt::Display for WeightedLabeledData<I, L>
where
    I: Clone + fmt::Display,
    L: Clone + fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in self.elements() {
            let element = element.map_err(|_| fmt::Error)?;
            writeln!(
                f,
                "{} ({} [{}])",
                element.weight, element.data.label, element.data.input
            )?;
        }
        Ok(())
    }
}
