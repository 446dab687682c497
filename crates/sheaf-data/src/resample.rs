// Resampling — bootstrap and shuffle
//
// Both algorithms take their random source as an argument. Reproducible
// results require a seeded generator, e.g. `DatasetConfig::seed(..).rng()`.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use sheaf_core::{Error, Result};

use crate::container::Container;
use crate::weighted::WeightedContainer;

/// Create a bootstrap sample of `dataset`, expressed as weights.
///
/// The result has the dataset's exact partitioning and shares its data
/// batches. Let `n` be `size`, or the number of elements when `size` is 0.
/// `n` indices are drawn uniformly with replacement from `[0, n)` and the
/// weight of every drawn element is incremented once per draw, so the weights
/// sum to exactly `n`.
///
/// Fails with an out-of-range error when `n` exceeds the number of elements.
pub fn bootstrap<C, R>(dataset: &C, size: usize, rng: &mut R) -> Result<WeightedContainer<C>>
where
    C: Container,
    R: Rng + ?Sized,
{
    let available = dataset.number_of_elements();
    let n = if size == 0 { available } else { size };
    if n > available {
        return Err(Error::ElementOutOfRange {
            index: n - 1,
            len: available,
        });
    }

    let mut counts = vec![0u32; available];
    for _ in 0..n {
        counts[rng.gen_range(0..n)] += 1;
    }

    let mut sample = WeightedContainer::from_data(dataset.clone(), 0.0);
    let weights = sample.weights_mut();
    let mut start = 0;
    for b in 0..weights.size() {
        let mut batch = weights.batch_mut(b)?;
        let end = start + batch.len();
        for (weight, &count) in batch.iter_mut().zip(&counts[start..end]) {
            *weight = f64::from(count);
        }
        start = end;
    }

    debug!(
        draws = n,
        elements = available,
        unique = counts.iter().filter(|&&c| c > 0).count(),
        "bootstrapped dataset"
    );
    Ok(sample)
}

/// Return a copy of `dataset` with its elements in uniformly random order.
///
/// Every element appears exactly once and the batch sizes are those of the
/// input.
pub fn shuffle<C, R>(dataset: &C, rng: &mut R) -> Result<C>
where
    C: Container,
    R: Rng + ?Sized,
{
    let partitioning = dataset.partitioning();
    let mut indices: Vec<usize> = (0..partitioning.number_of_elements()).collect();
    indices.shuffle(rng);
    let shuffled = dataset.indexed_subset_with(&indices, &partitioning)?;
    debug!(
        elements = indices.len(),
        batches = partitioning.len(),
        "shuffled dataset"
    );
    Ok(shuffled)
}
