// DatasetConfig — batching and random-source settings

use rand::rngs::StdRng;
use rand::SeedableRng;

use sheaf_core::Partitioning;

/// Maximum batch size used when none is given.
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// Settings shared by code that builds and resamples datasets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetConfig {
    /// Maximum number of elements per batch (0 = a single batch).
    pub batch_size: usize,
    /// Optional random seed for reproducible resampling.
    pub seed: Option<u64>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            seed: None,
        }
    }
}

impl DatasetConfig {
    pub fn batch_size(mut self, bs: usize) -> Self {
        self.batch_size = bs;
        self
    }

    pub fn seed(mut self, s: u64) -> Self {
        self.seed = Some(s);
        self
    }

    /// Balanced layout for `num_elements` elements under this batch size.
    pub fn partitioning(&self, num_elements: usize) -> Partitioning {
        Partitioning::balanced(num_elements, self.batch_size)
    }

    /// A random source for `bootstrap` / `shuffle`.
    ///
    /// Seeded when `seed` is set; otherwise drawn from OS entropy and not
    /// reproducible.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
