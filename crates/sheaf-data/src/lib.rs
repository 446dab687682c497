//! # sheaf-data
//!
//! Batched dataset containers for learning algorithms.
//!
//! This crate provides:
//! - [`Container`] trait — the operations every batched container supports
//! - [`BatchContainer`] — an ordered sequence of shared batches of one element type
//! - [`LabeledContainer`] — inputs and labels kept in lockstep
//! - [`WeightedContainer`] — any container paired with one weight per element
//! - [`WeightedData`] / [`WeightedLabeledData`] — the weighted datasets used for training
//! - [`bootstrap`] / [`shuffle`] — resampling with a caller-supplied random source
//! - [`DatasetConfig`] — default batch size and reproducible seeding
//!
//! Containers share batch storage on clone, append and splice. Writes through
//! one container are visible through every alias until
//! [`Container::make_independent`] is called.
//!
//! ```
//! use sheaf_data::{BatchContainer, Container};
//!
//! let mut head = BatchContainer::from_range(0..3, 0);
//! let mut tail = BatchContainer::from_range(3..5, 0);
//! head.append(&tail);
//! assert_eq!(head.partitioning().sizes(), &[3, 2]);
//!
//! // the appended batch is shared until one side is made independent
//! *tail.element_mut(0).unwrap() = 30;
//! assert_eq!(head.to_vec().unwrap(), vec![0, 1, 2, 30, 4]);
//! head.make_independent().unwrap();
//! *tail.element_mut(0).unwrap() = 300;
//! assert_eq!(head.to_vec().unwrap(), vec![0, 1, 2, 30, 4]);
//! ```

pub mod batch;
pub mod config;
pub mod container;
pub mod facades;
pub mod indexing;
pub mod labeled;
pub mod resample;
#[cfg(feature = "serde")]
pub mod serde;
pub mod weighted;

pub use batch::{BatchContainer, BatchMut, BatchRef, ElementMut, ElementRef};
pub use config::{DatasetConfig, DEFAULT_BATCH_SIZE};
pub use container::Container;
pub use facades::{WeightedData, WeightedLabeledData};
pub use indexing::{Elements, IndexingIterator};
pub use labeled::{ClassLabel, InputLabelPair, LabeledContainer, LabeledShape};
pub use resample::{bootstrap, shuffle};
pub use weighted::{WeightedContainer, WeightedPair};

pub use sheaf_core::{ElementPosition, Error, ErrorKind, Partitioning, Result, Shape};
