//! # sheaf-core
//!
//! Shared primitives for the sheaf dataset containers.
//!
//! This crate provides:
//! - [`Error`] / [`ErrorKind`] — the single error type and its taxonomy
//! - [`Shape`] — per-element structural metadata
//! - [`Partitioning`] — the batch layout of a container, and element addressing

pub mod error;
pub mod partitioning;
pub mod shape;

pub use error::{Error, ErrorKind, Result};
pub use partitioning::{ElementPosition, Partitioning};
pub use shape::Shape;
