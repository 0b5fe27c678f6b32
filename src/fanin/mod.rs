//! # Fan-in: many sources, one consumer.

pub(crate) mod merge;

pub use merge::Merged;
