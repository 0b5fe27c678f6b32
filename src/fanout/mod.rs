//! # Fan-out: one source, many consumers.
//!
//! Each constructor spawns one coordinator task that owns the source and serves
//! the handles it hands out:
//! - `mirror`: every handle sees every item;
//! - `distribute`: every item goes to one partition;
//! - `group`: one handle per distinct key;
//! - [`Distinct`]: uniques and duplicates, built on grouping.

pub(crate) mod distribute;
pub(crate) mod group;
pub(crate) mod mirror;
mod uniques;

pub use distribute::{Distributor, Partition};
pub use group::{Group, Groups};
pub use mirror::Mirror;
pub use uniques::Distinct;
pub(crate) use uniques::Keep;
