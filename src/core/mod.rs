//! Runtime core: hub, configuration and the shared-source machinery.
//!
//! The public API from this module is [`Hub`], [`HubBuilder`], [`HubConfig`]
//! and the free constructor functions.
//!
//! Internal modules:
//! - [`session`]: session labels and event publishing;
//! - [`shared`]: the latched wrapper around a shared source;
//! - [`hub`]: session factory and free functions;
//! - [`builder`]: hub construction with subscribers.

mod builder;
mod config;
mod hub;
pub(crate) mod session;
pub(crate) mod shared;

pub use builder::HubBuilder;
pub use config::HubConfig;
pub use hub::{
    distribute, duplicates, group, group_by, merge, mirror, try_duplicates, try_group_by,
    try_uniques, uniques, Hub,
};
