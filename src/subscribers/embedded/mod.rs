//! # Built-in subscribers
//!
//! Small, self-contained subscribers for demos and debugging.
//!
//! - [`LogWriter`]: prints events in a human-readable form (demo/debug).

mod log;

pub use log::LogWriter;
