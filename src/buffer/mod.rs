//! Shared buffer + handle primitive.
//!
//! Every fan-out variant is built from the same two pieces:
//! - [`Buffer`]: a locked FIFO of items pulled for one consumer but not yet read;
//! - [`Handle`]: the consumer-facing [`Sequence`](crate::Sequence) that pops its
//!   buffer locally and otherwise asks the coordinator over a mailbox.
//!
//! Coordinators differ only in how they route a freshly pulled item into buffers.

mod handle;
mod queue;

pub(crate) use handle::{Reply, Request};
pub use handle::Handle;
pub use queue::Buffer;
