//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [session-started] session=mirror#1 handles=3
//! [group-opened] session=group#2 group=0
//! [backlog] session=distribute#3 handle=1 queued=65
//! [error-latched] session=group#2 handle=1 err="source failed: eof"
//! [source-exhausted] session=mirror#1 pulled=10
//! [source-released] session=mirror#1
//! [session-ended] session=mirror#1
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let session = e.session.as_deref().unwrap_or("?");
        let handle = e.handle.map_or_else(|| "-".to_string(), |h| h.to_string());
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::SessionStarted => {
                println!("[session-started] session={session} handles={handle}");
            }
            EventKind::SessionEnded => println!("[session-ended] session={session}"),
            EventKind::HandleOpened => {
                println!("[handle-opened] session={session} handle={handle}");
            }
            EventKind::GroupOpened => {
                println!("[group-opened] session={session} group={handle}");
            }
            EventKind::HandleReleased => {
                println!("[handle-released] session={session} handle={handle}");
            }
            EventKind::BacklogExceeded => {
                println!(
                    "[backlog] session={session} handle={handle} queued={:?}",
                    e.backlog
                );
            }
            EventKind::SourceExhausted => {
                println!("[source-exhausted] session={session} pulled={:?}", e.backlog);
            }
            EventKind::SourceReleased if e.reason.is_some() => {
                println!("[source-released] session={session} err={reason:?}");
            }
            EventKind::SourceReleased => println!("[source-released] session={session}"),
            EventKind::ErrorLatched => {
                println!("[error-latched] session={session} handle={handle} err={reason:?}");
            }
            EventKind::MergeCancelled => {
                println!("[merge-cancelled] session={session} source={handle} err={reason:?}");
            }
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] subscriber={session} reason={reason:?}");
            }
            EventKind::SubscriberPanicked => {
                println!("[subscriber-panicked] subscriber={session} info={reason}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
