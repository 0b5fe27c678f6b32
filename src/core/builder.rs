use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

use super::{config::HubConfig, hub::Hub, session::Observers};
use crate::{
    events::{Bus, Event},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for a [`Hub`] with event subscribers.
pub struct HubBuilder {
    cfg: HubConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl HubBuilder {
    /// Creates a builder with the given configuration and no subscribers.
    pub fn new(cfg: HubConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive session events (handles opened, errors latched,
    /// sources released, ...) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the hub.
    ///
    /// With subscribers, this spawns a listener task that forwards bus events to
    /// the [`SubscriberSet`]. The listener stops once the hub and every session
    /// it started are gone.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime while subscribers are set.
    pub fn build(self) -> Hub {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let stop = CancellationToken::new();

        if !self.subscribers.is_empty() {
            let set = SubscriberSet::new(self.subscribers, bus.clone());
            subscriber_listener(bus.subscribe(), set, stop.clone());
        }
        Hub::from_parts(self.cfg, Arc::new(Observers::new(bus, stop)))
    }
}

/// Forwards bus events to the subscriber set until stopped.
fn subscriber_listener(mut rx: broadcast::Receiver<Event>, set: SubscriberSet, stop: CancellationToken) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(ev),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
                _ = stop.cancelled() => break,
            }
        }
        set.shutdown().await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::sequence::{collect, from_iter};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Kinds(Mutex<Vec<EventKind>>);

    #[async_trait::async_trait]
    impl Subscribe for Kinds {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().unwrap().push(ev.kind);
        }
    }

    #[tokio::test]
    async fn subscribers_see_session_events() {
        let kinds = Arc::new(Kinds::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![kinds.clone()];
        let hub = HubBuilder::new(HubConfig::default())
            .with_subscribers(subs)
            .build();

        let handles = hub.mirror(from_iter(0..3), 1);
        for h in handles {
            assert_eq!(collect(h).await.unwrap(), vec![0, 1, 2]);
        }

        for _ in 0..100 {
            if kinds.0.lock().unwrap().contains(&EventKind::SessionEnded) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        let seen = kinds.0.lock().unwrap().clone();
        assert_eq!(seen.first(), Some(&EventKind::SessionStarted));
        assert!(seen.contains(&EventKind::SourceExhausted));
        assert!(seen.contains(&EventKind::SourceReleased));
        assert!(seen.contains(&EventKind::SessionEnded));
    }
}
