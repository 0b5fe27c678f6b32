//! # Hub configuration.
//!
//! Provides [`HubConfig`], the settings shared by every session a [`Hub`](crate::Hub)
//! starts.
//!
//! ## Sentinel values
//! - `merge_capacity = 0` → one output slot per merged source
//! - `release_grace = 0s` → releasing a merged sequence does not wait for its drains

use std::time::Duration;

/// Settings for a [`Hub`](crate::Hub) and the sessions it starts.
///
/// ## Field semantics
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped)
/// - `request_capacity`: coordinator mailbox size (min 1; clamped)
/// - `merge_capacity`: merged output channel size (`0` = number of sources)
/// - `release_grace`: wait for merge drains on release (`0s` = don't wait)
///
/// ## Notes
/// All fields are public. Prefer the helper accessors over checking sentinels
/// at call sites.
#[derive(Clone, Debug)]
pub struct HubConfig {
    /// Capacity of the event bus broadcast ring buffer.
    ///
    /// Receivers that lag behind by more than this many events observe `Lagged`
    /// and skip the oldest ones.
    pub bus_capacity: usize,

    /// Capacity of each coordinator's request mailbox.
    ///
    /// Every handle has at most one request in flight, so this only bounds how
    /// many handles can be queued at the coordinator at once before `advance()`
    /// waits to enqueue.
    pub request_capacity: usize,

    /// Capacity of the channel merged sources are drained into.
    ///
    /// - `0` = one slot per source
    /// - `n > 0` = at most `n` items in flight
    pub merge_capacity: usize,

    /// Maximum time releasing a merged sequence waits for its drain tasks to
    /// stop (and release their sources).
    pub release_grace: Duration,
}

impl HubConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns a mailbox capacity clamped to a minimum of 1.
    #[inline]
    pub fn request_capacity_clamped(&self) -> usize {
        self.request_capacity.max(1)
    }

    /// Returns the merged channel capacity for `sources` inputs (min 1).
    #[inline]
    pub fn merge_capacity_for(&self, sources: usize) -> usize {
        match self.merge_capacity {
            0 => sources.max(1),
            n => n,
        }
    }

    /// Returns the release grace as an `Option`.
    ///
    /// - `None` → do not wait
    /// - `Some(d)` → wait up to `d`
    #[inline]
    pub fn release_grace(&self) -> Option<Duration> {
        if self.release_grace == Duration::ZERO {
            None
        } else {
            Some(self.release_grace)
        }
    }
}

impl Default for HubConfig {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `request_capacity = 32`
    /// - `merge_capacity = 0` (one slot per source)
    /// - `release_grace = 5s`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            request_capacity: 32,
            merge_capacity: 0,
            release_grace: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_resolve_through_accessors() {
        let cfg = HubConfig {
            bus_capacity: 0,
            request_capacity: 0,
            merge_capacity: 0,
            release_grace: Duration::ZERO,
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.request_capacity_clamped(), 1);
        assert_eq!(cfg.merge_capacity_for(0), 1);
        assert_eq!(cfg.merge_capacity_for(7), 7);
        assert_eq!(cfg.release_grace(), None);
    }

    #[test]
    fn explicit_values_win() {
        let cfg = HubConfig {
            merge_capacity: 3,
            ..HubConfig::default()
        };
        assert_eq!(cfg.merge_capacity_for(10), 3);
        assert_eq!(cfg.release_grace(), Some(Duration::from_secs(5)));
    }
}
