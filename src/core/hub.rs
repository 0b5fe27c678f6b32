//! # Hub: entry point for sharing sessions.
//!
//! A [`Hub`] carries the [`HubConfig`] and the event bus every session it
//! starts publishes to. Each constructor consumes its source(s), spawns one
//! coordinator (or one drain task per source for merge) and returns the
//! consumer-side sequences.
//!
//! ```text
//! Hub::mirror(src, n)        ──► Vec<Mirror<T>>     (all see everything)
//! Hub::distribute(src, b)    ──► Distributor<T>     (yields Partition<T>)
//! Hub::group_by(src, key)    ──► Groups<T>          (yields Group<T>)
//! Hub::uniques / duplicates  ──► Distinct<T>
//! Hub::merge(sources)        ──► Merged<T>
//! ```
//!
//! The free functions ([`mirror`], [`distribute`], ...) use a default hub with
//! no subscribers.
//!
//! ## Runtime
//! Every constructor spawns Tokio tasks and panics outside a Tokio runtime.
//! Merge release timeouts need the runtime's time driver.

use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::{
    builder::HubBuilder,
    config::HubConfig,
    session::{Observers, Session},
};
use crate::error::SequenceError;
use crate::events::{Bus, Event};
use crate::fanin::{self, Merged};
use crate::fanout::{self, Distinct, Distributor, Groups, Keep, Mirror};
use crate::sequence::Sequence;

/// Factory for mirror, distribute, group and merge sessions.
#[derive(Clone)]
pub struct Hub {
    cfg: HubConfig,
    observers: Arc<Observers>,
}

impl Hub {
    /// Creates a hub without subscribers.
    ///
    /// Events are still published; use [`Hub::subscribe`] to read them.
    pub fn new(cfg: HubConfig) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Self::from_parts(cfg, Arc::new(Observers::new(bus, CancellationToken::new())))
    }

    /// Returns a builder for a hub with event subscribers.
    pub fn builder(cfg: HubConfig) -> HubBuilder {
        HubBuilder::new(cfg)
    }

    pub(crate) fn from_parts(cfg: HubConfig, observers: Arc<Observers>) -> Self {
        Self { cfg, observers }
    }

    /// Configuration this hub starts sessions with.
    pub fn config(&self) -> &HubConfig {
        &self.cfg
    }

    /// Subscribes to events of every session started from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.observers.bus.subscribe()
    }

    fn session(&self, kind: &'static str) -> Session {
        Session::new(kind, Arc::clone(&self.observers))
    }

    /// Shares `source` between `count` handles that each see every item.
    ///
    /// Items are cloned into the backlogs of handles that fall behind. With
    /// `count == 0` the source is released right away.
    pub fn mirror<S>(&self, source: S, count: usize) -> Vec<Mirror<S::Item>>
    where
        S: Sequence + 'static,
        S::Item: Clone + 'static,
    {
        fanout::mirror::spawn(
            source,
            count,
            self.cfg.request_capacity_clamped(),
            self.session("mirror"),
        )
    }

    /// Splits `source` across partitions; each item goes to exactly one.
    ///
    /// `buffer_size` is the backlog watermark per partition (`0` = none).
    pub fn distribute<S>(&self, source: S, buffer_size: usize) -> Distributor<S::Item>
    where
        S: Sequence + 'static,
        S::Item: 'static,
    {
        fanout::distribute::spawn(
            source,
            buffer_size,
            self.cfg.request_capacity_clamped(),
            self.session("distribute"),
        )
    }

    /// Groups `source` by a fallible key function.
    ///
    /// `key_fn` gets the item's index in the source; its error becomes
    /// [`SequenceError::Key`] for that index.
    pub fn try_group_by<S, K, E, F>(&self, source: S, mut key_fn: F) -> Groups<S::Item>
    where
        S: Sequence + 'static,
        S::Item: 'static,
        K: Eq + Hash + Send + 'static,
        E: Display,
        F: FnMut(usize, &S::Item) -> Result<K, E> + Send + 'static,
    {
        let keyed = move |index: usize, item: &S::Item| {
            key_fn(index, item).map_err(|e| SequenceError::key(index, e.to_string()))
        };
        fanout::group::spawn(
            source,
            keyed,
            self.cfg.request_capacity_clamped(),
            self.session("group"),
        )
    }

    /// Groups `source` by `key_fn`.
    pub fn group_by<S, K, F>(&self, source: S, mut key_fn: F) -> Groups<S::Item>
    where
        S: Sequence + 'static,
        S::Item: 'static,
        K: Eq + Hash + Send + 'static,
        F: FnMut(&S::Item) -> K + Send + 'static,
    {
        let keyed = move |_: usize, item: &S::Item| Ok(key_fn(item));
        fanout::group::spawn(
            source,
            keyed,
            self.cfg.request_capacity_clamped(),
            self.session("group"),
        )
    }

    /// Groups `source` by the items themselves.
    pub fn group<S>(&self, source: S) -> Groups<S::Item>
    where
        S: Sequence + 'static,
        S::Item: Eq + Hash + Clone + 'static,
    {
        self.group_by(source, |item: &S::Item| item.clone())
    }

    /// First item of every key that occurs exactly once, in first-occurrence order.
    pub fn uniques<S, K, F>(&self, source: S, key_fn: F) -> Distinct<S::Item>
    where
        S: Sequence + 'static,
        S::Item: 'static,
        K: Eq + Hash + Send + 'static,
        F: FnMut(&S::Item) -> K + Send + 'static,
    {
        Distinct::new(self.group_by(source, key_fn), Keep::Uniques)
    }

    /// First item of every key that occurs more than once, in first-occurrence order.
    pub fn duplicates<S, K, F>(&self, source: S, key_fn: F) -> Distinct<S::Item>
    where
        S: Sequence + 'static,
        S::Item: 'static,
        K: Eq + Hash + Send + 'static,
        F: FnMut(&S::Item) -> K + Send + 'static,
    {
        Distinct::new(self.group_by(source, key_fn), Keep::Duplicates)
    }

    /// [`Hub::uniques`] with a fallible, index-aware key function.
    pub fn try_uniques<S, K, E, F>(&self, source: S, key_fn: F) -> Distinct<S::Item>
    where
        S: Sequence + 'static,
        S::Item: 'static,
        K: Eq + Hash + Send + 'static,
        E: Display,
        F: FnMut(usize, &S::Item) -> Result<K, E> + Send + 'static,
    {
        Distinct::new(self.try_group_by(source, key_fn), Keep::Uniques)
    }

    /// [`Hub::duplicates`] with a fallible, index-aware key function.
    pub fn try_duplicates<S, K, E, F>(&self, source: S, key_fn: F) -> Distinct<S::Item>
    where
        S: Sequence + 'static,
        S::Item: 'static,
        K: Eq + Hash + Send + 'static,
        E: Display,
        F: FnMut(usize, &S::Item) -> Result<K, E> + Send + 'static,
    {
        Distinct::new(self.try_group_by(source, key_fn), Keep::Duplicates)
    }

    /// Interleaves `sources` into one sequence.
    ///
    /// The first error from any source (or its release) ends the merge and
    /// cancels the others; every source is released either way.
    pub fn merge<I, S>(&self, sources: I) -> Merged<S::Item>
    where
        I: IntoIterator<Item = S>,
        S: Sequence + 'static,
        S::Item: 'static,
    {
        let sources: Vec<S> = sources.into_iter().collect();
        let capacity = self.cfg.merge_capacity_for(sources.len());
        fanin::merge::spawn(
            sources,
            capacity,
            self.cfg.release_grace(),
            self.session("merge"),
        )
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

/// [`Hub::mirror`] on a default hub.
pub fn mirror<S>(source: S, count: usize) -> Vec<Mirror<S::Item>>
where
    S: Sequence + 'static,
    S::Item: Clone + 'static,
{
    Hub::default().mirror(source, count)
}

/// [`Hub::distribute`] on a default hub.
pub fn distribute<S>(source: S, buffer_size: usize) -> Distributor<S::Item>
where
    S: Sequence + 'static,
    S::Item: 'static,
{
    Hub::default().distribute(source, buffer_size)
}

/// [`Hub::group_by`] on a default hub.
pub fn group_by<S, K, F>(source: S, key_fn: F) -> Groups<S::Item>
where
    S: Sequence + 'static,
    S::Item: 'static,
    K: Eq + Hash + Send + 'static,
    F: FnMut(&S::Item) -> K + Send + 'static,
{
    Hub::default().group_by(source, key_fn)
}

/// [`Hub::try_group_by`] on a default hub.
pub fn try_group_by<S, K, E, F>(source: S, key_fn: F) -> Groups<S::Item>
where
    S: Sequence + 'static,
    S::Item: 'static,
    K: Eq + Hash + Send + 'static,
    E: Display,
    F: FnMut(usize, &S::Item) -> Result<K, E> + Send + 'static,
{
    Hub::default().try_group_by(source, key_fn)
}

/// [`Hub::group`] on a default hub.
pub fn group<S>(source: S) -> Groups<S::Item>
where
    S: Sequence + 'static,
    S::Item: Eq + Hash + Clone + 'static,
{
    Hub::default().group(source)
}

/// [`Hub::uniques`] on a default hub.
pub fn uniques<S, K, F>(source: S, key_fn: F) -> Distinct<S::Item>
where
    S: Sequence + 'static,
    S::Item: 'static,
    K: Eq + Hash + Send + 'static,
    F: FnMut(&S::Item) -> K + Send + 'static,
{
    Hub::default().uniques(source, key_fn)
}

/// [`Hub::duplicates`] on a default hub.
pub fn duplicates<S, K, F>(source: S, key_fn: F) -> Distinct<S::Item>
where
    S: Sequence + 'static,
    S::Item: 'static,
    K: Eq + Hash + Send + 'static,
    F: FnMut(&S::Item) -> K + Send + 'static,
{
    Hub::default().duplicates(source, key_fn)
}

/// [`Hub::try_uniques`] on a default hub.
pub fn try_uniques<S, K, E, F>(source: S, key_fn: F) -> Distinct<S::Item>
where
    S: Sequence + 'static,
    S::Item: 'static,
    K: Eq + Hash + Send + 'static,
    E: Display,
    F: FnMut(usize, &S::Item) -> Result<K, E> + Send + 'static,
{
    Hub::default().try_uniques(source, key_fn)
}

/// [`Hub::try_duplicates`] on a default hub.
pub fn try_duplicates<S, K, E, F>(source: S, key_fn: F) -> Distinct<S::Item>
where
    S: Sequence + 'static,
    S::Item: 'static,
    K: Eq + Hash + Send + 'static,
    E: Display,
    F: FnMut(usize, &S::Item) -> Result<K, E> + Send + 'static,
{
    Hub::default().try_duplicates(source, key_fn)
}

/// [`Hub::merge`] on a default hub.
pub fn merge<I, S>(sources: I) -> Merged<S::Item>
where
    I: IntoIterator<Item = S>,
    S: Sequence + 'static,
    S::Item: 'static,
{
    Hub::default().merge(sources)
}
