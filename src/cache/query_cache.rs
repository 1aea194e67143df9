//! Keyed cache of asynchronous fetch results
//!
//! Each key holds at most one in-flight fetch. Concurrent callers for the
//! same key share it, values past `stale_after` are served immediately while
//! a background refetch runs, failures are retried with exponential backoff,
//! and entries nobody has looked at for `evict_after` are dropped.
//!
//! Every fetch is tagged with a ticket from a cache-wide counter. A result
//! is only applied if its ticket is still the latest one issued for the key,
//! so a superseded request can never overwrite newer data.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::events::{CacheEvent, CacheEvents};
use super::options::QueryOptions;
use crate::core::error::FetchError;

/// Produces one attempt of a fetch; called again for every retry
pub type Fetcher<V> = Arc<dyn Fn() -> BoxFuture<'static, Result<V, FetchError>> + Send + Sync>;

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, FetchError>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    /// Known key, nothing fetched yet
    Idle,
    /// First fetch running, no value to show
    Fetching,
    Fresh,
    /// Value older than `stale_after`; served while refreshed
    Stale,
    /// Retries exhausted; the error stays attached until the entry is
    /// invalidated, refetched or evicted
    Failed,
}

/// What a caller sees for one key
#[derive(Debug, Clone)]
pub struct QueryState<V> {
    pub value: Option<V>,
    pub status: QueryStatus,
    pub error: Option<FetchError>,
    pub fetched_at: Option<Instant>,
    /// A fetch for this key is in flight (cold or background)
    pub is_fetching: bool,
    pub retries_remaining: u32,
}

impl<V> QueryState<V> {
    /// A state that never touched the cache
    pub fn failed(error: FetchError) -> Self {
        Self {
            value: None,
            status: QueryStatus::Failed,
            error: Some(error),
            fetched_at: None,
            is_fetching: false,
            retries_remaining: 0,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.value.is_none() && self.is_fetching
    }

    pub fn is_failed(&self) -> bool {
        self.status == QueryStatus::Failed
    }

    /// Transform the value, keeping status and error
    pub fn map<U>(self, f: impl FnOnce(V) -> Option<U>) -> QueryState<U> {
        QueryState {
            value: self.value.and_then(f),
            status: self.status,
            error: self.error,
            fetched_at: self.fetched_at,
            is_fetching: self.is_fetching,
            retries_remaining: self.retries_remaining,
        }
    }

    /// The value if there is one (possibly stale), else the error
    pub fn into_result(self) -> Result<V, FetchError> {
        match (self.value, self.error) {
            (Some(value), _) => Ok(value),
            (None, Some(error)) => Err(error),
            (None, None) => Err(FetchError::Cancelled),
        }
    }
}

// =============================================================================
// ENTRY
// =============================================================================

struct InFlight<V> {
    ticket: u64,
    result: SharedFetch<V>,
    task: AbortHandle,
}

struct Entry<V> {
    value: Option<V>,
    error: Option<FetchError>,
    /// Idle, Fetching, Fresh or Failed; Stale is derived from `fetched_at`
    status: QueryStatus,
    fetched_at: Option<Instant>,
    invalidated: bool,
    last_observed: Instant,
    options: QueryOptions,
    retries_remaining: u32,
    observers: usize,
    /// Latest ticket issued for this key
    ticket: u64,
    fetcher: Option<Fetcher<V>>,
    in_flight: Option<InFlight<V>>,
    gc: Option<AbortHandle>,
}

impl<V: Clone> Entry<V> {
    fn new(options: QueryOptions, now: Instant) -> Self {
        Self {
            value: None,
            error: None,
            status: QueryStatus::Idle,
            fetched_at: None,
            invalidated: false,
            last_observed: now,
            options,
            retries_remaining: options.max_retries,
            observers: 0,
            ticket: 0,
            fetcher: None,
            in_flight: None,
            gc: None,
        }
    }

    fn is_stale(&self, now: Instant) -> bool {
        if self.invalidated {
            return true;
        }
        match self.fetched_at {
            Some(at) => now.saturating_duration_since(at) >= self.options.stale_after,
            None => true,
        }
    }

    fn is_evictable(&self, now: Instant) -> bool {
        self.observers == 0
            && self.in_flight.is_none()
            && now.saturating_duration_since(self.last_observed) >= self.options.evict_after
    }

    fn status_at(&self, now: Instant) -> QueryStatus {
        match self.status {
            QueryStatus::Fresh if self.is_stale(now) => QueryStatus::Stale,
            status => status,
        }
    }

    fn snapshot(&self, now: Instant) -> QueryState<V> {
        QueryState {
            value: self.value.clone(),
            status: self.status_at(now),
            error: self.error.clone(),
            fetched_at: self.fetched_at,
            is_fetching: self.in_flight.is_some(),
            retries_remaining: self.retries_remaining,
        }
    }

    fn cancel_gc(&mut self) {
        if let Some(gc) = self.gc.take() {
            gc.abort();
        }
    }
}

impl<V> Drop for Entry<V> {
    // Timers and fetch tasks die with their entry
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.task.abort();
        }
        if let Some(gc) = self.gc.take() {
            gc.abort();
        }
    }
}

// =============================================================================
// CACHE
// =============================================================================

struct Inner<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    tickets: AtomicU64,
    events: CacheEvents<K>,
}

enum Step<V> {
    Ready(QueryState<V>),
    Wait(u64, SharedFetch<V>),
}

/// Cheap to clone; clones share the same entries
pub struct QueryCache<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for QueryCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for QueryCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                tickets: AtomicU64::new(0),
                events: CacheEvents::default(),
            }),
        }
    }

    /// Read `key`, fetching through `fetcher` on a miss.
    ///
    /// - miss: runs the fetch (with retries) and waits for it; concurrent
    ///   callers join the same fetch
    /// - fresh hit: returns the cached value
    /// - stale hit: returns the cached value now and refreshes in the
    ///   background
    /// - failed: returns the retained error without fetching again
    pub async fn get<F, Fut>(&self, key: K, fetcher: F, options: QueryOptions) -> QueryState<V>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
    {
        let fetcher: Fetcher<V> = Arc::new(move || fetcher().boxed());
        self.get_with(key, fetcher, options).await
    }

    /// [`get`](Self::get) with a pre-built fetcher
    pub async fn get_with(&self, key: K, fetcher: Fetcher<V>, options: QueryOptions) -> QueryState<V> {
        let step = {
            let mut entries = self.inner.entries.lock();
            let now = Instant::now();
            self.inner.evict_if_expired(&mut entries, &key, now);

            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(options, now));
            entry.options = options;
            entry.fetcher = Some(Arc::clone(&fetcher));
            entry.last_observed = now;

            if let Some(in_flight) = &entry.in_flight {
                if entry.value.is_none() {
                    debug!(?key, "Joining in-flight fetch");
                    Step::Wait(in_flight.ticket, in_flight.result.clone())
                } else {
                    Step::Ready(entry.snapshot(now))
                }
            } else if entry.status == QueryStatus::Failed && !entry.invalidated {
                self.inner.arm_gc(&key, entry);
                Step::Ready(entry.snapshot(now))
            } else if entry.value.is_some() && !entry.is_stale(now) {
                debug!(?key, "Cache hit");
                self.inner.arm_gc(&key, entry);
                Step::Ready(entry.snapshot(now))
            } else if entry.value.is_some() {
                debug!(?key, "Serving stale value, refreshing in background");
                let snapshot_before = entry.snapshot(now);
                // The spawned task applies the refresh; this caller does not wait on it
                let _ = self.inner.start_fetch(&key, entry, fetcher);
                Step::Ready(QueryState {
                    is_fetching: true,
                    ..snapshot_before
                })
            } else {
                debug!(?key, "Cache miss");
                let (ticket, result) = self.inner.start_fetch(&key, entry, fetcher);
                Step::Wait(ticket, result)
            }
        };

        self.wait(&key, step).await
    }

    /// Current state of `key` without fetching or touching its idle timer
    pub fn peek(&self, key: &K) -> Option<QueryState<V>> {
        let entries = self.inner.entries.lock();
        entries.get(key).map(|entry| entry.snapshot(Instant::now()))
    }

    /// Wait for the in-flight fetch of `key`, if any, and return the result
    pub async fn settled(&self, key: &K) -> Option<QueryState<V>> {
        let step = {
            let entries = self.inner.entries.lock();
            let entry = entries.get(key)?;
            match &entry.in_flight {
                Some(in_flight) => Step::Wait(in_flight.ticket, in_flight.result.clone()),
                None => Step::Ready(entry.snapshot(Instant::now())),
            }
        };
        Some(self.wait(key, step).await)
    }

    /// Fetch `key` again with its last fetcher, even if fresh or failed.
    /// Joins the running fetch instead when one is in flight.
    pub async fn refetch(&self, key: &K) -> Option<QueryState<V>> {
        let step = {
            let mut entries = self.inner.entries.lock();
            let entry = entries.get_mut(key)?;
            match &entry.in_flight {
                Some(in_flight) => Step::Wait(in_flight.ticket, in_flight.result.clone()),
                None => {
                    let fetcher = entry.fetcher.clone()?;
                    entry.last_observed = Instant::now();
                    let (ticket, result) = self.inner.start_fetch(key, entry, fetcher);
                    Step::Wait(ticket, result)
                }
            }
        };
        Some(self.wait(key, step).await)
    }

    /// Write a value directly. Any fetch in flight for the key is superseded.
    pub fn set_data(&self, key: K, value: V, options: QueryOptions) {
        let mut entries = self.inner.entries.lock();
        let now = Instant::now();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(options, now));

        if let Some(in_flight) = entry.in_flight.take() {
            debug!(?key, "Superseding in-flight fetch");
            in_flight.task.abort();
        }

        entry.ticket = self.inner.next_ticket();
        entry.options = options;
        entry.value = Some(value);
        entry.error = None;
        entry.status = QueryStatus::Fresh;
        entry.fetched_at = Some(now);
        entry.invalidated = false;
        entry.last_observed = now;
        entry.retries_remaining = options.max_retries;
        self.inner.arm_gc(&key, entry);
        drop(entries);

        self.inner.events.updated(&key);
    }

    /// Mark `key` stale; the next read refetches (failed entries included)
    pub fn invalidate(&self, key: &K) -> bool {
        let mut entries = self.inner.entries.lock();
        let Some(entry) = entries.get_mut(key) else {
            return false;
        };
        entry.invalidated = true;
        drop(entries);

        self.inner.events.invalidated(key);
        true
    }

    pub fn invalidate_all(&self) {
        let keys: Vec<K> = {
            let mut entries = self.inner.entries.lock();
            entries
                .iter_mut()
                .map(|(key, entry)| {
                    entry.invalidated = true;
                    key.clone()
                })
                .collect()
        };
        for key in keys {
            self.inner.events.invalidated(&key);
        }
    }

    /// Drop `key`, cancelling its timers and any fetch in flight
    pub fn remove(&self, key: &K) -> Option<V> {
        let removed = self.inner.entries.lock().remove(key);
        let mut removed = removed?;
        self.inner.events.evicted(key);
        removed.value.take()
    }

    /// Drop every entry, cancelling timers and fetches
    pub fn clear(&self) {
        let drained: Vec<(K, Entry<V>)> = self.inner.entries.lock().drain().collect();
        debug!(entries = drained.len(), "Clearing query cache");
        drop(drained);
        self.inner.events.cleared();
    }

    /// Evict every idle entry past its window. Returns how many were removed.
    pub fn collect_garbage(&self) -> usize {
        let now = Instant::now();
        let mut evicted = Vec::new();
        {
            let mut entries = self.inner.entries.lock();
            entries.retain(|key, entry| {
                let keep = !entry.is_evictable(now);
                if !keep {
                    evicted.push(key.clone());
                }
                keep
            });
        }
        for key in &evicted {
            self.inner.events.evicted(key);
        }
        evicted.len()
    }

    /// Register an observer for `key`. An observed entry is never evicted;
    /// dropping the observer starts the idle clock again.
    pub fn subscribe(&self, key: K) -> QueryObserver<K, V> {
        let events = self.inner.events.subscribe();
        {
            let mut entries = self.inner.entries.lock();
            let now = Instant::now();
            self.inner.evict_if_expired(&mut entries, &key, now);
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(QueryOptions::default(), now));
            entry.observers += 1;
            entry.last_observed = now;
            entry.cancel_gc();
        }

        QueryObserver {
            key,
            cache: self.clone(),
            events,
        }
    }

    /// Every change to every key
    pub fn events(&self) -> broadcast::Receiver<CacheEvent<K>> {
        self.inner.events.subscribe()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }

    /// Number of keys with a fetch in flight
    pub fn in_flight(&self) -> usize {
        self.inner
            .entries
            .lock()
            .values()
            .filter(|entry| entry.in_flight.is_some())
            .count()
    }

    fn release(&self, key: &K) {
        let mut entries = self.inner.entries.lock();
        if let Some(entry) = entries.get_mut(key) {
            entry.observers = entry.observers.saturating_sub(1);
            entry.last_observed = Instant::now();
            self.inner.arm_gc(key, entry);
        }
    }

    async fn wait(&self, key: &K, mut step: Step<V>) -> QueryState<V> {
        loop {
            let (ticket, result) = match step {
                Step::Ready(state) => return state,
                Step::Wait(ticket, result) => (ticket, result),
            };
            let outcome = result.await;
            step = self.inner.settle(key, ticket, outcome);
        }
    }
}

impl<K, V> Inner<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn next_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn evict_if_expired(&self, entries: &mut HashMap<K, Entry<V>>, key: &K, now: Instant) {
        let expired = entries
            .get(key)
            .map(|entry| entry.is_evictable(now))
            .unwrap_or(false);
        if expired {
            debug!(?key, "Evicting idle entry");
            entries.remove(key);
            self.events.evicted(key);
        }
    }

    fn start_fetch(
        self: &Arc<Self>,
        key: &K,
        entry: &mut Entry<V>,
        fetcher: Fetcher<V>,
    ) -> (u64, SharedFetch<V>) {
        let ticket = self.next_ticket();
        entry.ticket = ticket;
        entry.invalidated = false;
        entry.retries_remaining = entry.options.max_retries;
        if entry.value.is_none() {
            entry.status = QueryStatus::Fetching;
        }
        entry.cancel_gc();

        let task = tokio::spawn(run_fetch(
            Arc::downgrade(self),
            key.clone(),
            ticket,
            fetcher,
            entry.options,
        ));
        let abort = task.abort_handle();
        let result = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(_) => Err(FetchError::Cancelled),
            }
        }
        .boxed()
        .shared();

        entry.in_flight = Some(InFlight {
            ticket,
            result: result.clone(),
            task: abort,
        });
        self.events.fetching(key);
        (ticket, result)
    }

    fn apply_success(self: &Arc<Self>, key: &K, ticket: u64, value: V) {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(key) else {
            debug!(?key, "Discarding result for removed entry");
            return;
        };
        if entry.ticket != ticket {
            debug!(?key, ticket, latest = entry.ticket, "Discarding superseded result");
            return;
        }

        let now = Instant::now();
        entry.value = Some(value);
        entry.error = None;
        entry.status = QueryStatus::Fresh;
        entry.fetched_at = Some(now);
        entry.last_observed = now;
        entry.retries_remaining = entry.options.max_retries;
        entry.in_flight = None;
        self.arm_gc(key, entry);
        drop(entries);

        self.events.updated(key);
    }

    fn apply_failure(self: &Arc<Self>, key: &K, ticket: u64, error: FetchError) {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        if entry.ticket != ticket {
            debug!(?key, ticket, "Discarding superseded failure");
            return;
        }

        warn!(?key, "Fetch failed: {}", error);
        entry.error = Some(error.clone());
        entry.status = QueryStatus::Failed;
        entry.retries_remaining = 0;
        entry.last_observed = Instant::now();
        entry.in_flight = None;
        self.arm_gc(key, entry);
        drop(entries);

        self.events.failed(key, &error);
    }

    /// Record a failed attempt. `false` means the fetch was superseded and
    /// should stop retrying.
    fn note_retry(&self, key: &K, ticket: u64, retries_remaining: u32) -> bool {
        let mut entries = self.entries.lock();
        match entries.get_mut(key) {
            Some(entry) if entry.ticket == ticket => {
                entry.retries_remaining = retries_remaining;
                drop(entries);
                self.events.retrying(key, retries_remaining);
                true
            }
            _ => false,
        }
    }

    /// Turn the outcome of an awaited fetch into the caller's view
    fn settle(&self, key: &K, ticket: u64, outcome: Result<V, FetchError>) -> Step<V> {
        let mut entries = self.entries.lock();
        let now = Instant::now();

        let Some(entry) = entries.get_mut(key) else {
            // Removed while in flight; report what this fetch produced
            return Step::Ready(match outcome {
                Ok(value) => QueryState {
                    value: Some(value),
                    status: QueryStatus::Fresh,
                    error: None,
                    fetched_at: Some(now),
                    is_fetching: false,
                    retries_remaining: 0,
                },
                Err(error) => QueryState::failed(error),
            });
        };

        let own_flight = entry.in_flight.as_ref().map(|f| f.ticket) == Some(ticket);
        if own_flight && matches!(outcome, Err(FetchError::Cancelled)) {
            // Task died without reporting back
            entry.in_flight = None;
            entry.status = QueryStatus::Failed;
            entry.error = Some(FetchError::Cancelled);
        }

        match &entry.in_flight {
            Some(newer) if newer.ticket != ticket && entry.value.is_none() => {
                Step::Wait(newer.ticket, newer.result.clone())
            }
            _ => Step::Ready(entry.snapshot(now)),
        }
    }

    fn arm_gc(self: &Arc<Self>, key: &K, entry: &mut Entry<V>) {
        entry.cancel_gc();
        if entry.observers > 0 || entry.in_flight.is_some() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            // No runtime: eviction happens lazily on the next read
            return;
        };
        let Some(deadline) = entry.last_observed.checked_add(entry.options.evict_after) else {
            return;
        };

        let weak = Arc::downgrade(self);
        let key = key.clone();
        let handle = runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = weak.upgrade() {
                inner.evict_if_idle(&key);
            }
        });
        entry.gc = Some(handle.abort_handle());
    }

    fn evict_if_idle(&self, key: &K) {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        if !entry.is_evictable(now) {
            return;
        }
        // This task is the timer; don't abort it from Entry::drop
        entry.gc = None;
        entries.remove(key);
        drop(entries);

        debug!(?key, "Evicted idle entry");
        self.events.evicted(key);
    }
}

async fn run_fetch<K, V>(
    inner: Weak<Inner<K, V>>,
    key: K,
    ticket: u64,
    fetcher: Fetcher<V>,
    options: QueryOptions,
) -> Result<V, FetchError>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let mut failures: u32 = 0;
    loop {
        let error = match fetcher().await {
            Ok(value) => {
                if let Some(inner) = inner.upgrade() {
                    inner.apply_success(&key, ticket, value.clone());
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if !error.is_retryable() || failures >= options.max_retries {
            let terminal = if failures == 0 {
                error
            } else {
                FetchError::Exhausted {
                    attempts: failures + 1,
                    last: Box::new(error),
                }
            };
            if let Some(inner) = inner.upgrade() {
                inner.apply_failure(&key, ticket, terminal.clone());
            }
            return Err(terminal);
        }

        let delay = options.backoff(failures);
        failures += 1;
        let still_current = inner
            .upgrade()
            .map(|inner| inner.note_retry(&key, ticket, options.max_retries - failures))
            .unwrap_or(false);
        if !still_current {
            return Err(FetchError::Cancelled);
        }

        debug!(?key, attempt = failures, ?delay, "Retrying after error: {}", error);
        tokio::time::sleep(delay).await;
    }
}

// =============================================================================
// OBSERVER
// =============================================================================

/// Keeps an entry alive and reports its changes
pub struct QueryObserver<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    key: K,
    cache: QueryCache<K, V>,
    events: broadcast::Receiver<CacheEvent<K>>,
}

impl<K, V> QueryObserver<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn snapshot(&self) -> Option<QueryState<V>> {
        self.cache.peek(&self.key)
    }

    /// Next event concerning this key. `None` once the cache is gone.
    pub async fn changed(&mut self) -> Option<CacheEvent<K>> {
        loop {
            match self.events.recv().await {
                Ok(event) if event.concerns(&self.key) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Observer lagged behind cache events");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl<K, V> Drop for QueryObserver<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.cache.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    const STALE: Duration = Duration::from_secs(120);
    const EVICT: Duration = Duration::from_secs(300);

    fn options() -> QueryOptions {
        QueryOptions::new(STALE, EVICT)
            .with_retries(2)
            .with_retry_delay(Duration::from_millis(100))
    }

    /// Fetcher that counts calls and resolves after a short delay
    fn counting(
        calls: &Arc<AtomicUsize>,
        value: Arc<Vec<u32>>,
    ) -> impl Fn() -> BoxFuture<'static, Result<Arc<Vec<u32>>, FetchError>> + Send + Sync + 'static
    {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let value = Arc::clone(&value);
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(value)
            }
            .boxed()
        }
    }

    fn failing(
        calls: &Arc<AtomicUsize>,
        error: FetchError,
    ) -> impl Fn() -> BoxFuture<'static, Result<Arc<Vec<u32>>, FetchError>> + Send + Sync + 'static
    {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let error = error.clone();
            async move { Err(error) }.boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_fetch() {
        let cache: QueryCache<&str, Arc<Vec<u32>>> = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let value = Arc::new(vec![1, 2, 3]);

        let (a, b) = tokio::join!(
            cache.get("recent:20", counting(&calls, value.clone()), options()),
            cache.get("recent:20", counting(&calls, value.clone()), options()),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let (a, b) = (a.value.unwrap(), b.value.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.as_slice(), &[1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_boundary() {
        let cache: QueryCache<&str, Arc<Vec<u32>>> = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let value = Arc::new(vec![7]);

        let first = cache.get("summary", counting(&calls, value.clone()), options()).await;
        assert_eq!(first.status, QueryStatus::Fresh);

        tokio::time::advance(STALE - Duration::from_millis(1)).await;
        let before = cache.get("summary", counting(&calls, value.clone()), options()).await;
        assert_eq!(before.status, QueryStatus::Fresh);
        assert!(!before.is_fetching);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_millis(2)).await;
        let after = cache.get("summary", counting(&calls, value.clone()), options()).await;
        assert_eq!(after.status, QueryStatus::Stale);
        assert!(after.is_fetching);
        assert_eq!(after.value.as_deref(), Some(&vec![7]));

        // A second stale read joins the running refresh
        let again = cache.get("summary", counting(&calls, value.clone()), options()).await;
        assert!(again.is_fetching);

        let refreshed = cache.settled(&"summary").await.unwrap();
        assert_eq!(refreshed.status, QueryStatus::Fresh);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicted_entry_is_fetched_cold() {
        let cache: QueryCache<&str, Arc<Vec<u32>>> = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let value = Arc::new(vec![1]);

        let first = cache.get("wallet", counting(&calls, value.clone()), options()).await;
        tokio::time::advance(EVICT + Duration::from_millis(1)).await;

        let second = cache.get("wallet", counting(&calls, value.clone()), options()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(second.status, QueryStatus::Fresh);
        assert!(!second.is_fetching);
        assert!(second.fetched_at.unwrap() > first.fetched_at.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_timer_evicts() {
        let cache: QueryCache<&str, Arc<Vec<u32>>> = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        cache.get("wallet", counting(&calls, Arc::new(vec![1])), options()).await;
        assert_eq!(cache.len(), 1);

        tokio::time::sleep(EVICT + Duration::from_secs(1)).await;
        assert!(cache.peek(&"wallet").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_keeps_error() {
        let cache: QueryCache<&str, Arc<Vec<u32>>> = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let error = FetchError::Server {
            status: 503,
            message: "down".to_string(),
        };

        let state = cache.get("summary", failing(&calls, error.clone()), options()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(state.status, QueryStatus::Failed);
        assert_eq!(
            state.error,
            Some(FetchError::Exhausted {
                attempts: 3,
                last: Box::new(error.clone()),
            })
        );

        // New readers see the same diagnostic without another request
        let again = cache.get("summary", failing(&calls, error), options()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(again.error, state.error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_within_retry_budget() {
        let cache: QueryCache<&str, u32> = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let state = cache
            .get(
                "transfers",
                move || {
                    let attempt = counter.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if attempt < 2 {
                            Err(FetchError::Network("reset".into()))
                        } else {
                            Ok(42)
                        }
                    }
                },
                options(),
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(state.value, Some(42));
        assert_eq!(state.status, QueryStatus::Fresh);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_is_not_retried() {
        let cache: QueryCache<&str, Arc<Vec<u32>>> = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let state = cache
            .get(
                "summary",
                failing(&calls, FetchError::Unauthorized { message: None }),
                options(),
            )
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.error, Some(FetchError::Unauthorized { message: None }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_retries_failed_entry() {
        let cache: QueryCache<&str, Arc<Vec<u32>>> = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .get("summary", failing(&calls, FetchError::Timeout), options().with_retries(0))
            .await;
        assert!(cache.invalidate(&"summary"));

        let state = cache
            .get("summary", counting(&calls, Arc::new(vec![5])), options())
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(state.status, QueryStatus::Fresh);
        assert!(state.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_holds_until_invalidated() {
        let cache: QueryCache<&str, Arc<Vec<u32>>> = QueryCache::new();
        let fetches = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(AtomicUsize::new(0));

        cache
            .get("summary", counting(&fetches, Arc::new(vec![7])), options())
            .await;
        tokio::time::advance(STALE + Duration::from_millis(1)).await;

        let stale = cache
            .get("summary", failing(&failures, FetchError::Timeout), options().with_retries(0))
            .await;
        assert!(stale.is_fetching);
        let failed = cache.settled(&"summary").await.unwrap();
        assert_eq!(failed.status, QueryStatus::Failed);
        assert_eq!(failed.value.as_deref(), Some(&vec![7]));

        // Regular reads neither refetch nor let the entry age out
        for _ in 0..3 {
            tokio::time::advance(EVICT - Duration::from_secs(1)).await;
            let state = cache
                .get("summary", counting(&fetches, Arc::new(vec![8])), options())
                .await;
            assert_eq!(state.status, QueryStatus::Failed);
            assert_eq!(state.error, Some(FetchError::Timeout));
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        assert!(cache.invalidate(&"summary"));
        cache
            .get("summary", counting(&fetches, Arc::new(vec![8])), options())
            .await;
        let recovered = cache.settled(&"summary").await.unwrap();
        assert_eq!(recovered.status, QueryStatus::Fresh);
        assert_eq!(recovered.value.as_deref(), Some(&vec![8]));
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_result_is_discarded() {
        let cache: QueryCache<&str, u32> = QueryCache::new();
        cache.set_data("capital", 1, options());
        let stale_ticket = cache.inner.entries.lock()[&"capital"].ticket;

        cache.set_data("capital", 2, options());
        cache.inner.apply_success(&"capital", stale_ticket, 99);

        assert_eq!(cache.peek(&"capital").unwrap().value, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_during_fetch_wins() {
        let cache: QueryCache<&str, u32> = QueryCache::new();
        let reader = cache.clone();
        let pending = tokio::spawn(async move {
            reader
                .get(
                    "capital",
                    || async {
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        Ok(1)
                    },
                    options(),
                )
                .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.set_data("capital", 2, options());

        let state = pending.await.unwrap();
        assert_eq!(state.value, Some(2));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(cache.peek(&"capital").unwrap().value, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_blocks_eviction() {
        let cache: QueryCache<&str, Arc<Vec<u32>>> = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let observer = cache.subscribe("summary");
        cache.get("summary", counting(&calls, Arc::new(vec![1])), options()).await;

        tokio::time::sleep(EVICT * 2).await;
        assert_eq!(cache.collect_garbage(), 0);
        assert!(observer.snapshot().unwrap().value.is_some());

        drop(observer);
        tokio::time::advance(EVICT + Duration::from_millis(1)).await;
        cache.collect_garbage();
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_sees_updates() {
        let cache: QueryCache<&str, Arc<Vec<u32>>> = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut observer = cache.subscribe("summary");

        cache.get("wallet", counting(&calls, Arc::new(vec![9])), options()).await;
        cache.get("summary", counting(&calls, Arc::new(vec![1])), options()).await;

        assert_eq!(
            observer.changed().await,
            Some(CacheEvent::Fetching { key: "summary" })
        );
        assert_eq!(
            observer.changed().await,
            Some(CacheEvent::Updated { key: "summary" })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_in_flight() {
        let cache: QueryCache<&str, u32> = QueryCache::new();
        let reader = cache.clone();
        let pending = tokio::spawn(async move {
            reader
                .get(
                    "summary",
                    || async {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        Ok(1)
                    },
                    options(),
                )
                .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cache.in_flight(), 1);
        cache.clear();

        let state = pending.await.unwrap();
        assert_eq!(state.error, Some(FetchError::Cancelled));
        assert!(cache.is_empty());
    }
}
