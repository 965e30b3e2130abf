//! Asynchronous taxon searches for interactive callers.
//!
//! This module runs each search on its own short-lived worker thread, so the
//! interactive thread never blocks on the store. Results travel back through
//! a channel and are handed to the caller's completion callback when the
//! interactive thread dispatches pending messages.
//!
//! Each search surface (input field) has at most one search in flight.
//! Starting another search on the same field cancels the earlier one, so only
//! the latest request for a field is ever delivered. Cancellation is
//! cooperative via an `Arc<AtomicBool>` that the running query checks.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

use seahash::SeaHasher;
use std::hash::BuildHasherDefault;
use tracing::{debug, info, warn};

use crate::error::{FieldrefError, Result};
use crate::model::{SearchRequest, TaxonOccurrence};
use crate::persist::{QueryGuard, Store};
use crate::taxon::TaxonSearch;

pub type FieldHasher = BuildHasherDefault<SeaHasher>;

/// Cancellation token shared with the worker thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);
impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Caller-visible progress indicator, one per search surface.
pub trait ProgressListener {
    fn shown(&mut self, field: &str);
    fn dismissed(&mut self, field: &str);
}

/// A listener for callers without a progress indicator.
#[derive(Debug, Default)]
pub struct NoProgress;
impl ProgressListener for NoProgress {
    fn shown(&mut self, _field: &str) {}
    fn dismissed(&mut self, _field: &str) {}
}

pub type Completion = Box<dyn FnOnce(&str, Result<Vec<TaxonOccurrence>>)>;

/// Identifies one search request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchTicket {
    pub field: String,
    pub generation: u64,
}

/// Posted by a worker once its search finishes.
struct SearchMessage {
    field: String,
    generation: u64,
    outcome: Result<Vec<TaxonOccurrence>>,
}

struct InFlight {
    generation: u64,
    cancel: CancelToken,
    started: Instant,
    on_complete: Completion,
}

// ------------- SearchCoordinator -------------
/// Owned by the interactive thread. Not `Send`: completion callbacks and the
/// progress listener belong to the interactive side.
pub struct SearchCoordinator {
    store: Store,
    timeout: Option<Duration>,
    next_generation: u64,
    in_flight: HashMap<String, InFlight, FieldHasher>,
    sender: Sender<SearchMessage>,
    receiver: Receiver<SearchMessage>,
    progress: Box<dyn ProgressListener>,
}

impl SearchCoordinator {
    pub fn new(store: Store) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            store,
            timeout: None,
            next_generation: 0,
            in_flight: HashMap::default(),
            sender,
            receiver,
            progress: Box::new(NoProgress),
        }
    }
    /// Bounds every query; an expired search completes with
    /// [`FieldrefError::QueryTimeout`].
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
    pub fn with_progress(mut self, progress: Box<dyn ProgressListener>) -> Self {
        self.progress = progress;
        self
    }

    /// Starts a search on a worker thread. `on_complete` runs on the thread
    /// that later calls one of the dispatch methods, exactly once, unless the
    /// search is cancelled or superseded first.
    pub fn start_search<F>(&mut self, request: SearchRequest, on_complete: F) -> SearchTicket
    where
        F: FnOnce(&str, Result<Vec<TaxonOccurrence>>) + 'static,
    {
        let field = request.field.clone();
        if self.retire(&field) {
            debug!(%field, "earlier search superseded");
        }
        self.next_generation += 1;
        let generation = self.next_generation;
        let cancel = CancelToken::new();
        self.in_flight.insert(
            field.clone(),
            InFlight {
                generation,
                cancel: cancel.clone(),
                started: Instant::now(),
                on_complete: Box::new(on_complete),
            },
        );
        self.progress.shown(&field);

        let store = self.store.clone();
        let sender = self.sender.clone();
        let guard = QueryGuard::new(cancel.clone(), self.timeout);
        std::thread::spawn(move || {
            // the connection is released when the search goes out of scope
            let outcome =
                TaxonSearch::open_guarded(&store, guard).and_then(|search| search.search(&request));
            if cancel.is_cancelled() {
                debug!(field = %request.field, generation, "cancelled search dropped");
                return;
            }
            let _ = sender.send(SearchMessage {
                field: request.field,
                generation,
                outcome,
            });
        });
        SearchTicket { field, generation }
    }

    /// Cancels the search in flight for a field and dismisses its progress
    /// indicator. No callback is made for a cancelled search.
    pub fn cancel(&mut self, field: &str) -> bool {
        let cancelled = self.retire(field);
        if cancelled {
            info!(%field, "search cancelled");
        }
        cancelled
    }
    pub fn is_searching(&self, field: &str) -> bool {
        self.in_flight.contains_key(field)
    }
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Delivers every message already posted, without waiting. Returns the
    /// number of callbacks made.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut delivered = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(message) => {
                    if self.deliver(message) {
                        delivered += 1;
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        delivered
    }
    /// Waits up to `wait` for the next deliverable message. Stale messages
    /// from superseded searches are dropped along the way.
    pub fn dispatch_next(&mut self, wait: Duration) -> bool {
        let deadline = Instant::now() + wait;
        while !self.in_flight.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(message) => {
                    if self.deliver(message) {
                        return true;
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return false;
                }
            }
        }
        false
    }
    /// Dispatches until nothing is in flight or `wait` has passed. Returns the
    /// number of callbacks made.
    pub fn dispatch_until_idle(&mut self, wait: Duration) -> usize {
        let deadline = Instant::now() + wait;
        let mut delivered = 0;
        while !self.in_flight.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !self.dispatch_next(remaining) {
                break;
            }
            delivered += 1;
        }
        delivered
    }

    fn deliver(&mut self, message: SearchMessage) -> bool {
        let current = self
            .in_flight
            .get(&message.field)
            .is_some_and(|f| f.generation == message.generation);
        if !current {
            debug!(field = %message.field, generation = message.generation, "stale result dropped");
            return false;
        }
        let Some(in_flight) = self.in_flight.remove(&message.field) else {
            return false;
        };
        if let Err(e) = &message.outcome {
            warn!(field = %message.field, error = %e, "search failed");
        }
        debug!(
            field = %message.field,
            ms = in_flight.started.elapsed().as_secs_f64() * 1000.0,
            "search delivered"
        );
        (in_flight.on_complete)(&message.field, message.outcome);
        self.progress.dismissed(&message.field);
        true
    }
    fn retire(&mut self, field: &str) -> bool {
        match self.in_flight.remove(field) {
            Some(in_flight) => {
                in_flight.cancel.cancel();
                self.progress.dismissed(field);
                true
            }
            None => false,
        }
    }
}

impl Drop for SearchCoordinator {
    fn drop(&mut self) {
        let fields: Vec<String> = self.in_flight.keys().cloned().collect();
        for field in fields {
            self.retire(&field);
        }
    }
}

// ------------- Future-based search -------------
struct CancelOnDrop(CancelToken);
impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Runs one search on tokio's blocking pool. Dropping the future cancels the
/// query.
pub async fn search_async(
    store: Store,
    request: SearchRequest,
    timeout: Option<Duration>,
) -> Result<Vec<TaxonOccurrence>> {
    let cancel = CancelToken::new();
    let _cancel_on_drop = CancelOnDrop(cancel.clone());
    let guard = QueryGuard::new(cancel, timeout);
    tokio::task::spawn_blocking(move || {
        TaxonSearch::open_guarded(&store, guard).and_then(|search| search.search(&request))
    })
    .await
    .map_err(|e| {
        warn!(error = %e, "Join error");
        FieldrefError::Query(format!("search worker failed: {e}"))
    })?
}
