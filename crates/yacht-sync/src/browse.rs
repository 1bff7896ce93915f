//! Debounced evaluation of browse filters.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use yacht_core::{filter_listings, YachtFilters, YachtListing};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(750);

type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Delivers only the last value pushed within `delay` of the previous push.
///
/// Every `push` aborts the pending timer and starts a new one. Must be used
/// from within a tokio runtime.
pub struct Debouncer<T> {
    delay: Duration,
    callback: Callback<T>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(delay: Duration, callback: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            delay,
            callback: Arc::new(callback),
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn push(&self, value: T) {
        let callback = self.callback.clone();
        let delay = self.delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback(value);
        });

        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = pending.replace(task) {
            previous.abort();
        }
    }

    /// Drop the pending value, if any.
    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = pending.take() {
            previous.abort();
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        let pending = self.pending.get_mut().unwrap_or_else(|p| p.into_inner());
        if let Some(task) = pending.take() {
            task.abort();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub filters: YachtFilters,
    pub listings: Vec<YachtListing>,
}

/// Filter edits go through a debouncer; each evaluation is published on a
/// watch channel.
pub struct BrowseSession {
    debouncer: Debouncer<YachtFilters>,
    results: watch::Receiver<SearchResults>,
    evaluations: Arc<AtomicUsize>,
}

impl BrowseSession {
    /// Starts out showing every listing.
    pub fn new(listings: Arc<Vec<YachtListing>>, delay: Duration) -> Self {
        let (tx, rx) = watch::channel(SearchResults {
            filters: YachtFilters::default(),
            listings: listings.as_ref().clone(),
        });
        let evaluations = Arc::new(AtomicUsize::new(0));

        let counter = evaluations.clone();
        let debouncer = Debouncer::new(delay, move |filters: YachtFilters| {
            let hits = filter_listings(&filters, listings.iter());
            let run = counter.fetch_add(1, Ordering::SeqCst) + 1;
            debug!(run, hits = hits.len(), "browse filters evaluated");
            tx.send_replace(SearchResults {
                filters,
                listings: hits,
            });
        });

        Self {
            debouncer,
            results: rx,
            evaluations,
        }
    }

    pub fn update(&self, filters: YachtFilters) {
        self.debouncer.push(filters);
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchResults> {
        self.results.clone()
    }

    pub fn current(&self) -> SearchResults {
        self.results.borrow().clone()
    }

    /// Number of times the predicate has run.
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }
}

/// Feed one JSON `YachtFilters` object per line through a browse session and
/// hand every evaluation to `emit`. Blank lines are skipped and unparsable
/// lines are logged and ignored. An edit still pending at end of input is
/// evaluated before returning the number of evaluations.
pub async fn browse_lines<R>(
    listings: Arc<Vec<YachtListing>>,
    delay: Duration,
    reader: R,
    mut emit: impl FnMut(&SearchResults),
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let session = BrowseSession::new(listings, delay);
    let mut results = session.subscribe();
    let mut lines = reader.lines();
    let mut pending = false;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading browse filters")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<YachtFilters>(&line) {
                    Ok(filters) => {
                        session.update(filters);
                        pending = true;
                    }
                    Err(err) => warn!(%err, "skipping unparsable filter line"),
                }
            }
            changed = results.changed() => {
                if changed.is_ok() {
                    pending = false;
                    emit(&results.borrow_and_update());
                }
            }
        }
    }

    if pending && results.changed().await.is_ok() {
        emit(&results.borrow_and_update());
    }
    Ok(session.evaluations())
}
