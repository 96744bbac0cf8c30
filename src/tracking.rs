//! Live tracking poller.
//!
//! Reads the device location and asks the backend where on the route we are,
//! once at start and then every poll interval until stopped. Each tick
//! publishes the latest position, or `None` when the location or the lookup
//! failed; the next tick simply tries again.

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::CommuteBackend;
use crate::error::LocateError;
use crate::models::{RouteResult, TrackPosition};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Fix {
    pub lat: f64,
    pub lng: f64,
}

/// Source of the device's current location.
pub trait Locator: Send + Sync + 'static {
    fn locate(&self) -> impl Future<Output = Result<Fix, LocateError>> + Send;
}

/// Reads the latest fix from a JSON file (`{"lat": .., "lng": ..}`) kept up to
/// date by a GPS daemon. No file means no permission to locate.
pub struct FileLocator {
    path: PathBuf,
}

impl FileLocator {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Locator for FileLocator {
    async fn locate(&self) -> Result<Fix, LocateError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(LocateError::Denied),
            Err(e) => return Err(LocateError::Unavailable(e.to_string())),
        };
        serde_json::from_str(&contents).map_err(|e| LocateError::Unavailable(format!("{}: {e}", self.path.display())))
    }
}

pub struct TrackingPoller {
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
    active: Arc<AtomicBool>,
    closed: AtomicBool,
    polls: Arc<AtomicU32>,
    latest: Arc<watch::Sender<Option<TrackPosition>>>,
}

impl TrackingPoller {
    pub fn new(interval: Duration) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            interval,
            task: Mutex::new(None),
            active: Arc::new(AtomicBool::new(false)),
            closed: AtomicBool::new(false),
            polls: Arc::new(AtomicU32::new(0)),
            latest: Arc::new(latest),
        }
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn poll_count(&self) -> u32 {
        self.polls.load(Ordering::Relaxed)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<TrackPosition>> {
        self.latest.subscribe()
    }

    /// Start polling `route`, replacing any earlier polling. Returns `false`
    /// once the poller has been shut down.
    pub fn start<B, L>(&self, route: RouteResult, backend: Arc<B>, locator: Arc<L>) -> bool
    where
        B: CommuteBackend,
        L: Locator,
    {
        let mut task = self.task_slot();
        if self.closed.load(Ordering::SeqCst) {
            debug!("Tracking already shut down, not starting");
            return false;
        }
        if let Some(previous) = task.take() {
            previous.abort();
        }
        self.active.store(true, Ordering::Relaxed);
        self.polls.store(0, Ordering::Relaxed);

        let active = self.active.clone();
        let polls = self.polls.clone();
        let latest = self.latest.clone();
        let period = self.interval;
        info!("Tracking every {}s", period.as_secs());

        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if !active.load(Ordering::Relaxed) {
                    break;
                }
                let n = polls.fetch_add(1, Ordering::Relaxed) + 1;
                let position = poll_once(&route, backend.as_ref(), locator.as_ref()).await;
                if !active.load(Ordering::Relaxed) {
                    break;
                }
                debug!("Tracking poll #{n}: {}", if position.is_some() { "ok" } else { "cleared" });
                latest.send_replace(position);
            }
        }));
        true
    }

    /// Cancel polling. A poll in flight is dropped without publishing.
    pub fn stop(&self) {
        self.active.store(false, Ordering::Relaxed);
        if let Some(handle) = self.task_slot().take() {
            handle.abort();
            debug!("Tracking stopped after {} polls", self.poll_count());
        }
    }

    /// Stop for good: later `start` calls are refused.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.stop();
    }

    fn task_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        // The slot only holds a handle, so a poisoned lock is still usable.
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TrackingPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_once<B, L>(route: &RouteResult, backend: &B, locator: &L) -> Option<TrackPosition>
where
    B: CommuteBackend,
    L: Locator,
{
    let fix = match locator.locate().await {
        Ok(fix) => fix,
        Err(e) => {
            debug!("No location: {e}");
            return None;
        }
    };
    match backend.track_position(route, fix.lat, fix.lng).await {
        Ok(position) => Some(position),
        Err(e) => {
            warn!("Tracking lookup failed: {e}");
            None
        }
    }
}
