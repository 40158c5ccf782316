use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ErrorKind, SyncError};
use crate::metrics;
use crate::notifications::{Change, NotificationHub};
use crate::transport::{with_deadline, NotificationTransport};

/// What started a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshTrigger {
    /// The periodic poller.
    Background,
    /// An explicit user action, e.g. opening the notification list.
    OnDemand,
}

impl std::fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshTrigger::Background => write!(f, "background"),
            RefreshTrigger::OnDemand => write!(f, "on_demand"),
        }
    }
}

/// How a refresh response was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The response replaced the cache.
    Applied { seq: u64, notifications: usize },
    /// A newer refresh was issued before this one resolved.
    Discarded { seq: u64 },
}

/// Sequence bookkeeping for the stale-response guard.
#[derive(Debug, Default)]
pub(crate) struct RefreshState {
    issued: u64,
    in_flight: usize,
    last_synced_at: Option<i64>,
}

impl RefreshState {
    /// Issue a new refresh and return its sequence number.
    pub(crate) fn begin(&mut self) -> u64 {
        self.issued += 1;
        self.in_flight += 1;
        self.issued
    }

    /// Retire an in-flight refresh. Returns true if `seq` is still the
    /// most recently issued one, i.e. its result may be applied.
    pub(crate) fn settle(&mut self, seq: u64) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        seq == self.issued
    }

    pub(crate) fn mark_synced(&mut self, at: i64) {
        self.last_synced_at = Some(at);
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub(crate) fn last_synced_at(&self) -> Option<i64> {
        self.last_synced_at
    }
}

/// Keeps `loading` honest when a refresh future is dropped mid-flight
/// (poller shutdown). Disarmed once the refresh settles normally.
struct InFlightRefresh<'a> {
    hub: &'a NotificationHub,
    seq: u64,
    armed: bool,
}

impl<'a> InFlightRefresh<'a> {
    fn issue(hub: &'a NotificationHub) -> Self {
        let seq = hub.update(|state| {
            let was_loading = state.refresh.is_loading();
            let seq = state.refresh.begin();
            Change::when(!was_loading, seq)
        });
        Self {
            hub,
            seq,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightRefresh<'_> {
    fn drop(&mut self) {
        if self.armed {
            let seq = self.seq;
            self.hub.update(|state| {
                state.refresh.settle(seq);
                Change::when(!state.refresh.is_loading(), ())
            });
        }
    }
}

/// Periodic and on-demand full refresh of the notification cache.
pub struct SyncScheduler {
    hub: Arc<NotificationHub>,
    transport: Arc<dyn NotificationTransport>,
    request_timeout: Duration,
}

impl SyncScheduler {
    pub fn new(
        hub: Arc<NotificationHub>,
        transport: Arc<dyn NotificationTransport>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            hub,
            transport,
            request_timeout,
        }
    }

    /// Fetch everything and replace the cache, unless a newer refresh was
    /// issued while this one was in flight.
    ///
    /// A failed refresh leaves the cache untouched and sets the snapshot's
    /// error flag; the error is also returned for callers that care.
    pub async fn refresh(&self, trigger: RefreshTrigger) -> Result<RefreshOutcome, SyncError> {
        let mut ticket = InFlightRefresh::issue(&self.hub);
        let seq = ticket.seq;
        debug!(seq, trigger = %trigger, "Notification refresh issued");

        let started = Instant::now();
        let result = with_deadline(self.request_timeout, self.transport.fetch_all()).await;
        let elapsed = started.elapsed();

        ticket.disarm();
        let outcome = self.hub.update(|state| {
            let was_loading = state.refresh.is_loading();
            let is_latest = state.refresh.settle(seq);
            let loading_changed = was_loading != state.refresh.is_loading();

            if !is_latest {
                return Change::when(loading_changed, Ok(RefreshOutcome::Discarded { seq }));
            }

            match result {
                Ok(notifications) => {
                    state.cache.replace_all(notifications);
                    state.error = None;
                    state.refresh.mark_synced(chrono::Utc::now().timestamp());
                    Change::changed(Ok(RefreshOutcome::Applied {
                        seq,
                        notifications: state.cache.len(),
                    }))
                }
                Err(err) => {
                    let kind = ErrorKind::from(err.kind);
                    let flag_changed = state.error != Some(kind);
                    state.error = Some(kind);
                    Change::when(loading_changed || flag_changed, Err(SyncError::from(err)))
                }
            }
        });

        match &outcome {
            Ok(RefreshOutcome::Applied { notifications, .. }) => {
                debug!(seq, trigger = %trigger, notifications, ?elapsed, "Notification refresh applied");
                metrics::record_refresh(trigger, "applied", elapsed);
            }
            Ok(RefreshOutcome::Discarded { .. }) => {
                debug!(seq, trigger = %trigger, "Discarding stale notification refresh");
                metrics::record_refresh(trigger, "discarded", elapsed);
            }
            Err(e) => {
                warn!(seq, trigger = %trigger, error = %e, "Notification refresh failed, keeping last known state");
                metrics::record_refresh(trigger, "failed", elapsed);
            }
        }

        outcome
    }

    /// Start the background poller. The first refresh runs immediately.
    ///
    /// The poller stops when the returned handle is stopped or dropped, or
    /// when `shutdown` is cancelled.
    pub fn start(self: &Arc<Self>, interval: Duration, shutdown: &CancellationToken) -> PollerHandle {
        let token = shutdown.child_token();
        let scheduler = Arc::clone(self);
        let task = tokio::spawn(scheduler.poll(interval, token.clone()));

        PollerHandle {
            token,
            task: Some(task),
        }
    }

    async fn poll(self: Arc<Self>, interval: Duration, token: CancellationToken) {
        let interval = interval.max(Duration::from_millis(1));
        info!("Starting notification poller, refreshing every {:?}", interval);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            // Failures are already logged and flagged on the snapshot
            tokio::select! {
                _ = token.cancelled() => break,
                _ = self.refresh(RefreshTrigger::Background) => {}
            }
        }

        info!("Notification poller stopped");
    }
}

/// Handle to the background poller task.
pub struct PollerHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Ask the poller to stop. Idempotent.
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the poller and wait for its task to exit.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Notification poller task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
