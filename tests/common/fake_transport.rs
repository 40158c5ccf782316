//! Scripted in-memory transport
//!
//! Holds the "server side" notification list and lets tests hold fetches
//! open, pause mutations and inject failures per notification id.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use surplus_notifications::{Notification, NotificationTransport, TransportError};
use tokio::sync::{oneshot, watch};

/// A transport call as seen by the fake server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    FetchAll,
    FetchUnreadCount,
    MarkRead(Vec<String>),
    MarkAllRead,
    Delete(String),
}

/// Keeps one fetch pending until released. Dropping the gate releases it.
pub struct FetchGate {
    release: Option<oneshot::Sender<()>>,
}

impl FetchGate {
    pub fn release(mut self) {
        if let Some(tx) = self.release.take() {
            let _ = tx.send(());
        }
    }
}

#[derive(Default)]
struct FakeState {
    notifications: Vec<Notification>,
    calls: Vec<TransportCall>,
    held_fetches: VecDeque<oneshot::Receiver<()>>,
    fetch_failure: Option<TransportError>,
    unread_count_override: Option<usize>,
    mark_all_failure: Option<TransportError>,
    id_failures: HashMap<String, TransportError>,
}

pub struct FakeTransport {
    state: Mutex<FakeState>,
    mutations_open: watch::Sender<bool>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Self::with_notifications(Vec::new())
    }

    pub fn with_notifications(notifications: Vec<Notification>) -> Arc<Self> {
        let (mutations_open, _) = watch::channel(true);
        Arc::new(Self {
            state: Mutex::new(FakeState {
                notifications,
                ..Default::default()
            }),
            mutations_open,
        })
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Replace the server-side list.
    pub fn set_notifications(&self, notifications: Vec<Notification>) {
        self.lock().notifications = notifications;
    }

    pub fn server_notifications(&self) -> Vec<Notification> {
        self.lock().notifications.clone()
    }

    /// The next fetch captures the server list immediately but only
    /// responds once the returned gate is released.
    pub fn hold_next_fetch(&self) -> FetchGate {
        let (tx, rx) = oneshot::channel();
        self.lock().held_fetches.push_back(rx);
        FetchGate { release: Some(tx) }
    }

    pub fn fail_fetches(&self, error: Option<TransportError>) {
        self.lock().fetch_failure = error;
    }

    pub fn report_unread_count(&self, count: Option<usize>) {
        self.lock().unread_count_override = count;
    }

    pub fn fail_mark_all_read(&self, error: Option<TransportError>) {
        self.lock().mark_all_failure = error;
    }

    /// Fail mark-read and delete calls that target `id`.
    pub fn fail_id(&self, id: &str, error: TransportError) {
        self.lock().id_failures.insert(id.to_string(), error);
    }

    /// Mutation calls block until [`FakeTransport::resume_mutations`].
    pub fn pause_mutations(&self) {
        self.mutations_open.send_replace(false);
    }

    pub fn resume_mutations(&self) {
        self.mutations_open.send_replace(true);
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| **c == TransportCall::FetchAll)
            .count()
    }

    async fn wait_for_mutations(&self) {
        let mut rx = self.mutations_open.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }
}

#[async_trait]
impl NotificationTransport for FakeTransport {
    async fn fetch_all(&self) -> Result<Vec<Notification>, TransportError> {
        let (response, gate) = {
            let mut state = self.lock();
            state.calls.push(TransportCall::FetchAll);
            let response = match &state.fetch_failure {
                Some(e) => Err(e.clone()),
                None => Ok(state.notifications.clone()),
            };
            (response, state.held_fetches.pop_front())
        };

        if let Some(gate) = gate {
            let _ = gate.await;
        }
        response
    }

    async fn fetch_unread_count(&self) -> Result<usize, TransportError> {
        let mut state = self.lock();
        state.calls.push(TransportCall::FetchUnreadCount);
        if let Some(e) = &state.fetch_failure {
            return Err(e.clone());
        }
        Ok(state
            .unread_count_override
            .unwrap_or_else(|| state.notifications.iter().filter(|n| !n.is_read).count()))
    }

    async fn mark_read(&self, ids: &[String]) -> Result<(), TransportError> {
        self.lock().calls.push(TransportCall::MarkRead(ids.to_vec()));
        self.wait_for_mutations().await;

        let mut state = self.lock();
        for id in ids {
            if let Some(e) = state.id_failures.get(id) {
                return Err(e.clone());
            }
        }
        for id in ids {
            match state.notifications.iter_mut().find(|n| &n.id == id) {
                Some(n) => n.is_read = true,
                None => return Err(TransportError::not_found(format!("no notification {}", id))),
            }
        }
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<(), TransportError> {
        self.lock().calls.push(TransportCall::MarkAllRead);
        self.wait_for_mutations().await;

        let mut state = self.lock();
        if let Some(e) = &state.mark_all_failure {
            return Err(e.clone());
        }
        for n in state.notifications.iter_mut() {
            n.is_read = true;
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), TransportError> {
        self.lock().calls.push(TransportCall::Delete(id.to_string()));
        self.wait_for_mutations().await;

        let mut state = self.lock();
        if let Some(e) = state.id_failures.get(id) {
            return Err(e.clone());
        }
        let before = state.notifications.len();
        state.notifications.retain(|n| n.id != id);
        if state.notifications.len() == before {
            return Err(TransportError::not_found(format!("no notification {}", id)));
        }
        Ok(())
    }
}
