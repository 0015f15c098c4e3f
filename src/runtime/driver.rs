//! Async driver for a session
//!
//! Runs a `Session` on its own tokio task. Events arrive over an mpsc channel
//! (learner intents from the handle, signals from providers that were given
//! a sender), the logical clock follows tokio's clock on a fixed tick, and
//! every change to the render state is published on a watch channel.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::error::RuntimeError;
use super::session::{ActivityEvent, ActivityView, Session};
use super::turn::{Millis, TurnRecord};

/// Buffer size of the event channel
pub const EVENT_BUFFER_SIZE: usize = 64;

/// Event channel a session will read from
///
/// Create it first so providers can be handed a sender before the session
/// exists.
pub struct Inbox {
    tx: mpsc::Sender<ActivityEvent>,
    rx: mpsc::Receiver<ActivityEvent>,
}

impl Inbox {
    /// New channel with the default buffer
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER_SIZE);
        Self { tx, rx }
    }

    /// Sender for providers or other producers
    pub fn sender(&self) -> mpsc::Sender<ActivityEvent> {
        self.tx.clone()
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a running session
pub struct SessionHandle {
    events: mpsc::Sender<ActivityEvent>,
    view: watch::Receiver<ActivityView>,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<Vec<TurnRecord>>,
}

impl SessionHandle {
    /// Queue an event
    pub async fn send(&self, event: ActivityEvent) -> std::result::Result<(), RuntimeError> {
        self.events
            .send(event)
            .await
            .map_err(|_| RuntimeError::ShutDown)
    }

    /// Watch the render state
    pub fn subscribe(&self) -> watch::Receiver<ActivityView> {
        self.view.clone()
    }

    /// Latest render state
    pub fn view(&self) -> ActivityView {
        self.view.borrow().clone()
    }

    /// Stop the session and collect its recent turns
    pub async fn shutdown(mut self) -> Result<Vec<TurnRecord>> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.task.await.context("Session task failed")
    }
}

/// Spawn `session` onto the current tokio runtime
pub fn spawn_session(mut session: Session, inbox: Inbox, tick: Duration) -> SessionHandle {
    let Inbox { tx, rx } = inbox;
    if let Err(err) = session.start() {
        warn!(error = %err, "Session could not start");
    }
    let (view_tx, view_rx) = watch::channel(session.render());
    let (stop_tx, stop_rx) = oneshot::channel();

    let task = tokio::spawn(run(session, rx, stop_rx, view_tx, tick));
    SessionHandle {
        events: tx,
        view: view_rx,
        stop: Some(stop_tx),
        task,
    }
}

async fn run(
    mut session: Session,
    mut rx: mpsc::Receiver<ActivityEvent>,
    mut stop: oneshot::Receiver<()>,
    view: watch::Sender<ActivityView>,
    tick: Duration,
) -> Vec<TurnRecord> {
    let started = Instant::now();
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(session = %session.id(), tick_ms = tick.as_millis() as u64, "Session driver running");

    loop {
        tokio::select! {
            biased;

            _ = &mut stop => {
                debug!(session = %session.id(), "Stop requested");
                break;
            }

            event = rx.recv() => match event {
                Some(event) => {
                    session.advance_clock(Millis::from_duration(started.elapsed()));
                    let _ = session.handle(event);
                }
                None => {
                    info!(session = %session.id(), "Event channel closed");
                    break;
                }
            },

            _ = ticker.tick() => {
                session.advance_clock(Millis::from_duration(started.elapsed()));
            }
        }
        publish(&view, &session);
    }

    session.shutdown();
    publish(&view, &session);
    session.history().cloned().collect()
}

fn publish(view: &watch::Sender<ActivityView>, session: &Session) {
    let next = session.render();
    view.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}
