//! Progress events and the per-worker event channel.
//!
//! Every worker owns one [`EventChannel`]. The worker is its only producer;
//! subscribers each get their own unbounded crossbeam queue, so publishing
//! never blocks the worker and every subscriber sees that worker's events in
//! emission order.

use super::worker::WorkerId;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

/// Opaque caller-defined payload attached to a value update.
pub type UserData = Arc<dyn Any + Send + Sync>;

/// Moment an event was emitted, captured on the worker thread.
pub type TimeStamp = Instant;

#[derive(Debug, Clone)]
pub enum Event {
    RangeChanged {
        min: i64,
        max: i64,
    },
    ValueChanged {
        value: i64,
        user_data: Option<UserData>,
        timestamp: TimeStamp,
    },
    TextChanged(String),
    Finished,
}

impl Event {
    pub fn is_finished(&self) -> bool {
        matches!(self, Event::Finished)
    }
}

/// An event tagged with the worker that emitted it.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub source: WorkerId,
    pub event: Event,
}

/// Reads a numeric user payload, as used for velocity quantities.
pub fn user_data_as_f64(data: &UserData) -> Option<f64> {
    if let Some(v) = data.downcast_ref::<f64>() {
        Some(*v)
    } else if let Some(v) = data.downcast_ref::<f32>() {
        Some(f64::from(*v))
    } else if let Some(v) = data.downcast_ref::<i64>() {
        Some(*v as f64)
    } else if let Some(v) = data.downcast_ref::<i32>() {
        Some(f64::from(*v))
    } else if let Some(v) = data.downcast_ref::<u64>() {
        Some(*v as f64)
    } else {
        data.downcast_ref::<usize>().map(|v| *v as f64)
    }
}

#[derive(Debug)]
pub struct EventChannel {
    source: WorkerId,
    subscribers: Mutex<Vec<Sender<Envelope>>>,
}

impl EventChannel {
    pub(crate) fn new(source: WorkerId) -> Self {
        Self {
            source,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Open a new subscription; only events published after this call are received.
    pub fn subscribe(&self) -> Receiver<Envelope> {
        let (tx, rx) = unbounded();
        self.attach(tx);
        rx
    }

    pub(crate) fn attach(&self, tx: Sender<Envelope>) {
        self.subscribers.lock().push(tx);
    }

    /// Deliver `event` to every live subscriber. Subscribers whose receiver
    /// was dropped are pruned.
    pub(crate) fn publish(&self, event: Event) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| {
            tx.send(Envelope {
                source: self.source,
                event: event.clone(),
            })
            .is_ok()
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub(crate) fn clear(&self) {
        self.subscribers.lock().clear();
    }
}
