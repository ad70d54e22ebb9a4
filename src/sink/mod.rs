//! Passive consumers of progress events.
//!
//! A [`Sink`] is driven by the coordinator on its own context, after the
//! coordinator has updated its aggregation state. Every method defaults to a
//! no-op so a sink only implements what it cares about.

pub mod estimate;
pub mod velocity;

pub use estimate::{DurationFormatter, ProgressEstimate, TimeFormat};
pub use velocity::{VelocitySample, VelocityTracker};

use crate::executor::{TimeStamp, UserData};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

pub trait Sink: Send {
    fn on_value_changed(&mut self, _value: i64, _user_data: Option<&UserData>, _timestamp: TimeStamp) {}

    fn on_range_changed(&mut self, _min: i64, _max: i64) {}

    fn on_text_changed(&mut self, _text: &str) {}

    fn on_hide_requested(&mut self) {}
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn on_value_changed(&mut self, value: i64, user_data: Option<&UserData>, timestamp: TimeStamp) {
        (**self).on_value_changed(value, user_data, timestamp);
    }

    fn on_range_changed(&mut self, min: i64, max: i64) {
        (**self).on_range_changed(min, max);
    }

    fn on_text_changed(&mut self, text: &str) {
        (**self).on_text_changed(text);
    }

    fn on_hide_requested(&mut self) {
        (**self).on_hide_requested();
    }
}

/// Shared sinks stay inspectable by the caller while the coordinator drives them.
impl<S: Sink> Sink for Arc<Mutex<S>> {
    fn on_value_changed(&mut self, value: i64, user_data: Option<&UserData>, timestamp: TimeStamp) {
        self.lock().on_value_changed(value, user_data, timestamp);
    }

    fn on_range_changed(&mut self, min: i64, max: i64) {
        self.lock().on_range_changed(min, max);
    }

    fn on_text_changed(&mut self, text: &str) {
        self.lock().on_text_changed(text);
    }

    fn on_hide_requested(&mut self) {
        self.lock().on_hide_requested();
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl Sink for NullSink {}

/// Forwards every call to each child sink, in insertion order.
#[derive(Default)]
pub struct SinkGroup {
    children: Vec<Box<dyn Sink>>,
}

impl SinkGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a child and return its position.
    pub fn add<S: Sink + 'static>(&mut self, sink: S) -> usize {
        self.children.push(Box::new(sink));
        self.children.len() - 1
    }

    pub fn with<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.add(sink);
        self
    }

    /// Stop forwarding to the child at `index` and hand it back.
    pub fn remove(&mut self, index: usize) -> Box<dyn Sink> {
        self.children.remove(index)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Sink for SinkGroup {
    fn on_value_changed(&mut self, value: i64, user_data: Option<&UserData>, timestamp: TimeStamp) {
        for child in &mut self.children {
            child.on_value_changed(value, user_data, timestamp);
        }
    }

    fn on_range_changed(&mut self, min: i64, max: i64) {
        for child in &mut self.children {
            child.on_range_changed(min, max);
        }
    }

    fn on_text_changed(&mut self, text: &str) {
        for child in &mut self.children {
            child.on_text_changed(text);
        }
    }

    fn on_hide_requested(&mut self) {
        for child in &mut self.children {
            child.on_hide_requested();
        }
    }
}

impl std::fmt::Debug for SinkGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkGroup")
            .field("children", &self.children.len())
            .finish()
    }
}

/// Append-only log of every text the worker reported.
#[derive(Debug, Clone, Default)]
pub struct TextLog {
    lines: Vec<String>,
}

impl TextLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }
}

impl Sink for TextLog {
    fn on_text_changed(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }
}

/// Logs every call through `tracing`.
#[derive(Debug, Clone)]
pub struct TracingSink {
    label: String,
}

impl TracingSink {
    pub fn new<S: Into<String>>(label: S) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Sink for TracingSink {
    fn on_value_changed(&mut self, value: i64, _user_data: Option<&UserData>, _timestamp: TimeStamp) {
        info!(task = %self.label, value, "progress");
    }

    fn on_range_changed(&mut self, min: i64, max: i64) {
        info!(task = %self.label, min, max, "range");
    }

    fn on_text_changed(&mut self, text: &str) {
        info!(task = %self.label, text, "status");
    }

    fn on_hide_requested(&mut self) {
        info!(task = %self.label, "hidden");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Range(i64, i64),
    Value(i64),
    Text(String),
    Hide,
}

/// Records every call into a log shared between clones.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    calls: Arc<Mutex<Vec<SinkCall>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().clone()
    }

    pub fn values(&self) -> Vec<i64> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                SinkCall::Value(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    pub fn was_hidden(&self) -> bool {
        self.calls.lock().contains(&SinkCall::Hide)
    }
}

impl Sink for RecordingSink {
    fn on_value_changed(&mut self, value: i64, _user_data: Option<&UserData>, _timestamp: TimeStamp) {
        self.calls.lock().push(SinkCall::Value(value));
    }

    fn on_range_changed(&mut self, min: i64, max: i64) {
        self.calls.lock().push(SinkCall::Range(min, max));
    }

    fn on_text_changed(&mut self, text: &str) {
        self.calls.lock().push(SinkCall::Text(text.to_string()));
    }

    fn on_hide_requested(&mut self) {
        self.calls.lock().push(SinkCall::Hide);
    }
}
