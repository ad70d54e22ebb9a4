//! Processing velocity from value updates that carry a numeric quantity.

use super::Sink;
use crate::executor::{user_data_as_f64, TimeStamp, UserData};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocitySample {
    /// Progress value the sample was taken at.
    pub value: i64,
    /// Quantity per second.
    pub velocity: f64,
}

/// Tracks how fast a worker processes its quantity.
///
/// Each value update is expected to carry the quantity processed since the
/// previous update as numeric user data. Updates without one, or arriving in
/// the same millisecond as the previous update, only move the clock.
#[derive(Debug, Clone, Default)]
pub struct VelocityTracker {
    units: Option<String>,
    min: i64,
    max: i64,
    last: Option<TimeStamp>,
    samples: Vec<VelocitySample>,
    max_velocity: f64,
}

impl VelocityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_units<S: Into<String>>(units: S) -> Self {
        Self {
            units: Some(units.into()),
            ..Self::default()
        }
    }

    pub fn samples(&self) -> &[VelocitySample] {
        &self.samples
    }

    pub fn current_velocity(&self) -> Option<f64> {
        self.samples.last().map(|s| s.velocity)
    }

    pub fn max_velocity(&self) -> f64 {
        self.max_velocity
    }

    pub fn range(&self) -> (i64, i64) {
        (self.min, self.max)
    }

    /// Current velocity with three significant digits, e.g. `"12.5 MB/s"`.
    pub fn current_label(&self) -> Option<String> {
        let velocity = self.current_velocity()?;
        let number = significant(velocity, 3);
        Some(match &self.units {
            Some(units) => format!("{} {}/s", number, units),
            None => number,
        })
    }
}

impl Sink for VelocityTracker {
    fn on_value_changed(&mut self, value: i64, user_data: Option<&UserData>, timestamp: TimeStamp) {
        let Some(last) = self.last.replace(timestamp) else {
            return;
        };

        let elapsed_ms = timestamp.saturating_duration_since(last).as_millis();
        let quantity = user_data.and_then(user_data_as_f64);
        if let (true, Some(quantity)) = (elapsed_ms > 0, quantity) {
            let velocity = 1000.0 * quantity / elapsed_ms as f64;
            if velocity > self.max_velocity {
                self.max_velocity = velocity;
            }
            self.samples.push(VelocitySample { value, velocity });
        }
    }

    fn on_range_changed(&mut self, min: i64, max: i64) {
        self.min = min;
        self.max = max;
    }
}

fn significant(v: f64, digits: i32) -> String {
    if v == 0.0 || !v.is_finite() {
        return format!("{}", v);
    }
    let magnitude = v.abs().log10().floor() as i32;
    let decimals = (digits - 1 - magnitude).max(0) as usize;
    format!("{:.*}", decimals, v)
}
