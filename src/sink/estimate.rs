//! Elapsed and remaining time estimates.
//!
//! Time is measured from the first value update, using the timestamps the
//! worker attached to its events, so a slow consumer does not skew the
//! numbers. Both times become available with the second value update.

use super::Sink;
use crate::executor::{TimeStamp, UserData};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    /// "1 hour, 2 minutes, 3 seconds"
    Exact,
    /// "About 2 minutes and 30 seconds", "Less than 15 seconds"
    Approximate,
}

/// Splits a duration into days down to milliseconds for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationFormatter {
    days: u64,
    hours: u64,
    minutes: u64,
    seconds: u64,
    milliseconds: u64,
}

impl DurationFormatter {
    pub fn new(duration: Duration) -> Self {
        let total = duration.as_secs();
        Self {
            days: total / 86_400,
            hours: (total % 86_400) / 3_600,
            minutes: (total % 3_600) / 60,
            seconds: total % 60,
            milliseconds: u64::from(duration.subsec_millis()),
        }
    }

    pub fn format(&self, format: TimeFormat) -> String {
        match format {
            TimeFormat::Exact => self.exact(),
            TimeFormat::Approximate => self.approximate(),
        }
    }

    /// Coarse wording, resolution of seconds at best.
    pub fn approximate(&self) -> String {
        if self.days > 0 {
            format!("About {} and {}", quantity(self.days, "day"), quantity(self.hours, "hour"))
        } else if self.hours > 0 {
            format!(
                "About {} and {}",
                quantity(self.hours, "hour"),
                quantity(self.minutes, "minute")
            )
        } else if self.minutes > 0 {
            let mut text = format!("About {}", quantity(self.minutes, "minute"));
            if self.minutes < 5 && self.seconds > 30 {
                text.push_str(" and 30 seconds");
            }
            text
        } else {
            let bound = match self.seconds {
                46.. => return "Less than 1 minute".to_string(),
                31..=45 => 45,
                16..=30 => 30,
                11..=15 => 15,
                6..=10 => 10,
                _ => 5,
            };
            format!("Less than {} seconds", bound)
        }
    }

    /// Every non-zero unit from days to minutes, then seconds. Milliseconds are dropped.
    pub fn exact(&self) -> String {
        let mut parts = Vec::with_capacity(4);
        if self.days > 0 {
            parts.push(quantity(self.days, "day"));
        }
        if self.hours > 0 {
            parts.push(quantity(self.hours, "hour"));
        }
        if self.minutes > 0 {
            parts.push(quantity(self.minutes, "minute"));
        }
        parts.push(quantity(self.seconds, "second"));
        parts.join(", ")
    }

    pub fn milliseconds(&self) -> u64 {
        self.milliseconds
    }
}

fn quantity(q: u64, unit: &str) -> String {
    format!("{} {}{}", q, unit, if q != 1 { "s" } else { "" })
}

#[derive(Debug, Clone)]
pub struct ProgressEstimate {
    first: Option<(TimeStamp, i64)>,
    min: i64,
    max: i64,
    elapsed: Option<Duration>,
    remaining: Option<Duration>,
    elapsed_format: TimeFormat,
    remaining_format: TimeFormat,
}

impl ProgressEstimate {
    pub fn new() -> Self {
        Self {
            first: None,
            min: 0,
            max: 0,
            elapsed: None,
            remaining: None,
            elapsed_format: TimeFormat::Exact,
            remaining_format: TimeFormat::Approximate,
        }
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.remaining
    }

    pub fn elapsed_text(&self) -> Option<String> {
        self.elapsed
            .map(|d| DurationFormatter::new(d).format(self.elapsed_format))
    }

    pub fn remaining_text(&self) -> Option<String> {
        self.remaining
            .map(|d| DurationFormatter::new(d).format(self.remaining_format))
    }

    pub fn elapsed_format(&self) -> TimeFormat {
        self.elapsed_format
    }

    pub fn set_elapsed_format(&mut self, format: TimeFormat) {
        self.elapsed_format = format;
    }

    pub fn remaining_format(&self) -> TimeFormat {
        self.remaining_format
    }

    pub fn set_remaining_format(&mut self, format: TimeFormat) {
        self.remaining_format = format;
    }
}

impl Default for ProgressEstimate {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ProgressEstimate {
    fn on_value_changed(&mut self, value: i64, _user_data: Option<&UserData>, timestamp: TimeStamp) {
        let Some((first_time, first_value)) = self.first else {
            self.first = Some((timestamp, value));
            return;
        };

        let elapsed = timestamp.saturating_duration_since(first_time);
        self.elapsed = Some(elapsed);

        if self.max <= self.min {
            return;
        }
        let full_range = i128::from(self.max) - i128::from(first_value);
        let step = i128::from(value) - i128::from(first_value);
        if full_range == 0 || step == 0 {
            return;
        }

        // linear extrapolation from the first sample
        let elapsed_ms = i128::try_from(elapsed.as_millis()).unwrap_or(i128::MAX);
        let total_ms = elapsed_ms.saturating_mul(full_range) / step;
        let remaining_ms = total_ms.saturating_sub(elapsed_ms).max(0);
        self.remaining = Some(Duration::from_millis(
            u64::try_from(remaining_ms).unwrap_or(u64::MAX),
        ));
    }

    fn on_range_changed(&mut self, min: i64, max: i64) {
        self.min = min;
        self.max = max;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn dur(secs: u64) -> Duration {
        Duration::from_secs(secs)
    }

    #[test]
    fn test_exact() {
        assert_eq!(DurationFormatter::new(dur(0)).exact(), "0 seconds");
        assert_eq!(DurationFormatter::new(dur(1)).exact(), "1 second");
        assert_eq!(DurationFormatter::new(dur(3_723)).exact(), "1 hour, 2 minutes, 3 seconds");
        assert_eq!(
            DurationFormatter::new(dur(2 * 86_400 + 5)).exact(),
            "2 days, 5 seconds"
        );
    }

    #[test]
    fn test_approximate() {
        let cases = [
            (3, "Less than 5 seconds"),
            (8, "Less than 10 seconds"),
            (12, "Less than 15 seconds"),
            (20, "Less than 30 seconds"),
            (40, "Less than 45 seconds"),
            (50, "Less than 1 minute"),
            (60, "About 1 minute"),
            (155, "About 2 minutes and 30 seconds"),
            (150, "About 2 minutes"),
            (400, "About 6 minutes"),
            (3_660, "About 1 hour and 1 minute"),
            (90_000, "About 1 day and 1 hour"),
        ];
        for (secs, expected) in cases {
            assert_eq!(DurationFormatter::new(dur(secs)).approximate(), expected, "{} s", secs);
        }
    }

    #[test]
    fn test_first_update_only_seeds() {
        let mut estimate = ProgressEstimate::new();
        estimate.on_range_changed(0, 100);
        estimate.on_value_changed(0, None, Instant::now());

        assert_eq!(estimate.elapsed(), None);
        assert_eq!(estimate.remaining(), None);
    }

    #[test]
    fn test_linear_extrapolation() {
        let t0 = Instant::now();
        let mut estimate = ProgressEstimate::new();
        estimate.on_range_changed(0, 100);
        estimate.on_value_changed(0, None, t0);
        estimate.on_value_changed(25, None, t0 + dur(10));

        assert_eq!(estimate.elapsed(), Some(dur(10)));
        assert_eq!(estimate.remaining(), Some(dur(30)));
        assert_eq!(estimate.elapsed_text().as_deref(), Some("10 seconds"));
        assert_eq!(estimate.remaining_text().as_deref(), Some("Less than 30 seconds"));
    }

    #[test]
    fn test_full_i64_range() {
        let t0 = Instant::now();
        let mut estimate = ProgressEstimate::new();
        estimate.on_range_changed(i64::MIN, i64::MAX);
        estimate.on_value_changed(i64::MIN, None, t0);
        estimate.on_value_changed(0, None, t0 + dur(10));

        let remaining = estimate.remaining().unwrap();
        assert!(remaining > dur(9) && remaining <= dur(10), "{:?}", remaining);
    }

    #[test]
    fn test_huge_remaining_saturates() {
        let t0 = Instant::now();
        let mut estimate = ProgressEstimate::new();
        estimate.on_range_changed(0, i64::MAX);
        estimate.on_value_changed(0, None, t0);
        estimate.on_value_changed(1, None, t0 + dur(1));

        assert_eq!(estimate.remaining(), Some(Duration::from_millis(u64::MAX)));
        assert!(estimate.remaining_text().unwrap().starts_with("About "));
    }

    #[test]
    fn test_unset_range_gives_elapsed_only() {
        let t0 = Instant::now();
        let mut estimate = ProgressEstimate::new();
        estimate.on_value_changed(1, None, t0);
        estimate.on_value_changed(2, None, t0 + dur(4));

        assert_eq!(estimate.elapsed(), Some(dur(4)));
        assert_eq!(estimate.remaining(), None);
    }

    #[test]
    fn test_formats_switchable() {
        let t0 = Instant::now();
        let mut estimate = ProgressEstimate::new();
        estimate.set_elapsed_format(TimeFormat::Approximate);
        estimate.set_remaining_format(TimeFormat::Exact);
        estimate.on_range_changed(0, 10);
        estimate.on_value_changed(0, None, t0);
        estimate.on_value_changed(5, None, t0 + dur(90));

        assert_eq!(estimate.elapsed_text().as_deref(), Some("About 1 minute"));
        assert_eq!(estimate.remaining_text().as_deref(), Some("1 minute, 30 seconds"));
    }
}
