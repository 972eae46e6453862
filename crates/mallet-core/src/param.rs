//! Gain automation timeline.
//!
//! An [`AudioParam`] is a default value plus a time-ordered list of
//! scheduled events. Ramps run from the previous event (time and value) to
//! their own end point; before the first event the default value holds.

use crate::error::{check_time, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
enum ParamEvent {
    SetValue { time: f64, value: f32 },
    LinearRamp { end_time: f64, value: f32 },
    ExponentialRamp { end_time: f64, value: f32 },
}

impl ParamEvent {
    fn time(&self) -> f64 {
        match *self {
            ParamEvent::SetValue { time, .. } => time,
            ParamEvent::LinearRamp { end_time, .. } | ParamEvent::ExponentialRamp { end_time, .. } => {
                end_time
            }
        }
    }

    fn value(&self) -> f32 {
        match *self {
            ParamEvent::SetValue { value, .. }
            | ParamEvent::LinearRamp { value, .. }
            | ParamEvent::ExponentialRamp { value, .. } => value,
        }
    }
}

/// A value that changes over audio-clock time.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioParam {
    default_value: f32,
    events: Vec<ParamEvent>,
}

impl AudioParam {
    pub fn new(default_value: f32) -> Self {
        Self {
            default_value,
            events: Vec::new(),
        }
    }

    pub fn default_value(&self) -> f32 {
        self.default_value
    }

    /// Number of scheduled events still on the timeline.
    pub fn scheduled_len(&self) -> usize {
        self.events.len()
    }

    /// Value at audio time `time`.
    pub fn value_at(&self, time: f64) -> f32 {
        let mut prev_time = 0.0;
        let mut prev_value = self.default_value;

        for event in &self.events {
            let event_time = event.time();
            if event_time > time {
                return match *event {
                    ParamEvent::SetValue { .. } => prev_value,
                    ParamEvent::LinearRamp { end_time, value } => {
                        linear_at(prev_time, prev_value, end_time, value, time)
                    }
                    ParamEvent::ExponentialRamp { end_time, value } => {
                        exponential_at(prev_time, prev_value, end_time, value, time)
                    }
                };
            }
            prev_time = event_time;
            prev_value = event.value();
        }
        prev_value
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) -> Result<()> {
        let time = check_time(time)?;
        let value = check_value(value)?;
        self.insert(ParamEvent::SetValue { time, value });
        Ok(())
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, end_time: f64) -> Result<()> {
        let end_time = check_time(end_time)?;
        let value = check_value(value)?;
        self.insert(ParamEvent::LinearRamp { end_time, value });
        Ok(())
    }

    /// The target must be strictly positive.
    pub fn exponential_ramp_to_value_at_time(&mut self, value: f32, end_time: f64) -> Result<()> {
        let end_time = check_time(end_time)?;
        if !(value.is_finite() && value > 0.0) {
            return Err(Error::InvalidRampTarget(value));
        }
        self.insert(ParamEvent::ExponentialRamp { end_time, value });
        Ok(())
    }

    /// Drop every event at or after `from`. A ramp is dropped whole when
    /// its end time is at or after `from`.
    pub fn cancel_scheduled_values(&mut self, from: f64) -> Result<()> {
        let from = check_time(from)?;
        self.events.retain(|e| e.time() < from);
        Ok(())
    }

    /// Keeps events sorted; equal times stay in insertion order.
    fn insert(&mut self, event: ParamEvent) {
        let time = event.time();
        let index = self.events.partition_point(|e| e.time() <= time);
        self.events.insert(index, event);
    }
}

impl Default for AudioParam {
    fn default() -> Self {
        Self::new(1.0)
    }
}

fn check_value(value: f32) -> Result<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::InvalidValue(value))
    }
}

fn progress(t0: f64, t1: f64, t: f64) -> f32 {
    if t1 <= t0 {
        1.0
    } else {
        ((t - t0) / (t1 - t0)).clamp(0.0, 1.0) as f32
    }
}

fn linear_at(t0: f64, v0: f32, t1: f64, v1: f32, t: f64) -> f32 {
    v0 + (v1 - v0) * progress(t0, t1, t)
}

/// Holds the start value when it can't be reached geometrically (zero or
/// sign change).
fn exponential_at(t0: f64, v0: f32, t1: f64, v1: f32, t: f64) -> f32 {
    if v0 <= 0.0 {
        return v0;
    }
    v0 * (v1 / v0).powf(progress(t0, t1, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_holds_without_events() {
        let param = AudioParam::new(0.5);
        assert_relative_eq!(param.value_at(0.0), 0.5);
        assert_relative_eq!(param.value_at(100.0), 0.5);
    }

    #[test]
    fn test_set_value_steps() {
        let mut param = AudioParam::new(0.0);
        param.set_value_at_time(0.8, 1.0).unwrap();
        assert_relative_eq!(param.value_at(0.5), 0.0);
        assert_relative_eq!(param.value_at(1.0), 0.8);
        assert_relative_eq!(param.value_at(2.0), 0.8);
    }

    #[test]
    fn test_linear_ramp() {
        let mut param = AudioParam::new(0.0);
        param.set_value_at_time(1.0, 1.0).unwrap();
        param.linear_ramp_to_value_at_time(0.0, 2.0).unwrap();
        assert_relative_eq!(param.value_at(1.5), 0.5, epsilon = 1e-6);
        assert_relative_eq!(param.value_at(2.0), 0.0);
        assert_relative_eq!(param.value_at(3.0), 0.0);
    }

    #[test]
    fn test_exponential_ramp() {
        let mut param = AudioParam::new(1.0);
        param.set_value_at_time(1.0, 0.0).unwrap();
        param.exponential_ramp_to_value_at_time(0.01, 2.0).unwrap();
        assert_relative_eq!(param.value_at(1.0), 0.1, epsilon = 1e-5);
        assert_relative_eq!(param.value_at(2.0), 0.01);
    }

    #[test]
    fn test_exponential_ramp_rejects_non_positive_target() {
        let mut param = AudioParam::new(1.0);
        assert_eq!(
            param.exponential_ramp_to_value_at_time(0.0, 1.0),
            Err(Error::InvalidRampTarget(0.0))
        );
        assert!(param.exponential_ramp_to_value_at_time(-1.0, 1.0).is_err());
        assert_eq!(param.scheduled_len(), 0);
    }

    #[test]
    fn test_exponential_from_zero_holds() {
        let mut param = AudioParam::new(0.0);
        param.exponential_ramp_to_value_at_time(1.0, 1.0).unwrap();
        assert_relative_eq!(param.value_at(0.5), 0.0);
        assert_relative_eq!(param.value_at(1.0), 1.0);
    }

    #[test]
    fn test_invalid_times() {
        let mut param = AudioParam::new(0.0);
        assert_eq!(
            param.set_value_at_time(1.0, -1.0),
            Err(Error::InvalidTime(-1.0))
        );
        assert!(param.linear_ramp_to_value_at_time(1.0, f64::NAN).is_err());
        assert!(param.set_value_at_time(f32::INFINITY, 1.0).is_err());
    }

    #[test]
    fn test_cancel_drops_future_events() {
        let mut param = AudioParam::new(0.0);
        param.set_value_at_time(1.0, 0.0).unwrap();
        param.exponential_ramp_to_value_at_time(0.5, 1.0).unwrap();
        param.linear_ramp_to_value_at_time(0.001, 10.0).unwrap();

        param.cancel_scheduled_values(0.5).unwrap();
        assert_eq!(param.scheduled_len(), 1);
        assert_relative_eq!(param.value_at(5.0), 1.0);
    }

    #[test]
    fn test_anchor_then_linear_release() {
        // Capture, cancel, anchor, ramp: the release pattern used by note stops.
        let mut param = AudioParam::new(0.0);
        param.set_value_at_time(0.0, 0.0).unwrap();
        param.linear_ramp_to_value_at_time(0.8, 0.01).unwrap();
        param.exponential_ramp_to_value_at_time(0.4, 1.0).unwrap();

        let now = 2.0;
        let current = param.value_at(now);
        param.cancel_scheduled_values(now).unwrap();
        param.set_value_at_time(current, now).unwrap();
        param.linear_ramp_to_value_at_time(0.001, now + 0.12).unwrap();

        assert_relative_eq!(param.value_at(now), 0.4, epsilon = 1e-6);
        assert_relative_eq!(param.value_at(now + 0.06), (0.4 + 0.001) / 2.0, epsilon = 1e-5);
        assert_relative_eq!(param.value_at(now + 0.2), 0.001);
    }

    #[test]
    fn test_equal_times_keep_insertion_order() {
        let mut param = AudioParam::new(0.0);
        param.set_value_at_time(0.2, 1.0).unwrap();
        param.set_value_at_time(0.7, 1.0).unwrap();
        assert_relative_eq!(param.value_at(1.0), 0.7);
    }
}
