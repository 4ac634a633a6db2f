//! Breakpoint automation for gain and pitch
//!
//! An `Envelope` is a list of timed breakpoints evaluated against the
//! engine's audio clock. Each breakpoint either jumps to a value or ramps
//! (linearly or exponentially) from the previous breakpoint. Times are
//! absolute, in seconds.

/// How a breakpoint is reached from the one before it
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Curve {
    /// Jump to the value at the breakpoint time
    Step,
    /// Straight line from the previous breakpoint
    Linear,
    /// Constant-ratio curve from the previous breakpoint
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Breakpoint {
    time: f64,
    value: f64,
    curve: Curve,
}

/// Automated parameter value
#[derive(Debug, Clone)]
pub struct Envelope {
    initial: f64,
    points: Vec<Breakpoint>,
}

impl Envelope {
    /// Create an envelope that holds `initial` until the first breakpoint
    pub fn new(initial: f64) -> Self {
        Self {
            initial,
            points: Vec::new(),
        }
    }

    /// Jump to `value` at `time`
    pub fn set_value_at(&mut self, value: f64, time: f64) -> &mut Self {
        self.insert(Breakpoint { time, value, curve: Curve::Step })
    }

    /// Ramp linearly to `value`, arriving at `time`
    pub fn linear_ramp_to(&mut self, value: f64, time: f64) -> &mut Self {
        self.insert(Breakpoint { time, value, curve: Curve::Linear })
    }

    /// Ramp exponentially to `value`, arriving at `time`.
    ///
    /// Exponential ramps cannot cross or touch zero; a non-positive
    /// target is nudged to a tiny positive value.
    pub fn exponential_ramp_to(&mut self, value: f64, time: f64) -> &mut Self {
        let value = if value <= 0.0 { 1e-4 } else { value };
        self.insert(Breakpoint { time, value, curve: Curve::Exponential })
    }

    /// Drop every breakpoint at or after `time`
    pub fn cancel_from(&mut self, time: f64) -> &mut Self {
        self.points.retain(|p| p.time < time);
        self
    }

    /// Freeze the envelope at its current value: cancel everything from
    /// `time` on and pin the value computed for `time`.
    pub fn hold_at(&mut self, time: f64) -> &mut Self {
        let current = self.value_at(time);
        self.cancel_from(time);
        self.set_value_at(current, time)
    }

    /// Time of the last breakpoint, if any
    pub fn end_time(&self) -> Option<f64> {
        self.points.last().map(|p| p.time)
    }

    /// Evaluate the envelope at `time`
    pub fn value_at(&self, time: f64) -> f64 {
        let mut prev_time = 0.0;
        let mut prev_value = self.initial;

        for point in &self.points {
            if time < point.time {
                let span = point.time - prev_time;
                if span <= 0.0 || time < prev_time {
                    return prev_value;
                }
                let frac = (time - prev_time) / span;
                return match point.curve {
                    Curve::Step => prev_value,
                    Curve::Linear => prev_value + (point.value - prev_value) * frac,
                    Curve::Exponential => {
                        if prev_value <= 0.0 {
                            prev_value
                        } else {
                            prev_value * (point.value / prev_value).powf(frac)
                        }
                    }
                };
            }
            prev_time = point.time;
            prev_value = point.value;
        }

        prev_value
    }

    fn insert(&mut self, point: Breakpoint) -> &mut Self {
        // Keep insertion order among equal times
        let idx = self.points.partition_point(|p| p.time <= point.time);
        self.points.insert(idx, point);
        self
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_holds_initial() {
        let env = Envelope::new(0.5);
        assert_eq!(env.value_at(0.0), 0.5);
        assert_eq!(env.value_at(10.0), 0.5);
        assert_eq!(env.end_time(), None);
    }

    #[test]
    fn test_step_then_linear() {
        let mut env = Envelope::new(0.0);
        env.set_value_at(0.0, 1.0).linear_ramp_to(1.0, 2.0);

        assert_eq!(env.value_at(0.5), 0.0);
        assert!((env.value_at(1.5) - 0.5).abs() < 1e-9);
        assert_eq!(env.value_at(2.0), 1.0);
        assert_eq!(env.value_at(3.0), 1.0);
    }

    #[test]
    fn test_exponential_ramp() {
        let mut env = Envelope::new(1.0);
        env.set_value_at(1.0, 0.0).exponential_ramp_to(0.01, 1.0);

        // Halfway through an exponential ramp from 1.0 to 0.01 is 0.1
        assert!((env.value_at(0.5) - 0.1).abs() < 1e-9);
        assert!((env.value_at(1.0) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_exponential_ramp_monotonic() {
        let mut env = Envelope::new(0.3);
        env.set_value_at(0.3, 0.0).exponential_ramp_to(0.01, 0.5);

        let mut last = f64::MAX;
        for i in 0..=50 {
            let v = env.value_at(i as f64 * 0.01);
            assert!(v <= last);
            last = v;
        }
    }

    #[test]
    fn test_exponential_rejects_zero_target() {
        let mut env = Envelope::new(1.0);
        env.set_value_at(1.0, 0.0).exponential_ramp_to(0.0, 1.0);
        let end = env.value_at(1.0);
        assert!(end > 0.0 && end < 0.001);
    }

    #[test]
    fn test_breakpoints_sorted_on_insert() {
        let mut env = Envelope::new(0.0);
        env.linear_ramp_to(1.0, 2.0);
        env.set_value_at(0.0, 1.0);

        assert_eq!(env.value_at(0.5), 0.0);
        assert!((env.value_at(1.5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_hold_at_freezes_current_value() {
        let mut env = Envelope::new(0.0);
        env.set_value_at(0.0, 0.0).linear_ramp_to(1.0, 1.0).exponential_ramp_to(0.001, 3.0);

        env.hold_at(0.5);
        assert!((env.value_at(0.5) - 0.5).abs() < 1e-9);
        assert!((env.value_at(2.0) - 0.5).abs() < 1e-9);

        env.exponential_ramp_to(0.001, 0.6);
        assert!(env.value_at(0.6) < 0.01);
    }
}
