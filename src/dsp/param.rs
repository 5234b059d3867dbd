//! Automatable parameters driven by the graph's audio clock.
//!
//! A ramp is a value-over-time function, never a blocking wait. Scheduling
//! a new ramp restarts the trajectory from the value at "now"; an active
//! ramp is never cancelled outright.

#[derive(Debug, Clone, Copy, PartialEq)]
struct Ramp {
    start_time: f64,
    start_value: f64,
    end_time: f64,
    end_value: f64,
}

impl Ramp {
    fn value_at(&self, time: f64) -> f64 {
        if time >= self.end_time {
            return self.end_value;
        }
        if time <= self.start_time {
            return self.start_value;
        }
        let t = (time - self.start_time) / (self.end_time - self.start_time);
        self.start_value + (self.end_value - self.start_value) * t
    }
}

/// A single automatable value (gain, frequency, Q).
#[derive(Debug, Clone, PartialEq)]
pub struct AudioParam {
    value: f64,
    ramp: Option<Ramp>,
}

impl AudioParam {
    pub fn new(value: f64) -> Self {
        AudioParam { value, ramp: None }
    }

    /// Value last settled by `advance` or a `set_value_at_time`.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Where the param is heading: the ramp end, or the current value.
    pub fn target(&self) -> f64 {
        self.ramp.map_or(self.value, |r| r.end_value)
    }

    pub fn is_ramping(&self) -> bool {
        self.ramp.is_some()
    }

    /// Value at `time` without mutating the param.
    pub fn value_at(&self, time: f64) -> f64 {
        self.ramp.map_or(self.value, |r| r.value_at(time))
    }

    /// Jump to `value` now, dropping any ramp in flight.
    pub fn set_value_at_time(&mut self, value: f64, _now: f64) {
        self.value = value;
        self.ramp = None;
    }

    /// Linearly move from the current value to `target`, arriving at
    /// `end_time` on the audio clock.
    pub fn linear_ramp_to_value_at_time(&mut self, target: f64, now: f64, end_time: f64) {
        let start_value = self.value_at(now);
        if end_time <= now {
            self.set_value_at_time(target, now);
            return;
        }
        self.value = start_value;
        self.ramp = Some(Ramp {
            start_time: now,
            start_value,
            end_time,
            end_value: target,
        });
    }

    /// Evaluate at `time`, settling the ramp once it has finished.
    #[inline]
    pub fn advance(&mut self, time: f64) -> f64 {
        if let Some(ramp) = self.ramp {
            self.value = ramp.value_at(time);
            if time >= ramp.end_time {
                self.ramp = None;
            }
        }
        self.value
    }
}
