use anyhow::Result;
use rand::Rng;
use std::time::Duration;

/// Think-time inserted between two consecutive tasks of the same user.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitTime {
    /// Uniformly random pause in `[min, max]`.
    Between { min: Duration, max: Duration },
    /// Always the same pause.
    Constant(Duration),
    /// Pace tasks so that one starts every `period`, whatever the task took.
    ConstantPacing(Duration),
}

impl Default for WaitTime {
    fn default() -> Self {
        WaitTime::Between {
            min: Duration::from_secs(1),
            max: Duration::from_secs(5),
        }
    }
}

impl WaitTime {
    pub fn between(min: Duration, max: Duration) -> Result<Self> {
        if min > max {
            anyhow::bail!(
                "Invalid wait time: min {:?} is greater than max {:?}",
                min,
                max
            );
        }
        Ok(WaitTime::Between { min, max })
    }

    pub fn constant(pause: Duration) -> Self {
        WaitTime::Constant(pause)
    }

    pub fn constant_pacing(period: Duration) -> Self {
        WaitTime::ConstantPacing(period)
    }

    /// Pause to take after a task that ran for `last_task`.
    pub fn next_pause<R: Rng + ?Sized>(&self, rng: &mut R, last_task: Duration) -> Duration {
        match self {
            WaitTime::Between { min, max } => {
                if min == max {
                    return *min;
                }
                let secs = rng.random_range(min.as_secs_f64()..=max.as_secs_f64());
                Duration::from_secs_f64(secs).clamp(*min, *max)
            }
            WaitTime::Constant(pause) => *pause,
            WaitTime::ConstantPacing(period) => period.saturating_sub(last_task),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            WaitTime::Between { min, max } => format!("between {:?} and {:?}", min, max),
            WaitTime::Constant(pause) => format!("constant {:?}", pause),
            WaitTime::ConstantPacing(period) => format!("one task every {:?}", period),
        }
    }
}
