use rand::rngs::OsRng;
use rand::Rng;
use std::time::Duration;

/// Jittered waits used after navigation, so dynamically injected results get a
/// chance to render.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    pub min: Duration,
    pub max: Duration,
}

impl Pacing {
    pub fn new(min: Duration, max: Duration) -> Self {
        if max < min {
            Self { min: max, max: min }
        } else {
            Self { min, max }
        }
    }

    /// Fixed delay with no jitter.
    pub fn fixed(delay: Duration) -> Self {
        Self { min: delay, max: delay }
    }

    /// Pick a duration in `[min, max]`.
    pub fn sample(&self) -> Duration {
        let lo = self.min.as_millis() as u64;
        let hi = self.max.as_millis() as u64;
        if lo == hi {
            return self.min;
        }
        let mut rng = OsRng;
        Duration::from_millis(rng.gen_range(lo..=hi))
    }
}
