use std::thread;
use std::time::{Duration, Instant};

/// Vertical sync clock - the loop's only cadence source.
///
/// `wait` blocks until the next refresh boundary. A frame that overran one or
/// more boundaries resynchronizes to the next one instead of bursting to
/// catch up; the skipped intervals are counted as missed.
#[derive(Debug)]
pub struct VsyncClock {
    period: Option<Duration>,
    next_boundary: Instant,
    intervals: u64,
    missed: u64,
}

impl VsyncClock {
    /// Clock ticking at `hz`
    pub fn new(hz: f32) -> Self {
        let period = (hz.is_finite() && hz > 0.0).then(|| Duration::from_secs_f32(1.0 / hz));
        Self::with_period(period)
    }

    /// Clock that never sleeps, for tests and offline runs
    pub fn unpaced() -> Self {
        Self::with_period(None)
    }

    pub fn from_refresh(hz: Option<f32>) -> Self {
        hz.map_or_else(Self::unpaced, Self::new)
    }

    fn with_period(period: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            period,
            next_boundary: now + period.unwrap_or_default(),
            intervals: 0,
            missed: 0,
        }
    }

    /// Block until the next boundary, return the number of intervals elapsed
    pub fn wait(&mut self) -> u64 {
        self.intervals += 1;

        let Some(period) = self.period else {
            return self.intervals;
        };

        let now = Instant::now();
        if now < self.next_boundary {
            thread::sleep(self.next_boundary - now);
            self.next_boundary += period;
        } else {
            let late = now - self.next_boundary;
            let skipped = (late.as_nanos() / period.as_nanos().max(1)) as u64;
            self.missed += skipped;
            self.next_boundary += period * (skipped as u32 + 1);
        }
        self.intervals
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    pub fn intervals(&self) -> u64 {
        self.intervals
    }

    /// Boundaries that passed while a frame was still being drawn
    pub fn missed(&self) -> u64 {
        self.missed
    }
}
