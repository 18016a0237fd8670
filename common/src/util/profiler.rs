use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Logs the time between creation and drop at debug level.
pub struct ScopedTimer {
    name: &'static str,
    start: Instant,
}

impl ScopedTimer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Ends the measurement early and returns the elapsed time.
    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        log::debug!("{} took {:?}", self.name, self.start.elapsed());
    }
}

/// Accumulated time per named phase over many routing attempts.
#[derive(Clone, Debug, Default)]
pub struct PhaseTimes {
    totals: BTreeMap<&'static str, (Duration, usize)>,
}

impl PhaseTimes {
    pub fn add(&mut self, phase: &'static str, elapsed: Duration) {
        let entry = self.totals.entry(phase).or_default();
        entry.0 += elapsed;
        entry.1 += 1;
    }

    pub fn total(&self, phase: &str) -> Duration {
        self.totals.get(phase).map(|e| e.0).unwrap_or_default()
    }

    pub fn count(&self, phase: &str) -> usize {
        self.totals.get(phase).map(|e| e.1).unwrap_or(0)
    }

    pub fn merge(&mut self, other: &PhaseTimes) {
        for (phase, (d, n)) in &other.totals {
            let entry = self.totals.entry(phase).or_default();
            entry.0 += *d;
            entry.1 += *n;
        }
    }

    pub fn report(&self) {
        for (phase, (d, n)) in &self.totals {
            log::info!("{:<16} {:>6} runs {:>10.1?}", phase, n, d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_accumulate() {
        let mut times = PhaseTimes::default();
        times.add("search", Duration::from_millis(3));
        times.add("search", Duration::from_millis(4));
        times.add("insert", Duration::from_millis(1));
        let mut other = PhaseTimes::default();
        other.add("insert", Duration::from_millis(2));
        times.merge(&other);
        assert_eq!(times.total("search"), Duration::from_millis(7));
        assert_eq!(times.count("search"), 2);
        assert_eq!(times.total("insert"), Duration::from_millis(3));
        assert_eq!(times.count("locate"), 0);
    }
}
