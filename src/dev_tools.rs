use std::time::Instant;

/// Minimal wall-clock timer for ad-hoc profiling during development.
#[allow(dead_code)]
pub struct Timer {
    last: Instant,
}

#[allow(dead_code)]
impl Timer {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    /// Prints the elapsed time since the previous call together with
    /// `msg`, then restarts the clock.
    pub fn log<T: std::fmt::Debug>(&mut self, msg: T) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);
        self.last = now;
        eprintln!("{elapsed:?}: {msg:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_restarts_on_log() {
        let mut timer = Timer::new();
        timer.log("first");
        timer.log("second");
    }
}
