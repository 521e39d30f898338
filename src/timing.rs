//! Step timing.

use std::time::{Duration, Instant};
use tracing::info;

/// Measures one build phase and reports it when finished.
pub struct Timer {
    name: String,
    start: Instant,
}

impl Timer {
    pub fn start(name: &str) -> Self {
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Log the elapsed time and return it.
    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        info!(phase = %self.name, "done in {}", format_duration(elapsed));
        elapsed
    }
}

/// `12.3s` below a minute, `1.5m` above.
pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs >= 60.0 {
        format!("{:.1}m", secs / 60.0)
    } else {
        format!("{:.1}s", secs)
    }
}
