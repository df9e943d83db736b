use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Fixed-interval pacing for outbound pushes.
///
/// The coordinator owns the only gate of a run and waits on it before
/// every push, so the destination sees at most one item per interval no
/// matter how many fetch workers are running.
pub struct OutputGate {
    ticker: Interval,
}

impl OutputGate {
    pub fn new(period: Duration) -> Self {
        let mut ticker = interval_at(Instant::now() + period, period);
        // a slow push must not be followed by a burst of catch-up ticks
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { ticker }
    }

    /// Waits for the next push slot. The first slot opens one period
    /// after the gate is created.
    pub async fn wait(&mut self) {
        self.ticker.tick().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slots_are_spaced_by_period() {
        let mut gate = OutputGate::new(Duration::from_millis(50));
        let start = Instant::now();

        gate.wait().await;
        gate.wait().await;
        gate.wait().await;

        assert_eq!(start.elapsed(), Duration::from_millis(150));
    }
}
