//! Periodic clock for polling work such as turn deadlines.
//!
//! ```ignore
//! let mut clock = TickScheduler::with_rate(1);
//! loop {
//!     tokio::select! {
//!         _ = shutdown.recv() => break,
//!         info = clock.wait_for_tick() => poll_rooms(info.tick).await,
//!     }
//! }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

/// What to do when the poller falls behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Forget the missed ticks and schedule the next one from now.
    #[default]
    Skip,
    /// Keep the original cadence; late ticks fire back to back.
    Drop,
}

#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Ticks per second. 0 disables the clock entirely.
    pub tick_rate_hz: u32,
    pub policy: TickPolicy,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 1,
            policy: TickPolicy::default(),
        }
    }
}

impl TickConfig {
    pub const MAX_TICK_RATE_HZ: u32 = 64;

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Caps the rate at [`Self::MAX_TICK_RATE_HZ`].
    pub fn validated(mut self) -> Self {
        if self.tick_rate_hz > Self::MAX_TICK_RATE_HZ {
            warn!(
                rate = self.tick_rate_hz,
                max = Self::MAX_TICK_RATE_HZ,
                "tick_rate_hz exceeds maximum, clamping"
            );
            self.tick_rate_hz = Self::MAX_TICK_RATE_HZ;
        }
        self
    }

    /// `None` when the clock is disabled.
    pub fn tick_duration(&self) -> Option<Duration> {
        (self.tick_rate_hz > 0).then(|| Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz)))
    }
}

/// One fired tick.
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Starts at 1.
    pub tick: u64,
    /// Woke more than a tenth of a period late.
    pub overrun: bool,
    /// Whole periods skipped under [`TickPolicy::Skip`].
    pub ticks_skipped: u64,
}

#[derive(Debug)]
pub struct TickScheduler {
    config: TickConfig,
    tick_duration: Option<Duration>,
    tick_count: u64,
    next_tick: Option<Instant>,
}

impl TickScheduler {
    /// The first tick is due one period from now.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let tick_duration = config.tick_duration();
        let next_tick = tick_duration.map(|period| Instant::now() + period);

        match tick_duration {
            None => debug!("tick scheduler created with the clock disabled"),
            Some(period) => debug!(
                rate_hz = config.tick_rate_hz,
                period_ms = period.as_millis() as u64,
                policy = ?config.policy,
                "tick scheduler created"
            ),
        }

        Self {
            config,
            tick_duration,
            tick_count: 0,
            next_tick,
        }
    }

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Sleeps until the next tick is due.
    ///
    /// With the clock disabled this never resolves, which keeps it usable
    /// as one arm of a `tokio::select!`.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let (Some(due), Some(period)) = (self.next_tick, self.tick_duration) else {
            return std::future::pending().await;
        };

        time::sleep_until(due).await;

        let now = Instant::now();
        self.tick_count += 1;
        let late_by = now.saturating_duration_since(due);
        let overrun = late_by > period / 10;
        let mut ticks_skipped = 0;

        self.next_tick = Some(match self.config.policy {
            TickPolicy::Skip => {
                if overrun {
                    ticks_skipped = (late_by.as_nanos() / period.as_nanos()) as u64;
                    if ticks_skipped > 0 {
                        warn!(
                            tick = self.tick_count,
                            skipped = ticks_skipped,
                            late_ms = late_by.as_millis() as u64,
                            "tick overrun, skipping ahead"
                        );
                    }
                }
                now + period
            }
            TickPolicy::Drop => {
                if overrun {
                    warn!(
                        tick = self.tick_count,
                        late_ms = late_by.as_millis() as u64,
                        "tick overrun, keeping cadence"
                    );
                }
                due + period
            }
        });

        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            overrun,
            ticks_skipped,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.tick_duration.is_none()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    pub fn tick_duration(&self) -> Option<Duration> {
        self.tick_duration
    }
}
