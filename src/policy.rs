//! Time-driven checks run once per control loop tick

use core::time::Duration;

use crate::config::LoopTiming;
use crate::state::DisplayState;

/// Timers for the periodic battery and Wi-Fi checks
#[derive(Debug, Clone)]
pub struct PolicyTimers {
    timing: LoopTiming,
    last_battery: Duration,
    last_wifi_check: Duration,
}

impl PolicyTimers {
    /// Start both periods at `now`
    pub fn new(timing: LoopTiming, now: Duration) -> Self {
        Self {
            timing,
            last_battery: now,
            last_wifi_check: now,
        }
    }

    /// Whether the battery should be sampled; restarts the period when true
    pub fn battery_due(&mut self, now: Duration) -> bool {
        due(&mut self.last_battery, self.timing.battery_interval, now)
    }

    /// Whether Wi-Fi should be checked; restarts the period when true
    pub fn wifi_check_due(&mut self, now: Duration) -> bool {
        due(&mut self.last_wifi_check, self.timing.wifi_check_interval, now)
    }

    /// Put the device to sleep after a quiet period
    ///
    /// Returns true when the mood changed.
    pub fn apply_idle_timeout(&self, state: &mut DisplayState, now: Duration) -> bool {
        let idle = now.saturating_sub(state.last_event());
        if idle > self.timing.idle_timeout && state.mark_sleeping() {
            log::info!("Idle for {}s, going to sleep", idle.as_secs());
            return true;
        }
        false
    }
}

fn due(last: &mut Duration, interval: Duration, now: Duration) -> bool {
    if now.saturating_sub(*last) > interval {
        *last = now;
        true
    } else {
        false
    }
}

/// Attempt limiter for broker reconnects
///
/// The first attempt is always allowed; later ones need `interval` to pass.
#[derive(Debug, Clone)]
pub struct ReconnectGate {
    interval: Duration,
    last_attempt: Option<Duration>,
}

impl ReconnectGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_attempt: None,
        }
    }

    /// Whether an attempt may start now; records the attempt when true
    pub fn try_begin(&mut self, now: Duration) -> bool {
        match self.last_attempt {
            Some(last) if now.saturating_sub(last) <= self.interval => false,
            _ => {
                self.last_attempt = Some(now);
                true
            }
        }
    }

    /// Forget the last attempt after a successful connect
    pub fn reset(&mut self) {
        self.last_attempt = None;
    }
}
