//! Send interval controller
//!
//! Validates user supplied seconds, keeps the periodic send timer in step with
//! the configured interval and persists the interval when it changes.

use crate::storage::{ConfigStore, NvStorage};
use crate::{NodeError, config};
use log::{info, warn};

/// Host periodic timer driving the telemetry send
pub trait PeriodicTimer {
    /// (Re)start the timer with the given period
    fn start(&mut self, period_ms: u32);

    /// Stop the timer if it is running
    fn stop(&mut self);
}

/// Parse a decimal seconds value. Only ASCII digits are accepted, no sign,
/// no whitespace; values beyond `u32` are rejected.
pub fn parse_seconds(raw: &str) -> Result<u32, NodeError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(NodeError::InvalidParameter);
    }

    raw.parse::<u32>().map_err(|_| NodeError::InvalidParameter)
}

/// Owns the send timer; the only writer of the persisted interval
pub struct IntervalController<T> {
    timer: T,
}

impl<T: PeriodicTimer> IntervalController<T> {
    pub fn new(timer: T) -> Self {
        Self { timer }
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Apply a new interval given in seconds as text.
    ///
    /// The stored value is `seconds * 1000` with u32 wrap-around. Nothing
    /// happens to the timer or the storage when the value is unchanged.
    pub fn apply_update<S: NvStorage>(
        &mut self,
        store: &mut ConfigStore<S>,
        raw: &str,
    ) -> Result<(), NodeError> {
        let seconds = parse_seconds(raw)?;
        let new_interval = seconds.wrapping_mul(config::MS_PER_SECOND);
        let old_interval = store.send_interval_ms();

        if new_interval == old_interval {
            info!("[INTERVAL] Interval unchanged: {} ms", new_interval);
            return Ok(());
        }

        store.set_send_interval_ms(new_interval);
        info!("[INTERVAL] New interval: {} ms", new_interval);

        self.timer.stop();
        if new_interval != 0 {
            self.timer.start(new_interval);
        } else {
            info!("[INTERVAL] Sending disabled");
        }

        store.save()?;
        Ok(())
    }

    /// Start the timer from whatever interval the store holds (boot path)
    pub fn resume<S: NvStorage>(&mut self, store: &ConfigStore<S>) {
        let interval = store.send_interval_ms();
        self.timer.stop();
        if interval != 0 {
            info!("[INTERVAL] Starting send timer with {} ms", interval);
            self.timer.start(interval);
        } else {
            warn!("[INTERVAL] Send interval is 0, automatic sending disabled");
        }
    }

    /// Current interval in whole seconds, sub-second remainder dropped
    pub fn read_interval_seconds<S: NvStorage>(&self, store: &ConfigStore<S>) -> u32 {
        store.send_interval_ms() / config::MS_PER_SECOND
    }
}
