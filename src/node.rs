//! Node context shared by the AT handlers

use crate::interval::{IntervalController, PeriodicTimer};
use crate::radio::RadioInfo;
use crate::storage::{ConfigStore, NvStorage};
use crate::NodeError;
use log::{info, warn};

/// Everything the custom AT commands operate on
pub struct Node<S, T, R> {
    pub store: ConfigStore<S>,
    pub interval: IntervalController<T>,
    pub radio: R,
}

impl<S, T, R> Node<S, T, R>
where
    S: NvStorage,
    T: PeriodicTimer,
    R: RadioInfo,
{
    pub fn new(storage: S, timer: T, radio: R) -> Self {
        Self {
            store: ConfigStore::new(storage),
            interval: IntervalController::new(timer),
            radio,
        }
    }

    /// Load the persisted interval and start the send timer from it.
    ///
    /// Returns `true` when a stored interval was found. A storage read failure
    /// falls back to the first-boot defaults, which are written back.
    pub fn boot(&mut self) -> bool {
        let found = match self.store.load() {
            Ok(found) => found,
            Err(e) => {
                warn!("[BOOT] Storage read failed ({:?}), falling back to defaults", e);
                // save() never reports failure
                let _ = self.store.reset_to_defaults();
                false
            }
        };

        if !found {
            info!("[BOOT] No stored send interval, sending disabled until AT+SENDINT");
        }

        self.interval.resume(&self.store);
        found
    }

    /// `AT+SENDINT=<seconds>`
    pub fn apply_send_interval(&mut self, raw: &str) -> Result<(), NodeError> {
        self.interval.apply_update(&mut self.store, raw)
    }

    pub fn send_interval_seconds(&self) -> u32 {
        self.interval.read_interval_seconds(&self.store)
    }
}
