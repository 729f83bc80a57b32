//! Persisted configuration store
//!
//! One fixed-layout record at the start of the non-volatile region:
//!
//! ```text
//! offset 0: valid flag (0xAA = initialized)
//! offset 1: send interval in ms, u32, native byte order
//! ```

use crate::{NodeError, config};
use log::{info, warn};

/// Byte-addressable non-volatile region (flash page, EEPROM, ...)
pub trait NvStorage {
    /// Fill `buf` with the bytes starting at `offset`
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), NodeError>;

    /// Write `data` starting at `offset`
    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), NodeError>;
}

/// The only persisted entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistedConfig {
    pub valid_flag: u8,
    /// Telemetry period in milliseconds, 0 = sending disabled
    pub send_interval_ms: u32,
}

impl PersistedConfig {
    /// Encoded size: flag byte immediately followed by the interval
    pub const SIZE: usize = 5;

    /// An initialized record carrying `send_interval_ms`
    pub const fn initialized(send_interval_ms: u32) -> Self {
        Self {
            valid_flag: config::VALID_FLAG,
            send_interval_ms,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid_flag == config::VALID_FLAG
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0] = self.valid_flag;
        bytes[1..].copy_from_slice(&self.send_interval_ms.to_ne_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        let mut interval = [0u8; 4];
        interval.copy_from_slice(&bytes[1..]);
        Self {
            valid_flag: bytes[0],
            send_interval_ms: u32::from_ne_bytes(interval),
        }
    }
}

/// Bounded write retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePolicy {
    max_attempts: u8,
}

impl WritePolicy {
    /// First write plus exactly one retry
    pub const RETRY_ONCE: Self = Self { max_attempts: 2 };

    pub const fn new(max_attempts: u8) -> Self {
        Self { max_attempts }
    }

    pub fn max_attempts(&self) -> u8 {
        self.max_attempts
    }

    /// Write `data`, retrying up to the policy limit. Returns the real outcome
    /// of the last attempt.
    pub fn write<S: NvStorage>(
        &self,
        storage: &mut S,
        offset: u32,
        data: &[u8],
    ) -> Result<(), NodeError> {
        let mut result = Err(NodeError::StorageWriteFailure);

        for attempt in 1..=self.max_attempts {
            result = storage.write(offset, data);
            match result {
                Ok(()) => break,
                Err(e) => warn!(
                    "[STORE] Write attempt {}/{} failed: {:?}",
                    attempt, self.max_attempts, e
                ),
            }
        }

        result
    }
}

/// In-memory mirror of the persisted record plus the storage it lives in
pub struct ConfigStore<S> {
    storage: S,
    config: PersistedConfig,
    policy: WritePolicy,
    write_failures: u32,
}

impl<S: NvStorage> ConfigStore<S> {
    /// Create a store holding compile-time defaults (interval 0, flag unset)
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            config: PersistedConfig::default(),
            policy: WritePolicy::RETRY_ONCE,
            write_failures: 0,
        }
    }

    /// Current in-memory record
    pub fn config(&self) -> PersistedConfig {
        self.config
    }

    pub fn send_interval_ms(&self) -> u32 {
        self.config.send_interval_ms
    }

    /// Only the interval controller mutates the interval
    pub(crate) fn set_send_interval_ms(&mut self, send_interval_ms: u32) {
        self.config.send_interval_ms = send_interval_ms;
    }

    /// Saves that failed even after the retry, hidden from `save` callers
    pub fn write_failures(&self) -> u32 {
        self.write_failures
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Read the record from storage.
    ///
    /// Returns `Ok(true)` when a valid record was found. A record without the
    /// valid flag is treated as first boot: the defaults are written back and
    /// `Ok(false)` is returned. A failed read leaves the in-memory defaults
    /// untouched and returns `StorageReadFailure`.
    pub fn load(&mut self) -> Result<bool, NodeError> {
        let mut bytes = [0u8; PersistedConfig::SIZE];
        if let Err(e) = self.storage.read(config::RECORD_OFFSET, &mut bytes) {
            warn!("[STORE] Failed to read send interval from storage: {:?}", e);
            return Err(NodeError::StorageReadFailure);
        }

        let stored = PersistedConfig::from_bytes(&bytes);
        info!("[STORE] Got flag: {:02X}", stored.valid_flag);
        info!("[STORE] Got send interval: {:08X}", stored.send_interval_ms);

        if !stored.is_valid() {
            info!(
                "[STORE] No valid send interval found, set to default, read 0X{:08X}",
                stored.send_interval_ms
            );
            self.reset_to_defaults()?;
            return Ok(false);
        }

        self.config = stored;
        info!("[STORE] Send interval found {}", self.config.send_interval_ms);
        Ok(true)
    }

    /// Replace the in-memory record with an initialized default and persist it
    pub fn reset_to_defaults(&mut self) -> Result<bool, NodeError> {
        self.config = PersistedConfig::initialized(0);
        self.save()
    }

    /// Write the record back, reporting the real outcome
    pub fn persist(&mut self) -> Result<(), NodeError> {
        info!("[STORE] Writing flag: {:02X}", self.config.valid_flag);
        info!("[STORE] Writing send interval 0X{:08X}", self.config.send_interval_ms);

        let bytes = self.config.to_bytes();
        self.policy
            .write(&mut self.storage, config::RECORD_OFFSET, &bytes)
    }

    /// Compatibility shim over [`persist`](Self::persist): always reports
    /// success once the retry has run. A real failure is only visible through
    /// the log and [`write_failures`](Self::write_failures).
    pub fn save(&mut self) -> Result<bool, NodeError> {
        if let Err(e) = self.persist() {
            self.write_failures = self.write_failures.saturating_add(1);
            warn!(
                "[STORE] Settings not persisted ({:?}), {} lost write(s) so far",
                e, self.write_failures
            );
        }
        Ok(true)
    }
}

/// RAM-backed region, starts erased (0xFF) like fresh flash
pub struct RamStorage<const N: usize> {
    data: [u8; N],
    fail_reads: bool,
    failing_writes: u32,
    writes: u32,
}

impl<const N: usize> RamStorage<N> {
    pub fn new() -> Self {
        Self::with_contents(&[])
    }

    /// Pre-fill the start of the region with `contents`, rest erased
    pub fn with_contents(contents: &[u8]) -> Self {
        let mut data = [0xFF; N];
        let len = contents.len().min(N);
        data[..len].copy_from_slice(&contents[..len]);
        Self {
            data,
            fail_reads: false,
            failing_writes: 0,
            writes: 0,
        }
    }

    pub fn contents(&self) -> &[u8; N] {
        &self.data
    }

    /// Successful writes so far
    pub fn write_count(&self) -> u32 {
        self.writes
    }

    pub fn set_fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    /// Make the next `count` writes fail
    pub fn fail_next_writes(&mut self, count: u32) {
        self.failing_writes = count;
    }

    fn range(offset: u32, len: usize) -> Option<core::ops::Range<usize>> {
        let start = usize::try_from(offset).ok()?;
        let end = start.checked_add(len)?;
        (end <= N).then_some(start..end)
    }
}

impl<const N: usize> Default for RamStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> NvStorage for RamStorage<N> {
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), NodeError> {
        if self.fail_reads {
            return Err(NodeError::StorageReadFailure);
        }
        let range = Self::range(offset, buf.len()).ok_or(NodeError::StorageReadFailure)?;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), NodeError> {
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(NodeError::StorageWriteFailure);
        }
        let range = Self::range(offset, data.len()).ok_or(NodeError::StorageWriteFailure)?;
        self.data[range].copy_from_slice(data);
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(flag: u8, interval_ms: u32) -> [u8; PersistedConfig::SIZE] {
        PersistedConfig {
            valid_flag: flag,
            send_interval_ms: interval_ms,
        }
        .to_bytes()
    }

    #[test]
    fn record_layout_is_flag_then_native_interval() {
        let bytes = PersistedConfig::initialized(0x1234_5678).to_bytes();
        assert_eq!(bytes[0], 0xAA);
        assert_eq!(&bytes[1..], &0x1234_5678u32.to_ne_bytes());
    }

    #[test]
    fn load_adopts_valid_record() {
        let storage = RamStorage::<16>::with_contents(&record(0xAA, 60_000));
        let mut store = ConfigStore::new(storage);

        assert_eq!(store.load(), Ok(true));
        assert_eq!(store.config(), PersistedConfig::initialized(60_000));
        assert_eq!(store.storage().write_count(), 0);
    }

    #[test]
    fn first_boot_writes_defaults() {
        let storage = RamStorage::<16>::with_contents(&record(0x00, 1234));
        let mut store = ConfigStore::new(storage);

        assert_eq!(store.load(), Ok(false));
        assert_eq!(store.config(), PersistedConfig::initialized(0));
        assert_eq!(store.storage().write_count(), 1);
        assert_eq!(&store.storage().contents()[..5], &record(0xAA, 0));
    }

    #[test]
    fn erased_storage_counts_as_first_boot() {
        let mut store = ConfigStore::new(RamStorage::<16>::new());
        assert_eq!(store.load(), Ok(false));
        assert!(store.config().is_valid());
    }

    #[test]
    fn read_failure_keeps_defaults() {
        let mut storage = RamStorage::<16>::with_contents(&record(0xAA, 5000));
        storage.set_fail_reads(true);
        let mut store = ConfigStore::new(storage);

        assert_eq!(store.load(), Err(NodeError::StorageReadFailure));
        assert_eq!(store.config(), PersistedConfig::default());
        assert_eq!(store.storage().write_count(), 0);
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut store = ConfigStore::new(RamStorage::<16>::new());
        store.load().unwrap();
        store.set_send_interval_ms(90_000);
        assert_eq!(store.save(), Ok(true));

        let saved = store.config();
        let mut reloaded = ConfigStore::new(RamStorage::<16>::with_contents(
            &store.storage().contents()[..],
        ));
        assert_eq!(reloaded.load(), Ok(true));
        assert_eq!(reloaded.config(), saved);
    }

    #[test]
    fn single_failure_is_retried() {
        let mut store = ConfigStore::new(RamStorage::<16>::new());
        store.storage_mut().fail_next_writes(1);

        assert_eq!(store.persist(), Ok(()));
        assert_eq!(store.storage().write_count(), 1);
        assert_eq!(store.write_failures(), 0);
    }

    #[test]
    fn policy_reports_real_outcome() {
        let mut storage = RamStorage::<16>::new();
        storage.fail_next_writes(2);

        let result = WritePolicy::RETRY_ONCE.write(&mut storage, 0, &[1, 2, 3]);
        assert_eq!(result, Err(NodeError::StorageWriteFailure));
        assert_eq!(storage.write_count(), 0);
    }

    #[test]
    fn save_masks_double_failure_but_counts_it() {
        let mut store = ConfigStore::new(RamStorage::<16>::new());
        store.storage_mut().fail_next_writes(2);

        assert_eq!(store.save(), Ok(true));
        assert_eq!(store.write_failures(), 1);
        assert_eq!(store.storage().write_count(), 0);
    }

    #[test]
    fn out_of_range_access_fails() {
        let mut storage = RamStorage::<4>::new();
        let mut buf = [0u8; PersistedConfig::SIZE];
        assert_eq!(storage.read(0, &mut buf), Err(NodeError::StorageReadFailure));
        assert_eq!(storage.write(2, &[0; 3]), Err(NodeError::StorageWriteFailure));
    }
}
