//! [`NvStorage`] on a 24x32 I2C EEPROM (4 KiB, 32 byte pages)

use crate::NodeError;
use crate::storage::NvStorage;
use eeprom24x::{Eeprom24x, SlaveAddr, addr_size::TwoBytes, page_size::B32, unique_serial::No};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::warn;

pub const CAPACITY: u32 = 4096;
pub const PAGE_SIZE: usize = 32;
/// Internal write cycle (tWR) after every page
const WRITE_CYCLE_MS: u32 = 5;

pub struct EepromStorage<I2C, D> {
    eeprom: Eeprom24x<I2C, B32, TwoBytes, No>,
    delay: D,
}

impl<I2C: I2c, D: DelayNs> EepromStorage<I2C, D> {
    /// Chip strapped to the default address (0x50)
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            eeprom: Eeprom24x::new_24x32(i2c, SlaveAddr::Default),
            delay,
        }
    }

    pub fn release(self) -> (I2C, D) {
        (self.eeprom.destroy(), self.delay)
    }

    fn in_range(offset: u32, len: usize) -> bool {
        u32::try_from(len)
            .ok()
            .and_then(|len| offset.checked_add(len))
            .is_some_and(|end| end <= CAPACITY)
    }
}

impl<I2C: I2c, D: DelayNs> NvStorage for EepromStorage<I2C, D> {
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), NodeError> {
        if !Self::in_range(offset, buf.len()) {
            return Err(NodeError::StorageReadFailure);
        }
        self.eeprom.read_data(offset, buf).map_err(|e| {
            warn!("[STORE] EEPROM read at {} failed: {:?}", offset, e);
            NodeError::StorageReadFailure
        })
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), NodeError> {
        if !Self::in_range(offset, data.len()) {
            return Err(NodeError::StorageWriteFailure);
        }

        // page writes wrap inside the page, so never cross a boundary
        let mut address = offset;
        let mut rest = data;
        while !rest.is_empty() {
            let room = PAGE_SIZE - (address as usize % PAGE_SIZE);
            let (chunk, tail) = rest.split_at(room.min(rest.len()));
            self.eeprom.write_page(address, chunk).map_err(|e| {
                warn!("[STORE] EEPROM write at {} failed: {:?}", address, e);
                NodeError::StorageWriteFailure
            })?;
            self.delay.delay_ms(WRITE_CYCLE_MS);
            address += chunk.len() as u32;
            rest = tail;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ConfigStore, PersistedConfig};
    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};

    /// Byte-accurate model of a 24x32 behind address 0x50
    struct FakeChip {
        memory: Vec<u8>,
        pointer: usize,
        page_writes: Vec<(usize, usize)>,
        offline: bool,
    }

    impl FakeChip {
        fn new() -> Self {
            Self {
                memory: vec![0xFF; CAPACITY as usize],
                pointer: 0,
                page_writes: Vec::new(),
                offline: false,
            }
        }
    }

    impl ErrorType for FakeChip {
        type Error = ErrorKind;
    }

    impl I2c for FakeChip {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.offline || address != 0x50 {
                return Err(ErrorKind::Other);
            }
            for op in operations {
                match op {
                    Operation::Write(bytes) => {
                        self.pointer = usize::from(u16::from_be_bytes([bytes[0], bytes[1]]));
                        let payload = &bytes[2..];
                        if !payload.is_empty() {
                            self.page_writes.push((self.pointer, payload.len()));
                        }
                        let page = self.pointer - self.pointer % PAGE_SIZE;
                        for (i, byte) in payload.iter().enumerate() {
                            let at = page + (self.pointer - page + i) % PAGE_SIZE;
                            self.memory[at] = *byte;
                        }
                    }
                    Operation::Read(buf) => {
                        for byte in buf.iter_mut() {
                            *byte = self.memory[self.pointer % self.memory.len()];
                            self.pointer += 1;
                        }
                    }
                }
            }
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[test]
    fn write_then_read_back() {
        let mut storage = EepromStorage::new(FakeChip::new(), NoDelay);
        storage.write(100, &[1, 2, 3]).unwrap();

        let mut buf = [0u8; 3];
        storage.read(100, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
    }

    #[test]
    fn writes_are_split_at_page_boundaries() {
        let mut storage = EepromStorage::new(FakeChip::new(), NoDelay);
        let data: Vec<u8> = (0..40).collect();
        storage.write(30, &data).unwrap();

        let mut buf = [0u8; 40];
        storage.read(30, &mut buf).unwrap();
        assert_eq!(buf.as_slice(), data.as_slice());

        let (chip, _) = storage.release();
        assert_eq!(chip.page_writes, [(30, 2), (32, 32), (64, 6)]);
    }

    #[test]
    fn out_of_range_is_rejected_before_the_bus() {
        let mut storage = EepromStorage::new(FakeChip::new(), NoDelay);
        let mut buf = [0u8; 2];
        assert_eq!(storage.read(4095, &mut buf), Err(NodeError::StorageReadFailure));
        assert_eq!(storage.write(u32::MAX, &[0]), Err(NodeError::StorageWriteFailure));
    }

    #[test]
    fn bus_errors_map_to_storage_errors() {
        let mut chip = FakeChip::new();
        chip.offline = true;
        let mut storage = EepromStorage::new(chip, NoDelay);
        let mut buf = [0u8; 1];
        assert_eq!(storage.read(0, &mut buf), Err(NodeError::StorageReadFailure));
        assert_eq!(storage.write(0, &[0]), Err(NodeError::StorageWriteFailure));
    }

    #[test]
    fn config_store_on_eeprom() {
        let mut store = ConfigStore::new(EepromStorage::new(FakeChip::new(), NoDelay));
        assert_eq!(store.load(), Ok(false));
        store.set_send_interval_ms(120_000);
        store.persist().unwrap();

        let (chip, _) = store.into_storage().release();
        let mut reloaded = ConfigStore::new(EepromStorage::new(chip, NoDelay));
        assert_eq!(reloaded.load(), Ok(true));
        assert_eq!(reloaded.config(), PersistedConfig::initialized(120_000));
    }
}
