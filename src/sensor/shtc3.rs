//! SHTC3 driver (the chip on the RAK1901 board)
//!
//! Blocking, over any `embedded-hal` 1.0 I2C bus. Every exchange is wakeup,
//! command, sleep so the chip idles in its low power state between reads.

use super::{SensorDriver, SensorReading};
use crate::{NodeError, config};
use crc::{Algorithm, Crc};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, warn};

/// CRC-8 Sensirion uses for every 16-bit word on the wire
pub const CRC_8_SENSIRION: Algorithm<u8> = Algorithm {
    width: 8,
    poly: 0x31,
    init: 0xFF,
    refin: false,
    refout: false,
    xorout: 0x00,
    check: 0xF7,
    residue: 0x00,
};

const CMD_WAKEUP: u16 = 0x3517;
const CMD_SLEEP: u16 = 0xB098;
const CMD_READ_ID: u16 = 0xEFC8;
// normal power, clock stretching off, temperature first
const CMD_MEASURE: u16 = 0x7866;

const WAKEUP_US: u32 = 240;
const MEASURE_MS: u32 = 13;

const ID_MASK: u16 = 0x083F;
const ID_SHTC3: u16 = 0x0807;

pub struct Shtc3<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    last: SensorReading,
}

impl<I2C: I2c, D: DelayNs> Shtc3<I2C, D> {
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            i2c,
            delay,
            address: config::SHTC3_ADDRESS,
            last: SensorReading::default(),
        }
    }

    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    /// Product code register, checksum verified
    pub fn read_id(&mut self) -> Result<u16, NodeError> {
        self.wakeup()?;
        let result = self.command(CMD_READ_ID).and_then(|_| {
            let mut buf = [0u8; 3];
            self.read_words(&mut buf)?;
            Ok(u16::from_be_bytes([buf[0], buf[1]]))
        });
        self.command(CMD_SLEEP)?;
        result
    }

    /// One full measurement cycle
    pub fn measure(&mut self) -> Result<SensorReading, NodeError> {
        self.wakeup()?;
        let result = self.command(CMD_MEASURE).and_then(|_| {
            self.delay.delay_ms(MEASURE_MS);
            let mut buf = [0u8; 6];
            self.read_words(&mut buf)?;
            Ok(SensorReading {
                temperature: raw_to_celsius(u16::from_be_bytes([buf[0], buf[1]])),
                humidity: raw_to_humidity(u16::from_be_bytes([buf[3], buf[4]])),
            })
        });
        self.command(CMD_SLEEP)?;
        result
    }

    fn wakeup(&mut self) -> Result<(), NodeError> {
        self.command(CMD_WAKEUP)?;
        self.delay.delay_us(WAKEUP_US);
        Ok(())
    }

    fn command(&mut self, cmd: u16) -> Result<(), NodeError> {
        self.i2c.write(self.address, &cmd.to_be_bytes()).map_err(|e| {
            warn!("[SENSOR] I2C write {:#06x} failed: {:?}", cmd, e);
            NodeError::SensorError
        })
    }

    /// Reads `[msb, lsb, crc]` triplets and checks each one
    fn read_words(&mut self, buf: &mut [u8]) -> Result<(), NodeError> {
        self.i2c.read(self.address, buf).map_err(|e| {
            warn!("[SENSOR] I2C read failed: {:?}", e);
            NodeError::SensorError
        })?;

        let crc = Crc::<u8>::new(&CRC_8_SENSIRION);
        for word in buf.chunks_exact(3) {
            let calc_sum = crc.checksum(&word[..2]);
            if calc_sum != word[2] {
                warn!(
                    "[SENSOR] checksum did not match (ours: {:#x} != sensor's: {:#x})",
                    calc_sum, word[2]
                );
                return Err(NodeError::SensorError);
            }
        }
        Ok(())
    }
}

impl<I2C: I2c, D: DelayNs> SensorDriver for Shtc3<I2C, D> {
    fn init(&mut self) -> Result<(), NodeError> {
        let id = self.read_id()?;
        debug!("[SENSOR] SHTC3 id {:#06x}", id);
        if id & ID_MASK != ID_SHTC3 {
            warn!("[SENSOR] unexpected product id {:#06x}", id);
            return Err(NodeError::SensorError);
        }
        Ok(())
    }

    fn update(&mut self) -> Result<(), NodeError> {
        self.last = self.measure()?;
        Ok(())
    }

    fn temperature(&self) -> f32 {
        self.last.temperature
    }

    fn humidity(&self) -> f32 {
        self.last.humidity
    }
}

pub fn raw_to_celsius(raw: u16) -> f32 {
    -45.0 + 175.0 * f32::from(raw) / 65536.0
}

pub fn raw_to_humidity(raw: u16) -> f32 {
    100.0 * f32::from(raw) / 65536.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};
    use std::collections::VecDeque;

    #[derive(Default)]
    struct FakeBus {
        commands: Vec<u16>,
        reads: VecDeque<Vec<u8>>,
        fail_writes: bool,
    }

    impl ErrorType for FakeBus {
        type Error = ErrorKind;
    }

    impl I2c for FakeBus {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            assert_eq!(address, 0x70);
            for op in operations {
                match op {
                    Operation::Write(bytes) => {
                        if self.fail_writes {
                            return Err(ErrorKind::Other);
                        }
                        self.commands.push(u16::from_be_bytes([bytes[0], bytes[1]]));
                    }
                    Operation::Read(buf) => {
                        let data = self.reads.pop_front().ok_or(ErrorKind::Other)?;
                        buf.copy_from_slice(&data);
                    }
                }
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeDelay {
        total_ns: u64,
    }

    impl DelayNs for FakeDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += u64::from(ns);
        }
    }

    fn sensor(reads: &[&[u8]]) -> Shtc3<FakeBus, FakeDelay> {
        let bus = FakeBus {
            reads: reads.iter().map(|r| r.to_vec()).collect(),
            ..FakeBus::default()
        };
        Shtc3::new(bus, FakeDelay::default())
    }

    #[test]
    fn sensirion_crc() {
        let crc = Crc::<u8>::new(&CRC_8_SENSIRION);
        assert_eq!(crc.checksum(&[0xBE, 0xEF]), 0x92);
    }

    #[test]
    fn conversions() {
        assert_eq!(raw_to_celsius(0), -45.0);
        assert!((raw_to_celsius(0x6666) - 25.0).abs() < 0.01);
        assert_eq!(raw_to_humidity(0x8000), 50.0);
    }

    #[test]
    fn init_checks_product_id() {
        let mut sht = sensor(&[&[0x08, 0x87, 0x5B]]);
        assert_eq!(sht.init(), Ok(()));

        let (bus, _) = sht.release();
        assert_eq!(bus.commands, [CMD_WAKEUP, CMD_READ_ID, CMD_SLEEP]);
    }

    #[test]
    fn init_rejects_foreign_id() {
        let mut sht = sensor(&[&[0x00, 0x00, 0x81]]);
        assert_eq!(sht.init(), Err(NodeError::SensorError));
    }

    #[test]
    fn measurement_updates_last_values() {
        let mut sht = sensor(&[&[0x66, 0x66, 0x93, 0x80, 0x00, 0xA2]]);
        assert_eq!(sht.update(), Ok(()));
        assert!((sht.temperature() - 25.0).abs() < 0.01);
        assert_eq!(sht.humidity(), 50.0);

        let (bus, delay) = sht.release();
        assert_eq!(bus.commands, [CMD_WAKEUP, CMD_MEASURE, CMD_SLEEP]);
        assert!(delay.total_ns >= 13_240_000);
    }

    #[test]
    fn bad_checksum_keeps_previous_values() {
        let mut sht = sensor(&[
            &[0x66, 0x66, 0x93, 0x80, 0x00, 0xA2],
            &[0x00, 0x00, 0x81, 0x00, 0x00, 0x00],
        ]);
        sht.update().unwrap();
        assert_eq!(sht.update(), Err(NodeError::SensorError));
        assert_eq!(sht.humidity(), 50.0);

        // chip is put back to sleep even when the payload is rejected
        let (bus, _) = sht.release();
        assert_eq!(bus.commands.last(), Some(&CMD_SLEEP));
    }

    #[test]
    fn absent_chip_is_sensor_error() {
        let mut sht = sensor(&[]);
        sht.i2c.fail_writes = true;
        assert_eq!(sht.init(), Err(NodeError::SensorError));
        assert_eq!(sht.update(), Err(NodeError::SensorError));
    }
}
