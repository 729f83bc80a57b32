#![cfg_attr(not(test), no_std)]

//! LoRaWAN sensor node library
//!
//! Custom AT commands (`SENDINT`, `STATUS`) on top of a persisted send-interval
//! record, plus a temperature/humidity sensor layer that runs either against a
//! RAK1901 (SHTC3) on I2C or against a deterministic simulator.

pub mod at;
pub mod eeprom;
pub mod interval;
pub mod node;
pub mod radio;
pub mod sensor;
pub mod storage;
pub mod telemetry;

pub use node::Node;

/// Project version information
pub const VERSION: &str = "0.1.0-dev";

/// Default configuration constants
pub mod config {
    /// Offset of the persisted record inside the non-volatile region
    pub const RECORD_OFFSET: u32 = 0;

    /// Flag byte marking an initialized record
    pub const VALID_FLAG: u8 = 0xAA;

    /// Lone argument that turns an AT call into a query
    pub const QUERY_TOKEN: &str = "?";

    /// AT response line terminator
    pub const LINE_END: &str = "\r\n";

    pub const MS_PER_SECOND: u32 = 1000;

    /// Largest interval the help text advertises (fits a signed 32-bit millisecond count)
    pub const MAX_SAFE_SECONDS: u32 = 2_147_483;

    /// Longest AT line accepted from the console, terminator excluded
    pub const AT_LINE_MAX: usize = 128;

    /// Maximum `:` separated arguments per AT call
    pub const AT_MAX_ARGS: usize = 8;

    /// Console UART baud rate
    pub const CONSOLE_BAUD_RATE: u32 = 115_200;

    /// RAK1901 (SHTC3) I2C address
    pub const SHTC3_ADDRESS: u8 = 0x70;

    /// Hardware model reported by `AT+STATUS`
    pub const HW_MODEL: &str = "esp32c3-lora";

    /// Simulated and fallback sensor ranges
    pub mod sensor {
        pub const TEMPERATURE_MIN: f32 = 12.7;
        pub const TEMPERATURE_MAX: f32 = 37.2;
        pub const TEMPERATURE_STEP: f32 = 0.06;

        pub const HUMIDITY_MIN: f32 = 45.5;
        pub const HUMIDITY_MAX: f32 = 80.2;
        pub const HUMIDITY_STEP: f32 = 0.65;
    }

    /// LoRaWAN identity and radio defaults
    /// Read from environment variables at compile time, normalized by build.rs
    pub mod lorawan {
        use super::{parse_hex, parse_u8};

        pub const DEV_EUI: [u8; 8] = parse_hex(env!("LORA_DEV_EUI"));
        pub const APP_EUI: [u8; 8] = parse_hex(env!("LORA_APP_EUI"));
        pub const APP_KEY: [u8; 16] = parse_hex(env!("LORA_APP_KEY"));
        pub const APPS_KEY: [u8; 16] = parse_hex(env!("LORA_APPS_KEY"));
        pub const NWKS_KEY: [u8; 16] = parse_hex(env!("LORA_NWKS_KEY"));
        pub const DEV_ADDR: [u8; 4] = parse_hex(env!("LORA_DEV_ADDR"));

        /// 0 = P2P, 1 = LoRaWAN, 2 = FSK
        pub const NETWORK_MODE: u8 = parse_u8(env!("LORA_NETWORK_MODE"));
        /// Index into the region table, 4 = EU868
        pub const REGION: u8 = parse_u8(env!("LORA_REGION"));
        pub const JOIN_OTAA: bool = parse_u8(env!("LORA_JOIN_OTAA")) != 0;

        /// P2P and FSK defaults
        pub const P2P_FREQUENCY_HZ: u32 = 868_000_000;
        pub const P2P_SPREADING_FACTOR: u8 = 7;
        pub const P2P_BANDWIDTH_KHZ: u32 = 125;
        pub const P2P_CODING_RATE: u8 = 0;
        pub const P2P_PREAMBLE_LENGTH: u16 = 8;
        pub const P2P_TX_POWER: u8 = 14;
        pub const FSK_BITRATE: u32 = 50_000;
        pub const FSK_DEVIATION_HZ: u32 = 25_000;
    }

    const fn nibble(c: u8) -> u8 {
        match c {
            b'0'..=b'9' => c - b'0',
            b'A'..=b'F' => c - b'A' + 10,
            b'a'..=b'f' => c - b'a' + 10,
            _ => panic!("invalid hex digit in LoRaWAN configuration"),
        }
    }

    const fn parse_hex<const N: usize>(text: &str) -> [u8; N] {
        let bytes = text.as_bytes();
        assert!(bytes.len() == N * 2, "wrong hex length in LoRaWAN configuration");

        let mut out = [0u8; N];
        let mut i = 0;
        while i < N {
            out[i] = (nibble(bytes[2 * i]) << 4) | nibble(bytes[2 * i + 1]);
            i += 1;
        }
        out
    }

    const fn parse_u8(text: &str) -> u8 {
        let bytes = text.as_bytes();
        let mut value: u8 = 0;
        let mut i = 0;
        while i < bytes.len() {
            assert!(bytes[i].is_ascii_digit(), "invalid number in LoRaWAN configuration");
            value = value * 10 + (bytes[i] - b'0');
            i += 1;
        }
        value
    }
}

/// Error types for the sensor node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeError {
    /// Malformed or wrong-arity AT input
    InvalidParameter,
    /// Non-volatile read failed
    StorageReadFailure,
    /// Non-volatile write failed
    StorageWriteFailure,
    /// Sensor bus or checksum error
    SensorError,
}
