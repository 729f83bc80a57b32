//! Cayenne LPP uplink payload

use crate::sensor::SensorReading;

pub const TEMPERATURE_CHANNEL: u8 = 1;
pub const HUMIDITY_CHANNEL: u8 = 2;
pub const LPP_TEMPERATURE: u8 = 0x67;
pub const LPP_HUMIDITY: u8 = 0x68;

pub const PAYLOAD_LEN: usize = 7;

/// `[ch, 0x67, temp_hi, temp_lo, ch, 0x68, rh]`
///
/// Temperature is a signed 0.1 °C count, humidity an unsigned 0.5 % count.
/// Out-of-range values saturate.
pub fn encode(reading: &SensorReading) -> [u8; PAYLOAD_LEN] {
    let temperature = round(reading.temperature * 10.0) as i16;
    let humidity = round(reading.humidity * 2.0) as u8;
    let [t_hi, t_lo] = temperature.to_be_bytes();

    [
        TEMPERATURE_CHANNEL,
        LPP_TEMPERATURE,
        t_hi,
        t_lo,
        HUMIDITY_CHANNEL,
        LPP_HUMIDITY,
        humidity,
    ]
}

// half away from zero, core has no f32::round
fn round(value: f32) -> f32 {
    if value >= 0.0 {
        (value + 0.5) as i32 as f32
    } else {
        (value - 0.5) as i32 as f32
    }
}
