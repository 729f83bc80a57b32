//! Temperature / humidity sensor layer
//!
//! Two interchangeable backends behind [`EnvSensor`]: the RAK1901 on the I2C
//! bus ([`RealSensor`] over [`Shtc3`]) and a deterministic ping-pong
//! simulator ([`SimulatedSensor`]). Callers never know which one is active.

pub mod real;
pub mod shtc3;
pub mod simulated;

pub use real::RealSensor;
pub use shtc3::Shtc3;
pub use simulated::{PingPong, SimulatedSensor};

use crate::NodeError;

/// One temperature / humidity sample
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorReading {
    /// Degrees celsius
    pub temperature: f32,
    /// Relative humidity in percent
    pub humidity: f32,
}

/// What the application needs from a sensor backend
pub trait EnvSensor {
    /// Bring the backend up. Failure is logged, never fatal.
    fn init(&mut self);

    /// Always returns a value, stale or simulated if need be
    fn read_temperature(&mut self) -> f32;

    /// Always returns a value, stale or simulated if need be
    fn read_humidity(&mut self) -> f32;

    fn read(&mut self) -> SensorReading {
        SensorReading {
            temperature: self.read_temperature(),
            humidity: self.read_humidity(),
        }
    }
}

/// Chip level driver used by [`RealSensor`]
pub trait SensorDriver {
    /// Bus setup and presence probe
    fn init(&mut self) -> Result<(), NodeError>;

    /// Take a fresh measurement
    fn update(&mut self) -> Result<(), NodeError>;

    /// Temperature of the last successful measurement
    fn temperature(&self) -> f32;

    /// Humidity of the last successful measurement
    fn humidity(&self) -> f32;
}
