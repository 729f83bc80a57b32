//! Software stand-in for the RAK1901 when no hardware is attached

use super::EnvSensor;
use crate::config::sensor::*;

/// Triangle wave between `min` and `max`, one `step` per read
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PingPong {
    value: f32,
    min: f32,
    max: f32,
    step: f32,
    rising: bool,
}

impl PingPong {
    /// Starts at `min`, heading up
    pub const fn new(min: f32, max: f32, step: f32) -> Self {
        Self {
            value: min,
            min,
            max,
            step,
            rising: true,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn is_rising(&self) -> bool {
        self.rising
    }

    /// Advance one step. Reaching a bound clamps to it and turns around.
    pub fn next(&mut self) -> f32 {
        if self.rising {
            self.value += self.step;
            if self.value >= self.max {
                self.value = self.max;
                self.rising = false;
            }
        } else {
            self.value -= self.step;
            if self.value <= self.min {
                self.value = self.min;
                self.rising = true;
            }
        }
        self.value
    }
}

pub struct SimulatedSensor {
    temperature: PingPong,
    humidity: PingPong,
}

impl SimulatedSensor {
    pub const fn new() -> Self {
        Self {
            temperature: PingPong::new(TEMPERATURE_MIN, TEMPERATURE_MAX, TEMPERATURE_STEP),
            humidity: PingPong::new(HUMIDITY_MIN, HUMIDITY_MAX, HUMIDITY_STEP),
        }
    }
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvSensor for SimulatedSensor {
    fn init(&mut self) {}

    fn read_temperature(&mut self) -> f32 {
        self.temperature.next()
    }

    fn read_humidity(&mut self) -> f32 {
        self.humidity.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_read_is_one_step_above_min() {
        let mut sensor = SimulatedSensor::new();
        assert!((sensor.read_temperature() - (TEMPERATURE_MIN + TEMPERATURE_STEP)).abs() < 1e-4);
        assert!((sensor.read_humidity() - (HUMIDITY_MIN + HUMIDITY_STEP)).abs() < 1e-4);
    }

    #[test]
    fn temperature_is_bounded_triangle_wave() {
        let mut wave = PingPong::new(TEMPERATURE_MIN, TEMPERATURE_MAX, TEMPERATURE_STEP);
        let mut previous = wave.value();

        // rising edge up to the clamp at max
        loop {
            let value = wave.next();
            assert!(value > previous, "{} not above {}", value, previous);
            assert!(value <= TEMPERATURE_MAX);
            previous = value;
            if value == TEMPERATURE_MAX {
                break;
            }
        }
        assert!(!wave.is_rising());

        // falling edge down to the clamp at min
        loop {
            let value = wave.next();
            assert!(value < previous, "{} not below {}", value, previous);
            assert!(value >= TEMPERATURE_MIN);
            previous = value;
            if value == TEMPERATURE_MIN {
                break;
            }
        }
        assert!(wave.is_rising());
    }

    #[test]
    fn never_leaves_range() {
        let mut sensor = SimulatedSensor::new();
        for _ in 0..5_000 {
            let reading = sensor.read();
            assert!((TEMPERATURE_MIN..=TEMPERATURE_MAX).contains(&reading.temperature));
            assert!((HUMIDITY_MIN..=HUMIDITY_MAX).contains(&reading.humidity));
        }
    }

    #[test]
    fn humidity_turns_after_reaching_max() {
        let mut wave = PingPong::new(HUMIDITY_MIN, HUMIDITY_MAX, HUMIDITY_STEP);
        // (80.2 - 45.5) / 0.65 = 53.4 steps, the 54th is clamped
        for _ in 0..53 {
            assert!(wave.next() < HUMIDITY_MAX);
        }
        assert_eq!(wave.next(), HUMIDITY_MAX);
        assert!(wave.next() < HUMIDITY_MAX);
    }

    #[test]
    fn channels_move_independently() {
        let mut sensor = SimulatedSensor::new();
        for _ in 0..10 {
            sensor.read_humidity();
        }
        assert!((sensor.read_temperature() - (TEMPERATURE_MIN + TEMPERATURE_STEP)).abs() < 1e-4);
    }
}
