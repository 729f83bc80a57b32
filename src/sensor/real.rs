//! Hardware backed sensor with graceful degradation

use super::{EnvSensor, SensorDriver};
use crate::config::sensor::{HUMIDITY_MIN, TEMPERATURE_MIN};
use log::{error, info};

/// Wraps a [`SensorDriver`] so reads never fail. A dead driver yields the
/// last good value, or the simulator floor if nothing was ever measured.
pub struct RealSensor<D> {
    driver: D,
    present: bool,
    measured: bool,
}

impl<D: SensorDriver> RealSensor<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            present: false,
            measured: false,
        }
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    fn refresh(&mut self) {
        match self.driver.update() {
            Ok(()) => self.measured = true,
            Err(e) => {
                error!("[SENSOR] Read failed: {:?}", e);
                error!("[SENSOR] Please plug in the sensor RAK1901 and Reboot");
            }
        }
    }
}

impl<D: SensorDriver> EnvSensor for RealSensor<D> {
    fn init(&mut self) {
        match self.driver.init() {
            Ok(()) => {
                info!("[SENSOR] RAK1901 found");
                self.present = true;
            }
            Err(e) => {
                error!("[SENSOR] Init failed: {:?}", e);
                error!("[SENSOR] Please plug in the sensor RAK1901 and Reboot");
            }
        }
    }

    fn read_temperature(&mut self) -> f32 {
        self.refresh();
        if self.measured {
            self.driver.temperature()
        } else {
            TEMPERATURE_MIN
        }
    }

    fn read_humidity(&mut self) -> f32 {
        self.refresh();
        if self.measured {
            self.driver.humidity()
        } else {
            HUMIDITY_MIN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeError;

    struct ScriptedDriver {
        present: bool,
        samples: Vec<(f32, f32)>,
        current: (f32, f32),
    }

    impl SensorDriver for ScriptedDriver {
        fn init(&mut self) -> Result<(), NodeError> {
            if self.present { Ok(()) } else { Err(NodeError::SensorError) }
        }

        fn update(&mut self) -> Result<(), NodeError> {
            if self.samples.is_empty() {
                return Err(NodeError::SensorError);
            }
            self.current = self.samples.remove(0);
            Ok(())
        }

        fn temperature(&self) -> f32 {
            self.current.0
        }

        fn humidity(&self) -> f32 {
            self.current.1
        }
    }

    fn sensor(present: bool, samples: &[(f32, f32)]) -> RealSensor<ScriptedDriver> {
        let mut sensor = RealSensor::new(ScriptedDriver {
            present,
            samples: samples.to_vec(),
            current: (0.0, 0.0),
        });
        sensor.init();
        sensor
    }

    #[test]
    fn reads_fresh_values() {
        let mut sensor = sensor(true, &[(21.5, 0.0), (0.0, 40.0)]);
        assert!(sensor.is_present());
        assert_eq!(sensor.read_temperature(), 21.5);
        assert_eq!(sensor.read_humidity(), 40.0);
    }

    #[test]
    fn missing_sensor_reports_floor_values() {
        let mut sensor = sensor(false, &[]);
        assert!(!sensor.is_present());
        let reading = sensor.read();
        assert_eq!(reading.temperature, TEMPERATURE_MIN);
        assert_eq!(reading.humidity, HUMIDITY_MIN);
    }

    #[test]
    fn failed_update_keeps_last_good_value() {
        let mut sensor = sensor(true, &[(19.0, 55.0)]);
        assert_eq!(sensor.read_temperature(), 19.0);
        assert_eq!(sensor.read_temperature(), 19.0);
        assert_eq!(sensor.read_humidity(), 55.0);
    }
}
