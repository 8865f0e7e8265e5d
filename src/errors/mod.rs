use embassy_time::{Duration, Instant};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{pyro::PyroUsage, status::PyroReadiness};

/// Every fault the flight core reports outward. None of them are fatal.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum M3fcError {
    #[error("Sensor fault: {0}")]
    Sensor(#[from] SensorFault),
    #[error("Configuration fault: {0}")]
    Config(#[from] ConfigError),
    #[error("Arming fault: {0}")]
    Arming(#[from] ArmingError),
    #[error("Device fault: {0}")]
    Device(#[from] DeviceError),
    #[error("Pyro fire request for {usage:?} was dropped, the request queue is full.")]
    PyroRequestDropped { usage: Option<PyroUsage> },
}

#[non_exhaustive]
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError {
    #[error("The device is not responding after {millis} ms.")]
    Timeout { millis: u64 },
    #[error("The device was not identified correctly.")]
    IdentificationError,
    #[error("The bus transaction with the device failed.")]
    Bus,
}

#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AtmosphereError {
    #[error("Pressure {pressure} Pa is outside the modelled atmosphere.")]
    OutOfRange { pressure: f64 },
    #[error("Altitude {altitude} m is outside the modelled atmosphere.")]
    AltitudeOutOfRange { altitude: f64 },
}

#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorFault {
    #[error("Barometer sample rejected: {0}")]
    Pressure(#[from] AtmosphereError),
    #[error("Accelerometer sample contained non-finite values.")]
    NonFinite,
}

#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    #[error("Accelerometer axis code {0} does not name a signed axis.")]
    InvalidAccelAxis(u8),
    #[error("Position code {0} is neither dart nor core.")]
    InvalidPosition(u8),
    #[error("Pyro usage code {0} is unknown.")]
    InvalidPyroUsage(u8),
    #[error("Pyro type code {0} is unknown.")]
    InvalidPyroType(u8),
}

#[derive(Error, Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("Pyros are not ready to fire: {readiness:?}")]
pub struct ArmingError {
    pub readiness: PyroReadiness,
}

/// Pass an error through at most once per `duration`, unless it changes.
pub struct Debounce<T> {
    duration: Duration,
    inner: Option<(Instant, T)>,
}

impl<T: PartialEq + Clone> Debounce<T> {
    pub const fn new(duration: Duration) -> Self {
        Self {
            duration,
            inner: None,
        }
    }

    pub fn evaluate(&mut self, error: T) -> Option<T> {
        self.evaluate_at(Instant::now(), error)
    }

    pub fn evaluate_at(&mut self, now: Instant, error: T) -> Option<T> {
        if self
            .inner
            .as_ref()
            .is_none_or(|(t, e)| now.saturating_duration_since(*t) > self.duration || e != &error)
        {
            self.inner = Some((now, error.clone()));
            Some(error)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debounce_suppresses_repeats() {
        let mut debounce = Debounce::new(Duration::from_secs(5));
        let t0 = Instant::from_millis(0);

        assert_eq!(debounce.evaluate_at(t0, 1), Some(1));
        assert_eq!(debounce.evaluate_at(t0 + Duration::from_secs(1), 1), None);
        assert_eq!(debounce.evaluate_at(t0 + Duration::from_secs(2), 2), Some(2));
        assert_eq!(debounce.evaluate_at(t0 + Duration::from_secs(8), 2), Some(2));
    }

    #[test]
    fn errors_convert_upwards() {
        let fault: M3fcError = SensorFault::from(AtmosphereError::OutOfRange { pressure: 1.0 }).into();
        assert!(matches!(fault, M3fcError::Sensor(SensorFault::Pressure(_))));

        let fault: M3fcError = ConfigError::InvalidAccelAxis(9).into();
        assert_eq!(fault, M3fcError::Config(ConfigError::InvalidAccelAxis(9)));
    }
}
