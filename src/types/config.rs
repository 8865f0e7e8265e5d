use embassy_time::Duration;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use crate::{
    errors::ConfigError,
    sync::data_cell::DataCell,
    types::pyro::{PyroType, PyroUsage},
    NUM_PYRO_CHANNELS,
};

/// Shared, runtime-replaceable configuration snapshot.
pub type ConfigStore = DataCell<Configuration>;

/// Where in the vehicle stack this flight computer sits.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum M3fcPosition {
    Dart = 1,
    Core = 2,
}

/// Which signed accelerometer axis points "up" along the vehicle.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccelAxis {
    X = 1,
    NegX = 2,
    Y = 3,
    NegY = 4,
    Z = 5,
    NegZ = 6,
}

impl AccelAxis {
    /// Pick the "up" component out of a three-axis sample.
    pub fn up_component(self, accels: [f64; 3]) -> f64 {
        match self {
            AccelAxis::X => accels[0],
            AccelAxis::NegX => -accels[0],
            AccelAxis::Y => accels[1],
            AccelAxis::NegY => -accels[1],
            AccelAxis::Z => accels[2],
            AccelAxis::NegZ => -accels[2],
        }
    }
}

/// Flight profile thresholds, stored in the compact units of the
/// configuration store. Use the accessor methods for physical units.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MissionProfile {
    /// 1=dart 2=core
    pub position: u8,
    /// 1=X 2=-X 3=Y 4=-Y 5=Z 6=-Z
    pub accel_axis: u8,
    /// Ignition detection threshold, in m/s^2
    pub ignition_accel: u8,
    /// Burnout detection timeout, in 0.1 s since launch
    pub burnout_timeout: u8,
    /// Apogee detection timeout, in s since launch
    pub apogee_timeout: u8,
    /// Main release altitude, in 10 m above the pad
    pub main_altitude: u8,
    /// Main release timeout, in s since apogee
    pub main_timeout: u8,
    /// Landing detection timeout, in 10 s since launch
    pub land_timeout: u8,
}

impl MissionProfile {
    pub const fn const_default() -> Self {
        Self {
            position: M3fcPosition::Core as u8,
            accel_axis: AccelAxis::Z as u8,
            ignition_accel: 20,
            burnout_timeout: 30,
            apogee_timeout: 10,
            main_altitude: 2,
            main_timeout: 30,
            land_timeout: 30,
        }
    }

    pub fn position(&self) -> Result<M3fcPosition, ConfigError> {
        M3fcPosition::try_from(self.position).map_err(|e| ConfigError::InvalidPosition(e.number))
    }

    pub fn accel_axis(&self) -> Result<AccelAxis, ConfigError> {
        AccelAxis::try_from(self.accel_axis).map_err(|e| ConfigError::InvalidAccelAxis(e.number))
    }

    /// Ignition detection threshold [m/s^2]
    pub fn ignition_accel(&self) -> f64 {
        self.ignition_accel as f64
    }

    pub fn burnout_timeout(&self) -> Duration {
        Duration::from_millis(self.burnout_timeout as u64 * 100)
    }

    pub fn apogee_timeout(&self) -> Duration {
        Duration::from_secs(self.apogee_timeout as u64)
    }

    /// Main release altitude above the pad [m]
    pub fn main_altitude(&self) -> f64 {
        self.main_altitude as f64 * 10.0
    }

    pub fn main_timeout(&self) -> Duration {
        Duration::from_secs(self.main_timeout as u64)
    }

    pub fn land_timeout(&self) -> Duration {
        Duration::from_secs(self.land_timeout as u64 * 10)
    }
}

impl Default for MissionProfile {
    fn default() -> Self {
        Self::const_default()
    }
}

/// One pyro output: what it is used for and what is wired to it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PyroChannel {
    /// 0=NONE 1=DROGUE 2=MAIN 3=DART_SEP 4=BOOSTER_SEP
    pub usage: u8,
    /// 0=NONE 1=EMATCH 2=TALON 3=METRON
    pub kind: u8,
}

impl PyroChannel {
    pub const UNUSED: Self = Self::new(PyroUsage::None, PyroType::None);

    pub const fn new(usage: PyroUsage, kind: PyroType) -> Self {
        Self {
            usage: usage as u8,
            kind: kind as u8,
        }
    }

    pub fn usage(&self) -> Result<PyroUsage, ConfigError> {
        PyroUsage::try_from(self.usage).map_err(|e| ConfigError::InvalidPyroUsage(e.number))
    }

    pub fn kind(&self) -> Result<PyroType, ConfigError> {
        PyroType::try_from(self.kind).map_err(|e| ConfigError::InvalidPyroType(e.number))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PyroConfig {
    pub channels: [PyroChannel; NUM_PYRO_CHANNELS],
}

impl PyroConfig {
    pub const fn const_default() -> Self {
        Self {
            channels: [
                PyroChannel::new(PyroUsage::Drogue, PyroType::EMatch),
                PyroChannel::new(PyroUsage::Main, PyroType::EMatch),
                PyroChannel::UNUSED,
                PyroChannel::UNUSED,
            ],
        }
    }
}

impl Default for PyroConfig {
    fn default() -> Self {
        Self::const_default()
    }
}

/// The externally owned configuration, as seen by the flight core.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Configuration {
    pub profile: MissionProfile,
    pub pyros: PyroConfig,
}

impl Configuration {
    pub const DEFAULT: Self = Self {
        profile: MissionProfile::const_default(),
        pyros: PyroConfig::const_default(),
    };
}

/// Tuning of the vertical Kalman filter.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EstimatorConfig {
    /// Jerk variance in nominal flight [m^2/s^5]
    pub q_nominal: f64,
    /// Jerk variance while a dynamic event is expected [m^2/s^5]
    pub q_dynamic: f64,
    /// Emit telemetry on every n-th prediction. Zero disables it.
    pub telemetry_divider: u16,
}

impl EstimatorConfig {
    pub const fn const_default() -> Self {
        Self {
            q_nominal: 500.0,
            q_dynamic: 2000.0,
            telemetry_divider: 20,
        }
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self::const_default()
    }
}

/// Timing of the mission state machine.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MissionConfig {
    pub tick_ms: u64,
    pub heartbeat_ms: u64,
    /// Time from boot before INIT hands over to PAD
    pub pad_delay_ms: u64,
    /// Below this speed the vehicle is considered landed [m/s]
    pub landed_velocity: f64,
}

impl MissionConfig {
    pub const fn const_default() -> Self {
        Self {
            tick_ms: crate::consts::MISSION_TICK_MS,
            heartbeat_ms: crate::consts::MISSION_HEARTBEAT_MS,
            pad_delay_ms: crate::consts::PAD_DELAY_MS,
            landed_velocity: 0.5,
        }
    }
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self::const_default()
    }
}
