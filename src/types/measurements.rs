use embassy_time::Instant;
use serde::{Deserialize, Serialize};

/// Fused estimate of vertical motion, as handed to the mission.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StateEstimate {
    /// Altitude relative to the filter's arbitrary reference [m], up positive
    pub h: f64,
    /// Vertical velocity [m/s]
    pub v: f64,
    /// Vertical acceleration, gravity removed [m/s^2]
    pub a: f64,
}

impl StateEstimate {
    pub const fn new(h: f64, v: f64, a: f64) -> Self {
        Self { h, v, a }
    }
}

/// Complete filter belief: state vector, covariance and the time both
/// were last advanced to.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EstimatorState {
    /// `[altitude, velocity, acceleration]`
    pub x: [f64; 3],
    pub p: [[f64; 3]; 3],
    pub last_predict_time: Instant,
}

impl EstimatorState {
    pub const P_INIT: [[f64; 3]; 3] = [[250.0, 0.0, 0.0], [0.0, 0.1, 0.0], [0.0, 0.0, 0.1]];

    pub const fn new(now: Instant) -> Self {
        Self {
            x: [0.0; 3],
            p: Self::P_INIT,
            last_predict_time: now,
        }
    }

    pub fn estimate(&self) -> StateEstimate {
        StateEstimate::new(self.x[0], self.x[1], self.x[2])
    }

    /// Diagonal of the covariance, `[var_h, var_v, var_a]`.
    pub fn variances(&self) -> [f64; 3] {
        [self.p[0][0], self.p[1][1], self.p[2][2]]
    }
}

/// Flags through which the mission tells the estimator how far to trust
/// its inputs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrustFlags {
    /// When false, pressure samples are discarded
    pub trust_barometer: bool,
    /// Widen process noise ahead of a high-dynamics event
    pub dynamic_event_expected: bool,
}

impl TrustFlags {
    pub const fn new() -> Self {
        Self {
            trust_barometer: true,
            dynamic_event_expected: false,
        }
    }
}

impl Default for TrustFlags {
    fn default() -> Self {
        Self::new()
    }
}

/// A barometer sample as delivered by the driver.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PressureSample {
    /// Static pressure [Pa]
    pub pressure: f64,
    /// Sensor noise [Pa rms]
    pub rms: f64,
}

/// An accelerometer sample as delivered by the driver.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AccelSample {
    /// Body-frame acceleration [m/s^2]
    pub accels: [f64; 3],
    /// Full-scale range of the sensor [m/s^2]
    pub max: f64,
    /// Sensor noise [m/s^2 rms]
    pub rms: f64,
}
