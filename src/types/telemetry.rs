use serde::{Deserialize, Serialize};

use crate::types::{config::Configuration, mission::MissionPhase};

/// Scalar broadcasts from the flight core. Framing and encoding onto the
/// bus belong to the transport.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Telemetry {
    /// Prediction interval [s] and altitude [m]
    TimeAltitude { dt: f64, h: f64 },
    /// Velocity [m/s] and acceleration [m/s^2]
    VelocityAccel { v: f64, a: f64 },
    /// Altitude variance [m^2]
    VarAltitude { var_h: f64 },
    VarVelocityAccel { var_v: f64, var_a: f64 },
    /// Mission elapsed time [ms] and current phase
    MissionState { met_ms: u32, phase: MissionPhase },
    /// Active configuration, sent periodically
    Config(Configuration),
}
