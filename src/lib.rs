//! Flight-control core of the M3FC rocket avionics unit.
//!
//! Barometer and accelerometer samples are fused by a three-state Kalman
//! filter ([`estimators::vertical_kalman::KalmanEstimator`]) into altitude,
//! vertical velocity and vertical acceleration. The mission state machine
//! ([`mission::MissionStateMachine`]) polls that estimate at a fixed tick and
//! sequences the flight, requesting pyrotechnic events at phase boundaries.

#![no_std]

// Logging macros for either defmt or log, must come first
#[macro_use]
mod logging;

pub mod consts;
pub mod errors;
pub mod estimators;
pub mod hw_abstraction;
pub mod mission;
pub mod replay;
pub mod signals;
pub mod sync;
pub mod tasks;
pub mod types;

#[allow(unused)]
#[cfg(not(feature = "arch-std"))]
use num_traits::Float as _;

// Re-exported for implementors
pub use embassy_futures;
pub use embassy_sync;
pub use embassy_time;
pub use nalgebra;

pub use estimators::vertical_kalman::KalmanEstimator;
pub use mission::MissionStateMachine;

/// Number of pyro channels addressable by one fire request.
pub const NUM_PYRO_CHANNELS: usize = 4;
