use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use crate::NUM_PYRO_CHANNELS;

/// The role of a pyro channel.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PyroUsage {
    None = 0,
    Drogue = 1,
    Main = 2,
    DartSeparation = 3,
    BoosterSeparation = 4,
}

/// The pyrotechnic device wired to a channel, which decides how the
/// pyro board drives it.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PyroType {
    #[default]
    None = 0,
    EMatch = 1,
    Talon = 2,
    Metron = 3,
}

/// One batched request to the pyro subsystem. Each slot holds the
/// device type to fire on that channel, or `None` to leave it alone.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PyroFireRequest {
    pub usage: Option<PyroUsage>,
    pub channels: [PyroType; NUM_PYRO_CHANNELS],
}

impl PyroFireRequest {
    /// True if no channel would be fired by this request.
    pub fn is_empty(&self) -> bool {
        self.channels.iter().all(|kind| *kind == PyroType::None)
    }
}

/// Latest status received from the pyro board.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PyroStatus {
    pub supply_good: bool,
    pub armed: bool,
}

impl PyroStatus {
    /// Supply voltages above this are considered good, in 0.1 V
    pub const SUPPLY_GOOD_DECIVOLTS: u8 = 40;

    pub const fn new() -> Self {
        Self {
            supply_good: false,
            armed: false,
        }
    }

    /// Apply a supply voltage report from the pyro board, in 0.1 V.
    pub fn with_supply_voltage(mut self, decivolts: u8) -> Self {
        self.supply_good = decivolts > Self::SUPPLY_GOOD_DECIVOLTS;
        self
    }

    pub fn with_armed(mut self, armed: bool) -> Self {
        self.armed = armed;
        self
    }
}
