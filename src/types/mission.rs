use embassy_time::{Duration, Instant};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// Flight phases, in the order a nominal flight visits them.
#[repr(u8)]
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TryFromPrimitive, IntoPrimitive,
)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MissionPhase {
    Init = 0,
    Pad,
    Ignition,
    PoweredAscent,
    Burnout,
    FreeAscent,
    Apogee,
    DrogueDescent,
    ReleaseMain,
    MainDescent,
    Land,
    Landed,
}

impl MissionPhase {
    pub const ALL: [MissionPhase; 12] = [
        MissionPhase::Init,
        MissionPhase::Pad,
        MissionPhase::Ignition,
        MissionPhase::PoweredAscent,
        MissionPhase::Burnout,
        MissionPhase::FreeAscent,
        MissionPhase::Apogee,
        MissionPhase::DrogueDescent,
        MissionPhase::ReleaseMain,
        MissionPhase::MainDescent,
        MissionPhase::Land,
        MissionPhase::Landed,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            MissionPhase::Init => "INIT",
            MissionPhase::Pad => "PAD",
            MissionPhase::Ignition => "IGNITION",
            MissionPhase::PoweredAscent => "POWERED_ASCENT",
            MissionPhase::Burnout => "BURNOUT",
            MissionPhase::FreeAscent => "FREE_ASCENT",
            MissionPhase::Apogee => "APOGEE",
            MissionPhase::DrogueDescent => "DROGUE_DESCENT",
            MissionPhase::ReleaseMain => "RELEASE_MAIN",
            MissionPhase::MainDescent => "MAIN_DESCENT",
            MissionPhase::Land => "LAND",
            MissionPhase::Landed => "LANDED",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, MissionPhase::Landed)
    }
}

/// Per-flight scratch state, owned by the mission state machine.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MissionContext {
    /// Time the mission started, the reference for the INIT delay
    pub t_boot: Instant,
    pub t_launch: Option<Instant>,
    pub t_apogee: Option<Instant>,
    /// Altitude snapshot taken while on the pad [m]
    pub h_ground: f64,
    pub current_phase: MissionPhase,
}

impl MissionContext {
    pub const fn new(t_boot: Instant) -> Self {
        Self {
            t_boot,
            t_launch: None,
            t_apogee: None,
            h_ground: 0.0,
            current_phase: MissionPhase::Init,
        }
    }

    /// Time since launch, or `None` before launch was detected.
    pub fn since_launch(&self, now: Instant) -> Option<Duration> {
        self.t_launch.map(|t| now.saturating_duration_since(t))
    }

    pub fn since_apogee(&self, now: Instant) -> Option<Duration> {
        self.t_apogee.map(|t| now.saturating_duration_since(t))
    }

    /// Mission elapsed time, zero before launch.
    pub fn met(&self, now: Instant) -> Duration {
        self.since_launch(now).unwrap_or(Duration::from_ticks(0))
    }
}
