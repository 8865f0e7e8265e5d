/// Standard gravity [m/s^2]
pub const GRAVITY: f64 = 9.80665;

/// Accelerometer magnitudes within this band of 1 g cannot be told apart
/// from a vehicle at rest or tumbling near apogee [m/s^2]
pub const ONE_G_AMBIGUITY: f64 = 1.0;

/// Interval between mission state machine ticks [ms]
pub const MISSION_TICK_MS: u64 = 10;

/// Interval between mission phase heartbeats [ms]
pub const MISSION_HEARTBEAT_MS: u64 = 1000;

/// Time from boot before the vehicle may leave INIT [ms]
pub const PAD_DELAY_MS: u64 = 30_000;

/// Interval between configuration reports [ms]
pub const CONFIG_REPORT_MS: u64 = 5000;
