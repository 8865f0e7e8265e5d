//! Deterministic replay of recorded flight logs.
//!
//! Samples are fed to the estimator in log order and the mission is ticked
//! whenever at least one tick period of log time has passed, all against
//! the timestamps in the log rather than a wall clock.

use embassy_time::{Duration, Instant};

use crate::{
    hw_abstraction::{FaultSink, PyroSink, TelemetrySink},
    mission::MissionStateMachine,
    types::{
        measurements::{AccelSample, PressureSample, StateEstimate},
        mission::MissionPhase,
    },
};

#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LogRecord {
    Pressure(PressureSample),
    Accel(AccelSample),
}

/// One timestamped sensor sample from a flight log.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LogEntry {
    pub t: Instant,
    pub record: LogRecord,
}

impl LogEntry {
    pub fn pressure(t: Instant, pressure: f64, rms: f64) -> Self {
        Self {
            t,
            record: LogRecord::Pressure(PressureSample { pressure, rms }),
        }
    }

    pub fn accel(t: Instant, accels: [f64; 3], max: f64, rms: f64) -> Self {
        Self {
            t,
            record: LogRecord::Accel(AccelSample { accels, max, rms }),
        }
    }
}

/// A phase transition observed during replay, with the estimate that
/// caused it.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhaseChange {
    pub t: Instant,
    pub from: MissionPhase,
    pub to: MissionPhase,
    pub estimate: StateEstimate,
}

pub struct Replay<'a, E: TelemetrySink, O: TelemetrySink + PyroSink + FaultSink> {
    mission: MissionStateMachine<'a, E, O>,
    tick: Duration,
    heartbeat: Duration,
    last_tick: Instant,
    last_heartbeat: Instant,
}

impl<'a, E: TelemetrySink, O: TelemetrySink + PyroSink + FaultSink> Replay<'a, E, O> {
    /// Replay against `mission`, whose log starts at `start`.
    pub fn new(mission: MissionStateMachine<'a, E, O>, start: Instant) -> Self {
        let tuning = mission.tuning();
        Self {
            tick: Duration::from_millis(tuning.tick_ms),
            heartbeat: Duration::from_millis(tuning.heartbeat_ms),
            mission,
            last_tick: start,
            last_heartbeat: start,
        }
    }

    pub fn mission(&self) -> &MissionStateMachine<'a, E, O> {
        &self.mission
    }

    pub fn phase(&self) -> MissionPhase {
        self.mission.phase()
    }

    /// Feed one sample, then tick the mission if it is due.
    pub fn feed(&mut self, entry: &LogEntry) -> Option<PhaseChange> {
        let estimator = self.mission.estimator();
        let result = match entry.record {
            LogRecord::Pressure(sample) => estimator.new_pressure(sample.pressure, sample.rms),
            LogRecord::Accel(sample) => estimator.new_accels(sample.accels, sample.max, sample.rms),
        };

        if let Err(error) = result {
            self.mission.output().report(error);
        }

        self.poll(entry.t)
    }

    /// Feed an entire log, passing every phase change to `on_change`.
    pub fn run(&mut self, log: impl IntoIterator<Item = LogEntry>, mut on_change: impl FnMut(PhaseChange)) {
        for entry in log {
            if let Some(change) = self.feed(&entry) {
                on_change(change);
            }
        }
    }

    /// Keep ticking without any samples until `end`, as after a total
    /// loss of sensors.
    pub fn idle_until(&mut self, end: Instant, mut on_change: impl FnMut(PhaseChange)) {
        let mut now = self.last_tick + self.tick;
        while now <= end {
            if let Some(change) = self.poll(now) {
                on_change(change);
            }
            now += self.tick;
        }
    }

    fn poll(&mut self, now: Instant) -> Option<PhaseChange> {
        if now.saturating_duration_since(self.last_heartbeat) >= self.heartbeat {
            self.last_heartbeat = now;
            self.mission.heartbeat(now);
        }

        if now.saturating_duration_since(self.last_tick) < self.tick {
            return None;
        }
        self.last_tick = now;

        let from = self.mission.phase();
        let estimate = self.mission.estimator().get_state_at(now);
        let to = self.mission.advance(now, &estimate);

        (from != to).then_some(PhaseChange {
            t: now,
            from,
            to,
            estimate,
        })
    }
}
