//! Mission state machine
//!
//! Sequences the flight through [`MissionPhase`] from power-up to landing.
//! Each tick evaluates exactly one transition with [`next_phase`], a pure
//! function of the current estimate, the flight context and the profile.
//! Entry effects (trust flags, timestamps and pyro requests) run once, on
//! the tick where the phase changes.

use embassy_time::{Duration, Instant};
#[allow(unused_imports)]
use num_traits::Float;

use crate::{
    errors::{ArmingError, Debounce, M3fcError},
    estimators::vertical_kalman::KalmanEstimator,
    hw_abstraction::{FaultSink, PyroSink, TelemetrySink},
    sync::data_cell::DataCell,
    types::{
        config::{ConfigStore, MissionConfig, MissionProfile, PyroConfig},
        measurements::StateEstimate,
        mission::{MissionContext, MissionPhase},
        pyro::{PyroFireRequest, PyroStatus, PyroUsage},
        status::PyroReadiness,
        telemetry::Telemetry,
    },
};

/// Decide the phase following `phase`, given the latest estimate.
///
/// Sensor-driven guards are OR'ed with a timeout, so every phase that
/// waits on the estimate is also left once its timeout is exceeded.
pub fn next_phase(
    phase: MissionPhase,
    estimate: &StateEstimate,
    ctx: &MissionContext,
    profile: &MissionProfile,
    tuning: &MissionConfig,
    now: Instant,
) -> MissionPhase {
    use MissionPhase::*;

    let exceeded = |elapsed: Option<Duration>, timeout: Duration| elapsed.is_some_and(|e| e > timeout);

    match phase {
        Init => {
            let pad_delay = Duration::from_millis(tuning.pad_delay_ms);
            match now.saturating_duration_since(ctx.t_boot) >= pad_delay {
                true => Pad,
                false => Init,
            }
        }
        Pad => match estimate.a > profile.ignition_accel() {
            true => Ignition,
            false => Pad,
        },
        Ignition => PoweredAscent,
        PoweredAscent => {
            match estimate.a < 0.0 || exceeded(ctx.since_launch(now), profile.burnout_timeout()) {
                true => Burnout,
                false => PoweredAscent,
            }
        }
        Burnout => FreeAscent,
        FreeAscent => match estimate.v < 0.0 || exceeded(ctx.since_launch(now), profile.apogee_timeout()) {
            true => Apogee,
            false => FreeAscent,
        },
        Apogee => DrogueDescent,
        DrogueDescent => {
            let below_main = estimate.h - ctx.h_ground < profile.main_altitude();
            match below_main || exceeded(ctx.since_apogee(now), profile.main_timeout()) {
                true => ReleaseMain,
                false => DrogueDescent,
            }
        }
        ReleaseMain => MainDescent,
        MainDescent => {
            let stopped = estimate.v.abs() < tuning.landed_velocity;
            match stopped || exceeded(ctx.since_launch(now), profile.land_timeout()) {
                true => Land,
                false => MainDescent,
            }
        }
        Land => Landed,
        Landed => Landed,
    }
}

/// Whether barometer readings can be trusted while in `phase`. The motor
/// burn and the transonic regime around it upset the static pressure.
const fn trusts_barometer(phase: MissionPhase) -> bool {
    !matches!(
        phase,
        MissionPhase::Ignition | MissionPhase::PoweredAscent | MissionPhase::Burnout
    )
}

/// Whether `phase` begins with a high-dynamics event the filter should
/// open up its process noise for.
const fn expects_dynamic_event(phase: MissionPhase) -> bool {
    matches!(
        phase,
        MissionPhase::Ignition
            | MissionPhase::PoweredAscent
            | MissionPhase::Burnout
            | MissionPhase::Apogee
            | MissionPhase::ReleaseMain
    )
}

/// The pyro event fired on entry to `phase`, if any.
const fn pyro_on_entry(phase: MissionPhase) -> Option<PyroUsage> {
    match phase {
        MissionPhase::Burnout => Some(PyroUsage::DartSeparation),
        MissionPhase::Apogee => Some(PyroUsage::Drogue),
        MissionPhase::ReleaseMain => Some(PyroUsage::Main),
        _ => None,
    }
}

pub struct MissionStateMachine<'a, E: TelemetrySink, O: TelemetrySink + PyroSink + FaultSink> {
    name: &'static str,
    estimator: &'a KalmanEstimator<'a, E>,
    config: &'a ConfigStore,
    pyro_status: &'a DataCell<PyroStatus>,
    tuning: MissionConfig,
    ctx: MissionContext,
    output: O,
    arming_debounce: Debounce<PyroReadiness>,
}

impl<'a, E: TelemetrySink, O: TelemetrySink + PyroSink + FaultSink> MissionStateMachine<'a, E, O> {
    pub fn new(
        estimator: &'a KalmanEstimator<'a, E>,
        config: &'a ConfigStore,
        pyro_status: &'a DataCell<PyroStatus>,
        output: O,
        t_boot: Instant,
    ) -> Self {
        Self::with_tuning(estimator, config, pyro_status, output, MissionConfig::default(), t_boot)
    }

    pub fn with_tuning(
        estimator: &'a KalmanEstimator<'a, E>,
        config: &'a ConfigStore,
        pyro_status: &'a DataCell<PyroStatus>,
        output: O,
        tuning: MissionConfig,
        t_boot: Instant,
    ) -> Self {
        Self {
            name: "mission",
            estimator,
            config,
            pyro_status,
            tuning,
            ctx: MissionContext::new(t_boot),
            output,
            arming_debounce: Debounce::new(Duration::from_secs(5)),
        }
    }

    pub fn phase(&self) -> MissionPhase {
        self.ctx.current_phase
    }

    pub fn context(&self) -> &MissionContext {
        &self.ctx
    }

    pub fn estimator(&self) -> &'a KalmanEstimator<'a, E> {
        self.estimator
    }

    pub fn tuning(&self) -> &MissionConfig {
        &self.tuning
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    /// Poll the estimator and run one step of the mission.
    pub fn tick(&mut self, now: Instant) -> MissionPhase {
        let estimate = self.estimator.get_state_at(now);
        self.advance(now, &estimate)
    }

    /// Run one step of the mission against a given estimate.
    ///
    /// Reads the current configuration, evaluates a single transition and
    /// applies its entry effects. Returns the phase after the step.
    pub fn advance(&mut self, now: Instant, estimate: &StateEstimate) -> MissionPhase {
        let config = self.config.read();
        let phase = self.ctx.current_phase;

        if phase == MissionPhase::Pad {
            // Keep the ground reference fresh until launch
            self.ctx.h_ground = estimate.h;
            self.check_arming(now);
        }

        let next = next_phase(phase, estimate, &self.ctx, &config.profile, &self.tuning, now);
        if next != phase {
            self.enter(next, now, estimate, &config.pyros);
        }

        next
    }

    /// Broadcast the current phase and mission elapsed time.
    pub fn heartbeat(&self, now: Instant) {
        self.output.send_telemetry(Telemetry::MissionState {
            met_ms: self.met_ms(now),
            phase: self.ctx.current_phase,
        });
    }

    /// Request every channel configured for `usage` to fire, in a single
    /// batch. Channels with invalid codes are reported and left out.
    pub fn fire_pyro(&self, usage: PyroUsage, pyros: &PyroConfig) {
        let mut request = PyroFireRequest {
            usage: Some(usage),
            ..Default::default()
        };

        for (slot, channel) in request.channels.iter_mut().zip(pyros.channels.iter()) {
            let matches = match channel.usage() {
                Ok(channel_usage) => channel_usage == usage,
                Err(error) => {
                    self.output.report(error.into());
                    continue;
                }
            };

            if matches {
                match channel.kind() {
                    Ok(kind) => *slot = kind,
                    Err(error) => self.output.report(error.into()),
                }
            }
        }

        if request.is_empty() {
            warn!("[{}] No channel configured for {:?}", self.name, usage);
        } else {
            warn!("[{}] Firing {:?} on {:?}", self.name, usage, request.channels);
        }
        self.output.fire(request);
    }

    fn enter(&mut self, phase: MissionPhase, now: Instant, estimate: &StateEstimate, pyros: &PyroConfig) {
        info!("[{}] {} -> {}", self.name, self.ctx.current_phase.name(), phase.name());

        self.estimator.set_trust_barometer(trusts_barometer(phase));
        self.estimator.set_dynamic_event_expected(expects_dynamic_event(phase));

        match phase {
            MissionPhase::Pad => self.ctx.h_ground = estimate.h,
            MissionPhase::Ignition => self.ctx.t_launch = Some(now),
            MissionPhase::Apogee => self.ctx.t_apogee = Some(now),
            _ => {}
        }

        if let Some(usage) = pyro_on_entry(phase) {
            self.fire_pyro(usage, pyros);
        }

        self.ctx.current_phase = phase;
        self.heartbeat(now);
    }

    fn check_arming(&mut self, now: Instant) {
        let readiness = PyroReadiness::from_status(self.pyro_status.read());
        if readiness.is_empty() {
            return;
        }

        if self.arming_debounce.evaluate_at(now, readiness).is_some() {
            debug!("[{}] Pyros not ready: {:?}", self.name, readiness);
        }
        self.output.report(M3fcError::Arming(ArmingError { readiness }));
    }

    fn met_ms(&self, now: Instant) -> u32 {
        u32::try_from(self.ctx.met(now).as_millis()).unwrap_or(u32::MAX)
    }
}
