#![allow(non_snake_case)]

use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use embassy_time::Instant;
use nalgebra::{Matrix3, Vector3};
#[allow(unused_imports)]
use num_traits::Float;
use portable_atomic::{AtomicU32, Ordering};

use crate::{
    consts::{GRAVITY, ONE_G_AMBIGUITY},
    errors::{M3fcError, SensorFault},
    estimators::atmosphere::pressure_to_altitude,
    hw_abstraction::TelemetrySink,
    sync::data_cell::DataCell,
    types::{
        config::{ConfigStore, EstimatorConfig},
        measurements::{EstimatorState, StateEstimate, TrustFlags},
        telemetry::Telemetry,
    },
};

/// Index of each quantity in the state vector.
const ALT: usize = 0;
const ACC: usize = 2;

/// What became of a measurement handed to the estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Update {
    /// The sample was folded into the estimate. Holds the pre-fit residual.
    Fused { innovation: f64 },
    /// The sample was deliberately ignored, e.g. an untrusted barometer.
    Ignored,
}

struct FilterState {
    // [altitude, velocity, acceleration]
    x: Vector3<f64>,
    P: Matrix3<f64>,
    last_predict_time: Instant,
    predictions: u16,
}

impl FilterState {
    fn new(now: Instant) -> Self {
        let init = EstimatorState::new(now);
        Self {
            x: Vector3::from(init.x),
            P: Matrix3::from_fn(|r, c| init.p[r][c]),
            last_predict_time: now,
            predictions: 0,
        }
    }

    /// Advance state and covariance to `now` under a constant-jerk model
    /// with jerk variance `q`. Returns the elapsed time in seconds.
    ///
    /// ```text
    /// F = [ 1  dt  dt²/2 ]     Q = q [ dt⁶/36  dt⁵/12  dt⁴/6 ]
    ///     [ 0   1  dt    ]           [ dt⁵/12  dt⁴/4   dt³/2 ]
    ///     [ 0   0   1    ]           [ dt⁴/6   dt³/2   dt²   ]
    /// ```
    fn predict(&mut self, now: Instant, q: f64) -> f64 {
        let dt = now.saturating_duration_since(self.last_predict_time).as_micros() as f64 / 1e6;
        self.last_predict_time = self.last_predict_time.max(now);

        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        let dt4 = dt3 * dt;
        let dt5 = dt4 * dt;
        let dt6 = dt5 * dt;

        #[rustfmt::skip]
        let F = Matrix3::new(
            1.0, dt,  dt2 / 2.0,
            0.0, 1.0, dt,
            0.0, 0.0, 1.0,
        );

        #[rustfmt::skip]
        let Q = Matrix3::new(
            dt6 / 36.0, dt5 / 12.0, dt4 / 6.0,
            dt5 / 12.0, dt4 / 4.0,  dt3 / 2.0,
            dt4 / 6.0,  dt3 / 2.0,  dt2,
        ) * q;

        self.x = F * self.x;
        self.P = F * self.P * F.transpose() + Q;

        dt
    }

    /// Scalar measurement update observing state `idx` directly with
    /// noise variance `R`. Returns the pre-fit residual.
    fn fuse(&mut self, idx: usize, z: f64, R: f64) -> f64 {
        let y = z - self.x[idx];
        let S_inv = 1.0 / (self.P[(idx, idx)] + R);
        let K: Vector3<f64> = self.P.column(idx) * S_inv;

        self.x += K * y;

        // P -= K P[idx, :]
        let P_row = self.P.row(idx).into_owned();
        self.P -= K * P_row;

        y
    }

    fn state(&self) -> EstimatorState {
        EstimatorState {
            x: self.x.into(),
            p: core::array::from_fn(|r| core::array::from_fn(|c| self.P[(r, c)])),
            last_predict_time: self.last_predict_time,
        }
    }
}

/// Thread-safe vertical state estimator fusing barometric altitude and
/// accelerometer readings.
///
/// Sensor tasks call [`new_pressure`](Self::new_pressure) and
/// [`new_accels`](Self::new_accels) at their own rate, the mission calls
/// [`get_state`](Self::get_state) once per tick. Prediction only happens
/// on read, so time simply accumulates between reads. Every operation
/// holds the filter lock for a fixed amount of arithmetic.
pub struct KalmanEstimator<'a, T: TelemetrySink = ()> {
    name: &'static str,
    config: &'a ConfigStore,
    tuning: EstimatorConfig,
    trust: DataCell<TrustFlags>,
    filter: Mutex<CriticalSectionRawMutex, RefCell<FilterState>>,
    rejected: AtomicU32,
    telemetry: T,
}

impl<'a, T: TelemetrySink> KalmanEstimator<'a, T> {
    pub fn new(config: &'a ConfigStore, telemetry: T, now: Instant) -> Self {
        Self::with_tuning(config, telemetry, EstimatorConfig::default(), now)
    }

    pub fn with_tuning(config: &'a ConfigStore, telemetry: T, tuning: EstimatorConfig, now: Instant) -> Self {
        Self {
            name: "estimator",
            config,
            tuning,
            trust: DataCell::new(TrustFlags::new()),
            filter: Mutex::new(RefCell::new(FilterState::new(now))),
            rejected: AtomicU32::new(0),
            telemetry,
        }
    }

    pub fn trust_flags(&self) -> TrustFlags {
        self.trust.read()
    }

    pub fn set_trust_barometer(&self, trust: bool) {
        self.trust.modify(|flags| flags.trust_barometer = trust);
    }

    pub fn set_dynamic_event_expected(&self, expected: bool) {
        self.trust.modify(|flags| flags.dynamic_event_expected = expected);
    }

    /// Number of samples discarded because they could not be used.
    pub fn rejected_samples(&self) -> u32 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Copy of the full filter belief, without predicting.
    pub fn snapshot(&self) -> EstimatorState {
        self.filter.lock(|filter| filter.borrow().state())
    }

    /// Predict up to the current time and return the estimate.
    pub fn get_state(&self) -> StateEstimate {
        self.get_state_at(Instant::now())
    }

    /// Predict up to `now` and return the estimate. A `now` earlier than
    /// the last prediction counts as zero elapsed time.
    pub fn get_state_at(&self, now: Instant) -> StateEstimate {
        let q = match self.trust.read().dynamic_event_expected {
            true => self.tuning.q_dynamic,
            false => self.tuning.q_nominal,
        };

        self.filter.lock(|filter| {
            let mut filter = filter.borrow_mut();
            let dt = filter.predict(now, q);

            let state = filter.state();

            filter.predictions = filter.predictions.saturating_add(1);
            if self.tuning.telemetry_divider != 0 && filter.predictions >= self.tuning.telemetry_divider {
                filter.predictions = 0;
                self.emit(dt, &state);
            }

            state.estimate()
        })
    }

    /// Fuse a barometer reading of `pressure` ± `rms` [Pa].
    ///
    /// The noise variance is the squared altitude span of the pressure's
    /// error band at the current altitude. Ignored while the barometer is
    /// not trusted. Rejected, leaving the estimate untouched, if any of the
    /// conversions fall outside the atmosphere model or are not finite.
    pub fn new_pressure(&self, pressure: f64, rms: f64) -> Result<Update, M3fcError> {
        if !self.trust.read().trust_barometer {
            return Ok(Update::Ignored);
        }

        let altitudes = pressure_to_altitude(pressure).and_then(|h| {
            let h_plus = pressure_to_altitude(pressure + rms)?;
            let h_minus = pressure_to_altitude(pressure - rms)?;
            Ok((h, h_plus, h_minus))
        });

        let (h, h_plus, h_minus) = match altitudes {
            Ok(altitudes) => altitudes,
            Err(error) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                return Err(SensorFault::from(error).into());
            }
        };

        let R = (h_minus - h_plus).powi(2);
        let innovation = self.filter.lock(|filter| filter.borrow_mut().fuse(ALT, h, R));

        Ok(Update::Fused { innovation })
    }

    /// Fuse an accelerometer sample, `accels` in the body frame [m/s^2],
    /// from a sensor with full-scale `max` and noise `rms`.
    ///
    /// The configured axis gives the vertical component. Samples whose
    /// overall magnitude is close to 1 g are fused as zero acceleration
    /// with an rms of 1 g, and readings beyond full scale have their rms
    /// inflated by the excess. Non-finite values are rejected.
    pub fn new_accels(&self, accels: [f64; 3], max: f64, rms: f64) -> Result<Update, M3fcError> {
        let axis = match self.config.read().profile.accel_axis() {
            Ok(axis) => axis,
            Err(error) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                return Err(error.into());
            }
        };

        if !accels.iter().chain([&max, &rms]).all(|a| a.is_finite()) {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(SensorFault::NonFinite.into());
        }

        let up = axis.up_component(accels);
        let overall = Vector3::from(accels).norm();

        let (a_meas, rms) = if (overall - GRAVITY).abs() < ONE_G_AMBIGUITY {
            (0.0, GRAVITY)
        } else if up.abs() > max {
            (up - GRAVITY, rms + (up.abs() - max))
        } else {
            (up - GRAVITY, rms)
        };

        let innovation = self.filter.lock(|filter| filter.borrow_mut().fuse(ACC, a_meas, rms * rms));

        Ok(Update::Fused { innovation })
    }

    fn emit(&self, dt: f64, state: &EstimatorState) {
        let [h, v, a] = state.x;
        let [var_h, var_v, var_a] = state.variances();
        trace!("[{}] dt={} h={} v={} a={}", self.name, dt, h, v, a);

        self.telemetry.send_telemetry(Telemetry::TimeAltitude { dt, h });
        self.telemetry.send_telemetry(Telemetry::VelocityAccel { v, a });
        self.telemetry.send_telemetry(Telemetry::VarAltitude { var_h });
        self.telemetry.send_telemetry(Telemetry::VarVelocityAccel { var_v, var_a });
    }
}
