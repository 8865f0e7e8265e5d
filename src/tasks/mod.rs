use embassy_time::Instant;
use static_cell::StaticCell;

use crate::{estimators::vertical_kalman::KalmanEstimator, signals as s, signals::Bus};

pub mod accel_reader;
pub mod baro_reader;
pub mod config_reporter;
pub mod mission;

static ESTIMATOR: StaticCell<KalmanEstimator<'static, Bus>> = StaticCell::new();

/// Create the process-wide estimator, reading [`s::CONFIG`] and sending
/// telemetry on the [`Bus`]. Returns `None` if it already exists.
pub fn init_estimator(now: Instant) -> Option<&'static KalmanEstimator<'static, Bus>> {
    let estimator = ESTIMATOR.try_init(KalmanEstimator::new(&s::CONFIG, Bus, now))?;
    Some(estimator)
}
