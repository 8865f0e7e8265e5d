use embassy_time::{Duration, Timer};

use crate::{
    errors::{Debounce, M3fcError},
    estimators::vertical_kalman::{KalmanEstimator, Update},
    hw_abstraction::{Accelerometer, FaultSink, TelemetrySink},
};

const RETRY: Duration = Duration::from_millis(100);

pub async fn main(
    mut accel: impl Accelerometer,
    estimator: &KalmanEstimator<'_, impl TelemetrySink>,
    faults: impl FaultSink,
) -> ! {
    const ID: &str = "accel_reader";
    info!("[{}] Task started", ID);

    let mut debounce = Debounce::new(Duration::from_secs(1));

    loop {
        if let Err(M3fcError::Device(_)) = step(&mut accel, estimator, &faults, &mut debounce).await {
            Timer::after(RETRY).await;
        }
    }
}

/// Read one sample and hand it to the estimator.
pub async fn step(
    accel: &mut impl Accelerometer,
    estimator: &KalmanEstimator<'_, impl TelemetrySink>,
    faults: &impl FaultSink,
    debounce: &mut Debounce<M3fcError>,
) -> Result<Update, M3fcError> {
    let result = match accel.read_accels().await {
        Ok(sample) => estimator.new_accels(sample.accels, sample.max, sample.rms),
        Err(error) => Err(error.into()),
    };

    if let Err(error) = result {
        if let Some(error) = debounce.evaluate(error) {
            warn!("[accel_reader] Sample rejected: {:?}", error);
        }
        faults.report(error);
    }

    result
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::{cell::RefCell, vec::Vec};

    use embassy_time::Instant;
    use futures_executor::block_on;

    use super::*;
    use crate::{
        consts::GRAVITY,
        errors::{ConfigError, DeviceError},
        types::{
            config::{ConfigStore, Configuration},
            measurements::AccelSample,
        },
    };

    struct FakeAccel(AccelSample);

    impl Accelerometer for FakeAccel {
        async fn read_accels(&mut self) -> Result<AccelSample, DeviceError> {
            Ok(self.0)
        }
    }

    #[derive(Default)]
    struct Faults(RefCell<Vec<M3fcError>>);

    impl FaultSink for Faults {
        fn report(&self, fault: M3fcError) {
            self.0.borrow_mut().push(fault);
        }
    }

    #[test]
    fn axis_faults_are_reported_every_sample() {
        let mut config = Configuration::DEFAULT;
        config.profile.accel_axis = 9;
        let config = ConfigStore::new(config);
        let estimator = KalmanEstimator::new(&config, (), Instant::from_millis(0));
        let faults = Faults::default();
        let mut debounce = Debounce::new(Duration::from_secs(60));

        let mut accel = FakeAccel(AccelSample {
            accels: [0.0, 0.0, 3.0 * GRAVITY],
            max: 156.96,
            rms: 10.01,
        });

        for _ in 0..3 {
            let result = block_on(step(&mut accel, &estimator, &faults, &mut debounce));
            assert_eq!(result, Err(M3fcError::Config(ConfigError::InvalidAccelAxis(9))));
        }
        assert_eq!(faults.0.borrow().len(), 3);
        assert_eq!(estimator.snapshot().x, [0.0; 3]);

        config.modify(|c| c.profile.accel_axis = 5);
        let result = block_on(step(&mut accel, &estimator, &faults, &mut debounce));
        assert!(matches!(result, Ok(Update::Fused { .. })));
        assert!(estimator.snapshot().x[2] > 0.0);
    }
}
