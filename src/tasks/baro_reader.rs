use embassy_time::{Duration, Timer};

use crate::{
    errors::{Debounce, M3fcError},
    estimators::vertical_kalman::{KalmanEstimator, Update},
    hw_abstraction::{Barometer, FaultSink, TelemetrySink},
};

/// Wait before retrying a barometer that failed to deliver.
const RETRY: Duration = Duration::from_millis(100);

pub async fn main(mut baro: impl Barometer, estimator: &KalmanEstimator<'_, impl TelemetrySink>, faults: impl FaultSink) -> ! {
    const ID: &str = "baro_reader";
    info!("[{}] Task started", ID);

    let mut debounce = Debounce::new(Duration::from_secs(1));

    loop {
        if let Err(M3fcError::Device(_)) = step(&mut baro, estimator, &faults, &mut debounce).await {
            Timer::after(RETRY).await;
        }
    }
}

/// Read one sample and hand it to the estimator. Faults are reported to
/// `faults` and returned.
pub async fn step(
    baro: &mut impl Barometer,
    estimator: &KalmanEstimator<'_, impl TelemetrySink>,
    faults: &impl FaultSink,
    debounce: &mut Debounce<M3fcError>,
) -> Result<Update, M3fcError> {
    let result = match baro.read_pressure().await {
        Ok(sample) => estimator.new_pressure(sample.pressure, sample.rms),
        Err(error) => Err(error.into()),
    };

    if let Err(error) = result {
        if let Some(error) = debounce.evaluate(error) {
            warn!("[baro_reader] Sample rejected: {:?}", error);
        }
        faults.report(error);
    }

    result
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::{cell::RefCell, collections::VecDeque, vec::Vec};

    use embassy_time::Instant;
    use futures_executor::block_on;

    use super::*;
    use crate::{
        errors::{AtmosphereError, DeviceError, SensorFault},
        estimators::atmosphere::altitude_to_pressure,
        types::{
            config::{ConfigStore, Configuration},
            measurements::PressureSample,
        },
    };

    struct FakeBaro(VecDeque<Result<PressureSample, DeviceError>>);

    impl Barometer for FakeBaro {
        async fn read_pressure(&mut self) -> Result<PressureSample, DeviceError> {
            self.0.pop_front().unwrap_or(Err(DeviceError::Timeout { millis: 10 }))
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
    fn samples_reach_the_estimator() {
        let config = ConfigStore::new(Configuration::DEFAULT);
        let estimator = KalmanEstimator::new(&config, (), Instant::from_millis(0));
        let faults = Faults::default();
        let mut debounce = Debounce::new(Duration::from_secs(1));

        let pressure = altitude_to_pressure(120.0).unwrap();
        let mut baro = FakeBaro(VecDeque::from([
            Ok(PressureSample { pressure, rms: 6.5 }),
            Ok(PressureSample { pressure: 1.0, rms: 6.5 }),
            Err(DeviceError::Bus),
        ]));

        let update = block_on(step(&mut baro, &estimator, &faults, &mut debounce));
        assert!(matches!(update, Ok(Update::Fused { .. })));
        assert!(estimator.snapshot().x[0] > 0.0);

        let rejected = block_on(step(&mut baro, &estimator, &faults, &mut debounce));
        assert!(matches!(
            rejected,
            Err(M3fcError::Sensor(SensorFault::Pressure(AtmosphereError::OutOfRange { .. })))
        ));

        let failed = block_on(step(&mut baro, &estimator, &faults, &mut debounce));
        assert_eq!(failed, Err(M3fcError::Device(DeviceError::Bus)));

        let reported = faults.0.borrow();
        assert_eq!(reported.len(), 2);
        assert_eq!(reported[1], M3fcError::Device(DeviceError::Bus));
        assert_eq!(estimator.rejected_samples(), 1);
    }

    #[test]
    fn untrusted_samples_are_not_faults() {
        let config = ConfigStore::new(Configuration::DEFAULT);
        let estimator = KalmanEstimator::new(&config, (), Instant::from_millis(0));
        estimator.set_trust_barometer(false);
        let faults = Faults::default();
        let mut debounce = Debounce::new(Duration::from_secs(1));

        let mut baro = FakeBaro(VecDeque::from([Ok(PressureSample { pressure: 90_000.0, rms: 6.5 })]));
        let update = block_on(step(&mut baro, &estimator, &faults, &mut debounce));

        assert_eq!(update, Ok(Update::Ignored));
        assert!(faults.0.borrow().is_empty());
    }
}
