use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Instant, Ticker};

use crate::{
    estimators::vertical_kalman::KalmanEstimator,
    hw_abstraction::{FaultSink, PyroSink, TelemetrySink},
    mission::MissionStateMachine,
    signals::{self as s, Bus},
};

#[embassy_executor::task]
pub async fn mission_task(estimator: &'static KalmanEstimator<'static, Bus>) -> ! {
    let mission = MissionStateMachine::new(estimator, &s::CONFIG, &s::PYRO_STATUS, Bus, Instant::now());
    main(mission).await
}

/// Tick the mission at its fixed rate, and broadcast the phase on every
/// heartbeat in between.
pub async fn main<E, O>(mut mission: MissionStateMachine<'_, E, O>) -> !
where
    E: TelemetrySink,
    O: TelemetrySink + PyroSink + FaultSink,
{
    const ID: &str = "mission";
    info!("[{}] Task started", ID);

    let mut ticker = Ticker::every(Duration::from_millis(mission.tuning().tick_ms));
    let mut heartbeat = Ticker::every(Duration::from_millis(mission.tuning().heartbeat_ms));

    loop {
        match select(ticker.next(), heartbeat.next()).await {
            Either::First(()) => {
                mission.tick(Instant::now());
            }
            Either::Second(()) => mission.heartbeat(Instant::now()),
        }
    }
}
