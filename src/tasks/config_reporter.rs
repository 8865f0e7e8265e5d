use embassy_time::{Duration, Ticker};

use crate::{
    consts::CONFIG_REPORT_MS,
    hw_abstraction::TelemetrySink,
    signals::{self as s, Bus},
    types::{config::ConfigStore, telemetry::Telemetry},
};

#[embassy_executor::task]
pub async fn config_reporter_task() -> ! {
    main(&s::CONFIG, Bus).await
}

/// Periodically broadcast the active configuration.
pub async fn main(config: &ConfigStore, sink: impl TelemetrySink) -> ! {
    const ID: &str = "config_reporter";
    info!("[{}] Task started", ID);

    let mut ticker = Ticker::every(Duration::from_millis(CONFIG_REPORT_MS));
    loop {
        ticker.next().await;
        report(config, &sink);
    }
}

pub fn report(config: &ConfigStore, sink: &impl TelemetrySink) {
    sink.send_telemetry(Telemetry::Config(config.read()));
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::{cell::RefCell, vec::Vec};

    use super::*;
    use crate::types::config::Configuration;

    #[derive(Default)]
    struct Sink(RefCell<Vec<Telemetry>>);

    impl TelemetrySink for Sink {
        fn send_telemetry(&self, telemetry: Telemetry) {
            self.0.borrow_mut().push(telemetry);
        }
    }

    #[test]
    fn reports_the_current_snapshot() {
        let config = ConfigStore::new(Configuration::DEFAULT);
        let sink = Sink::default();

        report(&config, &sink);
        config.modify(|c| c.profile.main_altitude = 30);
        report(&config, &sink);

        let sent = sink.0.borrow();
        assert_eq!(sent[0], Telemetry::Config(Configuration::DEFAULT));
        let Telemetry::Config(latest) = sent[1] else {
            panic!("Expected a config report");
        };
        assert_eq!(latest.profile.main_altitude(), 300.0);
    }
}
