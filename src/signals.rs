//! Process-wide channels connecting the flight core to the transport.
//!
//! Producers never wait on these. When a channel is full the newest
//! message is dropped and counted.

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex as M, channel::Channel};
use portable_atomic::{AtomicU32, Ordering};

use crate::{
    errors::M3fcError,
    hw_abstraction::{FaultSink, PyroSink, TelemetrySink},
    sync::data_cell::DataCell,
    types::{
        config::{ConfigStore, Configuration},
        pyro::{PyroFireRequest, PyroStatus},
        telemetry::Telemetry,
    },
};

const TELEMETRY_LEN: usize = 32;
const PYRO_LEN: usize = 4;
const ERR_LEN: usize = 8;

/// Outgoing telemetry, drained by the telemetry transport.
pub static TELEMETRY: Channel<M, Telemetry, TELEMETRY_LEN> = Channel::new();

/// Fire requests, drained by the pyro board link.
pub static PYRO_REQUESTS: Channel<M, PyroFireRequest, PYRO_LEN> = Channel::new();

/// Channel for all non-fatal faults to be published to.
pub static ERR_CHANNEL: Channel<M, M3fcError, ERR_LEN> = Channel::new();

/// The active configuration, written by the configuration store.
pub static CONFIG: ConfigStore = ConfigStore::new(Configuration::DEFAULT);

/// Latest pyro board status, written by the pyro board link.
pub static PYRO_STATUS: DataCell<PyroStatus> = DataCell::new(PyroStatus::new());

static DROPPED_ERRORS: AtomicU32 = AtomicU32::new(0);
static DROPPED_TELEMETRY: AtomicU32 = AtomicU32::new(0);
static DROPPED_PYRO_REQUESTS: AtomicU32 = AtomicU32::new(0);

/// Immediately publish an error to the global error channel.
pub fn register_error(error: impl Into<M3fcError>) {
    if ERR_CHANNEL.try_send(error.into()).is_err() {
        DROPPED_ERRORS.fetch_add(1, Ordering::Relaxed);
    }
}

/// Number of faults lost to a full [`ERR_CHANNEL`].
pub fn dropped_errors() -> u32 {
    DROPPED_ERRORS.load(Ordering::Relaxed)
}

/// Number of messages lost to a full [`TELEMETRY`] channel.
pub fn dropped_telemetry() -> u32 {
    DROPPED_TELEMETRY.load(Ordering::Relaxed)
}

/// Number of fire requests lost to a full [`PYRO_REQUESTS`] channel.
pub fn dropped_pyro_requests() -> u32 {
    DROPPED_PYRO_REQUESTS.load(Ordering::Relaxed)
}

/// The channel-backed collaborator, for use on the flight computer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bus;

impl TelemetrySink for Bus {
    fn send_telemetry(&self, telemetry: Telemetry) {
        if TELEMETRY.try_send(telemetry).is_err() {
            DROPPED_TELEMETRY.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl PyroSink for Bus {
    fn fire(&self, request: PyroFireRequest) {
        if PYRO_REQUESTS.try_send(request).is_err() {
            error!("[bus] Pyro request queue full, dropped {:?}", request.usage);
            DROPPED_PYRO_REQUESTS.fetch_add(1, Ordering::Relaxed);
            register_error(M3fcError::PyroRequestDropped { usage: request.usage });
        }
    }
}

impl FaultSink for Bus {
    fn report(&self, fault: M3fcError) {
        register_error(fault);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::{ConfigError, SensorFault},
        types::pyro::PyroUsage,
    };

    // The channels are global, so everything touching them lives in one test
    #[test]
    fn bus_publishes_and_counts_drops() {
        let bus = Bus;

        bus.report(ConfigError::InvalidAccelAxis(0).into());
        assert_eq!(ERR_CHANNEL.try_receive(), Ok(M3fcError::Config(ConfigError::InvalidAccelAxis(0))));

        for _ in 0..ERR_LEN {
            register_error(SensorFault::NonFinite);
        }
        assert_eq!(dropped_errors(), 0);
        register_error(SensorFault::NonFinite);
        assert_eq!(dropped_errors(), 1);
        while ERR_CHANNEL.try_receive().is_ok() {}

        bus.send_telemetry(Telemetry::VarAltitude { var_h: 1.0 });
        assert_eq!(TELEMETRY.try_receive(), Ok(Telemetry::VarAltitude { var_h: 1.0 }));
        for _ in 0..=TELEMETRY_LEN {
            bus.send_telemetry(Telemetry::VarAltitude { var_h: 2.0 });
        }
        assert_eq!(dropped_telemetry(), 1);
        while TELEMETRY.try_receive().is_ok() {}

        bus.fire(PyroFireRequest::default());
        assert_eq!(PYRO_REQUESTS.try_receive(), Ok(PyroFireRequest::default()));

        // A dropped fire request is counted and surfaces as a fault
        let drogue = PyroFireRequest {
            usage: Some(PyroUsage::Drogue),
            ..PyroFireRequest::default()
        };
        for _ in 0..PYRO_LEN {
            bus.fire(drogue);
        }
        assert_eq!(dropped_pyro_requests(), 0);
        bus.fire(drogue);
        assert_eq!(dropped_pyro_requests(), 1);
        assert_eq!(
            ERR_CHANNEL.try_receive(),
            Ok(M3fcError::PyroRequestDropped { usage: Some(PyroUsage::Drogue) })
        );
        while PYRO_REQUESTS.try_receive().is_ok() {}
    }
}
