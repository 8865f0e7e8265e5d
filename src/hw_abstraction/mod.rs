use crate::errors::{DeviceError, M3fcError};
use crate::types::{
    measurements::{AccelSample, PressureSample},
    pyro::PyroFireRequest,
    telemetry::Telemetry,
};

#[allow(async_fn_in_trait)]
pub trait Barometer {
    /// Wait for and return the next pressure sample.
    async fn read_pressure(&mut self) -> Result<PressureSample, DeviceError>;
}

#[allow(async_fn_in_trait)]
pub trait Accelerometer {
    /// Wait for and return the next acceleration sample.
    async fn read_accels(&mut self) -> Result<AccelSample, DeviceError>;
}

/// Destination for scalar telemetry broadcasts. Must not block.
pub trait TelemetrySink {
    fn send_telemetry(&self, telemetry: Telemetry);
}

/// The pyro subsystem. Requests are fire-and-forget.
pub trait PyroSink {
    fn fire(&self, request: PyroFireRequest);
}

/// Destination for non-fatal fault signals. Must not block.
pub trait FaultSink {
    fn report(&self, fault: M3fcError);
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for &T {
    fn send_telemetry(&self, telemetry: Telemetry) {
        (**self).send_telemetry(telemetry)
    }
}

impl<T: PyroSink + ?Sized> PyroSink for &T {
    fn fire(&self, request: PyroFireRequest) {
        (**self).fire(request)
    }
}

impl<T: FaultSink + ?Sized> FaultSink for &T {
    fn report(&self, fault: M3fcError) {
        (**self).report(fault)
    }
}

/// Discards telemetry, for estimators that nobody listens to.
impl TelemetrySink for () {
    fn send_telemetry(&self, _telemetry: Telemetry) {}
}
