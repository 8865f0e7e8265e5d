//! US Standard Atmosphere 1976, for converting static pressure to
//! geopotential altitude.

#[allow(unused_imports)]
use num_traits::Float;

use crate::errors::AtmosphereError;

/// Universal gas constant [J/(mol K)]
const RS: f64 = 8.31432;
/// Standard gravity [m/s^2]
const G0: f64 = crate::consts::GRAVITY;
/// Molar mass of dry air [kg/mol]
const M: f64 = 0.0289644;

/// Base values for one layer of the reference atmosphere.
#[derive(Debug, Clone, Copy)]
struct Layer {
    /// Temperature lapse rate [K/m]
    lapse: f64,
    /// Base pressure [Pa]
    pressure: f64,
    /// Base temperature [K]
    temperature: f64,
    /// Base geopotential height [m]
    height: f64,
}

const fn layer(lapse: f64, pressure: f64, temperature: f64, height: f64) -> Layer {
    Layer {
        lapse,
        pressure,
        temperature,
        height,
    }
}

const LAYERS: [Layer; 7] = [
    layer(-0.0065, 101325.0, 288.15, 0.0),
    layer(0.0, 22632.10, 216.65, 11000.0),
    layer(0.001, 5474.89, 216.65, 20000.0),
    layer(0.0028, 868.02, 228.65, 32000.0),
    layer(0.0, 110.91, 270.65, 47000.0),
    layer(-0.0028, 66.94, 270.65, 51000.0),
    layer(-0.002, 3.96, 214.65, 71000.0),
];

/// Convert a static pressure [Pa] into an altitude [m].
///
/// Pressures above sea-level standard are extrapolated down through the
/// lowest layer. Pressures at or below the base of the top layer, or that
/// are not finite, are out of range.
pub fn pressure_to_altitude(pressure: f64) -> Result<f64, AtmosphereError> {
    if !pressure.is_finite() {
        return Err(AtmosphereError::OutOfRange { pressure });
    }

    if pressure > LAYERS[0].pressure {
        return Ok(nonzero_lapse_altitude(pressure, &LAYERS[0]));
    }

    LAYERS
        .windows(2)
        .find(|pair| pressure <= pair[0].pressure && pressure > pair[1].pressure)
        .map(|pair| {
            let base = &pair[0];
            if base.lapse == 0.0 {
                zero_lapse_altitude(pressure, base)
            } else {
                nonzero_lapse_altitude(pressure, base)
            }
        })
        .ok_or(AtmosphereError::OutOfRange { pressure })
}

/// Convert an altitude [m] into the standard static pressure [Pa].
///
/// This is the exact inverse of [`pressure_to_altitude`] over the range
/// that function accepts.
pub fn altitude_to_pressure(altitude: f64) -> Result<f64, AtmosphereError> {
    if altitude < LAYERS[0].height {
        return Ok(nonzero_lapse_pressure(altitude, &LAYERS[0]));
    }

    LAYERS
        .windows(2)
        .find(|pair| altitude >= pair[0].height && altitude < pair[1].height)
        .map(|pair| {
            let base = &pair[0];
            if base.lapse == 0.0 {
                zero_lapse_pressure(altitude, base)
            } else {
                nonzero_lapse_pressure(altitude, base)
            }
        })
        .ok_or(AtmosphereError::AltitudeOutOfRange { altitude })
}

// Inverts P = Pb (Tb / (Tb + Lb (h - Hb)))^(g0 M / (Rs Lb))
fn nonzero_lapse_altitude(pressure: f64, base: &Layer) -> f64 {
    let exponent = (-RS * base.lapse) / (G0 * M);
    base.height + base.temperature / base.lapse * ((pressure / base.pressure).powf(exponent) - 1.0)
}

// Inverts P = Pb exp(-g0 M (h - Hb) / (Rs Tb))
fn zero_lapse_altitude(pressure: f64, base: &Layer) -> f64 {
    base.height - (RS * base.temperature) / (G0 * M) * (pressure / base.pressure).ln()
}

fn nonzero_lapse_pressure(altitude: f64, base: &Layer) -> f64 {
    let exponent = -(G0 * M) / (RS * base.lapse);
    base.pressure * (1.0 + base.lapse * (altitude - base.height) / base.temperature).powf(exponent)
}

fn zero_lapse_pressure(altitude: f64, base: &Layer) -> f64 {
    base.pressure * (-(G0 * M) * (altitude - base.height) / (RS * base.temperature)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sea_level_is_zero() {
        assert_relative_eq!(pressure_to_altitude(101325.0).unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn layer_bases_map_to_their_heights() {
        for base in &LAYERS[..6] {
            let h = pressure_to_altitude(base.pressure).unwrap();
            assert_relative_eq!(h, base.height, epsilon = 1e-6, max_relative = 1e-9);
        }
    }

    #[test]
    fn round_trip_within_every_layer() {
        for pair in LAYERS.windows(2) {
            let (lo, hi) = (pair[0].height, pair[1].height);
            let margin = 0.01 * (hi - lo);
            for step in 0..=20 {
                let h = lo + margin + (hi - lo - 2.0 * margin) * step as f64 / 20.0;
                let p = altitude_to_pressure(h).unwrap();
                let back = pressure_to_altitude(p).unwrap();
                assert_relative_eq!(back, h, epsilon = 1e-6, max_relative = 1e-10);
            }
        }
    }

    #[test]
    fn isothermal_layers_rise_above_their_base() {
        // 11-20 km and 47-51 km have zero lapse rate
        let h = pressure_to_altitude(16777.0).unwrap();
        assert!(h > 11000.0 && h < 20000.0, "16777 Pa gave {} m", h);
        assert_relative_eq!(h, 12900.0, epsilon = 5.0);

        let h = pressure_to_altitude(90.0).unwrap();
        assert!(h > 47000.0 && h < 51000.0, "90 Pa gave {} m", h);
    }

    #[test]
    fn below_ground_extrapolates_layer_zero() {
        for h in [-10.0, -250.0, -1000.0] {
            let p = altitude_to_pressure(h).unwrap();
            assert!(p > 101325.0);
            assert_relative_eq!(pressure_to_altitude(p).unwrap(), h, epsilon = 1e-6);
        }
    }

    #[test]
    fn altitude_increases_as_pressure_drops() {
        let mut previous = pressure_to_altitude(105000.0).unwrap();
        let mut pressure = 100000.0;
        while pressure > 5.0 {
            let h = pressure_to_altitude(pressure).unwrap();
            assert!(h > previous, "{} Pa gave {} m, not above {} m", pressure, h, previous);
            previous = h;
            pressure *= 0.8;
        }
    }

    #[test]
    fn implausible_pressures_are_rejected() {
        for pressure in [3.96, 1.0, 0.0, -5.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                pressure_to_altitude(pressure),
                Err(AtmosphereError::OutOfRange { .. })
            ));
        }
    }

    #[test]
    fn altitude_above_model_is_rejected() {
        assert!(matches!(
            altitude_to_pressure(71000.0),
            Err(AtmosphereError::AltitudeOutOfRange { .. })
        ));
    }
}
