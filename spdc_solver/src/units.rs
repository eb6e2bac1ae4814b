//! Physical constants and unit conversions.
//!
//! Everything inside the engine is SI: angular frequency in rad/s, lengths in
//! metres, temperatures in kelvin and angles in radians.

use std::f64::consts::PI;

/// Speed of light (m/s)
pub const C: f64 = 299_792_458.0;

/// Vacuum permittivity (F/m)
pub const EPSILON_0: f64 = 8.854_187_812_8e-12;

/// Offset between the Celsius and Kelvin scales
pub const ZERO_CELSIUS: f64 = 273.15;

pub const NANO: f64 = 1e-9;
pub const MICRO: f64 = 1e-6;
pub const MILLI: f64 = 1e-3;

/// Vacuum wavelength (m) of light with angular frequency `omega` (rad/s)
#[inline]
#[must_use]
pub fn wavelength_from_frequency(omega: f64) -> f64 {
    2.0 * PI * C / omega
}

/// Angular frequency (rad/s) of light with vacuum wavelength `lambda` (m)
#[inline]
#[must_use]
pub fn frequency_from_wavelength(lambda: f64) -> f64 {
    2.0 * PI * C / lambda
}

/// A wavelength bandwidth `delta_lambda` around `lambda` as an angular frequency bandwidth
#[inline]
#[must_use]
pub fn frequency_bandwidth(lambda: f64, delta_lambda: f64) -> f64 {
    2.0 * PI * C * delta_lambda / (lambda * lambda)
}

#[inline]
#[must_use]
pub fn celsius_to_kelvin(t: f64) -> f64 {
    t + ZERO_CELSIUS
}

#[inline]
#[must_use]
pub fn kelvin_to_celsius(t: f64) -> f64 {
    t - ZERO_CELSIUS
}
