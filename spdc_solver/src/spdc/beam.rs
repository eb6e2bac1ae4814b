use crate::units::{frequency_from_wavelength, wavelength_from_frequency};

use super::crystal::unit_vector;

/// A Gaussian beam inside the crystal.
///
/// `theta` and `phi` give the internal propagation direction in the lab frame,
/// `waist_position` the longitudinal position of the focus relative to the
/// crystal centre (m).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beam {
    pub(crate) frequency: f64,
    pub(crate) waist: f64,
    pub(crate) theta: f64,
    pub(crate) phi: f64,
    pub(crate) waist_position: f64,
}

impl Beam {
    pub(crate) fn new(wavelength: f64, waist: f64) -> Self {
        Beam {
            frequency: frequency_from_wavelength(wavelength),
            waist,
            theta: 0.0,
            phi: 0.0,
            waist_position: 0.0,
        }
    }

    /// Angular frequency (rad/s)
    #[must_use]
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Vacuum wavelength (m)
    #[must_use]
    pub fn wavelength(&self) -> f64 {
        wavelength_from_frequency(self.frequency)
    }

    /// 1/e^2 intensity radius at the focus (m)
    #[must_use]
    pub fn waist(&self) -> f64 {
        self.waist
    }

    #[must_use]
    pub fn theta(&self) -> f64 {
        self.theta
    }

    #[must_use]
    pub fn phi(&self) -> f64 {
        self.phi
    }

    #[must_use]
    pub fn waist_position(&self) -> f64 {
        self.waist_position
    }

    #[inline]
    #[must_use]
    pub fn direction(&self) -> [f64; 3] {
        unit_vector(self.theta, self.phi)
    }

    /// Rayleigh range for a wavenumber `k` in the medium
    #[inline]
    #[must_use]
    pub fn rayleigh_range(&self, k: f64) -> f64 {
        0.5 * k * self.waist * self.waist
    }
}
