use std::f64::consts::{LN_2, PI};

use crate::error::{ensure_positive, Result, SpdcError};

/// Longitudinal profile of the nonlinear coefficient along the crystal.
///
/// The window functions take a parameter `a`, the fraction of the crystal length
/// covered by the window. Outside the window the profile is zero. `Gaussian`
/// takes a full width at half maximum in metres. `Interpolate` holds samples
/// spread evenly from the input face to the output face.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Apodization {
    #[default]
    Off,
    Gaussian {
        fwhm: f64,
    },
    Bartlett(f64),
    Blackman(f64),
    Connes(f64),
    Cosine(f64),
    Hamming(f64),
    Welch(f64),
    Interpolate(Vec<f64>),
}

impl Apodization {
    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] for non-positive widths or parameters, and
    /// for interpolation tables with fewer than two (finite) samples.
    pub fn validate(&self) -> Result<()> {
        match self {
            Apodization::Off => Ok(()),
            Apodization::Gaussian { fwhm } => ensure_positive("apodization fwhm", *fwhm).map(|_| ()),
            Apodization::Bartlett(a)
            | Apodization::Blackman(a)
            | Apodization::Connes(a)
            | Apodization::Cosine(a)
            | Apodization::Hamming(a)
            | Apodization::Welch(a) => ensure_positive("apodization parameter", *a).map(|_| ()),
            Apodization::Interpolate(values) => {
                if values.len() < 2 {
                    return Err(SpdcError::Domain(
                        "interpolated apodization needs at least two samples".to_owned(),
                    ));
                }
                if values.iter().any(|v| !v.is_finite()) {
                    return Err(SpdcError::Domain(
                        "interpolated apodization samples must be finite".to_owned(),
                    ));
                }
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn is_off(&self) -> bool {
        matches!(self, Apodization::Off)
    }

    /// Relative nonlinearity at position `z` (m) in a crystal of `length`,
    /// with `z = 0` at the crystal centre.
    #[inline]
    #[must_use]
    pub fn value(&self, z: f64, length: f64) -> f64 {
        let window = |a: f64, f: fn(f64) -> f64| {
            let u = 2.0 * z / (a * length);
            if u.abs() > 1.0 {
                0.0
            } else {
                f(u)
            }
        };
        match self {
            Apodization::Off => 1.0,
            Apodization::Gaussian { fwhm } => (-4.0 * LN_2 * z * z / (fwhm * fwhm)).exp(),
            Apodization::Bartlett(a) => window(*a, |u| 1.0 - u.abs()),
            Apodization::Blackman(a) => window(*a, |u| {
                0.42 + 0.5 * (PI * u).cos() + 0.08 * (2.0 * PI * u).cos()
            }),
            Apodization::Connes(a) => window(*a, |u| (1.0 - u * u).powi(2)),
            Apodization::Cosine(a) => window(*a, |u| (0.5 * PI * u).cos()),
            Apodization::Hamming(a) => window(*a, |u| 0.54 + 0.46 * (PI * u).cos()),
            Apodization::Welch(a) => window(*a, |u| 1.0 - u * u),
            Apodization::Interpolate(values) => interpolate(values, z / length + 0.5),
        }
    }

    /// Length over which the profile is appreciable, used to size spectral ranges.
    #[must_use]
    pub fn effective_length(&self, length: f64) -> f64 {
        let effective = match self {
            Apodization::Off | Apodization::Interpolate(_) => length,
            Apodization::Gaussian { fwhm } => *fwhm,
            Apodization::Bartlett(a)
            | Apodization::Blackman(a)
            | Apodization::Connes(a)
            | Apodization::Cosine(a)
            | Apodization::Hamming(a)
            | Apodization::Welch(a) => 0.5 * a * length,
        };
        effective.min(length)
    }
}

/// Linear interpolation of evenly spaced `values` at `t` in `[0, 1]`
fn interpolate(values: &[f64], t: f64) -> f64 {
    if !(0.0..=1.0).contains(&t) || values.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let position = t * (values.len() - 1) as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let index = (position.floor() as usize).min(values.len().saturating_sub(2));
    let Some(next) = values.get(index + 1) else {
        return values[index];
    };
    #[allow(clippy::cast_precision_loss)]
    let fraction = position - index as f64;
    values[index] * (1.0 - fraction) + next * fraction
}

/// Quasi phase matching by periodic inversion of the nonlinear coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PeriodicPoling {
    #[default]
    Off,
    /// Poling period in metres, with the sign giving the direction of the grating vector
    On { period: f64 },
}

impl PeriodicPoling {
    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] if `period` is zero or not finite.
    pub fn new(period: f64) -> Result<Self> {
        if period.is_finite() && period != 0.0 {
            Ok(PeriodicPoling::On { period })
        } else {
            Err(SpdcError::Domain(format!(
                "poling period must be finite and non-zero, got {period}"
            )))
        }
    }

    /// Grating wavevector `2 pi / period` (rad/m), zero without poling
    #[inline]
    #[must_use]
    pub fn grating_wavevector(&self) -> f64 {
        match self {
            PeriodicPoling::Off => 0.0,
            PeriodicPoling::On { period } => 2.0 * PI / period,
        }
    }

    #[must_use]
    pub fn period(&self) -> Option<f64> {
        match self {
            PeriodicPoling::Off => None,
            PeriodicPoling::On { period } => Some(*period),
        }
    }
}
