//! Free function entry points over a configuration.
//!
//! Each function forwards to the matching method on [`SPDC`] or to the
//! analysis modules, building a [`JointSpectrum`] snapshot where needed.

use crate::{
    error::{OptimizeError, Result},
    hom::{self, HomTwoSourceResult},
    integrator::{Integrator, Quadrature},
    joint_spectrum::JointSpectrum,
    spaces::FrequencySpace,
    spdc::{OptimizeOutcome, SPDC},
};

pub use crate::dispersion::lookup_material;
pub use crate::schmidt::schmidt_number;

/// Longitudinal phase mismatch (rad/m) with the pump at `omega_s + omega_i`.
#[must_use]
pub fn delta_k(spdc: &SPDC, omega_s: f64, omega_i: f64) -> f64 {
    spdc.delta_k(omega_s, omega_i)
}

/// # Errors
///
/// Returns [`crate::SpdcError::Domain`] if `n` is zero.
pub fn optimum_range(spdc: &SPDC, n: usize) -> Result<FrequencySpace> {
    spdc.optimum_range(n)
}

#[must_use]
pub fn joint_spectrum<I: Integrator + Sync>(spdc: &SPDC, integrator: I) -> JointSpectrum<I> {
    spdc.joint_spectrum(integrator)
}

#[must_use]
pub fn hom_two_source_visibilities<I: Integrator + Sync>(
    spdc: &SPDC,
    space: &FrequencySpace,
    integrator: I,
) -> HomTwoSourceResult {
    hom::hom_two_source_visibilities(&spdc.joint_spectrum(integrator), space)
}

/// Single source coincidence probability at each delay, using the default
/// [`Quadrature`].
#[must_use]
pub fn hom_rate_series(spdc: &SPDC, delays: &[f64], space: &FrequencySpace) -> Vec<f64> {
    hom::hom_rate_series(&spdc.joint_spectrum(Quadrature::default()), delays, space)
}

/// # Errors
///
/// Returns the [`OptimizeError`] of a failed search, leaving `spdc` untouched.
pub fn to_optimum(spdc: &mut SPDC) -> std::result::Result<OptimizeOutcome, OptimizeError> {
    spdc.to_optimum()
}

pub fn try_as_optimum(spdc: &mut SPDC) -> OptimizeOutcome {
    spdc.try_as_optimum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dispersion::DispersionFormula, error::SpdcError};

    #[test]
    fn test_entry_points_agree_with_methods() {
        let spdc = SPDC::default();
        let (ws, wi) = (spdc.signal().frequency(), spdc.idler().frequency());
        assert_eq!(delta_k(&spdc, ws, wi), spdc.delta_k(ws, wi));
        assert_eq!(
            optimum_range(&spdc, 11).unwrap(),
            spdc.optimum_range(11).unwrap()
        );
        assert!(matches!(optimum_range(&spdc, 0), Err(SpdcError::Domain(_))));

        let space = spdc.optimum_range(11).unwrap();
        let rates = hom_rate_series(&spdc, &[0.0, 1e-12], &space);
        assert_eq!(rates.len(), 2);

        let result = hom_two_source_visibilities(&spdc, &space, Quadrature::default());
        assert!((0.0..=1.0 + 1e-6).contains(&result.ss.visibility));
    }

    #[test]
    fn test_optimum_entry_points() {
        let mut spdc = SPDC::default();
        assert!(try_as_optimum(&mut spdc).is_optimal());
        assert_eq!(spdc, SPDC::default());
        assert!(to_optimum(&mut spdc).is_ok());
    }

    #[test]
    fn test_lookup_material() {
        assert!(matches!(
            lookup_material("KTP"),
            Ok(DispersionFormula::Builtin(_))
        ));
        assert!(matches!(
            lookup_material("unobtainium"),
            Err(SpdcError::UnknownMaterial(_))
        ));
    }
}
