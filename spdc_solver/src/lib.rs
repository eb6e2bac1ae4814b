#![warn(clippy::pedantic)]

pub mod apodization;
pub mod api;
pub mod counts;
pub mod dispersion;
pub mod error;
pub mod hom;
pub mod integrator;
pub mod joint_spectrum;
mod parallel;
pub mod schmidt;
pub mod spaces;
pub mod spdc;
pub mod units;

pub use apodization::{Apodization, PeriodicPoling};
pub use dispersion::{lookup_material, DispersionFormula, MaterialRegistry, Polarization};
pub use counts::Efficiencies;
pub use error::{FormulaError, NumericalInstabilityWarning, OptimizeError, SpdcError};
pub use hom::{HomProfile, HomTwoSourceRates, HomTwoSourceResult, HomVisibility};
pub use integrator::{IntegrationMethod, Integrator, Quadrature};
pub use joint_spectrum::JointSpectrum;
pub use schmidt::{SchmidtDecomposition, SchmidtNumber};
pub use spaces::{FrequencySpace, Steps, SumDiffFrequencySpace, WavelengthSpace};
pub use spdc::{BeamRole, CrystalKind, OptimizeOutcome, OptimizerSettings, PMType, SPDC};

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::{
        hom::hom_two_source_visibilities,
        integrator::Simpson,
        schmidt::schmidt_number,
        spdc::{OptimizerSettings, SPDC},
        units::NANO,
    };

    pub(crate) fn get_default_spdc() -> SPDC {
        SPDC::default()
    }

    /// A non degenerate configuration re-phase-matched after moving the signal
    pub(crate) fn get_nondegenerate_spdc() -> SPDC {
        let mut spdc = get_default_spdc();
        spdc.set_crystal_theta(0.5).unwrap();
        spdc.set_wavelength(crate::spdc::BeamRole::Signal, 1500.0 * NANO)
            .unwrap();
        spdc.to_optimum_with(&OptimizerSettings::default()).unwrap();
        spdc
    }

    #[test]
    fn test_optimized_nondegenerate_spectrum() {
        let spdc = get_nondegenerate_spdc();
        assert!(spdc.is_energy_conserving(1e-9));
        let (ws, wi) = (spdc.signal().frequency(), spdc.idler().frequency());
        assert!(spdc.delta_k(ws, wi).abs() * spdc.crystal().length < 1e-5);

        let space = spdc.optimum_range(31).unwrap();
        let spectrum = spdc.joint_spectrum(Simpson::default());
        assert!(schmidt_number(&spectrum, &space) >= 1.0);

        let result = hom_two_source_visibilities(&spectrum, &space);
        for visibility in [result.ss, result.ii] {
            assert!((0.0..=1.0 + 1e-6).contains(&visibility.visibility));
        }
        assert_relative_eq!(
            result.ss.visibility,
            result.ii.visibility,
            max_relative = 1e-8
        );
    }
}
