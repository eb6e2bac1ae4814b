use ndarray::{Array1, Array2};
use ndarray_linalg::Norm;
#[cfg(feature = "decomposition")]
use ndarray_linalg::{EigValsh, UPLO};
use num_complex::Complex;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "decomposition")]
use crate::error::Result;
use crate::{
    error::NumericalInstabilityWarning, integrator::Integrator, joint_spectrum::JointSpectrum,
    spaces::FrequencySpace,
};

/// Reduced density matrix of the signal, `rho = F F^dagger`
fn reduced_density_matrix(jsa: &Array2<Complex<f64>>) -> Array2<Complex<f64>> {
    jsa.dot(&jsa.t().mapv(|v| v.conj()))
}

/// A Schmidt number together with any sign that the sampled spectrum was
/// degenerate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchmidtNumber {
    pub value: f64,
    pub warning: Option<NumericalInstabilityWarning>,
}

/// Schmidt number of the sampled joint spectral amplitude.
///
/// ```latex
/// K = \frac{(\mathrm{Tr}\,\rho)^2}{\mathrm{Tr}\,\rho^2}, \quad \rho = F F^\dagger
/// ```
/// which equals `1 / sum_i p_i^2` for the Schmidt probabilities `p_i`. A
/// vanishing spectrum has no correlations to count and gives one.
#[must_use]
pub fn schmidt_number<I: Integrator + Sync>(
    spectrum: &JointSpectrum<I>,
    space: &FrequencySpace,
) -> f64 {
    checked_schmidt_number(spectrum, space).value
}

/// As [`schmidt_number`], also returning a warning when the spectrum vanishes
/// or the result falls below one.
#[must_use]
pub fn checked_schmidt_number<I: Integrator + Sync>(
    spectrum: &JointSpectrum<I>,
    space: &FrequencySpace,
) -> SchmidtNumber {
    schmidt_number_of(&spectrum.jsa_matrix(space))
}

pub(crate) fn schmidt_number_of(jsa: &Array2<Complex<f64>>) -> SchmidtNumber {
    let trace = jsa.norm_l2().powi(2);
    if trace == 0.0 {
        return SchmidtNumber {
            value: 1.0,
            warning: NumericalInstabilityWarning::check(
                "spectrum norm",
                trace,
                (f64::MIN_POSITIVE, f64::INFINITY),
                0.0,
            ),
        };
    }
    let purity_trace = reduced_density_matrix(jsa).norm_l2().powi(2);
    let k = trace * trace / purity_trace;
    SchmidtNumber {
        value: k.max(1.0),
        warning: NumericalInstabilityWarning::check(
            "schmidt number",
            k,
            (1.0, f64::INFINITY),
            1e-9,
        ),
    }
}

/// Schmidt probabilities of a joint spectrum, in decreasing order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SchmidtDecomposition {
    pub probabilities: Array1<f64>,
}

impl SchmidtDecomposition {
    /// `sum_i p_i^2`
    #[must_use]
    pub fn purity(&self) -> f64 {
        self.probabilities.iter().map(|p| p * p).sum()
    }

    #[must_use]
    pub fn schmidt_number(&self) -> f64 {
        let purity = self.purity();
        if purity > 0.0 {
            (1.0 / purity).max(1.0)
        } else {
            1.0
        }
    }
}

/// Decompose the sampled spectrum into Schmidt modes, returning their weights.
///
/// # Errors
///
/// Returns [`crate::SpdcError::Linalg`] if the eigenvalue solver fails.
#[cfg(feature = "decomposition")]
pub fn schmidt_decomposition<I: Integrator + Sync>(
    spectrum: &JointSpectrum<I>,
    space: &FrequencySpace,
) -> Result<SchmidtDecomposition> {
    schmidt_decomposition_of(&spectrum.jsa_matrix(space))
}

#[cfg(feature = "decomposition")]
pub(crate) fn schmidt_decomposition_of(
    jsa: &Array2<Complex<f64>>,
) -> Result<SchmidtDecomposition> {
    // rho is Hermitian with eigenvalues |s_i|^2, returned in ascending order
    let eigenvalues = reduced_density_matrix(jsa).eigvalsh(UPLO::Lower)?;
    let weights = eigenvalues
        .iter()
        .rev()
        .map(|v| v.max(0.0))
        .collect::<Array1<f64>>();
    let total = weights.sum();
    let probabilities = if total > 0.0 {
        weights / total
    } else {
        weights
    };
    Ok(SchmidtDecomposition { probabilities })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{apodization::Apodization, integrator::Simpson, spdc::SPDC};

    fn get_spdc_with_bandwidth(bandwidth: f64) -> SPDC {
        let mut spdc = SPDC::default();
        spdc.set_pump_bandwidth(bandwidth).unwrap();
        spdc
    }

    #[test]
    fn test_separable_spectrum() {
        let f = Array2::from_shape_fn((6, 4), |(i, j)| {
            Complex::new((i + 1) as f64, 0.5) * Complex::new(1.0, -(j as f64))
        });
        let k = schmidt_number_of(&f);
        assert_relative_eq!(k.value, 1.0, max_relative = 1e-12);
        assert!(k.warning.is_none());
    }

    #[test]
    fn test_maximally_entangled() {
        let f = Array2::from_shape_fn((5, 5), |(i, j)| {
            if i == j {
                Complex::new(0.0, 1.0)
            } else {
                Complex::new(0.0, 0.0)
            }
        });
        assert_relative_eq!(schmidt_number_of(&f).value, 5.0, max_relative = 1e-12);
    }

    #[test]
    fn test_vanishing_spectrum() {
        let f = Array2::<Complex<f64>>::zeros((3, 3));
        let k = schmidt_number_of(&f);
        assert_eq!(k.value, 1.0);
        assert_eq!(k.warning.map(|w| w.quantity), Some("spectrum norm"));
    }

    #[test]
    fn test_corrupted_spectrum_is_flagged() {
        let mut f = Array2::from_elem((4, 4), Complex::new(1.0, 0.0));
        f[[1, 2]] = Complex::new(f64::NAN, 0.0);
        let k = schmidt_number_of(&f);
        assert_eq!(k.value, 1.0);
        let warning = k.warning.unwrap();
        assert_eq!(warning.quantity, "schmidt number");
        assert!(warning.value.is_nan());
    }

    #[test]
    fn test_probabilities_give_schmidt_number() {
        let decomposition = SchmidtDecomposition {
            probabilities: Array1::from(vec![0.5, 0.25, 0.25]),
        };
        assert_relative_eq!(decomposition.purity(), 0.375);
        assert_relative_eq!(decomposition.schmidt_number(), 8.0 / 3.0);
        let empty = SchmidtDecomposition {
            probabilities: Array1::zeros(2),
        };
        assert_eq!(empty.schmidt_number(), 1.0);
    }

    #[test]
    fn test_schmidt_number_at_least_one() {
        for bandwidth in [1e-9, 5.35e-9] {
            let spdc = get_spdc_with_bandwidth(bandwidth);
            let space = spdc.optimum_range(21).unwrap();
            let k = schmidt_number(&spdc.joint_spectrum(Simpson::default()), &space);
            assert!(k >= 1.0);
        }
    }

    #[test]
    fn test_apodization_increases_schmidt_number() {
        let mut spdc = get_spdc_with_bandwidth(3e-9);
        let space = spdc.optimum_range(41).unwrap();
        let plain = schmidt_number(&spdc.joint_spectrum(Simpson::default()), &space);
        assert_relative_eq!(plain, 3.11, max_relative = 2e-2);

        spdc.set_apodization(Apodization::Gaussian {
            fwhm: 0.25 * spdc.crystal().length,
        })
        .unwrap();
        let apodized = schmidt_number(&spdc.joint_spectrum(Simpson::default()), &space);
        assert!(apodized > 2.0 * plain, "{apodized} vs {plain}");
    }

    #[test]
    fn test_wider_pump_is_less_entangled() {
        let space = get_spdc_with_bandwidth(3e-9).optimum_range(41).unwrap();
        let narrow = get_spdc_with_bandwidth(3e-9);
        let wide = get_spdc_with_bandwidth(5.35e-9);
        let k_narrow = schmidt_number(&narrow.joint_spectrum(Simpson::default()), &space);
        let k_wide = schmidt_number(&wide.joint_spectrum(Simpson::default()), &space);
        assert!(k_wide < k_narrow);
        assert_relative_eq!(k_wide, 1.88, max_relative = 2e-2);
    }

    #[cfg(feature = "decomposition")]
    #[test]
    fn test_decomposition_of_known_states() {
        let separable = Array2::from_shape_fn((6, 4), |(i, j)| {
            Complex::new((i + 1) as f64, 0.5) * Complex::new(1.0, -(j as f64))
        });
        let decomposition = schmidt_decomposition_of(&separable).unwrap();
        assert_relative_eq!(decomposition.probabilities[0], 1.0, max_relative = 1e-10);

        let entangled = Array2::from_shape_fn((5, 5), |(i, j)| {
            if i == j {
                Complex::new(0.0, 1.0)
            } else {
                Complex::new(0.0, 0.0)
            }
        });
        let decomposition = schmidt_decomposition_of(&entangled).unwrap();
        assert_relative_eq!(decomposition.schmidt_number(), 5.0, max_relative = 1e-10);

        let vanishing = Array2::<Complex<f64>>::zeros((3, 3));
        assert_eq!(
            schmidt_decomposition_of(&vanishing).unwrap().schmidt_number(),
            1.0
        );
    }

    #[cfg(feature = "decomposition")]
    #[test]
    fn test_decomposition_matches_trace_formula() {
        let spdc = get_spdc_with_bandwidth(3e-9);
        let space = spdc.optimum_range(15).unwrap();
        let spectrum = spdc.joint_spectrum(Simpson::default());
        let decomposition = schmidt_decomposition(&spectrum, &space).unwrap();
        assert_relative_eq!(decomposition.probabilities.sum(), 1.0, max_relative = 1e-12);
        assert!(decomposition
            .probabilities
            .windows(2)
            .into_iter()
            .all(|w| w[0] >= w[1]));
        assert_relative_eq!(
            decomposition.schmidt_number(),
            schmidt_number(&spectrum, &space),
            max_relative = 1e-8
        );
    }
}
