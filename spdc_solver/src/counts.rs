//! Absolute pair and singles rates of a joint spectrum.
//!
//! The spectrum is normalised to one at perfect phase matching, so the
//! physical scale (nonlinearity, pump power, mode areas) enters through a
//! single prefactor per rate.

use std::f64::consts::{LN_2, PI};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    integrator::Integrator,
    joint_spectrum::JointSpectrum,
    spaces::FrequencySpace,
    spdc::{BeamRole, SPDC},
    units::{frequency_bandwidth, C, EPSILON_0},
};

/// Coincidence and singles rates (1/s) with the heralding efficiencies they imply.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Efficiencies {
    /// `R_c / sqrt(R_s R_i)`
    pub symmetric: f64,
    /// Probability of detecting the signal given an idler, `R_c / R_i`
    pub signal: f64,
    /// Probability of detecting the idler given a signal, `R_c / R_s`
    pub idler: f64,
    pub coincidences: f64,
    pub signal_singles: f64,
    pub idler_singles: f64,
}

impl Efficiencies {
    fn new(coincidences: f64, signal_singles: f64, idler_singles: f64) -> Self {
        let ratio = |singles: f64| {
            if singles > 0.0 {
                coincidences / singles
            } else {
                0.0
            }
        };
        Self {
            symmetric: ratio((signal_singles * idler_singles).sqrt()),
            signal: ratio(idler_singles),
            idler: ratio(signal_singles),
            coincidences,
            signal_singles,
            idler_singles,
        }
    }
}

/// `\int |\alpha(\omega)|^2 d\omega` of the Gaussian pump envelope
fn pump_spectral_integral(spdc: &SPDC) -> f64 {
    let bandwidth = frequency_bandwidth(spdc.pump().wavelength(), spdc.pump_bandwidth());
    bandwidth * (PI / (4.0 * LN_2)).sqrt()
}

/// Squared overlap of the pump profile with unit power signal and idler
/// modes, per unit pump area
fn coincidence_inverse_area(spdc: &SPDC) -> f64 {
    let p = spdc.pump().waist().powi(2);
    let s = spdc.signal().waist().powi(2);
    let i = spdc.idler().waist().powi(2);
    8.0 * p * s * i / (PI * (s * i + p * i + p * s).powi(2))
}

/// As [`coincidence_inverse_area`], summed over every idler mode
fn singles_inverse_area(spdc: &SPDC) -> f64 {
    let p = spdc.pump().waist().powi(2);
    let s = spdc.signal().waist().powi(2);
    2.0 / (PI * (p + s))
}

/// Rate per unit squared bandwidth of a unit joint spectrum.
///
/// ```latex
/// \mathcal{N} = \frac{d_\mathrm{eff}^2 P L^2 \omega_s \omega_i}
///     {4 \pi \epsilon_0 c^3 n_p n_s n_i A \int |\alpha(\omega)|^2 d\omega}
/// ```
fn rate_prefactor(spdc: &SPDC, inverse_area: f64) -> f64 {
    let (omega_s, omega_i) = (spdc.signal().frequency(), spdc.idler().frequency());
    let indices = spdc.refractive_index(BeamRole::Pump, spdc.pump().frequency())
        * spdc.refractive_index(BeamRole::Signal, omega_s)
        * spdc.refractive_index(BeamRole::Idler, omega_i);
    let length = spdc.crystal().length;
    let deff = spdc.deff();
    deff * deff * spdc.pump_average_power() * length * length * omega_s * omega_i * inverse_area
        / (4.0 * PI * EPSILON_0 * C.powi(3) * indices * pump_spectral_integral(spdc))
}

/// `sum_jk v_jk w_j w_k` for values laid out row major over `space`
fn weighted_sum<I: Integrator>(integrator: &I, space: &FrequencySpace, values: &[f64]) -> f64 {
    let signal_weights = integrator.sample_weights(&space.signal());
    let idler_weights = integrator.sample_weights(&space.idler());
    let n = idler_weights.len();
    values
        .iter()
        .enumerate()
        .map(|(index, v)| v * signal_weights[index / n] * idler_weights[index % n])
        .sum()
}

impl<I: Integrator + Sync> JointSpectrum<I> {
    /// Pairs per second detected in coincidence over `space`.
    ///
    /// ```latex
    /// R_c = \mathcal{N}_c \iint |\alpha(\omega_s + \omega_i) \Phi(\omega_s, \omega_i)|^2
    ///     d\omega_s d\omega_i
    /// ```
    #[must_use]
    pub fn counts_coincidences(&self, space: &FrequencySpace) -> f64 {
        let spdc = self.spdc();
        let jsi = self.jsi_range(space);
        rate_prefactor(spdc, coincidence_inverse_area(spdc))
            * weighted_sum(self.integrator(), space, &jsi)
    }

    /// Signal photons per second, with the idler collected in any mode.
    #[must_use]
    pub fn counts_singles_signal(&self, space: &FrequencySpace) -> f64 {
        let spdc = self.spdc();
        let jsi = self.jsi_singles_range(space);
        rate_prefactor(spdc, singles_inverse_area(spdc))
            * weighted_sum(self.integrator(), space, &jsi)
    }
}

impl<I: Integrator + Sync + Clone> JointSpectrum<I> {
    /// Idler photons per second, with the signal collected in any mode.
    #[must_use]
    pub fn counts_singles_idler(&self, space: &FrequencySpace) -> f64 {
        JointSpectrum::new(
            self.spdc().with_swapped_signal_idler(),
            self.integrator().clone(),
        )
        .counts_singles_signal(&space.swapped())
    }

    #[must_use]
    pub fn efficiencies(&self, space: &FrequencySpace) -> Efficiencies {
        let coincidences = self.counts_coincidences(space);
        let signal_singles = self.counts_singles_signal(space);
        let idler_singles = self.counts_singles_idler(space);
        log::debug!(
            "rates: coincidences {coincidences:e}/s, singles {signal_singles:e}/s and {idler_singles:e}/s"
        );
        Efficiencies::new(coincidences, signal_singles, idler_singles)
    }
}
