use std::f64::consts::LN_2;

use ndarray::Array2;
use num_complex::Complex;

use crate::{
    error::Result,
    integrator::{Integrator, Quadrature},
    parallel,
    spaces::{FrequencySpace, IntoSignalIdlerIterator},
    spdc::SPDC,
    units::frequency_bandwidth,
};

/// The joint spectral amplitude of a configuration.
///
/// The spectrum owns a snapshot of the configuration, so it never observes
/// later changes to the [`SPDC`] it was built from.
#[derive(Debug, Clone)]
pub struct JointSpectrum<I = Quadrature> {
    spdc: SPDC,
    integrator: I,
    /// Amplitude at the central frequencies
    norm: f64,
}

impl<I: Integrator + Sync> JointSpectrum<I> {
    #[must_use]
    pub fn new(spdc: SPDC, integrator: I) -> Self {
        let mut spectrum = Self {
            spdc,
            integrator,
            norm: 1.0,
        };
        spectrum.norm = spectrum
            .jsa(spectrum.spdc.signal().frequency(), spectrum.spdc.idler().frequency())
            .norm();
        spectrum
    }

    #[must_use]
    pub fn spdc(&self) -> &SPDC {
        &self.spdc
    }

    #[must_use]
    pub fn integrator(&self) -> &I {
        &self.integrator
    }

    /// Pump spectral amplitude at the sum frequency, one at the pump centre.
    ///
    /// ```latex
    /// \alpha(\omega) = \exp\left(-2 \ln 2 (\omega - \omega_p)^2 / \Delta\omega^2\right)
    /// ```
    /// so that the intensity has a FWHM of `Delta omega`. Amplitudes below the
    /// spectrum threshold are returned as zero.
    #[must_use]
    pub fn pump_spectrum(&self, omega_s: f64, omega_i: f64) -> f64 {
        let pump = self.spdc.pump();
        let bandwidth = frequency_bandwidth(pump.wavelength(), self.spdc.pump_bandwidth());
        let detuning = omega_s + omega_i - pump.frequency();
        let alpha = (-2.0 * LN_2 * detuning * detuning / (bandwidth * bandwidth)).exp();
        if alpha < self.spdc.pump_spectrum_threshold() {
            0.0
        } else {
            alpha
        }
    }

    #[must_use]
    pub fn jsa(&self, omega_s: f64, omega_i: f64) -> Complex<f64> {
        let alpha = self.pump_spectrum(omega_s, omega_i);
        if alpha == 0.0 {
            return Complex::new(0.0, 0.0);
        }
        alpha * self.spdc.phasematch(omega_s, omega_i, &self.integrator)
    }

    #[must_use]
    pub fn jsi(&self, omega_s: f64, omega_i: f64) -> f64 {
        self.jsa(omega_s, omega_i).norm_sqr()
    }

    /// Amplitude relative to the amplitude at the central frequencies
    #[must_use]
    pub fn jsa_normalized(&self, omega_s: f64, omega_i: f64) -> Complex<f64> {
        let jsa = self.jsa(omega_s, omega_i);
        if self.norm > 0.0 {
            jsa / self.norm
        } else {
            jsa
        }
    }

    #[must_use]
    pub fn jsi_normalized(&self, omega_s: f64, omega_i: f64) -> f64 {
        self.jsa_normalized(omega_s, omega_i).norm_sqr()
    }

    /// Amplitude for signal singles, with the idler collected unfiltered
    #[must_use]
    pub fn jsa_singles(&self, omega_s: f64, omega_i: f64) -> Complex<f64> {
        let alpha = self.pump_spectrum(omega_s, omega_i);
        if alpha == 0.0 {
            return Complex::new(0.0, 0.0);
        }
        alpha * self.spdc.phasematch_singles(omega_s, omega_i, &self.integrator)
    }

    #[must_use]
    pub fn jsi_singles(&self, omega_s: f64, omega_i: f64) -> f64 {
        self.jsa_singles(omega_s, omega_i).norm_sqr()
    }

    /// The amplitude at each point, in the order of `range`
    pub fn jsa_range<T: IntoSignalIdlerIterator>(&self, range: T) -> Vec<Complex<f64>> {
        let points = range.into_signal_idler_vec();
        parallel::map(&points, |&(omega_s, omega_i)| self.jsa(omega_s, omega_i))
    }

    pub fn jsi_range<T: IntoSignalIdlerIterator>(&self, range: T) -> Vec<f64> {
        self.jsa_range(range).iter().map(Complex::norm_sqr).collect()
    }

    /// Intensities scaled so that the largest in `range` is one
    pub fn jsi_normalized_range<T: IntoSignalIdlerIterator>(&self, range: T) -> Vec<f64> {
        let mut jsi = self.jsi_range(range);
        let max = jsi.iter().copied().fold(0.0, f64::max);
        if max > 0.0 {
            jsi.iter_mut().for_each(|v| *v /= max);
        }
        jsi
    }

    pub fn jsi_singles_range<T: IntoSignalIdlerIterator>(&self, range: T) -> Vec<f64> {
        let points = range.into_signal_idler_vec();
        parallel::map(&points, |&(omega_s, omega_i)| {
            self.jsi_singles(omega_s, omega_i)
        })
    }

    /// Amplitudes on `space`, indexed `[signal, idler]`
    #[must_use]
    pub fn jsa_matrix(&self, space: &FrequencySpace) -> Array2<Complex<f64>> {
        let values = self.jsa_range(space);
        Array2::from_shape_vec(space.shape(), values)
            .expect("one amplitude per point of the row-major grid")
    }

    #[must_use]
    pub fn jsi_matrix(&self, space: &FrequencySpace) -> Array2<f64> {
        self.jsa_matrix(space).mapv(|v| v.norm_sqr())
    }
}

impl SPDC {
    #[must_use]
    pub fn joint_spectrum<I: Integrator + Sync>(&self, integrator: I) -> JointSpectrum<I> {
        JointSpectrum::new(self.clone(), integrator)
    }

    /// An `n` x `n` frequency space around the central frequencies holding
    /// the bulk of the joint spectrum.
    ///
    /// Along the anti-diagonal it reaches the fourth zero of the phase matching
    /// function, estimated from the local slope and curvature of `Delta k`.
    /// Along the diagonal it adds twice the pump bandwidth.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SpdcError::Domain`] if `n` is zero.
    pub fn optimum_range(&self, n: usize) -> Result<FrequencySpace> {
        let omega_s = self.signal().frequency();
        let omega_i = self.idler().frequency();
        let mismatch = |delta: f64| self.delta_k(omega_s + delta, omega_i - delta);

        let h = 1e-4 * omega_s;
        let (plus, centre, minus) = (mismatch(h), mismatch(0.0), mismatch(-h));
        let slope = ((plus - minus) / (2.0 * h)).abs();
        let curvature = ((plus - 2.0 * centre + minus) / (h * h)).abs();

        let length = self
            .apodization()
            .effective_length(self.crystal().length);
        let target = 8.0 * std::f64::consts::PI / length;
        let phase_matching = if curvature > 0.0 {
            (-slope + (slope * slope + 2.0 * curvature * target).sqrt()) / curvature
        } else if slope > 0.0 {
            target / slope
        } else {
            log::debug!("flat phase mismatch, falling back to a 5% range");
            0.05 * omega_s.min(omega_i)
        };
        let pump = self.pump();
        let pump_width = 2.0 * frequency_bandwidth(pump.wavelength(), self.pump_bandwidth());

        let half_width =
            (phase_matching + 0.5 * pump_width).min(0.9 * omega_s.min(omega_i));
        log::debug!(
            "optimum range half width {half_width:e} rad/s (phase matching {phase_matching:e})"
        );
        FrequencySpace::from_center((omega_s, half_width), (omega_i, half_width), n)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{
        integrator::{IntegrationMethod, Simpson},
        spaces::{Steps, SumDiffFrequencySpace},
    };

    #[test]
    fn test_maximum_at_phase_matching() {
        let spdc = SPDC::default();
        let spectrum = spdc.joint_spectrum(Simpson::default());
        let (ws, wi) = (spdc.signal().frequency(), spdc.idler().frequency());
        let space = FrequencySpace::from_center((ws, 2e13), (wi, 2e13), 11).unwrap();
        let jsi = spectrum.jsi_matrix(&space);
        let centre = jsi[[5, 5]];
        assert!(jsi.iter().all(|&v| v <= centre));
        assert_relative_eq!(spectrum.jsi_normalized(ws, wi), 1.0, max_relative = 1e-12);
        // Falls off monotonically along the anti-diagonal
        for k in 0..5 {
            assert!(jsi[[5 + k + 1, 5 - k - 1]] < jsi[[5 + k, 5 - k]]);
        }
    }

    #[test]
    fn test_spectrum_is_a_snapshot() {
        let mut spdc = SPDC::default();
        let spectrum = spdc.joint_spectrum(IntegrationMethod::default().integrator());
        let (ws, wi) = (spdc.signal().frequency(), spdc.idler().frequency());
        let before = spectrum.jsa(ws + 1e13, wi - 1e13);
        spdc.set_crystal_theta(0.2).unwrap();
        assert_eq!(spectrum.jsa(ws + 1e13, wi - 1e13), before);
        // A fresh spectrum sees the change
        let changed = spdc.joint_spectrum(Simpson::default());
        assert!(changed.jsi(ws, wi) < 0.1 * spectrum.jsi(ws, wi));
    }

    #[test]
    fn test_pump_threshold_zeroes_far_points() {
        let spdc = SPDC::default();
        let spectrum = spdc.joint_spectrum(Simpson::default());
        let (ws, wi) = (spdc.signal().frequency(), spdc.idler().frequency());
        assert_eq!(spectrum.pump_spectrum(ws + 1e15, wi), 0.0);
        assert_eq!(spectrum.jsa(ws + 1e15, wi), Complex::new(0.0, 0.0));
        assert_relative_eq!(spectrum.pump_spectrum(ws, wi), 1.0);
    }

    #[test]
    fn test_ranges_agree_with_points() {
        let spdc = SPDC::default();
        let spectrum = spdc.joint_spectrum(Simpson::default());
        let space = spdc.optimum_range(5).unwrap();
        let matrix = spectrum.jsa_matrix(&space);
        for (index, (ws, wi)) in space.into_signal_idler_iterator().enumerate() {
            assert_eq!(matrix[[index / 5, index % 5]], spectrum.jsa(ws, wi));
        }
        let normalized = spectrum.jsi_normalized_range(&space);
        assert_relative_eq!(normalized.iter().copied().fold(0.0, f64::max), 1.0);

        let sum_diff = SumDiffFrequencySpace::new(
            Steps::new(0.99 * spdc.pump().frequency(), 1.01 * spdc.pump().frequency(), 3).unwrap(),
            Steps::new(-1e13, 1e13, 3).unwrap(),
        )
        .unwrap();
        assert_eq!(spectrum.jsi_range(sum_diff).len(), 9);
    }

    #[test]
    fn test_matrix_on_rectangular_space() {
        let spdc = SPDC::default();
        let spectrum = spdc.joint_spectrum(Simpson::default());
        let square = spdc.optimum_range(5).unwrap();
        let space =
            FrequencySpace::new(square.signal(), square.idler().with_len(7).unwrap()).unwrap();
        let matrix = spectrum.jsa_matrix(&space);
        assert_eq!(matrix.dim(), (5, 7));
        let (ws, wi) = (space.signal().value(3), space.idler().value(6));
        assert_eq!(matrix[[3, 6]], spectrum.jsa(ws, wi));
        assert!(matrix.iter().any(|v| v.norm() > 0.0));
    }

    #[test]
    fn test_optimum_range_contains_support() {
        let spdc = SPDC::default();
        let space = spdc.optimum_range(31).unwrap();
        let (low, high) = space.signal().bounds();
        let ws = spdc.signal().frequency();
        assert_relative_eq!(0.5 * (low + high), ws, max_relative = 1e-12);
        // Beyond the first phase matching zero, within the pump carrier
        assert!(high - ws > 3e13);
        assert!(low > 0.0);

        let spectrum = spdc.joint_spectrum(Simpson::default());
        let edge = spectrum.jsi_normalized(high, spdc.idler().frequency() - (high - ws));
        assert!(edge < 1e-2);

        assert!(spdc.optimum_range(0).is_err());
    }

    #[test]
    fn test_singles_match_coincidences_at_centre() {
        let mut spdc = SPDC::default();
        spdc.set_theta(crate::spdc::BeamRole::Signal, 0.0).unwrap();
        let spectrum = spdc.joint_spectrum(Simpson::default());
        let (ws, wi) = (spdc.signal().frequency(), spdc.idler().frequency());
        assert_relative_eq!(
            spectrum.jsi_singles(ws, wi),
            spectrum.jsi(ws, wi),
            max_relative = 1e-2
        );
    }
}
