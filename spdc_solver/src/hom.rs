//! Hong-Ou-Mandel interference of photons from one or two sources.
//!
//! Every quantity here is a weighted sum over the sampled joint spectral
//! amplitude. The weights come from [`Integrator::sample_weights`] of the
//! spectrum's integrator, so the choice of rule also controls how the
//! frequency grid is reduced.

use std::f64::consts::PI;

use ndarray::{Array1, Array2, ArrayView2};
use num_complex::Complex;
use rustfft::FftPlanner;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    error::{NumericalInstabilityWarning, Result, SpdcError},
    integrator::Integrator,
    joint_spectrum::JointSpectrum,
    parallel,
    spaces::{FrequencySpace, SignalIdlerFrequencyArray, Steps},
};

const GOLDEN_SECTION_ITERATIONS: usize = 80;
const COARSE_SAMPLES_PER_POINT: usize = 4;
const VISIBILITY_TOLERANCE: f64 = 1e-6;

/// Extremum of an interference curve and the delay (s) it occurs at.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HomVisibility {
    pub time: f64,
    pub visibility: f64,
    /// Set when the visibility falls outside `[0, 1]`
    #[cfg_attr(feature = "serde", serde(skip))]
    pub warning: Option<NumericalInstabilityWarning>,
}

impl HomVisibility {
    fn checked(quantity: &'static str, time: f64, visibility: f64) -> Self {
        Self {
            time,
            visibility,
            warning: NumericalInstabilityWarning::check(
                quantity,
                visibility,
                (0.0, 1.0),
                VISIBILITY_TOLERANCE,
            ),
        }
    }
}

/// Visibilities for interfering two signals, two idlers, or a signal and an
/// idler, each photon taken from an independent but identical source.
#[derive(Debug, Clone, PartialEq)]
pub struct HomTwoSourceResult {
    pub ss: HomVisibility,
    pub ii: HomVisibility,
    pub si: HomVisibility,
    pub warnings: Vec<NumericalInstabilityWarning>,
}

/// Coincidence probabilities against delay for each two source pairing.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HomTwoSourceRates {
    pub ss: Vec<f64>,
    pub ii: Vec<f64>,
    pub si: Vec<f64>,
}

/// Coincidence probability on the uniform delay grid of an FFT.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HomProfile {
    pub delays: Vec<f64>,
    pub rates: Vec<f64>,
}

fn steps_match(a: &Steps, b: &Steps) -> bool {
    let (a_start, a_end) = a.bounds();
    let (b_start, b_end) = b.bounds();
    let scale = a_end.abs().max(b_end.abs());
    a.len() == b.len()
        && (a_start - b_start).abs() <= 1e-12 * scale
        && (a_end - b_end).abs() <= 1e-12 * scale
}

/// Offsets of each sample from the centre of the axis
fn axis_offsets(steps: &Steps) -> Array1<f64> {
    let (start, end) = steps.bounds();
    let centre = 0.5 * (start + end);
    steps.iter().map(|x| x - centre).collect()
}

fn axis_centre(steps: &Steps) -> f64 {
    let (start, end) = steps.bounds();
    0.5 * (start + end)
}

/// The joint spectrum sampled on a grid.
struct SampledSpectrum {
    signal: Steps,
    idler: Steps,
    signal_weights: Array1<f64>,
    idler_weights: Array1<f64>,
    /// `f(x_j, y_k)`
    jsa: Array2<Complex<f64>>,
}

impl SampledSpectrum {
    fn new<I: Integrator + Sync>(spectrum: &JointSpectrum<I>, space: &FrequencySpace) -> Self {
        let signal = space.signal();
        let idler = space.idler();
        let integrator = spectrum.integrator();
        Self {
            signal,
            idler,
            signal_weights: integrator.sample_weights(&signal),
            idler_weights: integrator.sample_weights(&idler),
            jsa: spectrum.jsa_matrix(space),
        }
    }

    fn axes_match(&self) -> bool {
        steps_match(&self.signal, &self.idler)
    }

    /// `f(y_k, x_j)`, the amplitude with signal and idler exchanged
    fn exchanged<I: Integrator + Sync>(&self, spectrum: &JointSpectrum<I>) -> Array2<Complex<f64>> {
        if self.axes_match() {
            return self.jsa.t().to_owned();
        }
        let idler = self.idler;
        let points = self
            .signal
            .iter()
            .flat_map(|x| idler.iter().map(move |y| (y, x)))
            .collect();
        sample(spectrum, points, (self.signal.len(), idler.len()))
    }

    /// `f(x_j, x_m)`, the idler sampled on the signal axis
    fn signal_axis<I: Integrator + Sync>(
        &self,
        spectrum: &JointSpectrum<I>,
    ) -> Array2<Complex<f64>> {
        if self.axes_match() {
            return self.jsa.clone();
        }
        let signal = self.signal;
        let points = signal
            .iter()
            .flat_map(|x| signal.iter().map(move |m| (x, m)))
            .collect();
        sample(spectrum, points, (signal.len(), signal.len()))
    }

    /// `sum |f|^2 w_j w_k`
    fn norm(&self) -> f64 {
        self.jsa
            .indexed_iter()
            .map(|((j, k), f)| f.norm_sqr() * self.signal_weights[j] * self.idler_weights[k])
            .sum()
    }

    /// `f(x_j, y_k) f^*(y_k, x_j) w_j w_k`
    fn exchange_overlap(&self, exchanged: &Array2<Complex<f64>>) -> Array2<Complex<f64>> {
        Array2::from_shape_fn(self.jsa.dim(), |(j, k)| {
            self.jsa[[j, k]]
                * exchanged[[j, k]].conj()
                * (self.signal_weights[j] * self.idler_weights[k])
        })
    }

    fn signal_density(&self) -> DensityMatrix {
        DensityMatrix::new(
            self.jsa.view(),
            &self.idler_weights,
            &self.signal,
            &self.signal_weights,
        )
    }

    fn idler_density(&self) -> DensityMatrix {
        DensityMatrix::new(
            self.jsa.t(),
            &self.signal_weights,
            &self.idler,
            &self.idler_weights,
        )
    }

    /// Idler state expressed on the signal axis, for interference with a signal
    fn idler_density_on_signal_axis(&self, signal_axis: &Array2<Complex<f64>>) -> DensityMatrix {
        DensityMatrix::new(
            signal_axis.t(),
            &self.signal_weights,
            &self.signal,
            &self.signal_weights,
        )
    }

    /// Half of the delay period before the sampled series repeats
    fn alias_half_period(&self) -> f64 {
        let width = self
            .signal
            .division_width()
            .abs()
            .max(self.idler.division_width().abs());
        if width > 0.0 {
            PI / width
        } else {
            0.0
        }
    }

    fn scan_len(&self) -> usize {
        COARSE_SAMPLES_PER_POINT * self.signal.len().max(self.idler.len())
    }
}

fn sample<I: Integrator + Sync>(
    spectrum: &JointSpectrum<I>,
    points: Vec<(f64, f64)>,
    shape: (usize, usize),
) -> Array2<Complex<f64>> {
    let values = spectrum.jsa_range(SignalIdlerFrequencyArray(points));
    Array2::from_shape_vec(shape, values).expect("one amplitude per sampled point")
}

/// Coincidence probability of one source's pair meeting at a beam splitter.
struct RateKernel {
    overlap: Array2<Complex<f64>>,
    signal_offsets: Array1<f64>,
    /// Idler samples measured from the signal centre
    idler_offsets: Array1<f64>,
    norm: f64,
}

impl RateKernel {
    fn new(sampled: &SampledSpectrum, exchanged: &Array2<Complex<f64>>) -> Self {
        let reference = axis_centre(&sampled.signal);
        let norm = sampled.norm();
        if norm == 0.0 {
            log::warn!("HOM rate of a vanishing spectrum, returning 1/2");
        }
        Self {
            overlap: sampled.exchange_overlap(exchanged),
            signal_offsets: axis_offsets(&sampled.signal),
            idler_offsets: sampled.idler.iter().map(|y| y - reference).collect(),
            norm,
        }
    }

    /// ```latex
    /// P(\tau) = \frac{1}{2}\left(1 - \mathrm{Re}\frac{\sum_{jk} f(x_j, y_k) f^*(y_k, x_j)
    ///     e^{-i (x_j - y_k) \tau} w_j w_k}{\sum_{jk} |f(x_j, y_k)|^2 w_j w_k}\right)
    /// ```
    fn rate(&self, tau: f64) -> f64 {
        if self.norm == 0.0 {
            return 0.5;
        }
        let a = self
            .signal_offsets
            .mapv(|x| Complex::from_polar(1.0, -x * tau));
        let b = self
            .idler_offsets
            .mapv(|y| Complex::from_polar(1.0, y * tau));
        let interference = a.dot(&self.overlap.dot(&b));
        0.5 * (1.0 - interference.re / self.norm)
    }
}

/// Single photon state reduced from the joint amplitude, on one frequency axis.
struct DensityMatrix {
    rho: Array2<Complex<f64>>,
    offsets: Array1<f64>,
    weights: Array1<f64>,
    trace: f64,
}

impl DensityMatrix {
    /// `rho(a, b) = sum_t A(a, t) A^*(b, t) w_t`, for `amplitude` indexed
    /// `[kept, traced]`
    fn new(
        amplitude: ArrayView2<Complex<f64>>,
        traced_weights: &Array1<f64>,
        axis: &Steps,
        weights: &Array1<f64>,
    ) -> Self {
        let scaled = Array2::from_shape_fn(amplitude.dim(), |(a, t)| {
            amplitude[[a, t]] * traced_weights[t]
        });
        let rho = scaled.dot(&amplitude.t().mapv(|v| v.conj()));
        let trace = rho
            .diag()
            .iter()
            .zip(weights.iter())
            .map(|(r, w)| r.re * w)
            .sum();
        Self {
            rho,
            offsets: axis_offsets(axis),
            weights: weights.clone(),
            trace,
        }
    }
}

/// Interference visibility of two independent photons in states `x` and `y`.
///
/// ```latex
/// V(\tau) = \frac{\mathrm{Re} \sum_{jl} \rho_X(j, l) \rho_Y(l, j)
///     e^{-i (x_j - x_l) \tau} w_j w_l}{\mathrm{Tr}\rho_X \mathrm{Tr}\rho_Y}
/// ```
fn two_source_visibility(x: &DensityMatrix, y: &DensityMatrix, tau: f64) -> f64 {
    let denominator = x.trace * y.trace;
    if denominator == 0.0 {
        return 0.0;
    }
    let u = Array1::from_shape_fn(x.offsets.len(), |j| {
        Complex::from_polar(x.weights[j], -x.offsets[j] * tau)
    });
    let v = Array1::from_shape_fn(x.offsets.len(), |l| {
        Complex::from_polar(x.weights[l], x.offsets[l] * tau)
    });
    let total = x
        .rho
        .indexed_iter()
        .map(|((j, l), r)| r * v[l] * y.rho[[l, j]] * u[j])
        .sum::<Complex<f64>>();
    total.re / denominator
}

/// Minimise `f` over `[low, high]`, scanning `samples` points and refining the
/// best one by golden section search.
#[allow(clippy::cast_precision_loss)]
fn minimize<F>(f: F, low: f64, high: f64, samples: usize) -> (f64, f64)
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    if samples < 2 || high <= low {
        let centre = 0.5 * (low + high);
        return (centre, f(centre));
    }
    let step = (high - low) / (samples - 1) as f64;
    let points = (0..samples)
        .map(|i| low + step * i as f64)
        .collect::<Vec<_>>();
    let values = parallel::map(&points, |&t| f(t));
    let (best_index, best_value) = values
        .iter()
        .copied()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .unwrap_or((0, f64::INFINITY));
    let best = points[best_index];

    let ratio = 0.5 * (5f64.sqrt() - 1.0);
    let (mut a, mut b) = ((best - step).max(low), (best + step).min(high));
    let mut c = b - ratio * (b - a);
    let mut d = a + ratio * (b - a);
    let (mut fc, mut fd) = (f(c), f(d));
    for _ in 0..GOLDEN_SECTION_ITERATIONS {
        if fc < fd {
            b = d;
            d = c;
            fd = fc;
            c = b - ratio * (b - a);
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + ratio * (b - a);
            fd = f(d);
        }
    }
    let (refined, refined_value) = if fc < fd { (c, fc) } else { (d, fd) };
    if refined_value < best_value {
        (refined, refined_value)
    } else {
        (best, best_value)
    }
}

/// Coincidence probability of a single source's pair at each delay (s).
///
/// The series is periodic in the delay with period `2 pi / dx`, the inverse
/// of the grid spacing, so `space` must resolve the spectrum finely enough
/// for the delays of interest.
#[must_use]
pub fn hom_rate_series<I: Integrator + Sync>(
    spectrum: &JointSpectrum<I>,
    delays: &[f64],
    space: &FrequencySpace,
) -> Vec<f64> {
    let sampled = SampledSpectrum::new(spectrum, space);
    let kernel = RateKernel::new(&sampled, &sampled.exchanged(spectrum));
    parallel::map(delays, |&tau| kernel.rate(tau))
}

/// Depth of the single source HOM dip, `V = 1 - 2 P_min`.
///
/// The minimum is searched over one alias period of the sampled series. A
/// visibility outside `[0, 1]` is returned unchanged, with a warning.
#[must_use]
pub fn hom_visibility<I: Integrator + Sync>(
    spectrum: &JointSpectrum<I>,
    space: &FrequencySpace,
) -> HomVisibility {
    let sampled = SampledSpectrum::new(spectrum, space);
    dip_visibility(&sampled, &sampled.exchanged(spectrum))
}

fn dip_visibility(sampled: &SampledSpectrum, exchanged: &Array2<Complex<f64>>) -> HomVisibility {
    let kernel = RateKernel::new(sampled, exchanged);
    let half_period = sampled.alias_half_period();
    let (time, rate) = minimize(
        |tau| kernel.rate(tau),
        -half_period,
        half_period,
        sampled.scan_len(),
    );
    HomVisibility::checked("visibility", time, 1.0 - 2.0 * rate)
}

/// Visibilities between photons drawn from two identical sources.
///
/// Identical states interfere best at zero delay, so `ss` and `ii` are
/// evaluated there. The signal idler visibility is maximised over delay.
/// Values outside `[0, 1]` are returned unchanged, with a warning.
#[must_use]
pub fn hom_two_source_visibilities<I: Integrator + Sync>(
    spectrum: &JointSpectrum<I>,
    space: &FrequencySpace,
) -> HomTwoSourceResult {
    let sampled = SampledSpectrum::new(spectrum, space);
    two_source_visibilities(&sampled, &sampled.signal_axis(spectrum))
}

fn two_source_visibilities(
    sampled: &SampledSpectrum,
    signal_axis: &Array2<Complex<f64>>,
) -> HomTwoSourceResult {
    let signal = sampled.signal_density();
    let idler = sampled.idler_density();
    let idler_on_signal = sampled.idler_density_on_signal_axis(signal_axis);

    let ss = HomVisibility::checked(
        "ss visibility",
        0.0,
        two_source_visibility(&signal, &signal, 0.0),
    );
    let ii = HomVisibility::checked(
        "ii visibility",
        0.0,
        two_source_visibility(&idler, &idler, 0.0),
    );
    let half_period = PI / sampled.signal.division_width().abs().max(f64::MIN_POSITIVE);
    let (time, negative) = minimize(
        |tau| -two_source_visibility(&signal, &idler_on_signal, tau),
        -half_period,
        half_period,
        COARSE_SAMPLES_PER_POINT * sampled.signal.len(),
    );
    let si = HomVisibility::checked("si visibility", time, -negative);

    let warnings = [ss, ii, si].iter().filter_map(|v| v.warning).collect();
    HomTwoSourceResult { ss, ii, si, warnings }
}

/// Coincidence probability `(1 - V(tau)) / 2` for each two source pairing.
#[must_use]
pub fn hom_two_source_rate_series<I: Integrator + Sync>(
    spectrum: &JointSpectrum<I>,
    delays: &[f64],
    space: &FrequencySpace,
) -> HomTwoSourceRates {
    let sampled = SampledSpectrum::new(spectrum, space);
    let signal = sampled.signal_density();
    let idler = sampled.idler_density();
    let idler_on_signal = sampled.idler_density_on_signal_axis(&sampled.signal_axis(spectrum));

    let rates = parallel::map(delays, |&tau| {
        (
            0.5 * (1.0 - two_source_visibility(&signal, &signal, tau)),
            0.5 * (1.0 - two_source_visibility(&idler, &idler, tau)),
            0.5 * (1.0 - two_source_visibility(&signal, &idler_on_signal, tau)),
        )
    });
    let mut out = HomTwoSourceRates::default();
    for (ss, ii, si) in rates {
        out.ss.push(ss);
        out.ii.push(ii);
        out.si.push(si);
    }
    out
}

/// Single source coincidence probability on every delay resolved by the grid,
/// computed with one FFT.
///
/// On a grid with equal spacing `dx` on both axes the phase only depends on
/// `j - k`, so the sum collapses onto its diagonals
///
/// ```latex
/// c_d = \sum_{j - k = d} f(x_j, y_k) f^*(y_k, x_j) w_j w_k
/// ```
/// whose transform gives the series at `tau_m = 2 pi m / (P dx)`. The
/// diagonals are zero padded to `P = padding (N_x + N_y - 1)` points to
/// interpolate between delays. Delays are returned in increasing order,
/// centred on zero.
///
/// # Errors
///
/// Returns [`SpdcError::Domain`] if `padding` is zero or the signal and
/// idler spacings differ.
#[allow(
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn hom_rate_profile<I: Integrator + Sync>(
    spectrum: &JointSpectrum<I>,
    space: &FrequencySpace,
    padding: usize,
) -> Result<HomProfile> {
    if padding == 0 {
        return Err(SpdcError::Domain("padding must be at least one".to_owned()));
    }
    let (signal, idler) = (space.signal(), space.idler());
    let (dx, dy) = (signal.division_width(), idler.division_width());
    if dx.is_nan() || dx <= 0.0 || (dx - dy).abs() > 1e-9 * dx.abs().max(dy.abs()) {
        return Err(SpdcError::Domain(format!(
            "FFT profile needs equal positive spacing on both axes, got {dx:e} and {dy:e}"
        )));
    }

    let sampled = SampledSpectrum::new(spectrum, space);
    let norm = sampled.norm();
    let overlap = sampled.exchange_overlap(&sampled.exchanged(spectrum));
    let len = padding * (signal.len() + idler.len() - 1);
    let mut buffer = vec![Complex::new(0.0, 0.0); len];
    for ((j, k), value) in overlap.indexed_iter() {
        let index = (j as isize - k as isize).rem_euclid(len as isize) as usize;
        buffer[index] += value;
    }
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(len);
    fft.process(&mut buffer);

    let offset = signal.value(0) - idler.value(0);
    let half = (len / 2) as isize;
    let (delays, rates): (Vec<f64>, Vec<f64>) = (0..len as isize)
        .map(|s| {
            let m = s - half;
            let tau = 2.0 * PI * m as f64 / (len as f64 * dx);
            let rate = if norm == 0.0 {
                0.5
            } else {
                let value = Complex::from_polar(1.0, -offset * tau)
                    * buffer[m.rem_euclid(len as isize) as usize];
                0.5 * (1.0 - value.re / norm)
            };
            (tau, rate)
        })
        .unzip();
    Ok(HomProfile { delays, rates })
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    use super::*;
    use crate::{integrator::Simpson, schmidt::schmidt_number, spdc::SPDC};

    fn get_spdc_with_bandwidth(bandwidth: f64) -> SPDC {
        let mut spdc = SPDC::default();
        spdc.set_pump_bandwidth(bandwidth).unwrap();
        spdc
    }

    fn get_sampled_spectrum(
        f: impl Fn(f64, f64) -> Complex<f64>,
        n: usize,
    ) -> SampledSpectrum {
        let axis = Steps::new(1.0, 2.0, n).unwrap();
        let matrix = |a: &Steps, b: &Steps| {
            Array2::from_shape_fn((a.len(), b.len()), |(j, k)| f(a.value(j), b.value(k)))
        };
        let weights = crate::integrator::simpson_weights(&axis);
        SampledSpectrum {
            signal: axis,
            idler: axis,
            signal_weights: weights.clone(),
            idler_weights: weights,
            jsa: matrix(&axis, &axis),
        }
    }

    fn gaussian(x: f64, centre: f64) -> f64 {
        (-(x - centre).powi(2) / (2.0 * 0.05f64.powi(2))).exp()
    }

    #[test]
    fn test_rate_series_follows_delay_order() {
        let spdc = SPDC::default();
        let space = spdc.optimum_range(21).unwrap();
        let spectrum = spdc.joint_spectrum(Simpson::default());
        let delays = (0..9).map(|i| f64::from(i - 4) * 5e-14).collect::<Vec<_>>();
        let rates = hom_rate_series(&spectrum, &delays, &space);
        assert_eq!(rates.len(), delays.len());

        let reversed = delays.iter().rev().copied().collect::<Vec<_>>();
        let mut reversed_rates = hom_rate_series(&spectrum, &reversed, &space);
        reversed_rates.reverse();
        assert_eq!(rates, reversed_rates);
        assert!(hom_rate_series(&spectrum, &[], &space).is_empty());
    }

    #[test]
    fn test_symmetric_spectrum_has_deep_dip() {
        let spdc = SPDC::default();
        let space = spdc.optimum_range(41).unwrap();
        let spectrum = spdc.joint_spectrum(Simpson::default());
        let rates = hom_rate_series(&spectrum, &[0.0], &space);
        assert!(rates[0] < 0.05, "{}", rates[0]);

        let dip = hom_visibility(&spectrum, &space);
        assert!(dip.visibility > 0.9 && dip.visibility <= 1.0 + 1e-9);
        assert!(dip.warning.is_none());
        assert!(dip.visibility >= 1.0 - 2.0 * rates[0] - 1e-9);
    }

    #[test]
    fn test_separable_pair_interferes_perfectly() {
        let sampled = get_sampled_spectrum(
            |x, y| Complex::new(gaussian(x, 1.5) * gaussian(y, 1.5), 0.0),
            41,
        );
        let kernel = RateKernel::new(&sampled, &sampled.jsa.t().to_owned());
        assert_abs_diff_eq!(kernel.rate(0.0), 0.0, epsilon = 1e-12);

        let result = two_source_visibilities(&sampled, &sampled.jsa);
        assert_relative_eq!(result.ss.visibility, 1.0, max_relative = 1e-10);
        assert_relative_eq!(result.ii.visibility, 1.0, max_relative = 1e-10);
        assert_relative_eq!(result.si.visibility, 1.0, max_relative = 1e-6);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_distinguishable_photons_do_not_interfere() {
        let sampled = get_sampled_spectrum(
            |x, y| Complex::new(gaussian(x, 1.2) * gaussian(y, 1.8), 0.0),
            41,
        );
        let result = two_source_visibilities(&sampled, &sampled.jsa);
        assert_relative_eq!(result.ss.visibility, 1.0, max_relative = 1e-10);
        assert!(result.si.visibility.abs() < 1e-6);
    }

    #[test]
    fn test_corrupted_spectrum_is_flagged() {
        let mut sampled = get_sampled_spectrum(
            |x, y| Complex::new(gaussian(x, 1.5) * gaussian(y, 1.5), 0.0),
            21,
        );
        sampled.jsa[[10, 10]] = Complex::new(f64::NAN, 0.0);
        let exchanged = sampled.jsa.t().to_owned();

        let dip = dip_visibility(&sampled, &exchanged);
        let warning = dip.warning.unwrap();
        assert_eq!(warning.quantity, "visibility");
        assert!(warning.value.is_nan());

        let result = two_source_visibilities(&sampled, &sampled.jsa);
        assert_eq!(result.warnings.len(), 3);
        assert!(result.ss.warning.is_some());
    }

    #[test]
    fn test_mismatched_axes_sample_exchanged_points() {
        let spdc = SPDC::default();
        let spectrum = spdc.joint_spectrum(Simpson::default());
        let space = spdc.optimum_range(9).unwrap();
        let stretched = FrequencySpace::new(space.signal(), space.idler().with_len(7).unwrap())
            .unwrap();
        let sampled = SampledSpectrum::new(&spectrum, &stretched);
        assert!(!sampled.axes_match());

        let exchanged = sampled.exchanged(&spectrum);
        assert_eq!(exchanged.dim(), (9, 7));
        let (x, y) = (stretched.signal().value(2), stretched.idler().value(5));
        assert_eq!(exchanged[[2, 5]], spectrum.jsa(y, x));

        let signal_axis = sampled.signal_axis(&spectrum);
        assert_eq!(signal_axis.dim(), (9, 9));
        let m = stretched.signal().value(4);
        assert_eq!(signal_axis[[2, 4]], spectrum.jsa(x, m));
    }

    #[test]
    fn test_two_source_visibility_is_purity() {
        let spdc = get_spdc_with_bandwidth(3e-9);
        let space = spdc.optimum_range(41).unwrap();
        let spectrum = spdc.joint_spectrum(Simpson::default());
        let k = schmidt_number(&spectrum, &space);
        let result = hom_two_source_visibilities(&spectrum, &space);

        assert_eq!(result.ss.time, 0.0);
        assert_eq!(result.ii.time, 0.0);
        assert_relative_eq!(result.ss.visibility, 1.0 / k, max_relative = 2e-2);
        assert_relative_eq!(result.ii.visibility, result.ss.visibility, max_relative = 1e-8);
        assert!(result.si.visibility <= 1.0 + 1e-9);
        assert!(result.warnings.is_empty());

        let rates = hom_two_source_rate_series(&spectrum, &[0.0], &space);
        assert_relative_eq!(rates.ss[0], 0.5 * (1.0 - result.ss.visibility), max_relative = 1e-10);
        assert_eq!(rates.ii.len(), 1);
        assert_eq!(rates.si.len(), 1);
    }

    #[test]
    fn test_profile_matches_rate_series() {
        let spdc = SPDC::default();
        let space = spdc.optimum_range(15).unwrap();
        let spectrum = spdc.joint_spectrum(Simpson::default());
        let profile = hom_rate_profile(&spectrum, &space, 2).unwrap();
        assert_eq!(profile.delays.len(), 2 * (15 + 15 - 1));
        assert!(profile.delays.windows(2).all(|w| w[0] < w[1]));

        let direct = hom_rate_series(&spectrum, &profile.delays, &space);
        for (a, b) in profile.rates.iter().zip(&direct) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_profile_rejects_unequal_spacing() {
        let spdc = SPDC::default();
        let spectrum = spdc.joint_spectrum(Simpson::default());
        let space = spdc.optimum_range(15).unwrap();
        assert!(matches!(
            hom_rate_profile(&spectrum, &space, 0),
            Err(SpdcError::Domain(_))
        ));

        let stretched = FrequencySpace::new(
            space.signal(),
            space.idler().with_len(21).unwrap(),
        )
        .unwrap();
        assert!(matches!(
            hom_rate_profile(&spectrum, &stretched, 1),
            Err(SpdcError::Domain(_))
        ));
    }
}
