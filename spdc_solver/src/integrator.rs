use std::f64::consts::PI;

use ndarray::Array1;
use num_complex::Complex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::Uniform;
use serde::{Deserialize, Serialize};

use crate::spaces::Steps;

/// A rule for reducing a function, or a set of samples of a function, to an integral.
pub trait Integrator {
    /// Integrate `f` over `[a, b]`
    fn integrate<F: Fn(f64) -> Complex<f64>>(&self, f: F, a: f64, b: f64) -> Complex<f64>;

    /// Weights `w` such that `sum_j w_j f(x_j)` approximates the integral of `f`
    /// over the range of `steps`, where `x_j` are the samples of `steps`.
    ///
    /// Rules that need their own abscissae fall back to a fixed sample rule here.
    fn sample_weights(&self, steps: &Steps) -> Array1<f64> {
        trapezoid_weights(steps)
    }
}

#[must_use]
pub fn trapezoid_weights(steps: &Steps) -> Array1<f64> {
    let n = steps.len();
    let dx = steps.division_width();
    if n == 1 {
        return Array1::from_elem(1, dx);
    }
    let mut weights = Array1::from_elem(n, dx);
    weights[0] = 0.5 * dx;
    weights[n - 1] = 0.5 * dx;
    weights
}

/// Composite Simpson weights, or trapezoid weights when the sample count is even.
#[must_use]
pub fn simpson_weights(steps: &Steps) -> Array1<f64> {
    let n = steps.len();
    if n < 3 || n % 2 == 0 {
        return trapezoid_weights(steps);
    }
    let dx = steps.division_width();
    let mut weights = Array1::from_shape_fn(n, |i| (if i % 2 == 1 { 4.0 } else { 2.0 }) * dx / 3.0);
    weights[0] = dx / 3.0;
    weights[n - 1] = dx / 3.0;
    weights
}

/// Composite Simpson's rule with a fixed number of divisions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Simpson {
    pub divs: usize,
}

impl Default for Simpson {
    fn default() -> Self {
        Simpson { divs: 50 }
    }
}

impl Integrator for Simpson {
    #[allow(clippy::cast_precision_loss)]
    fn integrate<F: Fn(f64) -> Complex<f64>>(&self, f: F, a: f64, b: f64) -> Complex<f64> {
        // Round up to an even number of divisions
        let divs = (self.divs.max(2) + 1) & !1;
        let h = (b - a) / divs as f64;
        let mut sum = f(a) + f(b);
        for k in 1..divs {
            let factor = if k % 2 == 1 { 4.0 } else { 2.0 };
            sum += f(a + k as f64 * h) * factor;
        }
        sum * (h / 3.0)
    }

    fn sample_weights(&self, steps: &Steps) -> Array1<f64> {
        simpson_weights(steps)
    }
}

/// Simpson's rule with recursive bisection
///
/// `tolerance` is relative to the scale of the integrand over the whole interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveSimpson {
    pub tolerance: f64,
    pub max_depth: usize,
}

impl Default for AdaptiveSimpson {
    fn default() -> Self {
        AdaptiveSimpson {
            tolerance: 1e-6,
            max_depth: 16,
        }
    }
}

struct SimpsonInterval {
    a: f64,
    b: f64,
    fa: Complex<f64>,
    fm: Complex<f64>,
    fb: Complex<f64>,
    whole: Complex<f64>,
}

fn adaptive_simpson<F: Fn(f64) -> Complex<f64>>(
    f: &F,
    interval: &SimpsonInterval,
    tolerance: f64,
    depth: usize,
) -> Complex<f64> {
    let SimpsonInterval {
        a,
        b,
        fa,
        fm,
        fb,
        whole,
    } = *interval;
    let m = 0.5 * (a + b);
    let lm = 0.5 * (a + m);
    let rm = 0.5 * (m + b);
    let flm = f(lm);
    let frm = f(rm);
    let left = (fa + flm * 4.0 + fm) * ((m - a) / 6.0);
    let right = (fm + frm * 4.0 + fb) * ((b - m) / 6.0);
    let delta = left + right - whole;
    if depth == 0 || delta.norm() <= 15.0 * tolerance {
        return left + right + delta / 15.0;
    }
    adaptive_simpson(
        f,
        &SimpsonInterval {
            a,
            b: m,
            fa,
            fm: flm,
            fb: fm,
            whole: left,
        },
        0.5 * tolerance,
        depth - 1,
    ) + adaptive_simpson(
        f,
        &SimpsonInterval {
            a: m,
            b,
            fa: fm,
            fm: frm,
            fb,
            whole: right,
        },
        0.5 * tolerance,
        depth - 1,
    )
}

impl Integrator for AdaptiveSimpson {
    fn integrate<F: Fn(f64) -> Complex<f64>>(&self, f: F, a: f64, b: f64) -> Complex<f64> {
        let m = 0.5 * (a + b);
        let (fa, fm, fb) = (f(a), f(m), f(b));
        let whole = (fa + fm * 4.0 + fb) * ((b - a) / 6.0);
        let scale = (b - a).abs() * fa.norm().max(fm.norm()).max(fb.norm());
        adaptive_simpson(
            &f,
            &SimpsonInterval {
                a,
                b,
                fa,
                fm,
                fb,
                whole,
            },
            self.tolerance * scale.max(f64::MIN_POSITIVE),
            self.max_depth,
        )
    }

    fn sample_weights(&self, steps: &Steps) -> Array1<f64> {
        simpson_weights(steps)
    }
}

/// Fixed order Gauss-Legendre quadrature, nodes computed once on construction
#[derive(Debug, Clone, PartialEq)]
pub struct GaussLegendre {
    nodes: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussLegendre {
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new(degree: usize) -> Self {
        let n = degree.max(1);
        let mut nodes = vec![0.0; n];
        let mut weights = vec![0.0; n];
        let nf = n as f64;
        for i in 0..n.div_ceil(2) {
            // Initial guess for the i-th root, refined by Newton's method
            let mut x = (PI * (i as f64 + 0.75) / (nf + 0.5)).cos();
            for _ in 0..100 {
                let (p, dp) = legendre(n, x);
                let dx = p / dp;
                x -= dx;
                if dx.abs() < 1e-15 {
                    break;
                }
            }
            let (_, derivative) = legendre(n, x);
            let w = 2.0 / ((1.0 - x * x) * derivative * derivative);
            nodes[i] = -x;
            nodes[n - 1 - i] = x;
            weights[i] = w;
            weights[n - 1 - i] = w;
        }
        GaussLegendre { nodes, weights }
    }

    #[must_use]
    pub fn degree(&self) -> usize {
        self.nodes.len()
    }
}

impl Default for GaussLegendre {
    fn default() -> Self {
        GaussLegendre::new(40)
    }
}

/// `P_n(x)` and its derivative by the three term recurrence
#[allow(clippy::cast_precision_loss)]
fn legendre(n: usize, x: f64) -> (f64, f64) {
    let mut p0 = 1.0;
    let mut p1 = x;
    for j in 2..=n {
        let jf = j as f64;
        let p2 = ((2.0 * jf - 1.0) * x * p1 - (jf - 1.0) * p0) / jf;
        p0 = p1;
        p1 = p2;
    }
    if n == 0 {
        return (1.0, 0.0);
    }
    let dp = n as f64 * (x * p1 - p0) / (x * x - 1.0);
    (p1, dp)
}

impl Integrator for GaussLegendre {
    fn integrate<F: Fn(f64) -> Complex<f64>>(&self, f: F, a: f64, b: f64) -> Complex<f64> {
        let half = 0.5 * (b - a);
        let mid = 0.5 * (a + b);
        let sum = self
            .nodes
            .iter()
            .zip(&self.weights)
            .fold(Complex::default(), |acc, (x, w)| acc + f(mid + half * x) * *w);
        sum * half
    }

    fn sample_weights(&self, steps: &Steps) -> Array1<f64> {
        simpson_weights(steps)
    }
}

// Kronrod 15 point abscissae (positive half) and weights, with the embedded
// 7 point Gauss weights for the odd abscissae
const XGK: [f64; 8] = [
    0.991_455_371_120_812_6,
    0.949_107_912_342_758_5,
    0.864_864_423_359_769_1,
    0.741_531_185_599_394_4,
    0.586_087_235_467_691_1,
    0.405_845_151_377_397_2,
    0.207_784_955_007_898_5,
    0.0,
];
const WGK: [f64; 8] = [
    0.022_935_322_010_529_225,
    0.063_092_092_629_978_55,
    0.104_790_010_322_250_18,
    0.140_653_259_715_525_92,
    0.169_004_726_639_267_9,
    0.190_350_578_064_785_4,
    0.204_432_940_075_298_9,
    0.209_482_141_084_727_83,
];
const WG: [f64; 4] = [
    0.129_484_966_168_869_7,
    0.279_705_391_489_276_7,
    0.381_830_050_505_118_9,
    0.417_959_183_673_469_4,
];

/// Adaptive Gauss-Kronrod (7, 15) quadrature
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussKronrod {
    pub tolerance: f64,
    pub max_depth: usize,
}

impl Default for GaussKronrod {
    fn default() -> Self {
        GaussKronrod {
            tolerance: 1e-8,
            max_depth: 12,
        }
    }
}

/// Kronrod estimate, Gauss estimate, and the Kronrod estimate of `|f|`
fn kronrod_15<F: Fn(f64) -> Complex<f64>>(f: &F, a: f64, b: f64) -> (Complex<f64>, Complex<f64>, f64) {
    let half = 0.5 * (b - a);
    let mid = 0.5 * (a + b);
    let center = f(mid);
    let mut kronrod = center * WGK[7];
    let mut gauss = center * WG[3];
    let mut absolute = center.norm() * WGK[7];
    for j in 0..7 {
        let dx = half * XGK[j];
        let (left, right) = (f(mid - dx), f(mid + dx));
        let pair = left + right;
        kronrod += pair * WGK[j];
        absolute += (left.norm() + right.norm()) * WGK[j];
        if j % 2 == 1 {
            gauss += pair * WG[j / 2];
        }
    }
    (kronrod * half, gauss * half, absolute * half.abs())
}

fn adaptive_kronrod<F: Fn(f64) -> Complex<f64>>(
    f: &F,
    a: f64,
    b: f64,
    tolerance: f64,
    depth: usize,
) -> Complex<f64> {
    let (kronrod, gauss, _) = kronrod_15(f, a, b);
    if depth == 0 || (kronrod - gauss).norm() <= tolerance {
        return kronrod;
    }
    let m = 0.5 * (a + b);
    adaptive_kronrod(f, a, m, 0.5 * tolerance, depth - 1)
        + adaptive_kronrod(f, m, b, 0.5 * tolerance, depth - 1)
}

impl Integrator for GaussKronrod {
    fn integrate<F: Fn(f64) -> Complex<f64>>(&self, f: F, a: f64, b: f64) -> Complex<f64> {
        let (kronrod, gauss, absolute) = kronrod_15(&f, a, b);
        let tolerance = self.tolerance * absolute.max(f64::MIN_POSITIVE);
        if (kronrod - gauss).norm() <= tolerance || self.max_depth == 0 {
            return kronrod;
        }
        let m = 0.5 * (a + b);
        adaptive_kronrod(&f, a, m, 0.5 * tolerance, self.max_depth - 1)
            + adaptive_kronrod(&f, m, b, 0.5 * tolerance, self.max_depth - 1)
    }

    fn sample_weights(&self, steps: &Steps) -> Array1<f64> {
        simpson_weights(steps)
    }
}

/// Clenshaw-Curtis quadrature, doubling the order until successive estimates agree
#[derive(Debug, Clone, PartialEq)]
pub struct ClenshawCurtis {
    tolerance: f64,
    /// (nodes, weights) on `[-1, 1]` for orders 4, 8, .. 512
    levels: Vec<(Vec<f64>, Vec<f64>)>,
}

impl ClenshawCurtis {
    const MAX_LEVEL: u32 = 9;

    #[must_use]
    pub fn new(tolerance: f64) -> Self {
        let levels = (2..=Self::MAX_LEVEL)
            .map(|level| clenshaw_curtis_rule(1 << level))
            .collect();
        ClenshawCurtis { tolerance, levels }
    }

    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

impl Default for ClenshawCurtis {
    fn default() -> Self {
        ClenshawCurtis::new(1e-8)
    }
}

/// Nodes `cos(k pi / n)` and weights for even `n`
#[allow(clippy::cast_precision_loss)]
fn clenshaw_curtis_rule(n: usize) -> (Vec<f64>, Vec<f64>) {
    let nf = n as f64;
    let nodes = (0..=n).map(|k| (k as f64 * PI / nf).cos()).collect();
    let weights = (0..=n)
        .map(|k| {
            let c = if k == 0 || k == n { 1.0 } else { 2.0 };
            let sum: f64 = (1..=n / 2)
                .map(|j| {
                    let b = if 2 * j == n { 1.0 } else { 2.0 };
                    let jf = j as f64;
                    b / (4.0 * jf * jf - 1.0) * (2.0 * jf * k as f64 * PI / nf).cos()
                })
                .sum();
            c / nf * (1.0 - sum)
        })
        .collect();
    (nodes, weights)
}

impl Integrator for ClenshawCurtis {
    fn integrate<F: Fn(f64) -> Complex<f64>>(&self, f: F, a: f64, b: f64) -> Complex<f64> {
        let half = 0.5 * (b - a);
        let mid = 0.5 * (a + b);
        let mut previous: Option<Complex<f64>> = None;
        for (nodes, weights) in &self.levels {
            let mut estimate = Complex::default();
            let mut absolute = 0.0;
            for (x, w) in nodes.iter().zip(weights) {
                let value = f(mid + half * x);
                estimate += value * *w;
                absolute += value.norm() * w.abs();
            }
            estimate *= half;
            if let Some(previous) = previous {
                if (estimate - previous).norm() <= self.tolerance * (absolute * half.abs()) {
                    return estimate;
                }
            }
            previous = Some(estimate);
        }
        previous.unwrap_or_default()
    }

    fn sample_weights(&self, steps: &Steps) -> Array1<f64> {
        simpson_weights(steps)
    }
}

/// Plain Monte Carlo integration from a fixed seed, so repeated calls agree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonteCarlo {
    pub samples: usize,
    pub seed: u64,
}

impl Default for MonteCarlo {
    fn default() -> Self {
        MonteCarlo {
            samples: 10_000,
            seed: 0,
        }
    }
}

impl Integrator for MonteCarlo {
    #[allow(clippy::cast_precision_loss)]
    fn integrate<F: Fn(f64) -> Complex<f64>>(&self, f: F, a: f64, b: f64) -> Complex<f64> {
        if a == b || self.samples == 0 {
            return Complex::default();
        }
        let (low, high, sign) = if a < b { (a, b, 1.0) } else { (b, a, -1.0) };
        let rng = StdRng::seed_from_u64(self.seed);
        let sum = rng
            .sample_iter(Uniform::new(low, high))
            .take(self.samples)
            .fold(Complex::default(), |acc, x| acc + f(x));
        sum * (sign * (high - low) / self.samples as f64)
    }

    /// Every sample weighted equally, the sample mean times the range
    #[allow(clippy::cast_precision_loss)]
    fn sample_weights(&self, steps: &Steps) -> Array1<f64> {
        let n = steps.len();
        let width = if n == 1 {
            steps.division_width()
        } else {
            (steps.end() - steps.start()) / n as f64
        };
        Array1::from_elem(n, width)
    }
}

/// Serializable choice of integration rule and its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrationMethod {
    Simpson { divs: usize },
    AdaptiveSimpson { tolerance: f64, max_depth: usize },
    GaussLegendre { degree: usize },
    GaussKronrod { tolerance: f64, max_depth: usize },
    ClenshawCurtis { tolerance: f64 },
    MonteCarlo { samples: usize, seed: u64 },
}

impl Default for IntegrationMethod {
    fn default() -> Self {
        IntegrationMethod::Simpson { divs: 50 }
    }
}

impl IntegrationMethod {
    /// Build the rule, precomputing any nodes it needs.
    #[must_use]
    pub fn integrator(&self) -> Quadrature {
        match *self {
            IntegrationMethod::Simpson { divs } => Quadrature::Simpson(Simpson { divs }),
            IntegrationMethod::AdaptiveSimpson {
                tolerance,
                max_depth,
            } => Quadrature::AdaptiveSimpson(AdaptiveSimpson {
                tolerance,
                max_depth,
            }),
            IntegrationMethod::GaussLegendre { degree } => {
                Quadrature::GaussLegendre(GaussLegendre::new(degree))
            }
            IntegrationMethod::GaussKronrod {
                tolerance,
                max_depth,
            } => Quadrature::GaussKronrod(GaussKronrod {
                tolerance,
                max_depth,
            }),
            IntegrationMethod::ClenshawCurtis { tolerance } => {
                Quadrature::ClenshawCurtis(ClenshawCurtis::new(tolerance))
            }
            IntegrationMethod::MonteCarlo { samples, seed } => {
                Quadrature::MonteCarlo(MonteCarlo { samples, seed })
            }
        }
    }
}

/// A built [`IntegrationMethod`]
#[derive(Debug, Clone, PartialEq)]
pub enum Quadrature {
    Simpson(Simpson),
    AdaptiveSimpson(AdaptiveSimpson),
    GaussLegendre(GaussLegendre),
    GaussKronrod(GaussKronrod),
    ClenshawCurtis(ClenshawCurtis),
    MonteCarlo(MonteCarlo),
}

impl Default for Quadrature {
    fn default() -> Self {
        IntegrationMethod::default().integrator()
    }
}

impl From<IntegrationMethod> for Quadrature {
    fn from(value: IntegrationMethod) -> Self {
        value.integrator()
    }
}

impl Integrator for Quadrature {
    #[inline]
    fn integrate<F: Fn(f64) -> Complex<f64>>(&self, f: F, a: f64, b: f64) -> Complex<f64> {
        match self {
            Quadrature::Simpson(i) => i.integrate(f, a, b),
            Quadrature::AdaptiveSimpson(i) => i.integrate(f, a, b),
            Quadrature::GaussLegendre(i) => i.integrate(f, a, b),
            Quadrature::GaussKronrod(i) => i.integrate(f, a, b),
            Quadrature::ClenshawCurtis(i) => i.integrate(f, a, b),
            Quadrature::MonteCarlo(i) => i.integrate(f, a, b),
        }
    }

    fn sample_weights(&self, steps: &Steps) -> Array1<f64> {
        match self {
            Quadrature::Simpson(i) => i.sample_weights(steps),
            Quadrature::AdaptiveSimpson(i) => i.sample_weights(steps),
            Quadrature::GaussLegendre(i) => i.sample_weights(steps),
            Quadrature::GaussKronrod(i) => i.sample_weights(steps),
            Quadrature::ClenshawCurtis(i) => i.sample_weights(steps),
            Quadrature::MonteCarlo(i) => i.sample_weights(steps),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn get_methods() -> Vec<IntegrationMethod> {
        vec![
            IntegrationMethod::Simpson { divs: 50 },
            IntegrationMethod::AdaptiveSimpson {
                tolerance: 1e-10,
                max_depth: 20,
            },
            IntegrationMethod::GaussLegendre { degree: 40 },
            IntegrationMethod::GaussKronrod {
                tolerance: 1e-10,
                max_depth: 12,
            },
            IntegrationMethod::ClenshawCurtis { tolerance: 1e-10 },
        ]
    }

    #[test]
    fn test_oscillatory_integral() {
        // int_0^pi e^{ix} dx = 2i
        for method in get_methods() {
            let result = method
                .integrator()
                .integrate(|x| Complex::new(0.0, x).exp(), 0.0, PI);
            assert_abs_diff_eq!(result.re, 0.0, epsilon = 1e-6);
            assert_abs_diff_eq!(result.im, 2.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_polynomial_integral() {
        for method in get_methods() {
            let result = method
                .integrator()
                .integrate(|x| Complex::new(3.0 * x * x, 0.0), -1.0, 2.0);
            assert_abs_diff_eq!(result.re, 9.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_gauss_legendre_weights_sum_to_two() {
        for degree in [1, 2, 5, 40] {
            let rule = GaussLegendre::new(degree);
            assert_eq!(rule.degree(), degree);
            assert_abs_diff_eq!(rule.weights.iter().sum::<f64>(), 2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_monte_carlo_is_deterministic() {
        let rule = MonteCarlo {
            samples: 20_000,
            seed: 7,
        };
        let f = |x: f64| Complex::new(x * x, 0.0);
        let first = rule.integrate(f, 0.0, 1.0);
        assert_eq!(first, rule.integrate(f, 0.0, 1.0));
        assert_abs_diff_eq!(first.re, 1.0 / 3.0, epsilon = 1e-2);
        assert_abs_diff_eq!(rule.integrate(f, 1.0, 0.0).re, -first.re, epsilon = 1e-12);
    }

    #[test]
    fn test_sample_weights() {
        let steps = Steps::new(0.0, 1.0, 5).unwrap();
        let simpson = simpson_weights(&steps);
        assert_abs_diff_eq!(simpson.sum(), 1.0, epsilon = 1e-14);
        // Exact for cubics
        let cubic: f64 = steps
            .iter()
            .zip(simpson.iter())
            .map(|(x, w)| w * x * x * x)
            .sum();
        assert_abs_diff_eq!(cubic, 0.25, epsilon = 1e-14);

        let even = Steps::new(0.0, 1.0, 4).unwrap();
        assert_abs_diff_eq!(simpson_weights(&even).sum(), 1.0, epsilon = 1e-14);

        let single = Steps::new(0.0, 2.0, 1).unwrap();
        assert_abs_diff_eq!(trapezoid_weights(&single).sum(), 2.0);
        assert_abs_diff_eq!(
            MonteCarlo::default().sample_weights(&steps).sum(),
            1.0,
            epsilon = 1e-14
        );
    }

    #[test]
    fn test_method_serialization() {
        let text = toml::to_string(&IntegrationMethod::GaussLegendre { degree: 12 }).unwrap();
        let method: IntegrationMethod = toml::from_str(&text).unwrap();
        assert_eq!(method, IntegrationMethod::GaussLegendre { degree: 12 });
    }
}
