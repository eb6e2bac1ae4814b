//! Search for the phase matched operating point of a configuration.
//!
//! The optimum is exact longitudinal phase matching at the central
//! frequencies, `|Delta k_z| L <= phase_tolerance`, with the idler fixed by
//! energy and transverse momentum conservation. The free parameter is the
//! poling period when periodic poling is on, and the crystal angle otherwise.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::{apodization::PeriodicPoling, error::OptimizeError};

use super::{BeamRole, SPDC};

/// Number of samples used to bracket the phase matching angle
const THETA_SCAN_SAMPLES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerSettings {
    pub max_iterations: usize,
    /// Largest accepted phase mismatch `|Delta k| L` (rad)
    pub phase_tolerance: f64,
    /// Range searched for the crystal angle (rad)
    pub theta_bounds: (f64, f64),
    /// Also set the idler waist equal to the signal waist
    pub match_waists: bool,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            phase_tolerance: 1e-6,
            theta_bounds: (0.0, FRAC_PI_2),
            match_waists: false,
        }
    }
}

impl OptimizerSettings {
    /// # Errors
    ///
    /// Returns [`OptimizeError::Infeasible`] for contradictory angle bounds or
    /// a tolerance that is not finite and positive.
    pub fn validate(&self) -> Result<(), OptimizeError> {
        let (low, high) = self.theta_bounds;
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(OptimizeError::Infeasible(format!(
                "contradictory crystal angle bounds ({low}, {high})"
            )));
        }
        if !(self.phase_tolerance.is_finite() && self.phase_tolerance > 0.0) {
            return Err(OptimizeError::Infeasible(format!(
                "phase tolerance must be finite and positive, got {}",
                self.phase_tolerance
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptimizeOutcome {
    Converged { iterations: usize, residual: f64 },
    /// The configuration already satisfied the optimum, nothing changed
    AlreadyOptimal { residual: f64 },
    NotConverged { iterations: usize, residual: f64 },
    Infeasible(String),
}

impl OptimizeOutcome {
    #[must_use]
    pub fn is_optimal(&self) -> bool {
        matches!(
            self,
            OptimizeOutcome::Converged { .. } | OptimizeOutcome::AlreadyOptimal { .. }
        )
    }
}

impl From<OptimizeError> for OptimizeOutcome {
    fn from(value: OptimizeError) -> Self {
        match value {
            OptimizeError::NotConverged {
                iterations,
                residual,
            } => OptimizeOutcome::NotConverged {
                iterations,
                residual,
            },
            OptimizeError::Infeasible(reason) => OptimizeOutcome::Infeasible(reason),
        }
    }
}

/// A successful search: the optimal configuration and how it was reached.
#[derive(Debug, Clone, PartialEq)]
pub struct Optimized {
    pub spdc: SPDC,
    pub outcome: OptimizeOutcome,
}

impl SPDC {
    /// Phase mismatch `|Delta k| L` at the central frequencies
    #[must_use]
    pub fn phase_mismatch(&self) -> f64 {
        let [x, y, z] = self.delta_k_vector(self.signal.frequency, self.idler.frequency);
        (x * x + y * y + z * z).sqrt() * self.crystal.length
    }

    /// The configuration with the idler frequency set by energy conservation
    /// and its direction by transverse momentum conservation.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizeError::Infeasible`] if the signal frequency is not
    /// below the pump frequency, or if no idler angle conserves transverse
    /// momentum.
    pub fn with_optimum_idler(&self) -> Result<SPDC, OptimizeError> {
        let omega_i = self.pump.frequency - self.signal.frequency;
        if omega_i <= 0.0 {
            return Err(OptimizeError::Infeasible(format!(
                "signal wavelength {:e} m is not longer than the pump wavelength {:e} m",
                self.signal.wavelength(),
                self.pump.wavelength()
            )));
        }
        let mut spdc = self.clone();
        spdc.idler.frequency = omega_i;
        spdc.idler.phi = (self.signal.phi + PI).rem_euclid(2.0 * PI);

        // k_i sin(theta_i) = k_s sin(theta_s), with k_i depending on theta_i
        let transverse = spdc.wavenumber(BeamRole::Signal, spdc.signal.frequency)
            * spdc.signal.theta.sin();
        spdc.idler.theta = 0.0;
        for _ in 0..50 {
            let ratio = transverse / spdc.wavenumber(BeamRole::Idler, omega_i);
            if ratio.abs() > 1.0 {
                return Err(OptimizeError::Infeasible(
                    "no idler angle conserves transverse momentum".to_owned(),
                ));
            }
            let theta = ratio.asin();
            let change = (theta - spdc.idler.theta).abs();
            spdc.idler.theta = theta;
            if change < 1e-15 {
                break;
            }
        }
        Ok(spdc)
    }

    /// Crystal angle within `settings.theta_bounds` at which the longitudinal
    /// mismatch vanishes.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizeError::Infeasible`] if the settings are invalid or the
    /// bounds do not bracket a root, and [`OptimizeError::NotConverged`] if the
    /// bisection runs out of iterations or closes on a discontinuity.
    pub fn optimum_crystal_theta(&self, settings: &OptimizerSettings) -> Result<f64, OptimizeError> {
        settings.validate()?;
        let (low, high) = settings.theta_bounds;
        let mut probe = self.clone();
        let mut mismatch = |theta: f64| {
            probe.crystal.theta = theta;
            probe.delta_k(probe.signal.frequency, probe.idler.frequency)
        };

        let interval = bracket(&mut mismatch, low, high).ok_or_else(|| {
            OptimizeError::Infeasible(format!(
                "no phase matching angle between {low} and {high} rad"
            ))
        })?;
        log::trace!("phase matching angle bracketed in {interval:?}");
        bisect(
            &mut mismatch,
            interval,
            self.crystal.length,
            settings.phase_tolerance,
            settings.max_iterations,
        )
    }

    /// # Errors
    ///
    /// As [`SPDC::optimum_crystal_theta`].
    pub fn with_optimum_crystal_theta(&self, settings: &OptimizerSettings) -> Result<SPDC, OptimizeError> {
        let mut spdc = self.clone();
        spdc.crystal.theta = self.optimum_crystal_theta(settings)?;
        Ok(spdc)
    }

    /// The configuration with the poling period that cancels the unpoled
    /// longitudinal mismatch. A negative period reverses the grating.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizeError::Infeasible`] if the unpoled configuration is
    /// already phase matched, so that no finite period exists.
    pub fn with_optimum_periodic_poling(&self) -> Result<SPDC, OptimizeError> {
        let mut spdc = self.clone();
        spdc.poling = PeriodicPoling::Off;
        let delta_k = spdc.delta_k(spdc.signal.frequency, spdc.idler.frequency);
        let period = 2.0 * PI / delta_k;
        spdc.poling = PeriodicPoling::new(period).map_err(|_| {
            OptimizeError::Infeasible(format!(
                "no finite poling period cancels a mismatch of {delta_k} rad/m"
            ))
        })?;
        Ok(spdc)
    }

    fn is_at_optimum(&self, settings: &OptimizerSettings) -> bool {
        self.is_energy_conserving(1e-12)
            && self.with_optimum_idler().is_ok_and(|optimum| {
                (optimum.idler.theta - self.idler.theta).abs() < 1e-9
                    && (optimum.idler.phi - self.idler.phi).abs() < 1e-9
            })
            && (!settings.match_waists || self.idler.waist == self.signal.waist)
            && self.phase_mismatch() <= settings.phase_tolerance
    }

    /// Move to the optimum with the default settings.
    ///
    /// # Errors
    ///
    /// Returns the [`OptimizeError`] if no optimum was found, leaving the
    /// configuration untouched.
    pub fn to_optimum(&mut self) -> Result<OptimizeOutcome, OptimizeError> {
        self.to_optimum_with(&OptimizerSettings::default())
    }

    /// # Errors
    ///
    /// As [`SPDC::to_optimum`].
    pub fn to_optimum_with(&mut self, settings: &OptimizerSettings) -> Result<OptimizeOutcome, OptimizeError> {
        let optimized = optimize(self, settings)?;
        *self = optimized.spdc;
        Ok(optimized.outcome)
    }

    /// Move to the optimum if one is found, otherwise report why and leave
    /// the configuration untouched.
    pub fn try_as_optimum(&mut self) -> OptimizeOutcome {
        self.try_as_optimum_with(&OptimizerSettings::default())
    }

    pub fn try_as_optimum_with(&mut self, settings: &OptimizerSettings) -> OptimizeOutcome {
        match optimize(self, settings) {
            Ok(Optimized { spdc, outcome }) => {
                if matches!(outcome, OptimizeOutcome::Converged { .. }) {
                    *self = spdc;
                }
                outcome
            }
            Err(error) => {
                log::debug!("optimizer failed: {error}");
                error.into()
            }
        }
    }
}

/// First sign change of `f` on a uniform scan of `[low, high]`
fn bracket<F: FnMut(f64) -> f64>(f: &mut F, low: f64, high: f64) -> Option<(f64, f64)> {
    #[allow(clippy::cast_precision_loss)]
    let step = (high - low) / (THETA_SCAN_SAMPLES - 1) as f64;
    let mut previous = (low, f(low));
    for i in 1..THETA_SCAN_SAMPLES {
        #[allow(clippy::cast_precision_loss)]
        let x = if i == THETA_SCAN_SAMPLES - 1 {
            high
        } else {
            low + step * i as f64
        };
        let fx = f(x);
        if previous.1 == 0.0 {
            return Some((previous.0, previous.0));
        }
        if fx.signum() != previous.1.signum() {
            return Some((previous.0, x));
        }
        previous = (x, fx);
    }
    (previous.1 == 0.0).then_some((previous.0, previous.0))
}

/// Bisect a sign change of `f` on `[a, b]` until `|f| scale` is well inside
/// `tolerance`.
///
/// Once the interval reaches machine precision the midpoint is accepted only
/// if it meets `tolerance` itself.
fn bisect<F: FnMut(f64) -> f64>(
    f: &mut F,
    (mut a, mut b): (f64, f64),
    scale: f64,
    tolerance: f64,
    max_iterations: usize,
) -> Result<f64, OptimizeError> {
    let mut fa = f(a);
    let mut residual = f64::INFINITY;
    for iteration in 1..=max_iterations {
        let mid = 0.5 * (a + b);
        let fm = f(mid);
        residual = fm.abs() * scale;
        if residual <= tolerance * 1e-3 {
            return Ok(mid);
        }
        if (b - a) <= f64::EPSILON * mid.abs() {
            if residual <= tolerance {
                return Ok(mid);
            }
            // A sign change that never shrinks is a pole, not a root
            return Err(OptimizeError::NotConverged {
                iterations: iteration,
                residual,
            });
        }
        if fa.signum() == fm.signum() {
            a = mid;
            fa = fm;
        } else {
            b = mid;
        }
    }
    Err(OptimizeError::NotConverged {
        iterations: max_iterations,
        residual,
    })
}

/// Find the optimum of `spdc` without modifying it.
///
/// # Errors
///
/// Returns [`OptimizeError::Infeasible`] if no phase matched configuration
/// exists within the settings, and [`OptimizeError::NotConverged`] if the
/// search exceeds `settings.max_iterations`.
pub fn optimize(spdc: &SPDC, settings: &OptimizerSettings) -> Result<Optimized, OptimizeError> {
    settings.validate()?;
    if spdc.is_at_optimum(settings) {
        return Ok(Optimized {
            spdc: spdc.clone(),
            outcome: OptimizeOutcome::AlreadyOptimal {
                residual: spdc.phase_mismatch(),
            },
        });
    }

    let mut current = spdc.with_optimum_idler()?;
    if settings.match_waists {
        current.idler.waist = current.signal.waist;
    }

    let mut residual = f64::INFINITY;
    for iteration in 1..=settings.max_iterations {
        let theta = current.crystal.theta;
        current = match current.poling {
            PeriodicPoling::On { .. } => current.with_optimum_periodic_poling()?,
            PeriodicPoling::Off => current.with_optimum_crystal_theta(settings)?,
        };
        // The idler angle depends on its index, which moves with the crystal
        current = current.with_optimum_idler()?;
        residual = current.phase_mismatch();
        log::debug!(
            "optimizer iteration {iteration}: theta = {}, residual = {residual:e}",
            current.crystal.theta
        );
        if residual <= settings.phase_tolerance && (current.crystal.theta - theta).abs() < 1e-12 {
            return Ok(Optimized {
                spdc: current,
                outcome: OptimizeOutcome::Converged {
                    iterations: iteration,
                    residual,
                },
            });
        }
    }
    Err(OptimizeError::NotConverged {
        iterations: settings.max_iterations,
        residual,
    })
}
