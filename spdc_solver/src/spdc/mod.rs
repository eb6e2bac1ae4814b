//! The SPDC configuration and the physics evaluated directly on it.
//!
//! An [`SPDC`] is mutated through validating setters, so a configuration that
//! exists is always one the engines can evaluate. Nothing derived from it is
//! cached: after any setter, the next computation sees the new state.

use crate::{
    apodization::{Apodization, PeriodicPoling},
    dispersion::{MaterialRegistry, Polarization},
    error::{ensure_finite, ensure_positive, Result, SpdcError},
    units::{frequency_from_wavelength, NANO},
};

pub mod beam;
pub mod config;
pub mod crystal;
pub mod optimum;
pub mod phasematch;

pub use beam::Beam;
pub use config::SpdcConfig;
pub use crystal::{CrystalKind, CrystalSetup, PMType};
pub use optimum::{optimize, OptimizeOutcome, Optimized, OptimizerSettings};
pub use phasematch::BeamRole;

/// A complete down-conversion configuration.
///
/// All quantities are SI: frequencies in rad/s, lengths in metres,
/// temperatures in kelvin, angles in radians, power in watts.
#[derive(Debug, Clone, PartialEq)]
pub struct SPDC {
    pub(crate) crystal: CrystalSetup,
    pub(crate) pump: Beam,
    pub(crate) signal: Beam,
    pub(crate) idler: Beam,
    /// FWHM of the pump spectrum, as a wavelength (m)
    pub(crate) pump_bandwidth: f64,
    pub(crate) pump_average_power: f64,
    /// Pump amplitudes below this are treated as zero
    pub(crate) pump_spectrum_threshold: f64,
    pub(crate) poling: PeriodicPoling,
    pub(crate) apodization: Apodization,
    /// Effective nonlinear coefficient (m/V)
    pub(crate) deff: f64,
}

impl Default for SPDC {
    fn default() -> Self {
        let pump = Beam::new(775.0 * NANO, 100e-6);
        let signal = Beam::new(1550.0 * NANO, 100e-6);
        let idler = Beam {
            frequency: pump.frequency - signal.frequency,
            phi: signal.phi + std::f64::consts::PI,
            ..signal
        };
        SPDC {
            crystal: CrystalSetup::default(),
            pump,
            signal,
            idler,
            pump_bandwidth: 5.35 * NANO,
            pump_average_power: 1e-3,
            pump_spectrum_threshold: 1e-9,
            poling: PeriodicPoling::Off,
            apodization: Apodization::Off,
            deff: 1e-12,
        }
    }
}

impl SPDC {
    #[must_use]
    pub fn crystal(&self) -> &CrystalSetup {
        &self.crystal
    }

    #[must_use]
    pub fn pump(&self) -> &Beam {
        &self.pump
    }

    #[must_use]
    pub fn signal(&self) -> &Beam {
        &self.signal
    }

    #[must_use]
    pub fn idler(&self) -> &Beam {
        &self.idler
    }

    #[must_use]
    pub fn pump_bandwidth(&self) -> f64 {
        self.pump_bandwidth
    }

    #[must_use]
    pub fn pump_average_power(&self) -> f64 {
        self.pump_average_power
    }

    #[must_use]
    pub fn pump_spectrum_threshold(&self) -> f64 {
        self.pump_spectrum_threshold
    }

    #[must_use]
    pub fn periodic_poling(&self) -> PeriodicPoling {
        self.poling
    }

    #[must_use]
    pub fn apodization(&self) -> &Apodization {
        &self.apodization
    }

    #[must_use]
    pub fn deff(&self) -> f64 {
        self.deff
    }

    /// Whether `pump = signal + idler` holds to relative tolerance `tolerance`
    #[must_use]
    pub fn is_energy_conserving(&self, tolerance: f64) -> bool {
        let residual = self.pump.frequency - self.signal.frequency - self.idler.frequency;
        residual.abs() <= tolerance * self.pump.frequency
    }

    /// Polarisations of the (pump, signal, idler) set by the phase matching type
    #[must_use]
    pub fn polarizations(&self) -> (Polarization, Polarization, Polarization) {
        self.crystal.pm_type.polarizations()
    }

    // Crystal

    pub fn set_crystal_kind(&mut self, kind: CrystalKind) {
        self.crystal.kind = kind;
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::UnknownMaterial`] if `name` is not in `registry`.
    pub fn set_crystal_name(&mut self, registry: &MaterialRegistry, name: &str) -> Result<()> {
        self.crystal.kind = CrystalKind::from_name(registry, name)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::FormulaParse`] if the formula text is malformed.
    pub fn set_crystal_formula(&mut self, text: &str) -> Result<()> {
        self.crystal.kind = CrystalKind::custom(text)?;
        Ok(())
    }

    pub fn set_pm_type(&mut self, pm_type: PMType) {
        self.crystal.pm_type = pm_type;
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] if `theta` is not finite.
    pub fn set_crystal_theta(&mut self, theta: f64) -> Result<()> {
        self.crystal.theta = ensure_finite("crystal theta", theta)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] if `phi` is not finite.
    pub fn set_crystal_phi(&mut self, phi: f64) -> Result<()> {
        self.crystal.phi = ensure_finite("crystal phi", phi)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] unless `length` is positive.
    pub fn set_crystal_length(&mut self, length: f64) -> Result<()> {
        self.crystal.length = ensure_positive("crystal length", length)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] unless the temperature (K) is positive.
    pub fn set_crystal_temperature(&mut self, temperature: f64) -> Result<()> {
        self.crystal.temperature = ensure_positive("crystal temperature", temperature)?;
        Ok(())
    }

    pub fn set_counter_propagation(&mut self, counter_propagation: bool) {
        self.crystal.counter_propagation = counter_propagation;
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] if the poling period is zero or not finite.
    pub fn set_periodic_poling(&mut self, poling: PeriodicPoling) -> Result<()> {
        if let PeriodicPoling::On { period } = poling {
            PeriodicPoling::new(period)?;
        }
        self.poling = poling;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] for invalid apodization parameters.
    pub fn set_apodization(&mut self, apodization: Apodization) -> Result<()> {
        apodization.validate()?;
        self.apodization = apodization;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] if `deff` is not finite.
    pub fn set_deff(&mut self, deff: f64) -> Result<()> {
        self.deff = ensure_finite("deff", deff)?;
        Ok(())
    }

    // Pump

    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] unless `wavelength` is positive.
    pub fn set_pump_wavelength(&mut self, wavelength: f64) -> Result<()> {
        self.pump.frequency =
            frequency_from_wavelength(ensure_positive("pump wavelength", wavelength)?);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] unless `frequency` is positive.
    pub fn set_pump_frequency(&mut self, frequency: f64) -> Result<()> {
        self.pump.frequency = ensure_positive("pump frequency", frequency)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] unless `waist` is positive.
    pub fn set_pump_waist(&mut self, waist: f64) -> Result<()> {
        self.pump.waist = ensure_positive("pump waist", waist)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] if `position` is not finite.
    pub fn set_pump_waist_position(&mut self, position: f64) -> Result<()> {
        self.pump.waist_position = ensure_finite("pump waist position", position)?;
        Ok(())
    }

    /// Set the pump spectral FWHM as a wavelength (m).
    ///
    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] unless `bandwidth` is positive.
    pub fn set_pump_bandwidth(&mut self, bandwidth: f64) -> Result<()> {
        self.pump_bandwidth = ensure_positive("pump bandwidth", bandwidth)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] if `power` is negative or not finite.
    pub fn set_pump_average_power(&mut self, power: f64) -> Result<()> {
        if !(power.is_finite() && power >= 0.0) {
            return Err(SpdcError::Domain(format!(
                "pump power must be finite and non-negative, got {power}"
            )));
        }
        self.pump_average_power = power;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] unless `threshold` is in `[0, 1)`.
    pub fn set_pump_spectrum_threshold(&mut self, threshold: f64) -> Result<()> {
        if !(0.0..1.0).contains(&threshold) {
            return Err(SpdcError::Domain(format!(
                "pump spectrum threshold must be in [0, 1), got {threshold}"
            )));
        }
        self.pump_spectrum_threshold = threshold;
        Ok(())
    }

    // Signal and idler

    fn beam_mut(&mut self, role: BeamRole) -> &mut Beam {
        match role {
            BeamRole::Pump => &mut self.pump,
            BeamRole::Signal => &mut self.signal,
            BeamRole::Idler => &mut self.idler,
        }
    }

    #[must_use]
    pub fn beam(&self, role: BeamRole) -> &Beam {
        match role {
            BeamRole::Pump => &self.pump,
            BeamRole::Signal => &self.signal,
            BeamRole::Idler => &self.idler,
        }
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] unless `wavelength` is positive.
    pub fn set_wavelength(&mut self, role: BeamRole, wavelength: f64) -> Result<()> {
        let wavelength = ensure_positive("wavelength", wavelength)?;
        self.beam_mut(role).frequency = frequency_from_wavelength(wavelength);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] unless `frequency` is positive.
    pub fn set_frequency(&mut self, role: BeamRole, frequency: f64) -> Result<()> {
        self.beam_mut(role).frequency = ensure_positive("frequency", frequency)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] unless `waist` is positive.
    pub fn set_waist(&mut self, role: BeamRole, waist: f64) -> Result<()> {
        self.beam_mut(role).waist = ensure_positive("waist", waist)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] if `position` is not finite.
    pub fn set_waist_position(&mut self, role: BeamRole, position: f64) -> Result<()> {
        self.beam_mut(role).waist_position = ensure_finite("waist position", position)?;
        Ok(())
    }

    /// Set the internal emission angle from `z`.
    ///
    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] if `theta` is not finite, and for the pump,
    /// which always propagates along `z`.
    pub fn set_theta(&mut self, role: BeamRole, theta: f64) -> Result<()> {
        if role == BeamRole::Pump {
            return Err(SpdcError::Domain(
                "the pump propagates along z".to_owned(),
            ));
        }
        self.beam_mut(role).theta = ensure_finite("theta", theta)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] if `phi` is not finite.
    pub fn set_phi(&mut self, role: BeamRole, phi: f64) -> Result<()> {
        self.beam_mut(role).phi = ensure_finite("phi", phi)?;
        Ok(())
    }

    /// Emission angle outside the crystal, refracted at a face normal to `z`
    #[must_use]
    pub fn theta_external(&self, role: BeamRole) -> f64 {
        let beam = self.beam(role);
        let n = self.refractive_index(role, beam.frequency);
        (n * beam.theta.sin()).clamp(-1.0, 1.0).asin()
    }

    /// Set the emission angle outside the crystal, solving Snell's law for the
    /// internal angle.
    ///
    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] if the angle is not finite or not below 90°.
    pub fn set_theta_external(&mut self, role: BeamRole, theta_external: f64) -> Result<()> {
        ensure_finite("external theta", theta_external)?;
        if theta_external.abs() >= std::f64::consts::FRAC_PI_2 {
            return Err(SpdcError::Domain(format!(
                "external angle must be below 90 degrees, got {theta_external}"
            )));
        }
        let mut updated = self.clone();
        // The extraordinary index depends on the internal angle, so iterate
        for _ in 0..50 {
            let n = updated.refractive_index(role, updated.beam(role).frequency);
            let theta = (theta_external.sin() / n).asin();
            let previous = updated.beam(role).theta;
            updated.set_theta(role, theta)?;
            if (theta - previous).abs() < 1e-15 {
                break;
            }
        }
        *self = updated;
        Ok(())
    }

    /// The configuration with signal and idler exchanged
    #[must_use]
    pub fn with_swapped_signal_idler(&self) -> Self {
        let mut swapped = self.clone();
        std::mem::swap(&mut swapped.signal, &mut swapped.idler);
        swapped.crystal.pm_type = self.crystal.pm_type.swapped();
        swapped
    }
}
