//! Text configuration of an [`SPDC`], in TOML with human units.
//!
//! ```toml
//! deff_pm_per_volt = 1.0
//!
//! [crystal]
//! pm_type = "Type2_e_eo"
//! theta_deg = 28.87
//! length_um = 2000.0
//! temperature_c = 20.0
//! kind = "BBO_1"
//!
//! [pump]
//! wavelength_nm = 775.0
//! waist_um = 100.0
//! bandwidth_nm = 5.35
//!
//! [signal]
//! wavelength_nm = 1550.0
//! waist_um = 100.0
//! ```
//!
//! The idler may be omitted, in which case it is set by energy and transverse
//! momentum conservation with the signal waist.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    apodization::{Apodization, PeriodicPoling},
    dispersion::{CustomFormula, MaterialRegistry},
    error::{Result, SpdcError},
    units::{celsius_to_kelvin, kelvin_to_celsius, MICRO, MILLI, NANO},
};

use super::{BeamRole, CrystalKind, PMType, SPDC};

/// A crystal given by registered name, or inline by its index formulas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CrystalKindConfig {
    Name(String),
    Formula { no: String, ne: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrystalConfig {
    pub pm_type: PMType,
    pub theta_deg: f64,
    #[serde(default)]
    pub phi_deg: f64,
    pub length_um: f64,
    #[serde(default = "default_temperature_c")]
    pub temperature_c: f64,
    #[serde(default)]
    pub counter_propagation: bool,
    pub kind: CrystalKindConfig,
}

fn default_temperature_c() -> f64 {
    20.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PumpConfig {
    pub wavelength_nm: f64,
    pub waist_um: f64,
    pub bandwidth_nm: f64,
    #[serde(default = "default_average_power_mw")]
    pub average_power_mw: f64,
    #[serde(default = "default_spectrum_threshold")]
    pub spectrum_threshold: f64,
    #[serde(default)]
    pub waist_position_um: f64,
}

fn default_average_power_mw() -> f64 {
    1.0
}

fn default_spectrum_threshold() -> f64 {
    1e-9
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BeamConfig {
    pub wavelength_nm: f64,
    #[serde(default)]
    pub theta_deg: f64,
    #[serde(default)]
    pub phi_deg: f64,
    pub waist_um: f64,
    #[serde(default)]
    pub waist_position_um: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolingConfig {
    pub poling_period_um: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "parameter", rename_all = "lowercase")]
pub enum ApodizationConfig {
    Gaussian { fwhm_um: f64 },
    Bartlett(f64),
    Blackman(f64),
    Connes(f64),
    Cosine(f64),
    Hamming(f64),
    Welch(f64),
    Interpolate(Vec<f64>),
}

/// The text form of an [`SPDC`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpdcConfig {
    #[serde(default = "default_deff")]
    pub deff_pm_per_volt: f64,
    pub crystal: CrystalConfig,
    pub pump: PumpConfig,
    pub signal: BeamConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idler: Option<BeamConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periodic_poling: Option<PolingConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apodization: Option<ApodizationConfig>,
}

fn default_deff() -> f64 {
    1.0
}

fn apodization_config(apodization: &Apodization) -> Option<ApodizationConfig> {
    Some(match apodization {
        Apodization::Off => return None,
        Apodization::Gaussian { fwhm } => ApodizationConfig::Gaussian {
            fwhm_um: fwhm / MICRO,
        },
        Apodization::Bartlett(a) => ApodizationConfig::Bartlett(*a),
        Apodization::Blackman(a) => ApodizationConfig::Blackman(*a),
        Apodization::Connes(a) => ApodizationConfig::Connes(*a),
        Apodization::Cosine(a) => ApodizationConfig::Cosine(*a),
        Apodization::Hamming(a) => ApodizationConfig::Hamming(*a),
        Apodization::Welch(a) => ApodizationConfig::Welch(*a),
        Apodization::Interpolate(values) => ApodizationConfig::Interpolate(values.clone()),
    })
}

impl From<&ApodizationConfig> for Apodization {
    fn from(value: &ApodizationConfig) -> Self {
        match value {
            ApodizationConfig::Gaussian { fwhm_um } => Apodization::Gaussian {
                fwhm: fwhm_um * MICRO,
            },
            ApodizationConfig::Bartlett(a) => Apodization::Bartlett(*a),
            ApodizationConfig::Blackman(a) => Apodization::Blackman(*a),
            ApodizationConfig::Connes(a) => Apodization::Connes(*a),
            ApodizationConfig::Cosine(a) => Apodization::Cosine(*a),
            ApodizationConfig::Hamming(a) => Apodization::Hamming(*a),
            ApodizationConfig::Welch(a) => Apodization::Welch(*a),
            ApodizationConfig::Interpolate(values) => Apodization::Interpolate(values.clone()),
        }
    }
}

impl SpdcConfig {
    fn beam_config(spdc: &SPDC, role: BeamRole) -> BeamConfig {
        let beam = spdc.beam(role);
        BeamConfig {
            wavelength_nm: beam.wavelength() / NANO,
            theta_deg: beam.theta.to_degrees(),
            phi_deg: beam.phi.to_degrees(),
            waist_um: beam.waist / MICRO,
            waist_position_um: beam.waist_position / MICRO,
        }
    }

    fn apply_beam(spdc: &mut SPDC, role: BeamRole, config: &BeamConfig) -> Result<()> {
        spdc.set_wavelength(role, config.wavelength_nm * NANO)?;
        spdc.set_theta(role, config.theta_deg.to_radians())?;
        spdc.set_phi(role, config.phi_deg.to_radians())?;
        spdc.set_waist(role, config.waist_um * MICRO)?;
        spdc.set_waist_position(role, config.waist_position_um * MICRO)
    }

    /// Build the configuration, resolving crystal names against `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`SpdcError::UnknownMaterial`] for an unregistered crystal,
    /// [`SpdcError::FormulaParse`] for a malformed inline formula, and
    /// [`SpdcError::Domain`] for non-physical values.
    pub fn to_spdc(&self, registry: &MaterialRegistry) -> Result<SPDC> {
        let mut spdc = SPDC::default();
        spdc.set_deff(self.deff_pm_per_volt * 1e-12)?;

        let crystal = &self.crystal;
        match &crystal.kind {
            CrystalKindConfig::Name(name) => spdc.set_crystal_name(registry, name)?,
            CrystalKindConfig::Formula { no, ne } => spdc.set_crystal_kind(CrystalKind::Custom(
                Arc::new(CustomFormula::from_expressions(no, ne)?),
            )),
        }
        spdc.set_pm_type(crystal.pm_type);
        spdc.set_crystal_theta(crystal.theta_deg.to_radians())?;
        spdc.set_crystal_phi(crystal.phi_deg.to_radians())?;
        spdc.set_crystal_length(crystal.length_um * MICRO)?;
        spdc.set_crystal_temperature(celsius_to_kelvin(crystal.temperature_c))?;
        spdc.set_counter_propagation(crystal.counter_propagation);

        let pump = &self.pump;
        spdc.set_pump_wavelength(pump.wavelength_nm * NANO)?;
        spdc.set_pump_waist(pump.waist_um * MICRO)?;
        spdc.set_pump_bandwidth(pump.bandwidth_nm * NANO)?;
        spdc.set_pump_average_power(pump.average_power_mw * MILLI)?;
        spdc.set_pump_spectrum_threshold(pump.spectrum_threshold)?;
        spdc.set_pump_waist_position(pump.waist_position_um * MICRO)?;

        Self::apply_beam(&mut spdc, BeamRole::Signal, &self.signal)?;
        match &self.idler {
            Some(idler) => Self::apply_beam(&mut spdc, BeamRole::Idler, idler)?,
            None => {
                spdc.set_waist(BeamRole::Idler, spdc.signal.waist)?;
                spdc.set_waist_position(BeamRole::Idler, spdc.signal.waist_position)?;
                spdc = spdc
                    .with_optimum_idler()
                    .map_err(|e| SpdcError::Domain(e.to_string()))?;
            }
        }

        if let Some(poling) = &self.periodic_poling {
            spdc.set_periodic_poling(PeriodicPoling::new(poling.poling_period_um * MICRO)?)?;
        }
        if let Some(apodization) = &self.apodization {
            spdc.set_apodization(apodization.into())?;
        }
        Ok(spdc)
    }
}

impl From<&SPDC> for SpdcConfig {
    fn from(spdc: &SPDC) -> Self {
        let crystal = &spdc.crystal;
        let kind = match &crystal.kind {
            CrystalKind::Named { name, .. } => CrystalKindConfig::Name(name.clone()),
            CrystalKind::Custom(formula) => CrystalKindConfig::Formula {
                no: formula.no_text().to_owned(),
                ne: formula.ne_text().to_owned(),
            },
        };
        SpdcConfig {
            deff_pm_per_volt: spdc.deff / 1e-12,
            crystal: CrystalConfig {
                pm_type: crystal.pm_type,
                theta_deg: crystal.theta.to_degrees(),
                phi_deg: crystal.phi.to_degrees(),
                length_um: crystal.length / MICRO,
                temperature_c: kelvin_to_celsius(crystal.temperature),
                counter_propagation: crystal.counter_propagation,
                kind,
            },
            pump: PumpConfig {
                wavelength_nm: spdc.pump.wavelength() / NANO,
                waist_um: spdc.pump.waist / MICRO,
                bandwidth_nm: spdc.pump_bandwidth / NANO,
                average_power_mw: spdc.pump_average_power / MILLI,
                spectrum_threshold: spdc.pump_spectrum_threshold,
                waist_position_um: spdc.pump.waist_position / MICRO,
            },
            signal: Self::beam_config(spdc, BeamRole::Signal),
            idler: Some(Self::beam_config(spdc, BeamRole::Idler)),
            periodic_poling: spdc.poling.period().map(|period| PolingConfig {
                poling_period_um: period / MICRO,
            }),
            apodization: apodization_config(&spdc.apodization),
        }
    }
}

impl SPDC {
    /// Parse a configuration, resolving crystal names against the built in materials.
    ///
    /// # Errors
    ///
    /// Returns [`SpdcError::ConfigParse`] for malformed text, and otherwise as
    /// [`SpdcConfig::to_spdc`].
    pub fn from_text(text: &str) -> Result<SPDC> {
        Self::from_text_with_registry(text, &MaterialRegistry::with_builtins())
    }

    /// # Errors
    ///
    /// As [`SPDC::from_text`].
    pub fn from_text_with_registry(text: &str, registry: &MaterialRegistry) -> Result<SPDC> {
        let config: SpdcConfig = toml::from_str(text)?;
        config.to_spdc(registry)
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::ConfigSerialize`] if the configuration cannot be
    /// written as TOML.
    pub fn to_text(&self) -> Result<String> {
        Ok(toml::to_string(&SpdcConfig::from(self))?)
    }
}
