use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::units::MICRO;

pub mod formula;
pub mod materials;

pub use formula::CustomFormula;
pub use materials::{lookup_material, BuiltinMaterial, MaterialMeta, MaterialRegistry};

/// Polarisation of a beam relative to the crystal's optic axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarization {
    Ordinary,
    Extraordinary,
}

/// Refractive index model of a uniaxial crystal.
///
/// Custom formulas are shared, so cloning a configuration never re-parses them.
#[derive(Debug, Clone, PartialEq)]
pub enum DispersionFormula {
    Builtin(BuiltinMaterial),
    Custom(Arc<CustomFormula>),
}

impl DispersionFormula {
    /// # Errors
    ///
    /// Returns a [`crate::error::FormulaError`] if the text does not define `no` and `ne`.
    pub fn custom(text: &str) -> Result<Self, crate::error::FormulaError> {
        Ok(DispersionFormula::Custom(Arc::new(CustomFormula::parse(
            text,
        )?)))
    }

    /// Ordinary and extraordinary index at vacuum wavelength `lambda` (m)
    /// and `temperature` (K)
    #[inline]
    #[must_use]
    pub fn indices(&self, lambda: f64, temperature: f64) -> (f64, f64) {
        let lambda_um = lambda / MICRO;
        match self {
            DispersionFormula::Builtin(material) => material.indices(lambda_um, temperature),
            DispersionFormula::Custom(formula) => formula.indices(lambda_um, temperature),
        }
    }

    /// Index seen by light polarised along `polarization`, propagating at angle
    /// `theta` to the optic axis.
    ///
    /// For the extraordinary wave
    /// ```latex
    /// 1 / n(\theta)^2 = \cos^2\theta / n_o^2 + \sin^2\theta / n_e^2
    /// ```
    #[inline]
    #[must_use]
    pub fn index(
        &self,
        lambda: f64,
        temperature: f64,
        polarization: Polarization,
        theta: f64,
    ) -> f64 {
        let (no, ne) = self.indices(lambda, temperature);
        polarized_index(no, ne, polarization, theta)
    }
}

/// Index of the wave with `polarization` at angle `theta` to the optic axis,
/// given the principal indices.
#[inline]
#[must_use]
pub fn polarized_index(no: f64, ne: f64, polarization: Polarization, theta: f64) -> f64 {
    match polarization {
        Polarization::Ordinary => no,
        Polarization::Extraordinary => {
            let (sin, cos) = theta.sin_cos();
            1.0 / ((cos * cos) / (no * no) + (sin * sin) / (ne * ne)).sqrt()
        }
    }
}
