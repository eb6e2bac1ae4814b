use std::{fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    dispersion::{
        polarized_index, BuiltinMaterial, CustomFormula, DispersionFormula, MaterialRegistry,
        Polarization,
    },
    error::{Result, SpdcError},
    units::MICRO,
};

/// Polarisations of (pump, signal, idler), named `Type{n}_{pump}_{signal}{idler}`
/// with `o` ordinary and `e` extraordinary.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PMType {
    Type0_o_oo,
    Type0_e_ee,
    Type1_e_oo,
    #[default]
    Type2_e_eo,
    Type2_e_oe,
}

impl PMType {
    pub const ALL: [PMType; 5] = [
        PMType::Type0_o_oo,
        PMType::Type0_e_ee,
        PMType::Type1_e_oo,
        PMType::Type2_e_eo,
        PMType::Type2_e_oe,
    ];

    /// Polarisation of the (pump, signal, idler)
    #[must_use]
    pub fn polarizations(self) -> (Polarization, Polarization, Polarization) {
        use Polarization::{Extraordinary as E, Ordinary as O};
        match self {
            PMType::Type0_o_oo => (O, O, O),
            PMType::Type0_e_ee => (E, E, E),
            PMType::Type1_e_oo => (E, O, O),
            PMType::Type2_e_eo => (E, E, O),
            PMType::Type2_e_oe => (E, O, E),
        }
    }

    /// The same process with signal and idler exchanged
    #[must_use]
    pub fn swapped(self) -> Self {
        match self {
            PMType::Type2_e_eo => PMType::Type2_e_oe,
            PMType::Type2_e_oe => PMType::Type2_e_eo,
            other => other,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            PMType::Type0_o_oo => "Type0_o_oo",
            PMType::Type0_e_ee => "Type0_e_ee",
            PMType::Type1_e_oo => "Type1_e_oo",
            PMType::Type2_e_eo => "Type2_e_eo",
            PMType::Type2_e_oe => "Type2_e_oe",
        }
    }
}

impl fmt::Display for PMType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PMType {
    type Err = SpdcError;

    fn from_str(s: &str) -> Result<Self> {
        PMType::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| SpdcError::Domain(format!("unknown phase matching type `{s}`")))
    }
}

/// The crystal material, resolved when it is assigned.
#[derive(Debug, Clone, PartialEq)]
pub enum CrystalKind {
    /// A formula registered under a name
    Named {
        name: String,
        formula: DispersionFormula,
    },
    /// An inline formula text
    Custom(Arc<CustomFormula>),
}

impl CrystalKind {
    /// # Errors
    ///
    /// Returns [`SpdcError::UnknownMaterial`] if `name` is not registered.
    pub fn from_name(registry: &MaterialRegistry, name: &str) -> Result<Self> {
        Ok(CrystalKind::Named {
            name: name.to_owned(),
            formula: registry.lookup(name)?,
        })
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::FormulaParse`] if the text is malformed.
    pub fn custom(text: &str) -> Result<Self> {
        Ok(CrystalKind::Custom(Arc::new(CustomFormula::parse(text)?)))
    }

    #[must_use]
    pub fn builtin(material: BuiltinMaterial) -> Self {
        CrystalKind::Named {
            name: material.name().to_owned(),
            formula: DispersionFormula::Builtin(material),
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            CrystalKind::Named { name, .. } => Some(name),
            CrystalKind::Custom(_) => None,
        }
    }

    #[must_use]
    pub fn formula(&self) -> DispersionFormula {
        match self {
            CrystalKind::Named { formula, .. } => formula.clone(),
            CrystalKind::Custom(formula) => DispersionFormula::Custom(Arc::clone(formula)),
        }
    }

    #[inline]
    #[must_use]
    pub fn index(&self, lambda: f64, temperature: f64, polarization: Polarization, theta: f64) -> f64 {
        match self {
            CrystalKind::Named { formula, .. } => {
                formula.index(lambda, temperature, polarization, theta)
            }
            CrystalKind::Custom(formula) => {
                let (no, ne) = formula.indices(lambda / MICRO, temperature);
                polarized_index(no, ne, polarization, theta)
            }
        }
    }
}

impl Default for CrystalKind {
    fn default() -> Self {
        CrystalKind::builtin(BuiltinMaterial::Bbo)
    }
}

/// Crystal material, cut and geometry.
///
/// `theta` and `phi` orient the optic axis in the lab frame, where the pump
/// propagates along `z`. Lengths are in metres, temperature in kelvin.
#[derive(Debug, Clone, PartialEq)]
pub struct CrystalSetup {
    pub kind: CrystalKind,
    pub pm_type: PMType,
    pub theta: f64,
    pub phi: f64,
    pub length: f64,
    pub temperature: f64,
    pub counter_propagation: bool,
}

impl Default for CrystalSetup {
    fn default() -> Self {
        CrystalSetup {
            kind: CrystalKind::default(),
            pm_type: PMType::default(),
            theta: 28.868_498_466_586_f64.to_radians(),
            phi: 0.0,
            length: 2e-3,
            temperature: 293.15,
            counter_propagation: false,
        }
    }
}

impl CrystalSetup {
    /// Unit vector along the optic axis
    #[must_use]
    pub fn optic_axis(&self) -> [f64; 3] {
        unit_vector(self.theta, self.phi)
    }

    /// Index for light of vacuum wavelength `lambda` with `polarization`,
    /// propagating along the unit vector `direction`.
    #[inline]
    #[must_use]
    pub fn index_along(&self, lambda: f64, polarization: Polarization, direction: &[f64; 3]) -> f64 {
        let axis = self.optic_axis();
        let cos = (axis[0] * direction[0] + axis[1] * direction[1] + axis[2] * direction[2])
            .clamp(-1.0, 1.0);
        self.kind
            .index(lambda, self.temperature, polarization, cos.acos())
    }
}

/// Unit vector at polar angle `theta` from `z` and azimuth `phi`
#[inline]
#[must_use]
pub fn unit_vector(theta: f64, phi: f64) -> [f64; 3] {
    let (st, ct) = theta.sin_cos();
    let (sp, cp) = phi.sin_cos();
    [st * cp, st * sp, ct]
}
