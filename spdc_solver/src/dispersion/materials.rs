use std::collections::BTreeMap;

use crate::error::{Result, SpdcError};

use super::DispersionFormula;

/// Crystals with tabulated Sellmeier coefficients.
///
/// All formulas take the wavelength in µm. Temperature dependence is a linear
/// thermo-optic correction about 20 °C where coefficients are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuiltinMaterial {
    /// β-barium borate
    Bbo,
    /// β-barium borate, alternative fit valid further into the infrared
    Bbo2,
    /// Potassium titanyl phosphate, treated as uniaxial (y as ordinary, z as extraordinary)
    Ktp,
    /// 5% MgO doped lithium niobate
    LiNbO3,
    /// Congruent (undoped) lithium niobate
    LiNbO3Congruent,
    /// Lithium iodate
    LiIO3,
    /// Potassium dihydrogen phosphate
    Kdp,
    /// Ammonium dihydrogen phosphate
    Adp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialMeta {
    pub name: &'static str,
    pub description: &'static str,
    pub reference: &'static str,
}

const REFERENCE_TEMPERATURE: f64 = 293.15;

impl BuiltinMaterial {
    pub const ALL: [BuiltinMaterial; 8] = [
        BuiltinMaterial::Bbo,
        BuiltinMaterial::Bbo2,
        BuiltinMaterial::Ktp,
        BuiltinMaterial::LiNbO3,
        BuiltinMaterial::LiNbO3Congruent,
        BuiltinMaterial::LiIO3,
        BuiltinMaterial::Kdp,
        BuiltinMaterial::Adp,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        self.meta().name
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    #[must_use]
    pub fn meta(self) -> MaterialMeta {
        match self {
            BuiltinMaterial::Bbo => MaterialMeta {
                name: "BBO_1",
                description: "beta barium borate",
                reference: "Eimerl et al. 1987",
            },
            BuiltinMaterial::Bbo2 => MaterialMeta {
                name: "BBO_2",
                description: "beta barium borate",
                reference: "Handbook of Nonlinear Optical Crystals",
            },
            BuiltinMaterial::Ktp => MaterialMeta {
                name: "KTP",
                description: "potassium titanyl phosphate",
                reference: "Kato 1991",
            },
            BuiltinMaterial::LiNbO3 => MaterialMeta {
                name: "LiNbO3_1",
                description: "lithium niobate, 5% MgO doped",
                reference: "Zelmon et al. 1997",
            },
            BuiltinMaterial::LiNbO3Congruent => MaterialMeta {
                name: "LiNbO3_2",
                description: "lithium niobate, congruent",
                reference: "Zelmon et al. 1997",
            },
            BuiltinMaterial::LiIO3 => MaterialMeta {
                name: "LiIO3",
                description: "lithium iodate",
                reference: "Handbook of Nonlinear Optical Crystals",
            },
            BuiltinMaterial::Kdp => MaterialMeta {
                name: "KDP_1",
                description: "potassium dihydrogen phosphate",
                reference: "Handbook of Nonlinear Optical Crystals",
            },
            BuiltinMaterial::Adp => MaterialMeta {
                name: "ADP",
                description: "ammonium dihydrogen phosphate",
                reference: "Zernike 1964",
            },
        }
    }

    /// Ordinary and extraordinary index at `lambda_um` (µm) and `temperature` (K)
    #[must_use]
    pub fn indices(self, lambda_um: f64, temperature: f64) -> (f64, f64) {
        let l2 = lambda_um * lambda_um;
        let dt = temperature - REFERENCE_TEMPERATURE;
        match self {
            BuiltinMaterial::Bbo => {
                let no = (2.7405 + 0.0184 / (l2 - 0.0179) - 0.0155 * l2).sqrt();
                let ne = (2.3730 + 0.0128 / (l2 - 0.0156) - 0.0044 * l2).sqrt();
                (no - 9.3e-6 * dt, ne - 16.6e-6 * dt)
            }
            BuiltinMaterial::Bbo2 => {
                let no = (2.7359 + 0.018_78 / (l2 - 0.018_22) - 0.013_54 * l2).sqrt();
                let ne = (2.3753 + 0.012_24 / (l2 - 0.016_67) - 0.015_16 * l2).sqrt();
                (no - 9.3e-6 * dt, ne - 16.6e-6 * dt)
            }
            BuiltinMaterial::Ktp => {
                let ny = (2.09930 + 0.922_683 / (1.0 - 0.046_769_5 / l2) - 0.013_840_8 * l2).sqrt();
                let nz = (2.12725 + 1.18431 / (1.0 - 0.051_485_2 / l2)
                    + 0.6603 / (1.0 - 100.005_07 / l2)
                    - 9.689_56e-3 * l2)
                    .sqrt();
                let l3 = l2 * lambda_um;
                let dny = (0.1997 / l3 - 0.4063 / l2 + 0.5154 / lambda_um + 0.5425) * 1e-5;
                let dnz = (0.9221 / l3 - 2.9220 / l2 + 3.6677 / lambda_um - 0.1897) * 1e-5;
                (ny + dny * dt, nz + dnz * dt)
            }
            BuiltinMaterial::LiNbO3 => {
                let no = (1.0
                    + 2.4272 * l2 / (l2 - 0.01478)
                    + 1.4617 * l2 / (l2 - 0.05612)
                    + 9.6536 * l2 / (l2 - 371.216))
                    .sqrt();
                let ne = (1.0
                    + 2.2454 * l2 / (l2 - 0.01242)
                    + 1.3005 * l2 / (l2 - 0.05313)
                    + 6.8972 * l2 / (l2 - 331.33))
                    .sqrt();
                (no, ne)
            }
            BuiltinMaterial::LiNbO3Congruent => {
                let no = (1.0
                    + 2.6734 * l2 / (l2 - 0.01764)
                    + 1.2290 * l2 / (l2 - 0.05914)
                    + 12.614 * l2 / (l2 - 474.60))
                    .sqrt();
                let ne = (1.0
                    + 2.9804 * l2 / (l2 - 0.02047)
                    + 0.5981 * l2 / (l2 - 0.0666)
                    + 8.9543 * l2 / (l2 - 416.08))
                    .sqrt();
                (no, ne)
            }
            BuiltinMaterial::LiIO3 => {
                let no = (2.083_648 + 1.332_068 * l2 / (l2 - 0.035_306) - 0.008_525 * l2).sqrt();
                let ne = (1.673_463 + 1.245_229 * l2 / (l2 - 0.028_224) - 0.003_641 * l2).sqrt();
                (no, ne)
            }
            BuiltinMaterial::Kdp => {
                let no = (2.259_276 + 0.010_089_56 / (l2 - 0.012_942_625)
                    + 13.005_22 * l2 / (l2 - 400.0))
                    .sqrt();
                let ne = (2.132_668 + 0.008_637_494 / (l2 - 0.012_281_043)
                    + 3.227_992_4 * l2 / (l2 - 400.0))
                    .sqrt();
                (no, ne)
            }
            BuiltinMaterial::Adp => {
                let no = (2.302_842 + 0.011_125_165 / (l2 - 0.013_253_659)
                    + 15.102_464 * l2 / (l2 - 400.0))
                    .sqrt();
                let ne = (2.163_510 + 0.009_616_676 / (l2 - 0.012_989_120)
                    + 5.919_896 * l2 / (l2 - 400.0))
                    .sqrt();
                (no, ne)
            }
        }
    }
}

/// Named crystal formulas.
///
/// Built once and then shared read-only, the registry is passed to whatever
/// resolves crystal names (configuration loading, crystal setters).
#[derive(Debug, Clone, Default)]
pub struct MaterialRegistry {
    entries: BTreeMap<String, DispersionFormula>,
}

impl MaterialRegistry {
    /// An empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every [`BuiltinMaterial`] under its canonical name
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for material in BuiltinMaterial::ALL {
            registry
                .entries
                .insert(material.name().to_owned(), DispersionFormula::Builtin(material));
        }
        registry
    }

    /// Add (or replace) a named formula.
    pub fn register(&mut self, name: impl Into<String>, formula: DispersionFormula) {
        self.entries.insert(name.into(), formula);
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::UnknownMaterial`] if no formula is registered under `name`.
    pub fn lookup(&self, name: &str) -> Result<DispersionFormula> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| SpdcError::UnknownMaterial(name.to_owned()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// The registered name of `formula`, if any
    #[must_use]
    pub fn name_of(&self, formula: &DispersionFormula) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, f)| *f == formula)
            .map(|(name, _)| name.as_str())
    }
}

/// Resolve a builtin material by name without constructing a registry.
///
/// # Errors
///
/// Returns [`SpdcError::UnknownMaterial`] for names that are not builtin.
pub fn lookup_material(name: &str) -> Result<DispersionFormula> {
    BuiltinMaterial::from_name(name)
        .map(DispersionFormula::Builtin)
        .ok_or_else(|| SpdcError::UnknownMaterial(name.to_owned()))
}
