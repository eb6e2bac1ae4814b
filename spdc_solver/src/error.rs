use thiserror::Error;

/// A malformed custom dispersion expression, located by line and column
/// within the formula text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("formula error at line {line}, column {column} near `{token}`: {message}")]
pub struct FormulaError {
    pub line: usize,
    pub column: usize,
    pub token: String,
    pub message: String,
}

impl FormulaError {
    pub(crate) fn new(line: usize, column: usize, token: &str, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            token: token.to_owned(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizeError {
    #[error("optimizer did not converge after {iterations} iterations (residual {residual:e})")]
    NotConverged { iterations: usize, residual: f64 },
    #[error("no feasible optimum: {0}")]
    Infeasible(String),
}

#[derive(Debug, Error)]
pub enum SpdcError {
    #[error("failed to parse configuration: {0}")]
    ConfigParse(String),
    #[error("failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
    #[error("unknown material `{0}`")]
    UnknownMaterial(String),
    #[error(transparent)]
    FormulaParse(#[from] FormulaError),
    #[error("value out of domain: {0}")]
    Domain(String),
    #[error(transparent)]
    Optimize(#[from] OptimizeError),
    #[cfg(feature = "decomposition")]
    #[error(transparent)]
    Linalg(#[from] ndarray_linalg::error::LinalgError),
}

impl From<toml::de::Error> for SpdcError {
    fn from(value: toml::de::Error) -> Self {
        SpdcError::ConfigParse(value.to_string())
    }
}

pub type Result<T, E = SpdcError> = std::result::Result<T, E>;

/// Reject non-finite or non-positive physical quantities at the boundary.
pub(crate) fn ensure_positive(quantity: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(SpdcError::Domain(format!(
            "{quantity} must be finite and positive, got {value}"
        )))
    }
}

pub(crate) fn ensure_finite(quantity: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SpdcError::Domain(format!(
            "{quantity} must be finite, got {value}"
        )))
    }
}

/// A derived quantity that fell outside the range it can physically take.
///
/// These are reported alongside results rather than raised, since exploring
/// degenerate configurations is a valid use of the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericalInstabilityWarning {
    pub quantity: &'static str,
    pub value: f64,
    pub expected: (f64, f64),
}

impl NumericalInstabilityWarning {
    /// Check `value` against `[low - tolerance, high + tolerance]`, logging and
    /// returning a warning if it falls outside.
    #[must_use]
    pub(crate) fn check(
        quantity: &'static str,
        value: f64,
        (low, high): (f64, f64),
        tolerance: f64,
    ) -> Option<Self> {
        if value.is_finite() && value >= low - tolerance && value <= high + tolerance {
            return None;
        }
        log::warn!("{quantity} = {value} is outside the expected range [{low}, {high}]");
        Some(Self {
            quantity,
            value,
            expected: (low, high),
        })
    }
}

impl std::fmt::Display for NumericalInstabilityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} = {} outside [{}, {}]",
            self.quantity, self.value, self.expected.0, self.expected.1
        )
    }
}
