use thiserror::Error;

use crate::quat::Quaternion;

/// Errors raised while rotating a volume or handling motion parameters.
///
/// Every variant is unrecoverable at the point of detection: the current
/// rotation call is abandoned and the caller decides whether to abort the
/// batch or skip the timepoint. A half-rotated volume is never returned.
#[derive(Debug, Error)]
pub enum RotateError {
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    #[error("Euler angle extraction did not converge within {iterations} iterations")]
    ConvergenceFailure { iterations: usize },

    #[error("all shear decompositions are singular for quaternion ({0:?})")]
    SingularDecomposition(Quaternion),

    #[error("no repairing quaternion found within {steps} steps")]
    RepairExhausted { steps: usize },

    #[error("unsupported mode: {0}")]
    UnsupportedMode(&'static str),

    #[error("parameter file line {line}: {reason}")]
    ParseError { line: usize, reason: String },
}
