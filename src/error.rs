//! Error types, one enum per layer.

use thiserror::Error;

use crate::config::ConfigError;
use crate::devices::DeviceId;
use crate::ea::VariableEncoding;

/// Invalid variable layout or timing, detected before any evaluation runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProblemError {
    #[error("problem has no parts")]
    NoParts,

    #[error("device {device}: variable {index} has invalid bounds [{min}, {max}]")]
    InvalidBounds {
        device: DeviceId,
        index: usize,
        min: f64,
        max: f64,
    },

    #[error("device {device}: declares {found:?} variables in a {expected:?} problem")]
    EncodingMismatch {
        device: DeviceId,
        expected: VariableEncoding,
        found: VariableEncoding,
    },

    #[error("invalid simulation timing: {0}")]
    Timing(String),
}

/// Failure of a single fitness evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("chromosome has {actual} genes, layout expects {expected}")]
    ChromosomeLength { expected: usize, actual: usize },

    #[error("chromosome is {found:?} encoded, layout expects {expected:?}")]
    EncodingMismatch {
        expected: VariableEncoding,
        found: VariableEncoding,
    },

    #[error("cannot {action} while the simulation is {phase}")]
    Phase {
        action: &'static str,
        phase: &'static str,
    },
}

/// Failure of one device model inside one evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeviceError {
    #[error("lifecycle violation: {0}")]
    Lifecycle(&'static str),

    #[error("controllable device received no decoded solution")]
    MissingDecodedSolution,

    #[error("decoded solution has {found} values, expected {expected}")]
    DecodedLength { expected: usize, found: usize },

    #[error("model state became non-finite: {0}")]
    NonFinite(&'static str),
}

/// Fatal driver misconfiguration.
#[derive(Debug, Error)]
pub enum AlgorithmError {
    #[error("population size must be at least 2, got {0}")]
    EmptyPopulation(usize),

    #[error("no stopping rule configured")]
    NoStoppingRule,

    #[error("invalid stopping rule: {0}")]
    InvalidStoppingRule(String),

    #[error("invalid operator configuration: {0}")]
    InvalidOperator(String),

    #[error("worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Umbrella error surfaced by the orchestrator and the binary.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Problem(#[from] ProblemError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Algorithm(#[from] AlgorithmError),

    #[error("no problem parts registered")]
    NothingToSchedule,
}
