//! Evolutionary search over a flat chromosome.

pub mod driver;
pub mod encoding;
pub mod operators;
pub mod problem;
pub mod solution;
pub mod stopping;

pub use driver::{
    AlgorithmParameters, CancellationToken, EvolutionaryAlgorithm, GenerationStats, OptimizationResult,
    ReplacementType,
};
pub use encoding::{DecodedSolutionWrapper, EncodedVariableInformation, VariableEncoding, VariableLayout};
pub use operators::{CrossoverType, SelectionType};
pub use problem::Problem;
pub use solution::{Attribute, Chromosome, Evaluation, Solution};
pub use stopping::{StopReason, StoppingRule, StoppingRules};
