//! The seam between the evolutionary driver and whatever it optimizes.

use crate::ea::encoding::VariableLayout;
use crate::ea::solution::{Chromosome, Evaluation};

/// An optimization problem evaluated by the driver.
///
/// `evaluate` is called concurrently from the worker pool and must not
/// depend on shared mutable state. Failures are expressed as the worst
/// fitness so one bad individual never aborts a run.
pub trait Problem: Sync {
    /// Data returned alongside the objectives, kept with the best solution.
    type Auxiliary: Clone + Send;

    /// Chromosome shape.
    fn layout(&self) -> &VariableLayout;

    /// Names of the objective vector entries, for reporting.
    fn objective_names(&self) -> &[&'static str];

    fn evaluate(&self, chromosome: &Chromosome) -> Evaluation<Self::Auxiliary>;
}
