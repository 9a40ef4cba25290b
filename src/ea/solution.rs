//! Chromosomes and evaluated solutions.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ea::VariableEncoding;

/// Genotype of one individual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Chromosome {
    Binary(Vec<bool>),
    Real(Vec<f64>),
}

impl Chromosome {
    pub fn len(&self) -> usize {
        match self {
            Chromosome::Binary(g) => g.len(),
            Chromosome::Real(g) => g.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn encoding(&self) -> VariableEncoding {
        match self {
            Chromosome::Binary(_) => VariableEncoding::Binary,
            Chromosome::Real(_) => VariableEncoding::Real,
        }
    }
}

/// Algorithm-private attributes carried next to a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    /// Position after the last replacement, 0 = best.
    Rank,
    /// Generation in which the solution was created.
    Generation,
}

/// Result of evaluating one chromosome.
#[derive(Debug, Clone)]
pub struct Evaluation<A> {
    /// Minimized objectives, in problem-defined order.
    pub objectives: Vec<f64>,
    /// Scalar fitness used for selection. Lower is better.
    pub fitness: f64,
    /// Problem-specific data kept with the winner.
    pub auxiliary: A,
}

/// An evaluated individual.
#[derive(Debug, Clone)]
pub struct Solution<A> {
    pub chromosome: Chromosome,
    pub objectives: Vec<f64>,
    pub fitness: f64,
    pub auxiliary: A,
    attributes: BTreeMap<Attribute, f64>,
}

impl<A> Solution<A> {
    pub fn new(chromosome: Chromosome, evaluation: Evaluation<A>) -> Self {
        Self {
            chromosome,
            objectives: evaluation.objectives,
            fitness: evaluation.fitness,
            auxiliary: evaluation.auxiliary,
            attributes: BTreeMap::new(),
        }
    }

    pub fn attribute(&self, key: Attribute) -> Option<f64> {
        self.attributes.get(&key).copied()
    }

    pub fn set_attribute(&mut self, key: Attribute, value: f64) {
        self.attributes.insert(key, value);
    }

    /// Fitness with NaN mapped to the worst value.
    pub fn sort_key(&self) -> f64 {
        if self.fitness.is_nan() { f64::INFINITY } else { self.fitness }
    }
}

/// Orders solutions best first.
pub fn by_fitness<A>(a: &Solution<A>, b: &Solution<A>) -> Ordering {
    a.sort_key().total_cmp(&b.sort_key())
}
