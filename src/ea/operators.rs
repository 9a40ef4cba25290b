//! Selection, crossover and mutation operators.
//!
//! Operators only touch genotypes. They are called from the driver's
//! single-threaded section, so they take the run's generator directly.

use rand::Rng;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};

use crate::ea::solution::{Chromosome, Solution, by_fitness};

/// Parent selection scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionType {
    #[default]
    BinaryTournament,
}

/// Recombination scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverType {
    #[default]
    NPoint,
    Uniform,
}

/// Picks one parent from a non-empty population.
pub fn select<'a, A, R: Rng + ?Sized>(
    kind: SelectionType,
    population: &'a [Solution<A>],
    rng: &mut R,
) -> &'a Solution<A> {
    match kind {
        SelectionType::BinaryTournament => {
            let a = &population[rng.random_range(0..population.len())];
            let b = &population[rng.random_range(0..population.len())];
            if by_fitness(a, b).is_le() { a } else { b }
        }
    }
}

/// Recombines two parents into two children.
///
/// `points` is clamped to the number of interior cut positions.
pub fn crossover<R: Rng + ?Sized>(
    kind: CrossoverType,
    points: usize,
    a: &Chromosome,
    b: &Chromosome,
    rng: &mut R,
) -> (Chromosome, Chromosome) {
    match (a, b) {
        (Chromosome::Binary(a), Chromosome::Binary(b)) => {
            let (x, y) = recombine(kind, points, a, b, rng);
            (Chromosome::Binary(x), Chromosome::Binary(y))
        }
        (Chromosome::Real(a), Chromosome::Real(b)) => {
            let (x, y) = recombine(kind, points, a, b, rng);
            (Chromosome::Real(x), Chromosome::Real(y))
        }
        _ => (a.clone(), b.clone()),
    }
}

fn recombine<T: Clone, R: Rng + ?Sized>(
    kind: CrossoverType,
    points: usize,
    a: &[T],
    b: &[T],
    rng: &mut R,
) -> (Vec<T>, Vec<T>) {
    let mut x = a.to_vec();
    let mut y = b.to_vec();
    let len = x.len().min(y.len());
    match kind {
        CrossoverType::NPoint => {
            let cuts = points.min(len.saturating_sub(1));
            let mut positions: Vec<usize> = sample(rng, len.saturating_sub(1), cuts)
                .into_iter()
                .map(|p| p + 1)
                .collect();
            positions.sort_unstable();
            positions.push(len);
            let mut swap = false;
            let mut from = 0;
            for to in positions {
                if swap {
                    for i in from..to {
                        std::mem::swap(&mut x[i], &mut y[i]);
                    }
                }
                swap = !swap;
                from = to;
            }
        }
        CrossoverType::Uniform => {
            for i in 0..len {
                if rng.random_bool(0.5) {
                    std::mem::swap(&mut x[i], &mut y[i]);
                }
            }
        }
    }
    (x, y)
}

/// Mutates each gene independently with `probability`.
///
/// Bits flip. Real genes are redrawn uniformly within their bounds.
/// Returns the number of mutated genes.
pub fn mutate<R: Rng + ?Sized>(
    chromosome: &mut Chromosome,
    probability: f64,
    bounds: &[(f64, f64)],
    rng: &mut R,
) -> usize {
    let probability = probability.clamp(0.0, 1.0);
    let mut mutated = 0;
    match chromosome {
        Chromosome::Binary(bits) => {
            for bit in bits.iter_mut() {
                if rng.random_bool(probability) {
                    *bit = !*bit;
                    mutated += 1;
                }
            }
        }
        Chromosome::Real(genes) => {
            for (gene, &(lo, hi)) in genes.iter_mut().zip(bounds) {
                if rng.random_bool(probability) {
                    *gene = if lo < hi { rng.random_range(lo..=hi) } else { lo };
                    mutated += 1;
                }
            }
        }
    }
    mutated
}

/// Effective per-gene mutation probability.
///
/// An explicit probability wins; otherwise `auto_factor / genes`.
pub fn mutation_rate(explicit: Option<f64>, auto_factor: f64, genes: usize) -> f64 {
    match explicit {
        Some(p) => p.clamp(0.0, 1.0),
        None if genes == 0 => 0.0,
        None => (auto_factor / genes as f64).clamp(0.0, 1.0),
    }
}
