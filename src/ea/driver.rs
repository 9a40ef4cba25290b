//! Generational evolutionary algorithm over any [`Problem`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ea::operators::{self, CrossoverType, SelectionType};
use crate::ea::problem::Problem;
use crate::ea::solution::{Attribute, Chromosome, Solution, by_fitness};
use crate::ea::stopping::{Progress, StopReason, StoppingRule, StoppingRules};
use crate::error::AlgorithmError;

/// How offspring enter the next population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementType {
    /// Offspring replace parents; the best `elitism` parents survive.
    #[default]
    Generational,
    /// Parents and offspring compete; the best `population_size` survive.
    MuPlusLambda,
}

/// Operator choices and rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlgorithmParameters {
    pub population_size: usize,
    pub selection: SelectionType,
    pub crossover: CrossoverType,
    pub crossover_points: usize,
    pub crossover_probability: f64,
    /// Per-gene probability. When unset, `auto_prob_mutation_factor / genes`.
    pub mutation_probability: Option<f64>,
    pub auto_prob_mutation_factor: f64,
    pub replacement: ReplacementType,
    pub elitism: usize,
    /// Offspring per generation. Defaults to the population size.
    pub offspring_size: Option<usize>,
    /// Worker pool size; 0 lets rayon pick.
    pub worker_threads: usize,
}

impl Default for AlgorithmParameters {
    fn default() -> Self {
        Self {
            population_size: 20,
            selection: SelectionType::BinaryTournament,
            crossover: CrossoverType::NPoint,
            crossover_points: 2,
            crossover_probability: 0.7,
            mutation_probability: None,
            auto_prob_mutation_factor: 1.0,
            replacement: ReplacementType::Generational,
            elitism: 1,
            offspring_size: None,
            worker_threads: 0,
        }
    }
}

impl AlgorithmParameters {
    pub fn validate(&self) -> Result<(), AlgorithmError> {
        if self.population_size < 2 {
            return Err(AlgorithmError::EmptyPopulation(self.population_size));
        }
        if !(0.0..=1.0).contains(&self.crossover_probability) {
            return Err(AlgorithmError::InvalidOperator(format!(
                "crossover_probability must be within [0, 1], got {}",
                self.crossover_probability
            )));
        }
        if let Some(p) = self.mutation_probability.filter(|p| !(0.0..=1.0).contains(p)) {
            return Err(AlgorithmError::InvalidOperator(format!(
                "mutation_probability must be within [0, 1], got {p}"
            )));
        }
        if !self.auto_prob_mutation_factor.is_finite() || self.auto_prob_mutation_factor < 0.0 {
            return Err(AlgorithmError::InvalidOperator(
                "auto_prob_mutation_factor must be a non-negative number".into(),
            ));
        }
        if self.crossover == CrossoverType::NPoint && self.crossover_points == 0 {
            return Err(AlgorithmError::InvalidOperator("crossover_points must be at least 1".into()));
        }
        if self.elitism >= self.population_size {
            return Err(AlgorithmError::InvalidOperator(format!(
                "elitism ({}) must be below population_size ({})",
                self.elitism, self.population_size
            )));
        }
        if self.offspring_size == Some(0) {
            return Err(AlgorithmError::InvalidOperator("offspring_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Cooperative cancellation, honoured between generations.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Fitness statistics of one generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub best: f64,
    /// Mean over finite fitness values; infinite when none are finite.
    pub mean: f64,
}

/// Outcome of a finished run.
#[derive(Debug, Clone)]
pub struct OptimizationResult<A> {
    /// Best solution seen during the whole run.
    pub best: Solution<A>,
    /// Final population, ranked best first.
    pub population: Vec<Solution<A>>,
    pub generations: usize,
    pub evaluations: usize,
    pub stop_reason: StopReason,
    pub history: Vec<GenerationStats>,
}

/// Configured driver owning its worker pool.
pub struct EvolutionaryAlgorithm {
    params: AlgorithmParameters,
    rules: StoppingRules,
    pool: rayon::ThreadPool,
}

impl EvolutionaryAlgorithm {
    pub fn new(params: AlgorithmParameters, rules: Vec<StoppingRule>) -> Result<Self, AlgorithmError> {
        params.validate()?;
        let rules = StoppingRules::new(rules)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.worker_threads)
            .thread_name(|i| format!("ea-worker-{i}"))
            .build()?;
        Ok(Self { params, rules, pool })
    }

    pub fn params(&self) -> &AlgorithmParameters {
        &self.params
    }

    /// Runs the search to completion.
    ///
    /// All operator randomness comes from `rng`; evaluations never see it.
    /// The initial population counts as generation 1.
    pub fn run<P: Problem, R: Rng + ?Sized>(
        &self,
        problem: &P,
        rng: &mut R,
        cancel: &CancellationToken,
    ) -> Result<OptimizationResult<P::Auxiliary>, AlgorithmError> {
        let started = Instant::now();
        let layout = problem.layout();
        let budget = self.rules.evaluation_budget();
        let pop_size = budget.map_or(self.params.population_size, |b| b.min(self.params.population_size));
        let mutation_rate =
            operators::mutation_rate(self.params.mutation_probability, self.params.auto_prob_mutation_factor, layout.len());

        let initial: Vec<Chromosome> = (0..pop_size).map(|_| layout.random_chromosome(rng)).collect();
        let mut population = self.evaluate_all(problem, initial, 1);
        population.sort_by(by_fitness);
        assign_ranks(&mut population);

        let mut generation = 1;
        let mut evaluations = pop_size;
        let mut best = population[0].clone();
        let mut history = vec![stats(generation, &population)];
        let mut means = vec![history[0].mean];
        tracing::debug!(generation, evaluations, best = best.fitness, mean = history[0].mean, "generation done");

        let stop_reason = loop {
            let progress = Progress {
                generation,
                evaluations,
                elapsed: started.elapsed(),
                mean_fitness: &means,
            };
            if let Some(reason) = self.rules.check(&progress) {
                break reason;
            }
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            let mut lambda = self.params.offspring_size.unwrap_or(self.params.population_size);
            if let Some(budget) = budget {
                lambda = lambda.min(budget.saturating_sub(evaluations));
            }
            if lambda == 0 {
                break StopReason::MaxEvaluations;
            }

            let offspring = self.breed(&population, lambda, mutation_rate, layout.bounds(), rng);
            generation += 1;
            let offspring = self.evaluate_all(problem, offspring, generation);
            evaluations += offspring.len();
            population = self.replace(population, offspring, pop_size);
            assign_ranks(&mut population);

            if by_fitness(&population[0], &best).is_lt() {
                best = population[0].clone();
            }
            let s = stats(generation, &population);
            tracing::debug!(generation, evaluations, best = best.fitness, mean = s.mean, "generation done");
            means.push(s.mean);
            history.push(s);
        };

        Ok(OptimizationResult {
            best,
            population,
            generations: generation,
            evaluations,
            stop_reason,
            history,
        })
    }

    fn breed<A, R: Rng + ?Sized>(
        &self,
        population: &[Solution<A>],
        lambda: usize,
        mutation_rate: f64,
        bounds: &[(f64, f64)],
        rng: &mut R,
    ) -> Vec<Chromosome> {
        let mut offspring = Vec::with_capacity(lambda);
        while offspring.len() < lambda {
            let a = operators::select(self.params.selection, population, rng);
            let b = operators::select(self.params.selection, population, rng);
            let (mut x, mut y) = if rng.random_bool(self.params.crossover_probability) {
                operators::crossover(
                    self.params.crossover,
                    self.params.crossover_points,
                    &a.chromosome,
                    &b.chromosome,
                    rng,
                )
            } else {
                (a.chromosome.clone(), b.chromosome.clone())
            };
            operators::mutate(&mut x, mutation_rate, bounds, rng);
            offspring.push(x);
            if offspring.len() < lambda {
                operators::mutate(&mut y, mutation_rate, bounds, rng);
                offspring.push(y);
            }
        }
        offspring
    }

    /// Evaluates on the worker pool; output order matches input order.
    fn evaluate_all<P: Problem>(
        &self,
        problem: &P,
        chromosomes: Vec<Chromosome>,
        generation: usize,
    ) -> Vec<Solution<P::Auxiliary>> {
        self.pool.install(|| {
            chromosomes
                .into_par_iter()
                .map(|chromosome| {
                    let evaluation = problem.evaluate(&chromosome);
                    let mut solution = Solution::new(chromosome, evaluation);
                    solution.set_attribute(Attribute::Generation, generation as f64);
                    solution
                })
                .collect()
        })
    }

    /// Builds the next population, sorted best first.
    fn replace<A>(&self, mut parents: Vec<Solution<A>>, mut offspring: Vec<Solution<A>>, size: usize) -> Vec<Solution<A>> {
        parents.sort_by(by_fitness);
        offspring.sort_by(by_fitness);
        let mut next = match self.params.replacement {
            ReplacementType::MuPlusLambda => {
                parents.append(&mut offspring);
                parents.sort_by(by_fitness);
                parents
            }
            ReplacementType::Generational => {
                let elites = self.params.elitism.min(parents.len());
                let rest = parents.split_off(elites);
                let mut next = parents;
                next.extend(offspring.into_iter().take(size.saturating_sub(elites)));
                // Budget-clamped generations may come up short.
                let missing = size.saturating_sub(next.len());
                next.extend(rest.into_iter().take(missing));
                next.sort_by(by_fitness);
                next
            }
        };
        next.truncate(size);
        next
    }
}

fn assign_ranks<A>(population: &mut [Solution<A>]) {
    for (rank, s) in population.iter_mut().enumerate() {
        s.set_attribute(Attribute::Rank, rank as f64);
    }
}

fn stats<A>(generation: usize, population: &[Solution<A>]) -> GenerationStats {
    let finite: Vec<f64> = population.iter().map(|s| s.fitness).filter(|f| f.is_finite()).collect();
    let mean = if finite.is_empty() {
        f64::INFINITY
    } else {
        finite.iter().sum::<f64>() / finite.len() as f64
    };
    GenerationStats {
        generation,
        best: population.iter().map(Solution::sort_key).fold(f64::INFINITY, f64::min),
        mean,
    }
}
