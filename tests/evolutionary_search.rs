//! Integration tests for the evolutionary driver on household problems.

mod common;

use hems_sched::ea::{
    CancellationToken, EvolutionaryAlgorithm, Problem, StopReason, StoppingRule, VariableEncoding,
};
use hems_sched::random::RandomStream;

const HORIZON: i64 = 2 * 3600;

fn household(encoding: VariableEncoding) -> hems_sched::sim::HouseholdProblem {
    common::problem(
        vec![common::battery("battery", HORIZON), common::pv("pv")],
        encoding,
        HORIZON,
        11,
    )
}

#[test]
fn evaluation_budget_sets_generation_count() {
    let ea = EvolutionaryAlgorithm::new(
        common::small_algorithm(4),
        vec![StoppingRule::MaxEvaluations { max_evaluations: 8 }],
    )
    .unwrap();
    let problem = household(VariableEncoding::Binary);
    let mut rng = RandomStream::new(1).rng();
    let result = ea.run(&problem, &mut rng, &CancellationToken::new()).unwrap();

    assert_eq!(result.generations, 2);
    assert_eq!(result.evaluations, 8);
    assert_eq!(result.stop_reason, StopReason::MaxEvaluations);
    assert_eq!(result.best.chromosome.len(), problem.layout().len());
    assert!(result.best.fitness.is_finite());
}

#[test]
fn best_is_the_best_seen_in_any_generation() {
    let ea = EvolutionaryAlgorithm::new(
        common::small_algorithm(8),
        vec![StoppingRule::MaxEvaluations { max_evaluations: 80 }],
    )
    .unwrap();
    let problem = household(VariableEncoding::Binary);
    let mut rng = RandomStream::new(2).rng();
    let result = ea.run(&problem, &mut rng, &CancellationToken::new()).unwrap();

    assert_eq!(result.history.len(), result.generations);
    for stats in &result.history {
        assert!(result.best.fitness <= stats.best, "{stats:?}");
    }
    assert_eq!(result.population.len(), 8);
}

#[test]
fn equal_seeds_give_equal_results_across_thread_counts() {
    let problem = household(VariableEncoding::Real);
    let run = |threads: usize| {
        let mut params = common::small_algorithm(6);
        params.worker_threads = threads;
        let ea = EvolutionaryAlgorithm::new(params, vec![StoppingRule::MaxEvaluations { max_evaluations: 30 }])
            .unwrap();
        let mut rng = RandomStream::new(3).rng();
        ea.run(&problem, &mut rng, &CancellationToken::new()).unwrap()
    };
    let a = run(1);
    let b = run(4);
    assert_eq!(a.best.fitness, b.best.fitness);
    assert_eq!(a.best.chromosome, b.best.chromosome);
}

#[test]
fn cancelled_run_still_returns_a_best_solution() {
    let ea = EvolutionaryAlgorithm::new(
        common::small_algorithm(4),
        vec![StoppingRule::MaxEvaluations { max_evaluations: 10_000 }],
    )
    .unwrap();
    let problem = household(VariableEncoding::Binary);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut rng = RandomStream::new(4).rng();
    let result = ea.run(&problem, &mut rng, &cancel).unwrap();
    assert_eq!(result.stop_reason, StopReason::Cancelled);
    assert_eq!(result.generations, 1);
    assert!(result.best.fitness.is_finite());
}
