// FICHIER : evorun/tests/engine_suite/aggregation_tests.rs

use crate::common::setup_with;
use evorun::generation_engine::{CompletionWaiter, FitnessAggregator};

#[tokio::test]
async fn test_missing_repetition_excluded_from_mean() {
    let env = setup_with(5, |c| c.num_avg_runs = 3);
    let fx = &env.fx;
    fx.write_result(0, 4, 0, "10.0\n");
    fx.write_result(0, 4, 2, "20.0\n");

    let report = FitnessAggregator::new(&fx.layout, 3).aggregate(0, 5).await.unwrap();
    assert_eq!(report.written, vec![(4, 15.0)]);
    let fitness = std::fs::read_to_string(fx.layout.fitness_file(0, 4)).unwrap();
    assert_eq!(fitness.trim().parse::<f64>().unwrap(), 15.0);
}

#[tokio::test]
async fn test_all_repetitions_empty_writes_no_fitness() {
    let env = setup_with(1, |c| c.num_avg_runs = 2);
    let fx = &env.fx;
    fx.write_result(3, 0, 0, "");
    fx.write_result(3, 0, 1, "   \n");

    let report = FitnessAggregator::new(&fx.layout, 2).aggregate(3, 1).await.unwrap();
    assert!(report.written.is_empty());
    assert!(!fx.layout.fitness_file(3, 0).exists());
}

#[tokio::test]
async fn test_repetitions_waited_then_averaged() {
    let env = setup_with(3, |c| c.num_avg_runs = 2);
    let fx = &env.fx;
    let waiter = CompletionWaiter::new(fx.context());
    for rep in 0..2 {
        if rep == 1 {
            // La répétition 1 de l'individu 2 échoue une fois
            fx.scheduler.fail_individual(2, 1);
        }
        waiter.run(1, rep).await.unwrap();
    }
    let rounds = fx.scheduler.submitted_rounds();
    assert_eq!(rounds, vec![vec![0, 1, 2], vec![0, 1, 2], vec![2]]);

    let report = FitnessAggregator::new(&fx.layout, 2).aggregate(1, 3).await.unwrap();
    // fake_value(ind, rep) = ind * 10 + rep
    assert_eq!(report.written, vec![(0, 0.5), (1, 10.5), (2, 20.5)]);
}
