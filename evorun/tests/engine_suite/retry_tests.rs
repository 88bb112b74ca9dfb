// FICHIER : evorun/tests/engine_suite/retry_tests.rs

use crate::common::{setup, setup_with};
use evorun::generation_engine::{CompletionWaiter, RoundState};
use evorun::utils::config::Threshold;
use std::collections::BTreeSet;
use std::time::Duration;

#[tokio::test]
async fn test_local_and_cluster_sets_are_disjoint() {
    let env = setup_with(10, |c| c.local_count = 3);
    let fx = &env.fx;

    let report = CompletionWaiter::new(fx.context()).run(0, 0).await.unwrap();
    assert_eq!(report.found.len(), 10);

    let rounds = fx.scheduler.submitted_rounds();
    assert_eq!(rounds, vec![(3..10).collect::<Vec<_>>()]);

    let local: BTreeSet<usize> = fx.launcher.evaluated().iter().map(|&(_, i, _)| i).collect();
    assert_eq!(local, BTreeSet::from([0, 1, 2]));
    assert!(rounds[0].iter().all(|i| !local.contains(i)));
}

#[tokio::test]
async fn test_single_straggler_resubmitted_alone() {
    let env = setup(10);
    let fx = &env.fx;
    fx.scheduler.fail_individual(7, 1);

    let report = CompletionWaiter::new(fx.context()).run(0, 0).await.unwrap();
    assert_eq!(fx.scheduler.submitted_rounds(), vec![(0..10).collect(), vec![7]]);
    assert!(report.remaining.is_empty());
    assert_eq!(report.rounds, 2);
}

#[tokio::test]
async fn test_completed_individual_never_resubmitted() {
    let env = setup(6);
    let fx = &env.fx;
    fx.scheduler.fail_individual(1, 2);
    fx.scheduler.fail_individual(4, 1);

    CompletionWaiter::new(fx.context()).run(2, 0).await.unwrap();
    let rounds = fx.scheduler.submitted_rounds();
    assert_eq!(rounds.len(), 3);
    assert_eq!(rounds[1], vec![1, 4]);
    assert_eq!(rounds[2], vec![1]);
    // Charge cluster non croissante d'un tour à l'autre
    assert!(rounds.windows(2).all(|w| w[1].len() <= w[0].len()));
}

#[tokio::test]
async fn test_fraction_threshold_exits_with_missing_individuals() {
    let env = setup_with(10, |c| c.min_jobs = Threshold::Fraction { fraction: 0.2 });
    let fx = &env.fx;
    fx.scheduler.never_complete(2);
    fx.scheduler.never_complete(5);

    let report = CompletionWaiter::new(fx.context()).run(0, 0).await.unwrap();
    assert_eq!(report.remaining, vec![2, 5]);
    assert_eq!(fx.scheduler.submissions().len(), 1);
}

#[tokio::test]
async fn test_stagnant_queue_does_not_block_forever() {
    // sleep 5s, stagnation après 60s, file bloquée à 4 jobs
    let env = setup(4);
    let fx = &env.fx;
    fx.scheduler.push_queue_counts(&[4; 100]);

    let report = CompletionWaiter::new(fx.context()).run(0, 0).await.unwrap();
    assert!(report.remaining.is_empty());

    // 13 polls de 5s + pause finale après nettoyage
    let waited: Duration = fx.clock.sleeps().iter().sum();
    assert!(waited > Duration::from_secs(60));
    assert!(waited < Duration::from_secs(90));
}

#[tokio::test]
async fn test_queue_query_faults_are_transient() {
    let env = setup(3);
    let fx = &env.fx;
    fx.scheduler.push_queue_error();
    fx.scheduler.push_queue_output("garbage without a count");
    fx.scheduler.push_queue_counts(&[2, 0]);

    let report = CompletionWaiter::new(fx.context()).run(0, 0).await.unwrap();
    assert_eq!(report.found.len(), 3);
}

#[tokio::test]
async fn test_rejected_submission_is_not_fatal() {
    // Le cluster refuse tout, le local progresse ; la perte d'un individu est tolérée
    let env = setup_with(2, |c| {
        c.local_count = 1;
        c.min_jobs = Threshold::Absolute(1);
    });
    let fx = &env.fx;
    fx.scheduler.reject_submissions();

    let report = CompletionWaiter::new(fx.context()).run(0, 0).await.unwrap();
    assert_eq!(report.found, BTreeSet::from([0]));
    assert_eq!(report.remaining, vec![1]);
}

#[test]
fn test_round_states_serialize_by_name() {
    let json = serde_json::to_string(&RoundState::EvaluatingCompletion).unwrap();
    assert_eq!(json, "\"EVALUATING_COMPLETION\"");
}
