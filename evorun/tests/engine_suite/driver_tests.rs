// FICHIER : evorun/tests/engine_suite/driver_tests.rs

use crate::common::{setup, setup_with};
use evorun::generation_engine::driver::RunManifest;
use evorun::generation_engine::{EngineContext, GenerationDriver};
use evorun::utils::config::Threshold;

#[tokio::test]
async fn test_generator_never_runs_before_generation_complete() {
    let env = setup(4);
    let fx = &env.fx;
    fx.scheduler.fail_individual(3, 2);

    let summaries = GenerationDriver::new(fx.context(), 0).run().await.unwrap();
    assert_eq!(summaries[0].repetitions[0].rounds, 3);
    // Le générateur de mise à jour voit toutes les fitness
    for ind in 0..4 {
        assert!(fx.layout.fitness_file(0, ind).exists());
    }
    assert_eq!(fx.launcher.generator_calls().len(), 2);
}

#[tokio::test]
async fn test_update_failure_is_retried() {
    let env = setup(2);
    let fx = &env.fx;
    let driver = GenerationDriver::new(fx.context(), 1);
    driver.prepare().await.unwrap();
    driver.bootstrap().await.unwrap();

    fx.launcher.fail_generator(1);
    driver.run_generation(0).await.unwrap();
    assert_eq!(fx.launcher.generator_calls().len(), 3);
    assert!(fx.layout.ready_marker(1).exists());
    assert!(fx.layout.valuation_done(0).exists());
}

#[tokio::test]
async fn test_resume_from_first_generation_skips_bootstrap() {
    let env = setup_with(2, |c| c.first_generation = 2);
    let fx = &env.fx;
    std::fs::write(fx.layout.ready_marker(2), "").unwrap();

    let summaries = GenerationDriver::new(fx.context(), 2).run().await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].generation, 2);
    assert_eq!(
        fx.launcher.generator_calls(),
        vec![vec!["update".to_string(), "2".to_string()]]
    );
}

#[tokio::test]
async fn test_stale_job_removal_can_be_disabled() {
    let env = setup_with(2, |c| c.scheduler.remove_stale_jobs = false);
    let fx = &env.fx;
    GenerationDriver::new(fx.context(), 0).run().await.unwrap();
    assert_eq!(fx.scheduler.removals(), 0);
}

#[tokio::test]
async fn test_manifest_records_run() {
    let env = setup_with(3, |c| c.min_jobs = Threshold::Absolute(1));
    let fx = &env.fx;
    GenerationDriver::new(fx.context(), 2).run().await.unwrap();

    let raw = std::fs::read_to_string(fx.layout.manifest_file()).unwrap();
    let manifest: RunManifest = serde_json::from_str(&raw).unwrap();
    assert_eq!(manifest.population, 3);
    assert_eq!(manifest.iterations, 2);
    assert_eq!(manifest.last_completed_generation, Some(2));
    assert_eq!(manifest.config.min_jobs, Threshold::Absolute(1));
    assert!(manifest.finished_at.unwrap() >= manifest.started_at);
}

/// Campagne avec de vrais exécutables : tout tourne en local.
#[cfg(unix)]
#[tokio::test]
async fn test_full_run_with_real_processes() {
    use crate::common::write_script;
    use evorun::generation_engine::SystemLauncher;

    let env = setup(3);
    let bin = env._tmp_dir.path().join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    let evaluator = write_script(&bin, "evaluate.sh", r#"echo 1.5 > "$2""#);
    let generator = write_script(&bin, "generate.sh", r#"touch "$1/paramswritten_$2.txt""#);

    let mut config = env.fx.config.clone();
    config.evaluator_path = evaluator;
    config.generator_path = generator;
    config.evaluator_args = vec!["{params}".into(), "{result}".into()];
    config.generator_bootstrap_args = vec!["{results}".into(), "{gen}".into()];
    config.generator_update_args = vec!["{results}".into(), "{next}".into()];
    config.local_count = 3;
    config.validate().unwrap();

    let fx = &env.fx;
    let ctx = EngineContext {
        config: &config,
        layout: &fx.layout,
        scheduler: &fx.scheduler,
        launcher: &SystemLauncher,
        clock: &fx.clock,
        population: 3,
    };
    GenerationDriver::new(ctx, 1).run().await.unwrap();

    assert!(fx.scheduler.submissions().is_empty());
    for gen in 0..=1 {
        for ind in 0..3 {
            let fitness = std::fs::read_to_string(fx.layout.fitness_file(gen, ind)).unwrap();
            assert_eq!(fitness, "1.5\n");
        }
        assert!(fx.layout.valuation_done(gen).exists());
    }
    assert!(fx.layout.ready_marker(2).exists());
}
