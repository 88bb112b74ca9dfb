// FICHIER : evorun/tools/evorun-cli/src/commands/aggregate.rs

use super::GenerationArgs;
use evorun::generation_engine::FitnessAggregator;
use evorun::utils::error::AnyResult;
use evorun::{user_success, user_warn};

/// Reprise après un arrêt entre évaluation et agrégation.
pub async fn handle(args: GenerationArgs) -> AnyResult<()> {
    let (config, layout) = super::load_context(&args.experiment, args.config.as_deref())?;
    super::init_console_logging();

    let report = FitnessAggregator::new(&layout, config.num_avg_runs)
        .aggregate(args.generation, args.population)
        .await?;

    user_success!(
        "AGGREGATE_DONE",
        "Génération {} : {} fitness écrites",
        args.generation,
        report.written.len()
    );
    if !report.skipped.is_empty() {
        user_warn!(
            "AGGREGATE_SKIPPED",
            "Sans valeur exploitable : {:?}",
            report.skipped
        );
    }
    Ok(())
}
