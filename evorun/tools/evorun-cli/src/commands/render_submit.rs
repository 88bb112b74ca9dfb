// FICHIER : evorun/tools/evorun-cli/src/commands/render_submit.rs

use super::GenerationArgs;
use evorun::generation_engine::{
    plan_dispatch, ClusterJobSubmitter, CondorScheduler, EngineContext, SystemLauncher, TokioClock,
};
use evorun::utils::error::AnyResult;

/// Imprime sur stdout le premier lot que `run` soumettrait (répétition 0,
/// relance 0, préfixe local exclu). Rien n'est soumis.
pub async fn handle(args: GenerationArgs) -> AnyResult<()> {
    let (config, layout) = super::load_context(&args.experiment, args.config.as_deref())?;
    super::init_console_logging();

    let scheduler = CondorScheduler::from_config(&config.scheduler)?;
    let ctx = EngineContext {
        config: &config,
        layout: &layout,
        scheduler: &scheduler,
        launcher: &SystemLauncher,
        clock: &TokioClock,
        population: args.population,
    };

    let all = ctx.all_individuals();
    let plan = plan_dispatch(&all, config.local_count);
    let description =
        ClusterJobSubmitter::new(ctx).describe(args.generation, 0, 0, &all, &plan.local);
    print!("{}", description.render());
    Ok(())
}
