// FICHIER : evorun/tools/evorun-cli/src/commands/run.rs

use clap::Args;
use evorun::generation_engine::{
    CondorScheduler, EngineContext, GenerationDriver, SystemLauncher, TokioClock,
};
use evorun::user_info;
use evorun::utils::context::{init_logging, LoggingOptions};
use evorun::utils::error::AnyResult;
use std::path::PathBuf;

/// `run <experiment> <iterations> <population> [config]`
#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Dossier racine de l'expérience (créé si absent)
    pub experiment: PathBuf,
    /// Dernière génération à évaluer (incluse)
    pub iterations: u32,
    /// Taille de la population
    pub population: usize,
    /// Fichier de configuration (défaut : $EVORUN_CONFIG puis ./localconfig.json)
    pub config: Option<PathBuf>,
}

pub async fn handle(args: RunArgs) -> AnyResult<()> {
    let (config, layout) = super::load_context(&args.experiment, args.config.as_deref())?;

    let logging = if config.log_enabled {
        LoggingOptions::with_file(layout.process_dir())
    } else {
        LoggingOptions::console_only()
    };
    init_logging(&logging);

    user_info!(
        "RUN_START",
        "🚀 evorun v{} : {} (générations {}..={}, population {})",
        env!("CARGO_PKG_VERSION"),
        layout.root().display(),
        config.first_generation,
        args.iterations,
        args.population
    );
    user_info!("RUN_CONFIG", "{}", config.display_summary(args.population));

    let scheduler = CondorScheduler::from_config(&config.scheduler)?;
    let ctx = EngineContext {
        config: &config,
        layout: &layout,
        scheduler: &scheduler,
        launcher: &SystemLauncher,
        clock: &TokioClock,
        population: args.population,
    };

    GenerationDriver::new(ctx, args.iterations).run().await?;
    Ok(())
}
