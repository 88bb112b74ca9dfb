pub mod aggregate;
pub mod render_submit;
pub mod run;
pub mod status;

use clap::Args;
use evorun::generation_engine::ExperimentLayout;
use evorun::utils::context::{init_logging, LoggingOptions};
use evorun::utils::error::{AnyResult, Context};
use evorun::RunConfig;
use std::path::{Path, PathBuf};

/// Arguments communs aux commandes qui ciblent une seule génération.
#[derive(Args, Clone, Debug)]
pub struct GenerationArgs {
    /// Dossier racine de l'expérience
    pub experiment: PathBuf,
    /// Indice de génération
    pub generation: u32,
    /// Taille de la population
    pub population: usize,
    /// Fichier de configuration (défaut : $EVORUN_CONFIG puis ./localconfig.json)
    pub config: Option<PathBuf>,
}

/// Charge la configuration et résout l'arborescence de l'expérience.
pub fn load_context(
    experiment: &Path,
    config: Option<&Path>,
) -> AnyResult<(RunConfig, ExperimentLayout)> {
    let path = RunConfig::resolve_path(config);
    let run_config = RunConfig::load(&path)?;
    let layout = ExperimentLayout::resolve(experiment, run_config.naming.clone())
        .with_context(|| format!("Dossier d'expérience {:?}", experiment))?;
    Ok((run_config, layout))
}

/// Console seule pour les commandes ponctuelles.
pub fn init_console_logging() {
    init_logging(&LoggingOptions::console_only());
}
