// FICHIER : evorun/tools/evorun-cli/src/commands/status.rs

use super::GenerationArgs;
use evorun::generation_engine::ResultFileProbe;
use evorun::utils::error::AnyResult;
use evorun::{user_info, user_success, user_warn};

fn join(ids: impl IntoIterator<Item = usize>) -> String {
    ids.into_iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Inventaire en lecture seule : résultats par répétition puis fitness.
pub async fn handle(args: GenerationArgs) -> AnyResult<()> {
    let (config, layout) = super::load_context(&args.experiment, args.config.as_deref())?;
    super::init_console_logging();

    let gen = args.generation;
    let probe = ResultFileProbe::new(&layout);
    user_info!("STATUS", "--- Génération {} ({}) ---", gen, layout.root().display());

    for rep in 0..config.num_avg_runs {
        let report = probe.scan(gen, rep).await?;
        let complete: Vec<usize> = report
            .complete
            .iter()
            .copied()
            .filter(|&i| i < args.population)
            .collect();
        let missing: Vec<usize> = (0..args.population)
            .filter(|i| !report.complete.contains(i))
            .collect();

        user_info!(
            "STATUS_REP",
            "Répétition {} : {}/{} résultats",
            rep,
            complete.len(),
            args.population
        );
        if !missing.is_empty() {
            user_warn!("STATUS_MISSING", "Manquants : [{}]", join(missing));
        }
        if !report.empty.is_empty() {
            user_warn!("STATUS_EMPTY", "Vides : [{}]", join(report.empty.iter().copied()));
        }
    }

    let fitness: Vec<usize> = (0..args.population)
        .filter(|&i| layout.fitness_file(gen, i).is_file())
        .collect();
    if fitness.len() == args.population {
        user_success!("STATUS_FITNESS", "Fitness : {}/{}", fitness.len(), args.population);
    } else {
        user_info!("STATUS_FITNESS", "Fitness : {}/{}", fitness.len(), args.population);
    }
    if layout.valuation_done(gen).is_file() {
        user_info!("STATUS_DONE", "Marqueur {:?} présent", layout.valuation_done(gen));
    }
    Ok(())
}
