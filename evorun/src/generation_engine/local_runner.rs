// FICHIER : evorun/src/generation_engine/local_runner.rs

use super::{EngineContext, GenerationId, IndividualId, RepetitionId};
use crate::user_info;
use tracing::{error, warn};

/// Exécution synchrone d'une poignée d'individus sur la machine courante.
///
/// Pas de relance ici : un échec se voit uniquement comme un fichier
/// résultat manquant au prochain balayage.
pub struct LocalRunner<'a> {
    ctx: EngineContext<'a>,
}

impl<'a> LocalRunner<'a> {
    pub fn new(ctx: EngineContext<'a>) -> Self {
        Self { ctx }
    }

    /// Renvoie le nombre d'évaluations terminées avec succès.
    pub async fn run(
        &self,
        gen: GenerationId,
        rep: RepetitionId,
        individuals: &[IndividualId],
    ) -> usize {
        let config = self.ctx.config;
        let mut succeeded = 0;

        for &ind in individuals {
            user_info!("LOCAL_RUN", "Running {} locally", ind);
            let args = self
                .ctx
                .layout
                .job_vars(gen, ind, rep, self.ctx.population)
                .render_all(&config.evaluator_args);

            match self.ctx.launcher.run(&config.evaluator_path, &args).await {
                Ok(true) => succeeded += 1,
                Ok(false) => warn!(individual = ind, "Évaluation locale en échec"),
                Err(e) => error!(individual = ind, "Évaluateur local non lancé : {}", e),
            }
        }
        succeeded
    }
}
