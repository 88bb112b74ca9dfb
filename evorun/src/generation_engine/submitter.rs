// FICHIER : evorun/src/generation_engine/submitter.rs

use super::cluster::SubmitOutcome;
use super::submit_file::{JobEntry, JobHeader, SubmitDescription};
use super::{EngineContext, GenerationId, IndividualId, RepetitionId};
use crate::utils::Result;
use crate::{user_info, user_warn};
use tracing::instrument;

/// Répartition d'un tour : un individu est local OU distant, jamais les deux.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchPlan {
    pub local: Vec<IndividualId>,
    pub remote: Vec<IndividualId>,
}

/// Les `local_count` premiers individus manquants tournent en local,
/// le reste part sur le cluster.
pub fn plan_dispatch(missing: &[IndividualId], local_count: usize) -> DispatchPlan {
    let split = local_count.min(missing.len());
    DispatchPlan {
        local: missing[..split].to_vec(),
        remote: missing[split..].to_vec(),
    }
}

pub struct ClusterJobSubmitter<'a> {
    ctx: EngineContext<'a>,
}

impl<'a> ClusterJobSubmitter<'a> {
    pub fn new(ctx: EngineContext<'a>) -> Self {
        Self { ctx }
    }

    /// Construit la description sans rien soumettre. Les individus listés
    /// dans `local` sont retirés de `individuals`.
    pub fn describe(
        &self,
        gen: GenerationId,
        rep: RepetitionId,
        retry: u32,
        individuals: &[IndividualId],
        local: &[IndividualId],
    ) -> SubmitDescription {
        let config = self.ctx.config;
        let layout = self.ctx.layout;
        let header = JobHeader::from_scheduler(config.evaluator_path.clone(), &config.scheduler);
        let mut description = SubmitDescription::new(header);

        for &ind in individuals.iter().filter(|i| !local.contains(i)) {
            let vars = layout.job_vars(gen, ind, rep, self.ctx.population);
            description.jobs.push(JobEntry {
                generation: gen,
                individual: ind,
                repetition: rep,
                arguments: vars.render_all(&config.evaluator_args),
                streams: layout.job_streams(gen, ind, rep, retry, config.log_enabled),
            });
        }
        description
    }

    /// Soumet un lot en une seule écriture. Renvoie le nombre de jobs acceptés.
    ///
    /// Seul l'échec de lancement de la commande remonte en `Err`.
    #[instrument(skip(self, individuals, local), fields(count = individuals.len()))]
    pub async fn submit(
        &self,
        gen: GenerationId,
        rep: RepetitionId,
        retry: u32,
        individuals: &[IndividualId],
        local: &[IndividualId],
    ) -> Result<usize> {
        let description = self.describe(gen, rep, retry, individuals, local);
        if description.is_empty() {
            return Ok(0);
        }

        user_info!(
            "SUBMIT_BATCH",
            "Submitting job for evaluation of generation {} run {} ({} jobs)",
            gen,
            rep,
            description.jobs.len()
        );
        let accepted = match self.ctx.scheduler.submit(&description).await? {
            SubmitOutcome::Accepted { jobs } => jobs,
            SubmitOutcome::Rejected { code, stderr } => {
                user_warn!(
                    "SUBMIT_REJECTED",
                    "Soumission refusée (code {:?}) : {}",
                    code,
                    stderr.trim()
                );
                0
            }
        };
        self.ctx.clock.sleep(self.ctx.config.submit_settle()).await;
        Ok(accepted)
    }
}
