// FICHIER : evorun/src/generation_engine/waiter.rs

//! Boucle de relance d'une (génération, répétition).
//!
//! ```text
//! SUBMITTING -> WAITING -> EVALUATING_COMPLETION -> DONE
//!      ^                            |
//!      +-------- RESUBMITTING <-----+
//! ```
//!
//! Un tour ne relance que les individus encore manquants. L'ensemble des
//! individus trouvés ne fait que croître d'un tour à l'autre.

use super::local_runner::LocalRunner;
use super::probe::ResultFileProbe;
use super::queue_monitor::{ClusterQueueMonitor, WaitOutcome};
use super::submitter::{plan_dispatch, ClusterJobSubmitter};
use super::{EngineContext, GenerationId, IndividualId, RepetitionId};
use crate::user_warn;
use crate::utils::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};

/// État d'un tour de la boucle de relance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundState {
    Submitting,
    Waiting,
    EvaluatingCompletion,
    Resubmitting,
    Done,
}

/// Bilan d'une (génération, répétition) une fois le critère atteint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
    pub found: BTreeSet<IndividualId>,
    /// Individus abandonnés (tolérés par `min_jobs`).
    pub remaining: Vec<IndividualId>,
    pub rounds: u32,
}

pub struct CompletionWaiter<'a> {
    ctx: EngineContext<'a>,
}

impl<'a> CompletionWaiter<'a> {
    pub fn new(ctx: EngineContext<'a>) -> Self {
        Self { ctx }
    }

    /// Critère de fin : `remaining <= min_jobs`, avec au moins un individu
    /// trouvé (une génération entièrement perdue est toujours relancée).
    pub fn is_done(&self, found: &BTreeSet<IndividualId>, remaining: &[IndividualId]) -> bool {
        let min_jobs = self.ctx.config.min_jobs.resolve(self.ctx.population);
        remaining.len() <= min_jobs && (!found.is_empty() || self.ctx.population == 0)
    }

    /// Déroule la machine d'états jusqu'à DONE.
    ///
    /// `Err` uniquement sur échec de lancement de la commande de soumission
    /// ou gabarit de nommage inutilisable. Peut ne jamais terminer si un
    /// individu échoue toujours et que `min_jobs` ne tolère pas sa perte.
    #[instrument(skip(self), fields(population = self.ctx.population))]
    pub async fn run(&self, gen: GenerationId, rep: RepetitionId) -> Result<CompletionReport> {
        let ctx = self.ctx;
        let config = ctx.config;
        let all = ctx.all_individuals();
        let min_condor = config.min_condor_jobs.resolve(ctx.population);

        let submitter = ClusterJobSubmitter::new(ctx);
        let local_runner = LocalRunner::new(ctx);
        let monitor = ClusterQueueMonitor::new(ctx);
        let probe = ResultFileProbe::new(ctx.layout);

        let mut state = RoundState::Submitting;
        let mut missing = all.clone();
        let mut found: BTreeSet<IndividualId> = BTreeSet::new();
        let mut remaining: Vec<IndividualId> = Vec::new();
        let mut retry: u32 = 0;
        let mut rounds: u32 = 0;

        loop {
            debug!(?state, retry, "Transition");
            state = match state {
                RoundState::Submitting => {
                    rounds += 1;
                    let plan = plan_dispatch(&missing, config.local_count);
                    submitter
                        .submit(gen, rep, retry, &plan.remote, &plan.local)
                        .await?;
                    local_runner.run(gen, rep, &plan.local).await;
                    RoundState::Waiting
                }
                RoundState::Waiting => {
                    match monitor.wait_for_drain(min_condor).await {
                        WaitOutcome::Drained { remaining } => {
                            debug!(remaining, "File sous le seuil")
                        }
                        WaitOutcome::Stagnated { remaining, waited } => {
                            warn!(?remaining, ?waited, "Attente abandonnée (stagnation)")
                        }
                    }
                    if config.scheduler.remove_stale_jobs {
                        if let Err(e) = ctx.scheduler.remove_jobs().await {
                            warn!("Nettoyage de la file impossible : {}", e);
                        }
                    }
                    // Laisse aux derniers fichiers le temps d'arriver sur le disque partagé
                    ctx.clock.sleep(config.sleep_time()).await;
                    RoundState::EvaluatingCompletion
                }
                RoundState::EvaluatingCompletion => {
                    let report = probe.scan(gen, rep).await?;
                    found.extend(report.complete.into_iter().filter(|&i| i < ctx.population));
                    remaining = all.iter().copied().filter(|i| !found.contains(i)).collect();

                    if self.is_done(&found, &remaining) {
                        RoundState::Done
                    } else {
                        retry += 1;
                        RoundState::Resubmitting
                    }
                }
                RoundState::Resubmitting => {
                    let listed: Vec<String> = remaining.iter().map(|i| i.to_string()).collect();
                    user_warn!(
                        "RESUBMIT",
                        "Re-running {} failed policies: [{}]",
                        remaining.len(),
                        listed.join(" ")
                    );
                    missing = remaining.clone();
                    RoundState::Submitting
                }
                RoundState::Done => {
                    info!(
                        found = found.len(),
                        abandoned = remaining.len(),
                        rounds,
                        "Génération {} / répétition {} terminée",
                        gen,
                        rep
                    );
                    return Ok(CompletionReport {
                        found,
                        remaining,
                        rounds,
                    });
                }
            };
        }
    }
}
