// FICHIER : evorun/src/generation_engine/mod.rs

//! Moteur de génération : soumission, attente, relance, agrégation, enchaînement.
//!
//! Flux d'une génération :
//! `GenerationDriver` → `CompletionWaiter` → (`ClusterJobSubmitter` | `LocalRunner`)
//! → évaluateur externe → (`ResultFileProbe`, `ClusterQueueMonitor`)
//! → `FitnessAggregator` → générateur externe.
//!
//! Aucun parallélisme interne : chaque composant attend son sous-processus,
//! son `sleep` ou son accès disque avant de rendre la main.

pub mod aggregator;
pub mod clock;
pub mod cluster;
pub mod driver;
pub mod layout;
pub mod local_runner;
pub mod probe;
pub mod process;
pub mod queue_monitor;
pub mod submit_file;
pub mod submitter;
pub mod test_mocks;
pub mod waiter;

use crate::utils::config::RunConfig;

pub use aggregator::{AggregationReport, FitnessAggregator};
pub use clock::{Clock, TokioClock};
pub use cluster::{BatchScheduler, CondorScheduler, SubmitOutcome};
pub use driver::{GenerationDriver, RunManifest};
pub use layout::{ExperimentLayout, TemplateVars};
pub use local_runner::LocalRunner;
pub use probe::{ProbeReport, ResultFileProbe};
pub use process::{ProcessLauncher, SystemLauncher};
pub use queue_monitor::{ClusterQueueMonitor, QueueFault, WaitOutcome};
pub use submit_file::{JobEntry, JobHeader, JobStreams, SubmitDescription};
pub use submitter::{plan_dispatch, ClusterJobSubmitter, DispatchPlan};
pub use waiter::{CompletionReport, CompletionWaiter, RoundState};

pub type GenerationId = u32;
pub type IndividualId = usize;
pub type RepetitionId = usize;

/// Dépendances partagées par tous les composants d'une campagne.
///
/// Emprunte tout : la configuration est immuable et les façades
/// (ordonnanceur, lanceur, horloge) sont injectées par l'appelant.
#[derive(Clone, Copy)]
pub struct EngineContext<'a> {
    pub config: &'a RunConfig,
    pub layout: &'a ExperimentLayout,
    pub scheduler: &'a dyn BatchScheduler,
    pub launcher: &'a dyn ProcessLauncher,
    pub clock: &'a dyn Clock,
    pub population: usize,
}

impl<'a> EngineContext<'a> {
    pub fn all_individuals(&self) -> Vec<IndividualId> {
        (0..self.population).collect()
    }
}

impl std::fmt::Debug for EngineContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("experiment", &self.layout.root())
            .field("population", &self.population)
            .finish_non_exhaustive()
    }
}
