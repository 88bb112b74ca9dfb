// FICHIER : evorun/src/generation_engine/driver.rs

//! Boucle externe sur les générations.
//!
//! Pour chaque génération `g` :
//! 1. `CompletionWaiter` pour chaque répétition ;
//! 2. `FitnessAggregator` ;
//! 3. générateur en mode mise à jour (relancé tant qu'il échoue) ;
//! 4. marqueur `valuation_done(g)` ;
//! 5. attente du marqueur `ready_marker(g + 1)`, sauf à la dernière génération ;
//! 6. évaluation locale optionnelle de la politique finale.

use super::aggregator::{AggregationReport, FitnessAggregator};
use super::waiter::{CompletionReport, CompletionWaiter};
use super::{EngineContext, GenerationId};
use crate::utils::config::RunConfig;
use crate::utils::core::{DateTime, Utc, Uuid};
use crate::utils::{fs as io, AppError, Result};
use crate::{user_info, user_success, user_warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// Trace d'une campagne, écrite dans `results/run.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub experiment: PathBuf,
    pub iterations: GenerationId,
    pub population: usize,
    pub last_completed_generation: Option<GenerationId>,
    pub config: RunConfig,
}

/// Bilan d'une génération terminée.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSummary {
    pub generation: GenerationId,
    pub repetitions: Vec<CompletionReport>,
    pub aggregation: AggregationReport,
}

pub struct GenerationDriver<'a> {
    ctx: EngineContext<'a>,
    iterations: GenerationId,
}

impl<'a> GenerationDriver<'a> {
    pub fn new(ctx: EngineContext<'a>, iterations: GenerationId) -> Self {
        Self { ctx, iterations }
    }

    /// Campagne complète : préparation, bootstrap, générations
    /// `first_generation..=iterations`, nettoyage.
    #[instrument(
        skip(self),
        fields(experiment = ?self.ctx.layout.root(), iterations = self.iterations)
    )]
    pub async fn run(&self) -> Result<Vec<GenerationSummary>> {
        let first = self.ctx.config.first_generation;
        if first > self.iterations {
            return Err(AppError::Config(format!(
                "first_generation ({}) au-delà du nombre d'itérations ({})",
                first, self.iterations
            )));
        }

        let mut manifest = self.prepare().await?;
        self.bootstrap().await?;

        let mut summaries = Vec::new();
        for gen in first..=self.iterations {
            summaries.push(self.run_generation(gen).await?);
            manifest.last_completed_generation = Some(gen);
            self.write_manifest(&manifest).await?;
        }

        self.clear_queue().await;
        manifest.finished_at = Some(Utc::now());
        self.write_manifest(&manifest).await?;
        user_success!(
            "RUN_DONE",
            "Campagne terminée : générations {}..={}",
            first,
            self.iterations
        );
        Ok(summaries)
    }

    /// Dossiers, manifeste initial, file vidée des jobs d'une campagne précédente.
    pub async fn prepare(&self) -> Result<RunManifest> {
        self.ctx.layout.create_dirs().await?;
        let manifest = RunManifest {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            experiment: self.ctx.layout.root().to_path_buf(),
            iterations: self.iterations,
            population: self.ctx.population,
            last_completed_generation: None,
            config: self.ctx.config.clone(),
        };
        self.write_manifest(&manifest).await?;
        self.clear_queue().await;
        Ok(manifest)
    }

    /// Population initiale. Ignoré en reprise (`first_generation > 0`) :
    /// on attend seulement le marqueur de la génération de reprise.
    pub async fn bootstrap(&self) -> Result<()> {
        let config = self.ctx.config;
        let first = config.first_generation;
        if first == 0 {
            let args = self
                .ctx
                .layout
                .generation_vars(first, self.ctx.population)
                .render_all(&config.generator_bootstrap_args);
            self.run_generator_until_success(&args).await?;
        }
        self.wait_for_marker(&self.ctx.layout.ready_marker(first)).await;
        Ok(())
    }

    pub async fn run_generation(&self, gen: GenerationId) -> Result<GenerationSummary> {
        let ctx = self.ctx;
        let config = ctx.config;
        user_info!("GENERATION_START", "\n\nGeneration {}", gen);

        let waiter = CompletionWaiter::new(ctx);
        let mut repetitions = Vec::with_capacity(config.num_avg_runs);
        for rep in 0..config.num_avg_runs {
            repetitions.push(waiter.run(gen, rep).await?);
        }

        let aggregation = FitnessAggregator::new(ctx.layout, config.num_avg_runs)
            .aggregate(gen, ctx.population)
            .await?;
        if !aggregation.skipped.is_empty() {
            warn!(skipped = ?aggregation.skipped, "Individus sans fitness");
        }

        let args = ctx
            .layout
            .generation_vars(gen, ctx.population)
            .render_all(&config.generator_update_args);
        self.run_generator_until_success(&args).await?;
        io::touch(&ctx.layout.valuation_done(gen)).await?;

        if gen < self.iterations {
            self.wait_for_marker(&ctx.layout.ready_marker(gen + 1)).await;
        }
        if config.evaluate_final_policy {
            self.evaluate_final_policy(gen).await;
        }

        Ok(GenerationSummary {
            generation: gen,
            repetitions,
            aggregation,
        })
    }

    /// Relance le générateur tant qu'il termine en échec.
    /// Un lancement impossible (binaire absent) reste fatal.
    async fn run_generator_until_success(&self, args: &[String]) -> Result<()> {
        let config = self.ctx.config;
        user_info!(
            "GENERATOR_RUN",
            "Executing command: {} {}",
            config.generator_path.display(),
            args.join(" ")
        );
        loop {
            let ok = self
                .ctx
                .launcher
                .run(&config.generator_path, args)
                .await
                .map_err(|e| {
                    AppError::Process(format!("{} : {}", config.generator_path.display(), e))
                })?;
            if ok {
                return Ok(());
            }
            user_warn!("GENERATOR_RETRY", "generate failed.... RUNNING GENERATE AGAIN");
            self.ctx.clock.sleep(config.generator_retry()).await;
        }
    }

    /// Attente active sur un fichier écrit par le générateur.
    async fn wait_for_marker(&self, marker: &Path) {
        let poll = self.ctx.config.marker_poll();
        while !io::exists(marker).await {
            debug!("Waiting on {:?}", marker);
            self.ctx.clock.sleep(poll).await;
        }
    }

    /// Évaluation unique, sans relance, de la politique finale si présente.
    async fn evaluate_final_policy(&self, gen: GenerationId) {
        let layout = self.ctx.layout;
        let policy = layout.final_policy(gen);
        if !io::exists(&policy).await {
            debug!("Pas de politique finale pour la génération {}", gen);
            return;
        }
        let value = layout.final_policy_value(gen);
        let args = layout
            .job_vars(gen, 0, 0, self.ctx.population)
            .set("params", policy.display())
            .set("result", value.display())
            .render_all(&self.ctx.config.evaluator_args);

        match self.ctx.launcher.run(&self.ctx.config.evaluator_path, &args).await {
            Ok(true) => user_info!("FINAL_POLICY", "Politique finale évaluée : {:?}", value),
            Ok(false) => warn!("Évaluation de la politique finale en échec ({:?})", policy),
            Err(e) => warn!("Évaluateur non lancé pour la politique finale : {}", e),
        }
    }

    async fn clear_queue(&self) {
        if !self.ctx.config.scheduler.remove_stale_jobs {
            return;
        }
        if let Err(e) = self.ctx.scheduler.remove_jobs().await {
            warn!("Nettoyage de la file impossible : {}", e);
        }
    }

    async fn write_manifest(&self, manifest: &RunManifest) -> Result<()> {
        io::write_json_atomic(&self.ctx.layout.manifest_file(), manifest).await
    }
}
