// FICHIER : evorun/src/generation_engine/test_mocks.rs

//! Doublures scriptées des façades (horloge, ordonnanceur, lanceur) et
//! fixture d'expérience prête à l'emploi.
//!
//! Compilé hors `cfg(test)` pour servir aussi aux tests d'intégration.

use super::clock::Clock;
use super::cluster::{BatchScheduler, SubmitOutcome};
use super::layout::ExperimentLayout;
use super::process::ProcessLauncher;
use super::submit_file::SubmitDescription;
use super::{EngineContext, GenerationId, IndividualId, RepetitionId};
use crate::utils::config::{NamingConfig, RunConfig, SchedulerConfig, Threshold};
use crate::utils::{AppError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Sortie de `condor_q` quand la file est vide.
pub const EMPTY_QUEUE: &str =
    "Total for query: 0 jobs; 0 completed, 0 removed, 0 idle, 0 running, 0 held, 0 suspended\n";

pub const FAKE_EVALUATOR: &str = "/fake/bin/evaluator";
pub const FAKE_GENERATOR: &str = "/fake/bin/generator";

/// Sortie de file simulée avec `n` jobs restants.
pub fn queue_output(n: usize) -> String {
    format!(
        "-- Schedd: submit.cluster.local\n ID  OWNER\n\nTotal for query: {} jobs; 0 completed, 0 removed, 0 idle, {} running, 0 held, 0 suspended\n",
        n, n
    )
}

/// Valeur écrite par les faux évaluateurs pour (ind, rep).
pub fn fake_value(ind: IndividualId, rep: RepetitionId) -> f64 {
    (ind * 10 + rep) as f64
}

fn write_result(path: &Path, value: f64) {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(path, format!("{}\n", value));
}

// --- HORLOGE ---

/// Horloge virtuelle : `sleep` avance le temps instantanément.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn advance(&self, duration: Duration) {
        *self.offset.lock().unwrap() += duration;
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        self.advance(duration);
        // Rend la main : un test peut agir pendant une attente
        tokio::task::yield_now().await;
    }
}

// --- ORDONNANCEUR ---

/// Ordonnanceur scripté : enregistre les descriptions et « exécute »
/// immédiatement chaque job en écrivant son fichier résultat
/// (dernier argument), sauf pour les individus programmés en échec.
#[derive(Debug, Default)]
pub struct FakeScheduler {
    submissions: Mutex<Vec<SubmitDescription>>,
    failures: Mutex<BTreeMap<IndividualId, usize>>,
    queue: Mutex<VecDeque<Result<String>>>,
    removals: Mutex<usize>,
    reject_all: Mutex<bool>,
    unreachable: Mutex<bool>,
}

impl FakeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// L'individu échoue à ses `times` prochaines soumissions.
    pub fn fail_individual(&self, ind: IndividualId, times: usize) {
        self.failures.lock().unwrap().insert(ind, times);
    }

    /// L'individu n'écrit jamais de résultat.
    pub fn never_complete(&self, ind: IndividualId) {
        self.fail_individual(ind, usize::MAX);
    }

    /// Ajoute une sortie de `condor_q` ; une fois le script épuisé, la file est vide.
    pub fn push_queue_output(&self, output: impl Into<String>) {
        self.queue.lock().unwrap().push_back(Ok(output.into()));
    }

    pub fn push_queue_counts(&self, counts: &[usize]) {
        for &n in counts {
            self.push_queue_output(queue_output(n));
        }
    }

    pub fn push_queue_error(&self) {
        self.queue
            .lock()
            .unwrap()
            .push_back(Err(AppError::Scheduler("condor_q : schedd injoignable".into())));
    }

    pub fn reject_submissions(&self) {
        *self.reject_all.lock().unwrap() = true;
    }

    /// Simule une commande de soumission introuvable.
    pub fn make_unreachable(&self) {
        *self.unreachable.lock().unwrap() = true;
    }

    pub fn submissions(&self) -> Vec<SubmitDescription> {
        self.submissions.lock().unwrap().clone()
    }

    /// Individus de chaque soumission, dans l'ordre.
    pub fn submitted_rounds(&self) -> Vec<Vec<IndividualId>> {
        self.submissions().iter().map(|s| s.individuals()).collect()
    }

    pub fn removals(&self) -> usize {
        *self.removals.lock().unwrap()
    }

    fn should_fail(&self, ind: IndividualId) -> bool {
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(&ind) {
            Some(0) | None => false,
            Some(left) => {
                if *left != usize::MAX {
                    *left -= 1;
                }
                true
            }
        }
    }
}

#[async_trait]
impl BatchScheduler for FakeScheduler {
    async fn submit(&self, description: &SubmitDescription) -> Result<SubmitOutcome> {
        if *self.unreachable.lock().unwrap() {
            return Err(AppError::Scheduler("condor_submit : introuvable".into()));
        }
        self.submissions.lock().unwrap().push(description.clone());
        if *self.reject_all.lock().unwrap() {
            return Ok(SubmitOutcome::Rejected {
                code: Some(1),
                stderr: "ERROR: Failed to connect to local queue manager".into(),
            });
        }
        for job in &description.jobs {
            if self.should_fail(job.individual) {
                continue;
            }
            if let Some(result) = job.arguments.last() {
                write_result(Path::new(result), fake_value(job.individual, job.repetition));
            }
        }
        Ok(SubmitOutcome::Accepted {
            jobs: description.jobs.len(),
        })
    }

    async fn query_queue(&self) -> Result<String> {
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(EMPTY_QUEUE.to_string()))
    }

    async fn remove_jobs(&self) -> Result<()> {
        *self.removals.lock().unwrap() += 1;
        Ok(())
    }
}

// --- LANCEUR ---

/// Lanceur scripté.
///
/// - Évaluateur : arguments `{gen} {ind} {rep} ... {result}` ; écrit
///   `fake_value(ind, rep)` dans le dernier argument.
/// - Générateur : arguments `bootstrap|update {gen}` ; écrit le marqueur
///   de la population suivante (`bootstrap g` => marqueur de g,
///   `update g` => marqueur de g+1).
#[derive(Debug)]
pub struct FakeLauncher {
    layout: ExperimentLayout,
    evaluated: Mutex<Vec<(GenerationId, IndividualId, RepetitionId)>>,
    generator_calls: Mutex<Vec<Vec<String>>>,
    failing: Mutex<Vec<IndividualId>>,
    generator_failures: Mutex<usize>,
    skip_markers: Mutex<bool>,
}

impl FakeLauncher {
    pub fn new(layout: ExperimentLayout) -> Self {
        Self {
            layout,
            evaluated: Mutex::new(Vec::new()),
            generator_calls: Mutex::new(Vec::new()),
            failing: Mutex::new(Vec::new()),
            generator_failures: Mutex::new(0),
            skip_markers: Mutex::new(false),
        }
    }

    pub fn fail_individual(&self, ind: IndividualId) {
        self.failing.lock().unwrap().push(ind);
    }

    /// Les `n` prochains appels au générateur échouent.
    pub fn fail_generator(&self, n: usize) {
        *self.generator_failures.lock().unwrap() = n;
    }

    /// Le générateur réussit sans écrire de marqueur (marqueur fourni par le test).
    pub fn skip_markers(&self) {
        *self.skip_markers.lock().unwrap() = true;
    }

    pub fn evaluated(&self) -> Vec<(GenerationId, IndividualId, RepetitionId)> {
        self.evaluated.lock().unwrap().clone()
    }

    pub fn generator_calls(&self) -> Vec<Vec<String>> {
        self.generator_calls.lock().unwrap().clone()
    }

    fn run_evaluator(&self, args: &[String]) -> bool {
        let parsed = (
            args.first().and_then(|a| a.parse::<GenerationId>().ok()),
            args.get(1).and_then(|a| a.parse::<IndividualId>().ok()),
            args.get(2).and_then(|a| a.parse::<RepetitionId>().ok()),
        );
        let (Some(gen), Some(ind), Some(rep)) = parsed else {
            return false;
        };
        self.evaluated.lock().unwrap().push((gen, ind, rep));
        if self.failing.lock().unwrap().contains(&ind) {
            return false;
        }
        if let Some(result) = args.last() {
            write_result(Path::new(result), fake_value(ind, rep));
        }
        true
    }

    fn run_generator(&self, args: &[String]) -> bool {
        self.generator_calls.lock().unwrap().push(args.to_vec());
        {
            let mut failures = self.generator_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return false;
            }
        }
        if *self.skip_markers.lock().unwrap() {
            return true;
        }
        let gen = args.get(1).and_then(|a| a.parse::<GenerationId>().ok());
        let marker = match (args.first().map(String::as_str), gen) {
            (Some("bootstrap"), Some(g)) => self.layout.ready_marker(g),
            (Some("update"), Some(g)) => self.layout.ready_marker(g + 1),
            _ => return false,
        };
        write_result(&marker, 1.0);
        true
    }
}

#[async_trait]
impl ProcessLauncher for FakeLauncher {
    async fn run(&self, program: &Path, args: &[String]) -> Result<bool> {
        match program.to_str() {
            Some(FAKE_EVALUATOR) => Ok(self.run_evaluator(args)),
            Some(FAKE_GENERATOR) => Ok(self.run_generator(args)),
            _ => Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{:?} introuvable", program),
            ))),
        }
    }
}

// --- FIXTURE ---

/// Configuration de test : temps courts, seuils nuls, arguments lisibles
/// par les doublures.
pub fn fake_config() -> RunConfig {
    RunConfig {
        evaluator_path: PathBuf::from(FAKE_EVALUATOR),
        generator_path: PathBuf::from(FAKE_GENERATOR),
        sleep_time_secs: 5,
        max_wait_time_secs: 60,
        min_jobs: Threshold::Absolute(0),
        min_condor_jobs: Threshold::Absolute(0),
        local_count: 0,
        log_enabled: false,
        evaluate_final_policy: false,
        num_avg_runs: 1,
        marker_poll_secs: 1,
        generator_retry_secs: 1,
        first_generation: 0,
        scheduler: SchedulerConfig::default(),
        naming: NamingConfig::default(),
        evaluator_args: ["{gen}", "{ind}", "{rep}", "{params}", "{result}"]
            .map(String::from)
            .to_vec(),
        generator_bootstrap_args: vec!["bootstrap".into(), "{gen}".into()],
        generator_update_args: vec!["update".into(), "{gen}".into()],
    }
}

/// Expérience complète sous `root/exp` avec ses doublures.
pub struct EngineFixture {
    pub config: RunConfig,
    pub layout: ExperimentLayout,
    pub scheduler: FakeScheduler,
    pub launcher: FakeLauncher,
    pub clock: ManualClock,
    pub population: usize,
}

impl EngineFixture {
    pub fn new(root: &Path, population: usize) -> Self {
        Self::with_config(root, population, fake_config())
    }

    pub fn with_config(root: &Path, population: usize, config: RunConfig) -> Self {
        let layout = ExperimentLayout::new(root.join("exp"), config.naming.clone());
        for dir in [layout.data_dir(), layout.results_dir(), layout.process_dir()] {
            let _ = std::fs::create_dir_all(dir);
        }
        Self {
            launcher: FakeLauncher::new(layout.clone()),
            scheduler: FakeScheduler::new(),
            clock: ManualClock::new(),
            config,
            layout,
            population,
        }
    }

    pub fn context(&self) -> EngineContext<'_> {
        EngineContext {
            config: &self.config,
            layout: &self.layout,
            scheduler: &self.scheduler,
            launcher: &self.launcher,
            clock: &self.clock,
            population: self.population,
        }
    }

    /// Écrit un fichier résultat comme le ferait un évaluateur.
    pub fn write_result(
        &self,
        gen: GenerationId,
        ind: IndividualId,
        rep: RepetitionId,
        content: &str,
    ) {
        let path = self.layout.result_file(gen, ind, rep);
        let _ = std::fs::write(path, content);
    }
}
