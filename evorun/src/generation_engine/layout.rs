// FICHIER : evorun/src/generation_engine/layout.rs

//! Arborescence d'une expérience et schéma de nommage des artefacts.
//!
//! ```text
//! <experiment>/
//!   data/       entrées statiques
//!   results/    populations, résultats par (gen, ind, rep), fitness agrégées, marqueurs
//!   process/    stdout/stderr/log des jobs (si log_enabled)
//! ```
//!
//! Soumission, exécution locale, sonde et agrégation passent toutes par ce
//! module : elles ne peuvent donc pas diverger sur la clé d'un fichier.

use super::submit_file::JobStreams;
use super::{GenerationId, IndividualId, RepetitionId};
use crate::utils::config::NamingConfig;
use crate::utils::{fs as io, AppError, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const DATA_DIR: &str = "data";
pub const RESULTS_DIR: &str = "results";
pub const PROCESS_DIR: &str = "process";
pub const NULL_SINK: &str = "/dev/null";

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([a-z_]+)\}").expect("regex de placeholder valide"))
}

/// Valeurs des placeholders `{clé}` d'un gabarit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateVars {
    values: BTreeMap<&'static str, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &'static str, value: impl ToString) -> Self {
        self.values.insert(key, value.to_string());
        self
    }

    /// Remplace chaque `{clé}` connue ; les inconnues restent telles quelles.
    pub fn render(&self, template: &str) -> String {
        placeholder_regex()
            .replace_all(template, |caps: &regex::Captures| {
                self.values
                    .get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    pub fn render_all(&self, templates: &[String]) -> Vec<String> {
        templates.iter().map(|t| self.render(t)).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentLayout {
    root: PathBuf,
    naming: NamingConfig,
}

impl ExperimentLayout {
    /// `root` doit être absolu (les chemins partent vers des machines distantes).
    pub fn new(root: impl Into<PathBuf>, naming: NamingConfig) -> Self {
        Self {
            root: root.into(),
            naming,
        }
    }

    /// Rend le chemin absolu par rapport au dossier courant.
    pub fn resolve(root: &Path, naming: NamingConfig) -> Result<Self> {
        let absolute = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()?.join(root)
        };
        Ok(Self::new(absolute, naming))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn results_dir(&self) -> PathBuf {
        self.root.join(RESULTS_DIR)
    }

    pub fn process_dir(&self) -> PathBuf {
        self.root.join(PROCESS_DIR)
    }

    /// Crée `experiment/`, `data/`, `results/` et `process/` si absents.
    pub async fn create_dirs(&self) -> Result<()> {
        for dir in [self.root.clone(), self.data_dir(), self.results_dir(), self.process_dir()] {
            io::ensure_dir(&dir).await?;
        }
        Ok(())
    }

    fn naming_vars(
        &self,
        gen: GenerationId,
        ind: Option<IndividualId>,
        rep: Option<RepetitionId>,
    ) -> TemplateVars {
        let mut vars = TemplateVars::new().set("gen", gen).set("next", gen + 1);
        if let Some(ind) = ind {
            vars = vars.set("ind", ind);
        }
        if let Some(rep) = rep {
            vars = vars.set("rep", rep);
        }
        vars
    }

    fn in_results(&self, template: &str, vars: &TemplateVars) -> PathBuf {
        self.results_dir().join(vars.render(template))
    }

    pub fn result_file(&self, gen: GenerationId, ind: IndividualId, rep: RepetitionId) -> PathBuf {
        self.in_results(&self.naming.result, &self.naming_vars(gen, Some(ind), Some(rep)))
    }

    pub fn fitness_file(&self, gen: GenerationId, ind: IndividualId) -> PathBuf {
        self.in_results(&self.naming.fitness, &self.naming_vars(gen, Some(ind), None))
    }

    pub fn params_file(&self, gen: GenerationId, ind: IndividualId) -> PathBuf {
        self.in_results(&self.naming.params, &self.naming_vars(gen, Some(ind), None))
    }

    pub fn population_file(&self, gen: GenerationId) -> PathBuf {
        self.in_results(&self.naming.population, &self.naming_vars(gen, None, None))
    }

    pub fn ready_marker(&self, gen: GenerationId) -> PathBuf {
        self.in_results(&self.naming.ready_marker, &self.naming_vars(gen, None, None))
    }

    pub fn valuation_done(&self, gen: GenerationId) -> PathBuf {
        self.in_results(&self.naming.valuation_done, &self.naming_vars(gen, None, None))
    }

    pub fn final_policy(&self, gen: GenerationId) -> PathBuf {
        self.in_results(&self.naming.final_policy, &self.naming_vars(gen, None, None))
    }

    pub fn final_policy_value(&self, gen: GenerationId) -> PathBuf {
        self.in_results(&self.naming.final_policy_value, &self.naming_vars(gen, None, None))
    }

    pub fn eval_output(&self, gen: GenerationId) -> PathBuf {
        self.results_dir().join(format!("generation{}.eval.xml", gen))
    }

    pub fn manifest_file(&self) -> PathBuf {
        self.results_dir().join("run.json")
    }

    /// Préfixe des fichiers fitness d'une génération (gabarit coupé avant `{ind}`),
    /// ex: `results/fitness.3.` pour `fitness.{gen}.{ind}`.
    pub fn fitness_prefix(&self, gen: GenerationId) -> String {
        let head = self
            .naming
            .fitness
            .split("{ind}")
            .next()
            .unwrap_or_default();
        let rendered = self.naming_vars(gen, None, None).render(head);
        format!("{}/{}", self.results_dir().display(), rendered)
    }

    /// Redirections stdout/stderr/log d'un job : fichiers par job dans
    /// `process/` si les logs sont activés, sinon `/dev/null`.
    pub fn job_streams(
        &self,
        gen: GenerationId,
        ind: IndividualId,
        rep: RepetitionId,
        retry: u32,
        log_enabled: bool,
    ) -> JobStreams {
        if !log_enabled {
            return JobStreams::null();
        }
        let stem = format!("{}-{}-{}-{}", gen, ind, rep, retry);
        let process = self.process_dir();
        JobStreams {
            error: process.join(format!("error-{}.err", stem)),
            output: process.join(format!("out-{}.out", stem)),
            log: process.join(format!("log-{}.log", stem)),
        }
    }

    /// Variables communes aux gabarits d'arguments (générateur comme évaluateur).
    pub fn generation_vars(&self, gen: GenerationId, population: usize) -> TemplateVars {
        TemplateVars::new()
            .set("experiment", self.root.display())
            .set("data", self.data_dir().display())
            .set("results", self.results_dir().display())
            .set("process", self.process_dir().display())
            .set("gen", gen)
            .set("next", gen + 1)
            .set("pop", population)
            .set("population", self.population_file(gen).display())
            .set("next_population", self.population_file(gen + 1).display())
            .set("fitness_prefix", self.fitness_prefix(gen))
            .set("eval_output", self.eval_output(gen).display())
    }

    /// Variables d'un job d'évaluation (gen, ind, rep).
    pub fn job_vars(
        &self,
        gen: GenerationId,
        ind: IndividualId,
        rep: RepetitionId,
        population: usize,
    ) -> TemplateVars {
        self.generation_vars(gen, population)
            .set("ind", ind)
            .set("rep", rep)
            .set("params", self.params_file(gen, ind).display())
            .set("result", self.result_file(gen, ind, rep).display())
    }

    /// Expression régulière qui reconnaît les noms de fichiers résultat
    /// d'une (génération, répétition) et capture l'indice d'individu.
    pub fn result_matcher(&self, gen: GenerationId, rep: RepetitionId) -> Result<Regex> {
        let vars = self.naming_vars(gen, None, Some(rep));
        let pieces: Vec<String> = self
            .naming
            .result
            .split("{ind}")
            .map(|piece| regex::escape(&vars.render(piece)))
            .collect();
        if pieces.len() < 2 {
            return Err(AppError::Layout(format!(
                "naming.result = '{}' : placeholder {{ind}} requis",
                self.naming.result
            )));
        }
        let pattern = format!("^{}$", pieces.join("([0-9]+)"));
        Regex::new(&pattern).map_err(|e| AppError::Layout(e.to_string()))
    }

    /// Vrai si le gabarit résultat et le gabarit fitness désignent le même
    /// fichier (mode « single-shot » : l'évaluateur écrit la fitness lui-même).
    pub fn result_is_fitness(&self, gen: GenerationId, ind: IndividualId) -> bool {
        self.result_file(gen, ind, 0) == self.fitness_file(gen, ind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> ExperimentLayout {
        ExperimentLayout::new("/exp", NamingConfig::default())
    }

    #[test]
    fn test_default_naming_matches_averaging_scripts() {
        let l = layout();
        assert_eq!(l.result_file(3, 7, 1), PathBuf::from("/exp/results/run_3_i_7_r_1.txt"));
        assert_eq!(l.fitness_file(3, 7), PathBuf::from("/exp/results/value_3_i_7.txt"));
        assert_eq!(l.params_file(3, 7), PathBuf::from("/exp/results/params_3_i_7.txt"));
        assert_eq!(l.ready_marker(4), PathBuf::from("/exp/results/paramswritten_4.txt"));
        assert_eq!(l.valuation_done(3), PathBuf::from("/exp/results/valuationdone_3.txt"));
        assert_eq!(l.final_policy_value(2), PathBuf::from("/exp/results/finalpolicy_value_2.txt"));
    }

    #[test]
    fn test_single_shot_naming() {
        let naming = NamingConfig {
            result: "fitness.{gen}.{ind}".into(),
            fitness: "fitness.{gen}.{ind}".into(),
            ..Default::default()
        };
        let l = ExperimentLayout::new("/exp", naming);
        assert!(l.result_is_fitness(2, 5));
        assert_eq!(l.fitness_prefix(2), "/exp/results/fitness.2.");
    }

    #[test]
    fn test_result_matcher_captures_individual() {
        let l = layout();
        let re = l.result_matcher(3, 1).unwrap();
        let caps = re.captures("run_3_i_12_r_1.txt").expect("doit matcher");
        assert_eq!(&caps[1], "12");
        assert!(re.captures("run_3_i_12_r_0.txt").is_none());
        assert!(re.captures("run_13_i_12_r_1.txt").is_none());
        assert!(re.captures("run_3_i_12_r_1.txt.tmp").is_none());
    }

    #[test]
    fn test_result_matcher_escapes_dots() {
        let naming = NamingConfig {
            result: "fitness.{gen}.{ind}".into(),
            ..Default::default()
        };
        let l = ExperimentLayout::new("/exp", naming);
        let re = l.result_matcher(1, 0).unwrap();
        assert!(re.is_match("fitness.1.4"));
        assert!(!re.is_match("fitnessX1X4"));
    }

    #[test]
    fn test_job_streams_logging_toggle() {
        let l = layout();
        let off = l.job_streams(1, 2, 0, 3, false);
        assert_eq!(off, JobStreams::null());
        let on = l.job_streams(1, 2, 0, 3, true);
        assert_eq!(on.error, PathBuf::from("/exp/process/error-1-2-0-3.err"));
        assert_eq!(on.output, PathBuf::from("/exp/process/out-1-2-0-3.out"));
        assert_eq!(on.log, PathBuf::from("/exp/process/log-1-2-0-3.log"));
    }

    #[test]
    fn test_job_vars_render_both_argument_styles() {
        let l = layout();
        let vars = l.job_vars(2, 4, 1, 10);
        let plain = vars.render_all(&["{params}".to_string(), "{result}".to_string()]);
        assert_eq!(
            plain,
            vec!["/exp/results/params_2_i_4.txt", "/exp/results/run_2_i_4_r_1.txt"]
        );

        let atari = vars.render_all(&[
            "-I".to_string(),
            "{data}/AtariExperiment.dat".to_string(),
            "-P".to_string(),
            "{population}".to_string(),
            "-N".to_string(),
            "{ind}".to_string(),
        ]);
        assert_eq!(atari[1], "/exp/data/AtariExperiment.dat");
        assert_eq!(atari[3], "/exp/results/generation2.xml.gz");
        assert_eq!(atari[5], "4");
    }

    #[test]
    fn test_unknown_placeholder_is_left_untouched() {
        let vars = TemplateVars::new().set("gen", 1);
        assert_eq!(vars.render("g{gen}-{mystery}"), "g1-{mystery}");
    }
}
