// FICHIER : evorun/src/utils/config.rs

use crate::utils::{env, AppError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

/// Nom du fichier de configuration cherché dans le dossier courant.
pub const DEFAULT_CONFIG_FILE: &str = "localconfig.json";
/// Variable d'environnement qui remplace le chemin par défaut.
pub const CONFIG_ENV_VAR: &str = "EVORUN_CONFIG";

/// Placeholders reconnus dans les gabarits de noms de fichiers.
pub const NAMING_PLACEHOLDERS: &[&str] = &["gen", "next", "ind", "rep"];

/// Placeholders reconnus dans les gabarits d'arguments.
pub const ARG_PLACEHOLDERS: &[&str] = &[
    "experiment",
    "data",
    "results",
    "process",
    "gen",
    "next",
    "ind",
    "rep",
    "pop",
    "params",
    "result",
    "population",
    "next_population",
    "fitness_prefix",
    "eval_output",
];

/// Seuil exprimé soit en nombre absolu d'individus, soit en fraction de la population.
///
/// JSON : `3` ou `{"fraction": 0.2}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Threshold {
    Absolute(usize),
    Fraction { fraction: f64 },
}

impl Threshold {
    /// Résout le seuil pour une population donnée.
    ///
    /// `remaining > 0.2 * n` sur des entiers équivaut à `remaining > floor(0.2 * n)`.
    pub fn resolve(&self, population: usize) -> usize {
        match *self {
            Threshold::Absolute(n) => n,
            Threshold::Fraction { fraction } => (fraction * population as f64).floor() as usize,
        }
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold::Absolute(0)
    }
}

/// Paramètres de l'ordonnanceur batch (Condor par défaut).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub submit_command: String,
    pub queue_command: String,
    pub remove_command: String,
    /// Propriétaire de la file. `None` => `$USER`.
    pub user: Option<String>,
    pub universe: String,
    pub environment: Option<String>,
    pub getenv: bool,
    /// Contraintes de ressources, ex: `Memory>2000 && OpSys=="LINUX" && Arch=="X86_64"`.
    pub requirements: Option<String>,
    pub input: String,
    /// Lignes `+Clé = "valeur"` (Group, Project, ProjectDescription...).
    pub attributes: BTreeMap<String, String>,
    /// Vide la file de l'utilisateur au début, après chaque attente et à la fin.
    pub remove_stale_jobs: bool,
    pub submit_settle_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            submit_command: "condor_submit".to_string(),
            queue_command: "condor_q".to_string(),
            remove_command: "condor_rm".to_string(),
            user: None,
            universe: "vanilla".to_string(),
            environment: Some("ONCONDOR=true".to_string()),
            getenv: true,
            requirements: None,
            input: "/dev/null".to_string(),
            attributes: BTreeMap::new(),
            remove_stale_jobs: true,
            submit_settle_secs: 1,
        }
    }
}

impl SchedulerConfig {
    /// Utilisateur effectif pour `condor_q` / `condor_rm`.
    pub fn resolved_user(&self) -> Option<String> {
        self.user
            .clone()
            .filter(|u| !u.trim().is_empty())
            .or_else(env::current_user)
    }
}

/// Schéma de nommage unique des artefacts sous `results/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NamingConfig {
    pub result: String,
    pub fitness: String,
    pub params: String,
    pub population: String,
    pub ready_marker: String,
    pub valuation_done: String,
    pub final_policy: String,
    pub final_policy_value: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            result: "run_{gen}_i_{ind}_r_{rep}.txt".to_string(),
            fitness: "value_{gen}_i_{ind}.txt".to_string(),
            params: "params_{gen}_i_{ind}.txt".to_string(),
            population: "generation{gen}.xml.gz".to_string(),
            ready_marker: "paramswritten_{gen}.txt".to_string(),
            valuation_done: "valuationdone_{gen}.txt".to_string(),
            final_policy: "finalpolicy_{gen}.txt".to_string(),
            final_policy_value: "finalpolicy_value_{gen}.txt".to_string(),
        }
    }
}

fn default_num_avg_runs() -> usize {
    1
}
fn default_one_sec() -> u64 {
    1
}
fn default_evaluator_args() -> Vec<String> {
    vec!["{params}".to_string(), "{result}".to_string()]
}
fn default_bootstrap_args() -> Vec<String> {
    vec!["{results}".to_string(), "0".to_string(), "{pop}".to_string()]
}
fn default_update_args() -> Vec<String> {
    vec!["{results}".to_string(), "{gen}".to_string(), "{pop}".to_string()]
}

/// Configuration immuable d'une campagne, chargée une fois au démarrage
/// puis passée par référence à chaque composant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    // --- Réglages obligatoires ---
    pub evaluator_path: PathBuf,
    pub generator_path: PathBuf,
    pub sleep_time_secs: u64,
    pub max_wait_time_secs: u64,
    pub min_jobs: Threshold,
    pub min_condor_jobs: Threshold,
    pub local_count: usize,
    pub log_enabled: bool,
    pub evaluate_final_policy: bool,

    // --- Réglages optionnels ---
    #[serde(default = "default_num_avg_runs")]
    pub num_avg_runs: usize,
    #[serde(default = "default_one_sec")]
    pub marker_poll_secs: u64,
    #[serde(default = "default_one_sec")]
    pub generator_retry_secs: u64,
    #[serde(default)]
    pub first_generation: u32,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default = "default_evaluator_args")]
    pub evaluator_args: Vec<String>,
    #[serde(default = "default_bootstrap_args")]
    pub generator_bootstrap_args: Vec<String>,
    #[serde(default = "default_update_args")]
    pub generator_update_args: Vec<String>,
}

impl RunConfig {
    /// Chemin effectif : argument explicite, puis `$EVORUN_CONFIG`, puis `./localconfig.json`.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        PathBuf::from(env::get_or(CONFIG_ENV_VAR, DEFAULT_CONFIG_FILE))
    }

    /// Charge, parse et valide le fichier JSON.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(AppError::Config(format!(
                "Fichier de configuration introuvable : {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Lecture impossible de {} : {}", path.display(), e))
        })?;
        Self::from_json(&content).map_err(|e| match e {
            AppError::Config(msg) => AppError::Config(format!("{} : {}", path.display(), msg)),
            other => other,
        })
    }

    /// Parse une configuration depuis une chaîne JSON.
    pub fn from_json(content: &str) -> Result<Self> {
        // Un champ obligatoire absent produit "missing field `evaluator_path`"
        let config: RunConfig =
            serde_json::from_str(content).map_err(|e| AppError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_avg_runs == 0 {
            return Err(AppError::Config("num_avg_runs doit être >= 1".into()));
        }
        if self.sleep_time_secs == 0 {
            return Err(AppError::Config("sleep_time_secs doit être > 0".into()));
        }
        if self.marker_poll_secs == 0 {
            return Err(AppError::Config("marker_poll_secs doit être > 0".into()));
        }
        for (name, threshold) in [
            ("min_jobs", self.min_jobs),
            ("min_condor_jobs", self.min_condor_jobs),
        ] {
            if let Threshold::Fraction { fraction } = threshold {
                if !(0.0..=1.0).contains(&fraction) {
                    return Err(AppError::Config(format!(
                        "{} : fraction hors de [0, 1] ({})",
                        name, fraction
                    )));
                }
            }
        }

        let naming = &self.naming;
        let per_individual = [
            ("naming.result", &naming.result),
            ("naming.fitness", &naming.fitness),
            ("naming.params", &naming.params),
        ];
        for (field, template) in per_individual {
            require_placeholders(field, template, &["gen", "ind"])?;
        }
        if self.num_avg_runs > 1 {
            require_placeholders("naming.result", &naming.result, &["rep"])?;
        }
        let per_generation = [
            ("naming.population", &naming.population),
            ("naming.ready_marker", &naming.ready_marker),
            ("naming.valuation_done", &naming.valuation_done),
            ("naming.final_policy", &naming.final_policy),
            ("naming.final_policy_value", &naming.final_policy_value),
        ];
        for (field, template) in per_individual.iter().chain(per_generation.iter()) {
            check_known_placeholders(field, template, NAMING_PLACEHOLDERS)?;
        }

        for arg in self
            .evaluator_args
            .iter()
            .chain(&self.generator_bootstrap_args)
            .chain(&self.generator_update_args)
        {
            check_known_placeholders("args", arg, ARG_PLACEHOLDERS)?;
        }
        Ok(())
    }

    pub fn sleep_time(&self) -> Duration {
        Duration::from_secs(self.sleep_time_secs)
    }

    pub fn max_wait_time(&self) -> Duration {
        Duration::from_secs(self.max_wait_time_secs)
    }

    pub fn marker_poll(&self) -> Duration {
        Duration::from_secs(self.marker_poll_secs)
    }

    pub fn generator_retry(&self) -> Duration {
        Duration::from_secs(self.generator_retry_secs)
    }

    pub fn submit_settle(&self) -> Duration {
        Duration::from_secs(self.scheduler.submit_settle_secs)
    }

    /// Résumé multi-lignes pour l'affichage au démarrage.
    pub fn display_summary(&self, population: usize) -> String {
        let mut lines = vec![
            format!("   Evaluator:  {}", self.evaluator_path.display()),
            format!("   Generator:  {}", self.generator_path.display()),
            format!(
                "   Poll:       {}s (stagnation après {}s)",
                self.sleep_time_secs, self.max_wait_time_secs
            ),
            format!(
                "   Seuils:     min_jobs={} min_condor_jobs={}",
                self.min_jobs.resolve(population),
                self.min_condor_jobs.resolve(population)
            ),
            format!(
                "   Local:      {} | Répétitions: {}",
                self.local_count, self.num_avg_runs
            ),
        ];
        if self.log_enabled {
            lines.push("   Logs jobs:  activés (process/)".to_string());
        }
        lines.join("\n")
    }
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([a-z_]+)\}").expect("regex de placeholder valide"))
}

fn require_placeholders(field: &str, template: &str, required: &[&str]) -> Result<()> {
    for name in required {
        if !template.contains(&format!("{{{}}}", name)) {
            return Err(AppError::Layout(format!(
                "{} = '{}' : placeholder {{{}}} requis",
                field, template, name
            )));
        }
    }
    Ok(())
}

fn check_known_placeholders(field: &str, template: &str, known: &[&str]) -> Result<()> {
    for cap in placeholder_regex().captures_iter(template) {
        let name = &cap[1];
        if !known.contains(&name) {
            return Err(AppError::Layout(format!(
                "{} = '{}' : placeholder inconnu {{{}}}",
                field, template, name
            )));
        }
    }
    Ok(())
}

// --- TESTS UNITAIRES ---
#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const MINIMAL: &str = r#"{
        "evaluator_path": "/opt/eval/atari_evaluate",
        "generator_path": "/opt/eval/atari_generate",
        "sleep_time_secs": 5,
        "max_wait_time_secs": 300,
        "min_jobs": {"fraction": 0.2},
        "min_condor_jobs": {"fraction": 0.1},
        "local_count": 0,
        "log_enabled": false,
        "evaluate_final_policy": false
    }"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = RunConfig::from_json(MINIMAL).expect("config minimale valide");
        assert_eq!(config.num_avg_runs, 1);
        assert_eq!(config.first_generation, 0);
        assert_eq!(config.scheduler.submit_command, "condor_submit");
        assert!(config.scheduler.remove_stale_jobs);
        assert_eq!(config.naming.result, "run_{gen}_i_{ind}_r_{rep}.txt");
        assert_eq!(config.evaluator_args, vec!["{params}", "{result}"]);
        assert_eq!(config.sleep_time(), Duration::from_secs(5));
    }

    #[test]
    fn test_threshold_resolution() {
        assert_eq!(Threshold::Absolute(3).resolve(100), 3);
        assert_eq!(Threshold::Fraction { fraction: 0.2 }.resolve(10), 2);
        assert_eq!(Threshold::Fraction { fraction: 0.1 }.resolve(15), 1);
        assert_eq!(Threshold::Fraction { fraction: 0.0 }.resolve(15), 0);
    }

    #[test]
    fn test_threshold_json_forms() {
        let abs: Threshold = serde_json::from_str("4").unwrap();
        assert_eq!(abs, Threshold::Absolute(4));
        let frac: Threshold = serde_json::from_str(r#"{"fraction": 0.25}"#).unwrap();
        assert_eq!(frac, Threshold::Fraction { fraction: 0.25 });
    }

    #[test]
    fn test_missing_required_setting() {
        let without_generator = MINIMAL.replace(
            r#""generator_path": "/opt/eval/atari_generate","#,
            "",
        );
        let err = RunConfig::from_json(&without_generator).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("generator_path"));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let zero_runs = MINIMAL.replace(
            r#""local_count": 0,"#,
            r#""local_count": 0, "num_avg_runs": 0,"#,
        );
        assert!(RunConfig::from_json(&zero_runs).is_err());

        let bad_fraction = MINIMAL.replace(r#"{"fraction": 0.2}"#, r#"{"fraction": 1.5}"#);
        assert!(RunConfig::from_json(&bad_fraction).is_err());
    }

    #[test]
    fn test_averaging_requires_rep_placeholder() {
        let json = MINIMAL.replace(
            r#""local_count": 0,"#,
            r#""local_count": 0, "num_avg_runs": 3, "naming": {"result": "fitness.{gen}.{ind}"},"#,
        );
        let err = RunConfig::from_json(&json).unwrap_err();
        assert!(matches!(err, AppError::Layout(_)));
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let json = MINIMAL.replace(
            r#""local_count": 0,"#,
            r#""local_count": 0, "evaluator_args": ["-P", "{pouplation}"],"#,
        );
        let err = RunConfig::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("pouplation"));
    }

    #[test]
    fn test_load_from_file_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("localconfig.json");
        let missing = RunConfig::load(&path).unwrap_err();
        assert!(missing.is_config());

        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = RunConfig::load(&path).expect("chargement fichier");
        assert_eq!(config.max_wait_time_secs, 300);
    }

    #[test]
    fn test_shipped_example_is_valid() {
        let config = RunConfig::from_json(include_str!("../../localconfig.example.json"))
            .expect("exemple livré valide");
        assert_eq!(config.num_avg_runs, 3);
        assert_eq!(config.naming.fitness, "fitness.{gen}.{ind}");
        assert_eq!(config.scheduler.attributes.len(), 3);
    }

    #[test]
    #[serial]
    fn test_resolve_path_precedence() {
        std::env::remove_var(CONFIG_ENV_VAR);
        assert_eq!(RunConfig::resolve_path(None), PathBuf::from(DEFAULT_CONFIG_FILE));

        std::env::set_var(CONFIG_ENV_VAR, "/etc/evorun/cluster.json");
        assert_eq!(
            RunConfig::resolve_path(None),
            PathBuf::from("/etc/evorun/cluster.json")
        );
        assert_eq!(
            RunConfig::resolve_path(Some(Path::new("mine.json"))),
            PathBuf::from("mine.json")
        );

        // Variable vide : même repli que si elle était absente
        std::env::set_var(CONFIG_ENV_VAR, "  ");
        assert_eq!(RunConfig::resolve_path(None), PathBuf::from(DEFAULT_CONFIG_FILE));
        std::env::remove_var(CONFIG_ENV_VAR);
    }
}
