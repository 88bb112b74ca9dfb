// FICHIER : evorun/src/generation_engine/submit_file.rs

//! Description de soumission batch : valeur structurée d'abord, texte Condor ensuite.
//!
//! Les tests portent sur `SubmitDescription` (quels individus, quelles
//! redirections) ; `render()` est le seul endroit qui connaît la syntaxe
//! du fichier de soumission.

use super::layout::NULL_SINK;
use super::{GenerationId, IndividualId, RepetitionId};
use crate::utils::config::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Redirections stdout/stderr/log d'un job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStreams {
    pub error: PathBuf,
    pub output: PathBuf,
    pub log: PathBuf,
}

impl JobStreams {
    pub fn null() -> Self {
        Self {
            error: PathBuf::from(NULL_SINK),
            output: PathBuf::from(NULL_SINK),
            log: PathBuf::from(NULL_SINK),
        }
    }
}

/// En-tête commun à tous les jobs d'une soumission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobHeader {
    pub executable: PathBuf,
    pub universe: String,
    pub environment: Option<String>,
    pub getenv: bool,
    pub requirements: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub input: String,
}

impl JobHeader {
    pub fn from_scheduler(executable: PathBuf, scheduler: &SchedulerConfig) -> Self {
        Self {
            executable,
            universe: scheduler.universe.clone(),
            environment: scheduler.environment.clone(),
            getenv: scheduler.getenv,
            requirements: scheduler.requirements.clone(),
            attributes: scheduler.attributes.clone(),
            input: scheduler.input.clone(),
        }
    }
}

/// Un job = un individu (et une répétition) évalué sur le cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEntry {
    pub generation: GenerationId,
    pub individual: IndividualId,
    pub repetition: RepetitionId,
    pub arguments: Vec<String>,
    pub streams: JobStreams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitDescription {
    pub header: JobHeader,
    pub jobs: Vec<JobEntry>,
}

impl SubmitDescription {
    pub fn new(header: JobHeader) -> Self {
        Self {
            header,
            jobs: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn individuals(&self) -> Vec<IndividualId> {
        self.jobs.iter().map(|j| j.individual).collect()
    }

    /// Texte attendu sur l'entrée standard de `condor_submit`.
    pub fn render(&self) -> String {
        let h = &self.header;
        let mut out = String::new();

        let _ = writeln!(out, "Executable = {}", h.executable.display());
        let _ = writeln!(out, "Universe = {}", h.universe);
        if let Some(env) = &h.environment {
            let _ = writeln!(out, "Environment = {}", env);
        }
        let _ = writeln!(out, "Getenv = {}", h.getenv);
        if let Some(req) = &h.requirements {
            let _ = writeln!(out, "Requirements = {}", req);
        }
        if !h.attributes.is_empty() {
            out.push('\n');
            for (key, value) in &h.attributes {
                let _ = writeln!(out, "+{} = \"{}\"", key, value.replace('"', "\\\""));
            }
        }
        out.push('\n');
        let _ = writeln!(out, "Input = {}", h.input);

        for job in &self.jobs {
            out.push('\n');
            let _ = writeln!(out, "Error = {}", job.streams.error.display());
            let _ = writeln!(out, "Output = {}", job.streams.output.display());
            let _ = writeln!(out, "Log = {}", job.streams.log.display());
            let _ = writeln!(out, "Arguments = {}", render_arguments(&job.arguments));
            out.push_str("Queue 1\n");
        }
        out
    }
}

/// Ligne `Arguments`. Sans espace ni guillemet : mots séparés par des espaces.
/// Sinon syntaxe « nouvelle » de Condor : ligne entre `"`, mots contenant
/// un blanc entre `'`, guillemets internes doublés.
pub fn render_arguments(args: &[String]) -> String {
    let needs_quoting = args
        .iter()
        .any(|a| a.is_empty() || a.contains(char::is_whitespace) || a.contains(['"', '\'']));
    if !needs_quoting {
        return args.join(" ");
    }
    let words: Vec<String> = args
        .iter()
        .map(|arg| {
            let escaped = arg.replace('"', "\"\"").replace('\'', "''");
            if arg.is_empty() || arg.contains(char::is_whitespace) || arg.contains('\'') {
                format!("'{}'", escaped)
            } else {
                escaped
            }
        })
        .collect();
    format!("\"{}\"", words.join(" "))
}
