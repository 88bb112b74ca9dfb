// FICHIER : evorun/src/generation_engine/probe.rs

use super::layout::ExperimentLayout;
use super::{GenerationId, IndividualId, RepetitionId};
use crate::utils::Result;
use std::collections::BTreeSet;
use tracing::{debug, error, warn};

/// Résultat d'un balayage de `results/` pour une (génération, répétition).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReport {
    /// Individus dont le fichier résultat existe et n'est pas vide.
    pub complete: BTreeSet<IndividualId>,
    /// Fichiers présents mais vides : écriture en cours ou évaluateur mort.
    pub empty: BTreeSet<IndividualId>,
}

/// Lecture seule du dossier de résultats.
#[derive(Debug, Clone, Copy)]
pub struct ResultFileProbe<'a> {
    layout: &'a ExperimentLayout,
}

impl<'a> ResultFileProbe<'a> {
    pub fn new(layout: &'a ExperimentLayout) -> Self {
        Self { layout }
    }

    /// Un dossier illisible donne un rapport vide (nouvel essai au prochain tour).
    /// `Err` seulement si le gabarit de nommage est inutilisable.
    pub async fn scan(&self, gen: GenerationId, rep: RepetitionId) -> Result<ProbeReport> {
        let matcher = self.layout.result_matcher(gen, rep)?;
        let dir = self.layout.results_dir();
        let mut report = ProbeReport::default();

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Lecture de {:?} impossible : {}", dir, e);
                return Ok(report);
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Balayage de {:?} interrompu : {}", dir, e);
                    break;
                }
            };
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(ind) = matcher
                .captures(name)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<IndividualId>().ok())
            else {
                continue;
            };

            match entry.metadata().await {
                Ok(meta) if meta.is_file() && meta.len() > 0 => {
                    report.complete.insert(ind);
                }
                Ok(meta) if meta.is_file() => {
                    error!("Fichier résultat vide : {:?}", entry.path());
                    report.empty.insert(ind);
                }
                Ok(_) => {}
                Err(e) => debug!("{:?} disparu pendant le balayage : {}", entry.path(), e),
            }
        }
        Ok(report)
    }
}
