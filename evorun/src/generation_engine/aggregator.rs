// FICHIER : evorun/src/generation_engine/aggregator.rs

use super::layout::ExperimentLayout;
use super::{GenerationId, IndividualId};
use crate::utils::{fs as io, Result};
use tracing::{debug, error, instrument};

/// Bilan de l'agrégation d'une génération.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationReport {
    /// (individu, moyenne écrite)
    pub written: Vec<(IndividualId, f64)>,
    /// Individus sans aucune valeur exploitable : pas de fichier fitness.
    pub skipped: Vec<IndividualId>,
}

/// Moyenne des répétitions de chaque individu vers son fichier fitness.
///
/// Seul écrivain des fichiers fitness. Un fichier n'est jamais réécrit
/// avec une moyenne calculée sur zéro valeur.
#[derive(Debug, Clone, Copy)]
pub struct FitnessAggregator<'a> {
    layout: &'a ExperimentLayout,
    num_avg_runs: usize,
}

impl<'a> FitnessAggregator<'a> {
    pub fn new(layout: &'a ExperimentLayout, num_avg_runs: usize) -> Self {
        Self {
            layout,
            num_avg_runs,
        }
    }

    /// Lit une valeur de répétition. Absent, vide ou illisible => `None` (journalisé).
    async fn read_value(&self, gen: GenerationId, ind: IndividualId, rep: usize) -> Option<f64> {
        let path = self.layout.result_file(gen, ind, rep);
        if !io::exists(&path).await {
            error!("Résultat manquant : {:?}", path);
            return None;
        }
        let raw = match io::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("{}", e);
                return None;
            }
        };
        let text = raw.trim();
        if text.is_empty() {
            error!("Résultat vide : {:?}", path);
            return None;
        }
        // Certains évaluateurs écrivent plusieurs colonnes : la première compte
        let first = text.split_whitespace().next().unwrap_or_default();
        match first.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                error!("Résultat illisible dans {:?} : '{}'", path, first);
                None
            }
        }
    }

    #[instrument(skip(self), fields(reps = self.num_avg_runs))]
    pub async fn aggregate(
        &self,
        gen: GenerationId,
        population: usize,
    ) -> Result<AggregationReport> {
        let mut report = AggregationReport::default();

        for ind in 0..population {
            let mut values = Vec::with_capacity(self.num_avg_runs);
            for rep in 0..self.num_avg_runs {
                if let Some(v) = self.read_value(gen, ind, rep).await {
                    values.push(v);
                }
            }

            if values.is_empty() {
                report.skipped.push(ind);
                continue;
            }
            let mean = values.iter().sum::<f64>() / values.len() as f64;

            if self.num_avg_runs == 1 && self.layout.result_is_fitness(gen, ind) {
                // Mode single-shot : le fichier de l'évaluateur fait foi
                debug!(ind, "Fichier fitness écrit par l'évaluateur");
            } else {
                let path = self.layout.fitness_file(gen, ind);
                io::write_atomic(&path, format!("{:?}\n", mean).as_bytes()).await?;
            }
            report.written.push((ind, mean));
        }
        Ok(report)
    }
}
