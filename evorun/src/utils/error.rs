use std::io;

// --- RE-EXPORTS ANYHOW (Pour la flexibilité du CLI) ---
pub use anyhow::{anyhow, Context};
// On renomme le Result de anyhow pour ne pas qu'il écrase le nôtre
pub use anyhow::Result as AnyResult;

// --- GESTION D'ERREUR STRICTE ---

/// Type de résultat standard pour evorun.
/// Utilise notre AppError unifiée au lieu d'une erreur générique.
pub type Result<T> = std::result::Result<T, AppError>;

/// Enumération centrale des erreurs fatales.
///
/// Les échecs transitoires (job perdu, fichier résultat vide, sortie de
/// `condor_q` illisible) ne passent jamais par ici : ils sont journalisés
/// et absorbés par la boucle de relance.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Erreur de configuration : {0}")]
    Config(String),

    #[error("Erreur d'entrée/sortie : {0}")]
    Io(#[from] io::Error),

    #[error("Ordonnanceur batch injoignable : {0}")]
    Scheduler(String),

    #[error("Erreur de processus : {0}")]
    Process(String),

    #[error("Gabarit de nommage invalide : {0}")]
    Layout(String),

    #[error("Erreur de sérialisation : {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Erreur Système : {0}")]
    System(#[from] anyhow::Error),
}

impl AppError {
    /// Vrai pour les erreurs de configuration (arguments, fichier, gabarits).
    pub fn is_config(&self) -> bool {
        matches!(self, AppError::Config(_) | AppError::Layout(_))
    }
}

// Helpers pour convertir des erreurs string en AppError
// Permet de faire : return Err("Mon erreur".into());
impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::System(anyhow::anyhow!(s))
    }
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::System(anyhow::anyhow!(s.to_string()))
    }
}
