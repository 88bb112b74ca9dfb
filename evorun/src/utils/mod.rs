// FICHIER : evorun/src/utils/mod.rs

// =========================================================================
//  EVORUN UTILS - Foundation Layer
// =========================================================================

pub mod config;
pub mod env;
pub mod error;
pub mod fs;
pub mod logger;
pub mod macros;
pub mod os;

// --- FAÇADES SÉMANTIQUES ---

/// **Core Foundation** : Types de base et Erreurs.
pub mod core {
    pub use super::error::{AppError, Result};
    pub use chrono::{DateTime, Utc};
    pub use uuid::Uuid;
}

/// **Application Context** : Config/Log.
pub mod context {
    pub use super::config::{RunConfig, SchedulerConfig, Threshold};
    pub use super::logger::{init_logging, LoggingOptions};
}

pub use error::{AppError, Result};
