// FICHIER : evorun/src/utils/logger.rs

use std::path::PathBuf;
use std::sync::Once;
use tracing_appender::rolling;
use tracing_subscriber::{
    filter::filter_fn, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

// Sécurité pour éviter la double initialisation (crash fréquent en tests)
static INIT: Once = Once::new();

/// Nom du journal JSON écrit dans `process/` quand les logs sont activés.
pub const LOG_FILE_NAME: &str = "evorun.log";

/// Options du logger, dérivées de la configuration de la campagne.
#[derive(Debug, Clone, Default)]
pub struct LoggingOptions {
    /// Dossier du journal JSON. `None` => console uniquement.
    pub log_dir: Option<PathBuf>,
    /// Niveau par défaut si `RUST_LOG` est absent.
    pub default_level: String,
}

impl LoggingOptions {
    pub fn console_only() -> Self {
        Self {
            log_dir: None,
            default_level: "info".to_string(),
        }
    }

    pub fn with_file(log_dir: PathBuf) -> Self {
        Self {
            log_dir: Some(log_dir),
            default_level: "info".to_string(),
        }
    }
}

pub fn init_logging(options: &LoggingOptions) {
    INIT.call_once(|| {
        // =========================================================================
        // LAYER 1 : CONSOLE (Pour l'opérateur)
        // =========================================================================
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&options.default_level));

        // Les macros user_* affichent déjà leur message : pas de doublon en console
        let anti_double_filter =
            filter_fn(|metadata| !metadata.fields().iter().any(|f| f.name() == "event"));

        let console_layer = fmt::layer()
            .compact()
            .with_target(false)
            .with_filter(env_filter)
            .with_filter(anti_double_filter);

        // =========================================================================
        // LAYER 2 : FICHIER JSON (optionnel)
        // =========================================================================
        let file_layer = options.log_dir.as_ref().map(|dir| {
            std::fs::create_dir_all(dir).ok();
            let appender = rolling::never(dir, LOG_FILE_NAME);
            fmt::layer()
                .json()
                .with_writer(appender)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
        });

        let registry = tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer);

        if registry.try_init().is_err() {
            tracing::warn!("⚠️ [Logger] Tentative de ré-initialisation ignorée (Global subscriber déjà actif).");
            return;
        }

        match &options.log_dir {
            Some(dir) => tracing::info!(
                "🚀 Logger initialisé. Journal JSON : {:?}",
                dir.join(LOG_FILE_NAME)
            ),
            None => tracing::debug!("🚀 Logger initialisé (console)"),
        }
    });
}
