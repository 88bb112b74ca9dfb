// FICHIER : evorun/src/generation_engine/process.rs

use crate::utils::os::exec_status;
use crate::utils::Result;
use async_trait::async_trait;
use std::path::Path;

/// Lancement synchrone d'un exécutable externe (évaluateur, générateur).
///
/// `Ok(false)` = le processus a tourné puis échoué ; `Err` = lancement impossible.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn run(&self, program: &Path, args: &[String]) -> Result<bool>;
}

/// Lanceur réel : hérite des flux du terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

#[async_trait]
impl ProcessLauncher for SystemLauncher {
    async fn run(&self, program: &Path, args: &[String]) -> Result<bool> {
        exec_status(&program.to_string_lossy(), args).await
    }
}
