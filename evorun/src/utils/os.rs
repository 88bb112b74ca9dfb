// FICHIER : evorun/src/utils/os.rs

use crate::utils::{AppError, Result};
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, instrument, warn};

/// Sortie capturée d'une commande système.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Découpe une ligne de commande configurée ("condor_submit -verbose")
/// en binaire + arguments, avec les règles de quoting du shell.
pub fn split_command_line(line: &str) -> Result<(String, Vec<String>)> {
    let mut words = shell_words::split(line)
        .map_err(|e| AppError::Config(format!("Commande mal formée '{}': {}", line, e)))?;
    if words.is_empty() {
        return Err(AppError::Config("Commande vide".to_string()));
    }
    let program = words.remove(0);
    Ok((program, words))
}

/// Exécute une commande système et capture sa sortie.
///
/// Un code de sortie non nul n'est PAS une erreur : l'appelant décide.
/// Seul l'échec de lancement (binaire introuvable, permissions) remonte en `Err`.
#[instrument(skip(args), fields(cmd = cmd))]
pub async fn exec_capture(cmd: &str, args: &[String]) -> Result<CommandOutput> {
    debug!("🚀 Exécution commande système : {} {:?}", cmd, args);

    let mut command = Command::new(cmd);
    command.args(args);
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    match command.output().await {
        Ok(output) => {
            let result = CommandOutput {
                success: output.status.success(),
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            };
            if !result.success {
                warn!("⚠️ Commande échouée (code {:?})", result.code);
                debug!("Stderr: {}", result.stderr);
            }
            Ok(result)
        }
        Err(e) => {
            error!("❌ Impossible de lancer la commande '{}': {}", cmd, e);
            Err(AppError::Io(e))
        }
    }
}

/// Lance une commande en héritant des flux du terminal et attend sa fin.
/// Renvoie `true` si le processus a terminé avec succès.
#[instrument(skip(args), fields(cmd = cmd))]
pub async fn exec_status(cmd: &str, args: &[String]) -> Result<bool> {
    debug!("🚀 Exécution synchrone : {} {:?}", cmd, args);
    let status = Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .status()
        .await
        .map_err(|e| {
            error!("❌ Impossible de lancer '{}': {}", cmd, e);
            AppError::Io(e)
        })?;
    if !status.success() {
        warn!("⚠️ '{}' terminé avec le code {:?}", cmd, status.code());
    }
    Ok(status.success())
}

/// Passe une chaîne dans l'entrée standard d'une commande (écriture puis
/// fermeture du pipe) et récupère sa sortie.
#[instrument(skip(args, input), fields(cmd = cmd, bytes = input.len()))]
pub async fn pipe_through(cmd: &str, args: &[String], input: &str) -> Result<CommandOutput> {
    // 1. Lancement du processus
    let mut child = Command::new(cmd)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| AppError::Io(std::io::Error::new(e.kind(), format!("'{}': {}", cmd, e))))?;

    // 2. Écriture dans stdin, puis fermeture pour signaler l'EOF.
    // EPIPE = le processus est sorti sans tout lire : son code de sortie fait foi.
    if let Some(mut stdin) = child.stdin.take() {
        match stdin.write_all(input.as_bytes()).await {
            Ok(()) => {
                stdin.shutdown().await.ok();
            }
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                debug!("'{}' a fermé son entrée avant la fin de l'écriture", cmd);
            }
            Err(e) => return Err(AppError::Io(e)),
        }
    }

    // 3. Attente du résultat
    let output = child.wait_with_output().await.map_err(AppError::Io)?;

    Ok(CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}
