// FICHIER : evorun/src/utils/fs.rs

use crate::utils::{AppError, Result};
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;

// --- RE-EXPORTS (Isolation de la couche OS) ---
pub use std::path::{Path, PathBuf};

/// Crée le dossier (et ses parents) s'il n'existe pas.
pub async fn ensure_dir(path: &Path) -> Result<()> {
    if !exists(path).await {
        fs::create_dir_all(path).await.map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!("création de {:?} impossible : {}", path, e),
            ))
        })?;
    }
    Ok(())
}

pub async fn exists(path: &Path) -> bool {
    fs::metadata(path).await.is_ok()
}

pub async fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).await.map_err(|e| {
        AppError::Io(std::io::Error::new(
            e.kind(),
            format!("lecture de {:?} impossible : {}", path, e),
        ))
    })
}

pub async fn remove_file(path: &Path) -> Result<()> {
    if exists(path).await {
        fs::remove_file(path).await?;
    }
    Ok(())
}

// --- ÉCRITURE ATOMIQUE ---

/// Écrit via un fichier temporaire puis `rename` : un lecteur (le générateur)
/// ne voit jamais un fichier à moitié écrit.
#[instrument(skip(content, path), fields(path = ?path))]
pub async fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent).await?;
    }

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .ok_or_else(|| {
            AppError::System(anyhow::anyhow!("Chemin sans nom de fichier : {:?}", path))
        })?;
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let mut file = fs::File::create(&tmp_path).await?;
    file.write_all(content).await?;
    file.flush().await.ok();
    file.sync_all().await.ok();

    if let Err(e) = fs::rename(&tmp_path, path).await {
        let _ = remove_file(&tmp_path).await;
        return Err(AppError::Io(e));
    }
    Ok(())
}

pub async fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(data)?;
    write_atomic(path, content.as_bytes()).await
}

/// Crée un fichier marqueur vide (ex: `valuationdone_3.txt`).
pub async fn touch(path: &Path) -> Result<()> {
    write_atomic(path, b"").await
}
