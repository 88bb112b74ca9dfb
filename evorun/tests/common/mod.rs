// FICHIER : evorun/tests/common/mod.rs

use evorun::generation_engine::test_mocks::{fake_config, EngineFixture};
use evorun::RunConfig;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;

static INIT: Once = Once::new();

/// Expérience isolée dans un dossier temporaire (supprimé au drop).
#[allow(dead_code)]
pub struct TestExperiment {
    pub fx: EngineFixture,
    pub _tmp_dir: TempDir,
}

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

pub fn setup(population: usize) -> TestExperiment {
    setup_with(population, |_| {})
}

pub fn setup_with(population: usize, tweak: impl FnOnce(&mut RunConfig)) -> TestExperiment {
    init_tracing();
    let tmp_dir = tempfile::Builder::new()
        .prefix("evorun_it_")
        .tempdir()
        .expect("dossier temporaire");
    let mut config = fake_config();
    tweak(&mut config);
    TestExperiment {
        fx: EngineFixture::with_config(tmp_dir.path(), population, config),
        _tmp_dir: tmp_dir,
    }
}

/// Écrit un script shell exécutable (vrais processus).
#[cfg(unix)]
#[allow(dead_code)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("écriture script");
    let mut perms = std::fs::metadata(&path).expect("metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod");
    path
}
