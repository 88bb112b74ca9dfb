// FICHIER : evorun/src/generation_engine/clock.rs

use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Source de temps des boucles d'attente.
/// Injectée pour que les tests avancent le temps sans dormir réellement.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Horloge réelle (tokio).
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
