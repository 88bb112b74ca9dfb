// FICHIER : evorun/src/generation_engine/queue_monitor.rs

use super::EngineContext;
use crate::user_info;
use regex::Regex;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Lecture de file ratée. Toujours transitoire : on réessaie au prochain poll.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueFault {
    #[error("sortie illisible : '{0}'")]
    Unparseable(String),
    #[error("commande d'état en échec : {0}")]
    CommandFailed(String),
}

/// Pourquoi l'état WAITING s'est terminé.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// La file est descendue sous le seuil.
    Drained { remaining: usize },
    /// Compte inchangé depuis plus de `max_wait_time` : on abandonne les traînards.
    Stagnated {
        remaining: Option<usize>,
        waited: Duration,
    },
}

fn jobs_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([0-9]+) jobs").expect("regex jobs valide"))
}

/// Nombre de jobs restants, lu sur la dernière ligne non vide
/// (ex: `Total for query: 12 jobs; 0 completed, ...`).
pub fn parse_jobs_remaining(output: &str) -> Result<usize, QueueFault> {
    let last = output
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    jobs_regex()
        .captures(last)
        .and_then(|caps| caps[1].parse().ok())
        .ok_or_else(|| QueueFault::Unparseable(last.to_string()))
}

/// Chronomètre de stagnation : remis à zéro à chaque changement du compte.
#[derive(Debug, Clone)]
pub struct StagnationTracker {
    last_count: Option<usize>,
    last_change: Instant,
    max_wait: Duration,
}

impl StagnationTracker {
    pub fn new(now: Instant, max_wait: Duration) -> Self {
        Self {
            last_count: None,
            last_change: now,
            max_wait,
        }
    }

    /// `None` (lecture ratée) conserve le dernier compte et laisse courir le chrono.
    pub fn observe(&mut self, count: Option<usize>, now: Instant) {
        if let Some(count) = count {
            if self.last_count != Some(count) {
                self.last_count = Some(count);
                self.last_change = now;
            }
        }
    }

    pub fn last_count(&self) -> Option<usize> {
        self.last_count
    }

    pub fn waited(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_change)
    }

    pub fn is_stagnated(&self, now: Instant) -> bool {
        self.waited(now) > self.max_wait
    }
}

pub struct ClusterQueueMonitor<'a> {
    ctx: EngineContext<'a>,
}

impl<'a> ClusterQueueMonitor<'a> {
    pub fn new(ctx: EngineContext<'a>) -> Self {
        Self { ctx }
    }

    pub async fn poll(&self) -> Result<usize, QueueFault> {
        let output = self
            .ctx
            .scheduler
            .query_queue()
            .await
            .map_err(|e| QueueFault::CommandFailed(e.to_string()))?;
        parse_jobs_remaining(&output)
    }

    /// État WAITING : interroge la file toutes les `sleep_time` secondes
    /// jusqu'à `restants <= threshold` ou stagnation. Au moins un poll.
    pub async fn wait_for_drain(&self, threshold: usize) -> WaitOutcome {
        let config = self.ctx.config;
        let clock = self.ctx.clock;
        let sleep_time = config.sleep_time();
        let mut tracker = StagnationTracker::new(clock.now(), config.max_wait_time());

        loop {
            let reading = match self.poll().await {
                Ok(count) => Some(count),
                Err(fault) => {
                    warn!("File batch : {} (nouvel essai)", fault);
                    None
                }
            };
            tracker.observe(reading, clock.now());

            if let Some(remaining) = reading {
                if remaining <= threshold {
                    debug!(remaining, threshold, "File drainée");
                    return WaitOutcome::Drained { remaining };
                }
                user_info!(
                    "QUEUE_WAIT",
                    "Waiting on jobs: {} left.. Sleep for {}",
                    remaining,
                    config.sleep_time_secs
                );
            }

            clock.sleep(sleep_time).await;

            let now = clock.now();
            if tracker.is_stagnated(now) {
                let waited = tracker.waited(now);
                user_info!(
                    "QUEUE_STAGNATED",
                    "Exceeded max wait time of {}. Ending jobs.",
                    config.max_wait_time_secs
                );
                return WaitOutcome::Stagnated {
                    remaining: tracker.last_count(),
                    waited,
                };
            }
        }
    }
}
