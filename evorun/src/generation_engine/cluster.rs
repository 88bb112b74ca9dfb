// FICHIER : evorun/src/generation_engine/cluster.rs

use super::submit_file::SubmitDescription;
use crate::utils::config::SchedulerConfig;
use crate::utils::os::{exec_capture, pipe_through, split_command_line};
use crate::utils::{AppError, Result};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

/// Issue d'une soumission dont la commande a pu être lancée.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted { jobs: usize },
    /// La commande a refusé la description (code non nul). Non fatal :
    /// les individus manqueront et seront relancés.
    Rejected { code: Option<i32>, stderr: String },
}

/// Façade de l'ordonnanceur batch.
///
/// - `submit` : `Err` uniquement si la commande ne peut pas être lancée (fatal).
/// - `query_queue` : sortie brute de la commande d'état ; `Err` = défaut transitoire.
/// - `remove_jobs` : vide la file de l'utilisateur ; les échecs sont journalisés.
#[async_trait]
pub trait BatchScheduler: Send + Sync {
    async fn submit(&self, description: &SubmitDescription) -> Result<SubmitOutcome>;
    async fn query_queue(&self) -> Result<String>;
    async fn remove_jobs(&self) -> Result<()>;
}

/// Implémentation réelle : `condor_submit` / `condor_q` / `condor_rm`
/// (ou les commandes configurées).
#[derive(Debug, Clone)]
pub struct CondorScheduler {
    submit: (String, Vec<String>),
    queue: (String, Vec<String>),
    remove: (String, Vec<String>),
    user: Option<String>,
}

impl CondorScheduler {
    pub fn from_config(config: &SchedulerConfig) -> Result<Self> {
        Ok(Self {
            submit: split_command_line(&config.submit_command)?,
            queue: split_command_line(&config.queue_command)?,
            remove: split_command_line(&config.remove_command)?,
            user: config.resolved_user(),
        })
    }

    fn with_user(&self, base: &[String]) -> Vec<String> {
        let mut args = base.to_vec();
        if let Some(user) = &self.user {
            args.push(user.clone());
        }
        args
    }
}

#[async_trait]
impl BatchScheduler for CondorScheduler {
    #[instrument(skip(self, description), fields(jobs = description.jobs.len()))]
    async fn submit(&self, description: &SubmitDescription) -> Result<SubmitOutcome> {
        let (program, args) = &self.submit;
        let output = pipe_through(program, args, &description.render())
            .await
            .map_err(|e| AppError::Scheduler(format!("{} : {}", program, e)))?;
        if output.success {
            debug!("Soumission acceptée : {}", output.stdout.trim());
            Ok(SubmitOutcome::Accepted {
                jobs: description.jobs.len(),
            })
        } else {
            Ok(SubmitOutcome::Rejected {
                code: output.code,
                stderr: output.stderr,
            })
        }
    }

    async fn query_queue(&self) -> Result<String> {
        let (program, base) = &self.queue;
        let output = exec_capture(program, &self.with_user(base)).await?;
        if !output.success {
            return Err(AppError::Scheduler(format!(
                "{} a échoué (code {:?}) : {}",
                program,
                output.code,
                output.stderr.trim()
            )));
        }
        Ok(output.stdout)
    }

    async fn remove_jobs(&self) -> Result<()> {
        let (program, base) = &self.remove;
        let output = exec_capture(program, &self.with_user(base)).await?;
        if !output.success {
            // Fréquent quand la file est déjà vide
            warn!("{} : code {:?} ({})", program, output.code, output.stderr.trim());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation_engine::submit_file::{JobEntry, JobHeader, JobStreams};

    fn config_with(submit: &str, queue: &str, remove: &str) -> SchedulerConfig {
        SchedulerConfig {
            submit_command: submit.into(),
            queue_command: queue.into(),
            remove_command: remove.into(),
            user: Some("alice".into()),
            ..Default::default()
        }
    }

    fn description() -> SubmitDescription {
        SubmitDescription::new(JobHeader::from_scheduler(
            "/bin/true".into(),
            &SchedulerConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_submit_through_cat_is_accepted() {
        let sched = CondorScheduler::from_config(&config_with("cat", "echo", "true")).unwrap();
        let outcome = sched.submit(&description()).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Accepted { jobs: 0 });
    }

    /// Description bien plus grosse qu'un buffer de pipe.
    fn large_description() -> SubmitDescription {
        let mut desc = description();
        for ind in 0..5000 {
            desc.jobs.push(JobEntry {
                generation: 0,
                individual: ind,
                repetition: 0,
                arguments: vec!["params.txt".into(), format!("results/fitness.0.{}", ind)],
                streams: JobStreams::null(),
            });
        }
        desc
    }

    #[tokio::test]
    async fn test_submit_rejected_is_not_fatal() {
        let sched = CondorScheduler::from_config(&config_with("false", "echo", "true")).unwrap();
        let outcome = sched.submit(&description()).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_submit_refused_before_reading_input_is_rejected() {
        let sched =
            CondorScheduler::from_config(&config_with("sh -c 'exit 1'", "echo", "true")).unwrap();
        let desc = large_description();
        assert!(desc.render().len() > 1 << 16);
        let outcome = sched.submit(&desc).await.unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Rejected {
                code: Some(1),
                stderr: String::new()
            }
        );
    }

    #[tokio::test]
    async fn test_submit_launch_failure_is_fatal() {
        let sched =
            CondorScheduler::from_config(&config_with("condor_submit_absent_42", "echo", "true"))
                .unwrap();
        let err = sched.submit(&description()).await.unwrap_err();
        assert!(matches!(err, AppError::Scheduler(_)));
    }

    #[tokio::test]
    async fn test_query_appends_user() {
        let sched =
            CondorScheduler::from_config(&config_with("cat", "echo 3 jobs for", "true")).unwrap();
        let out = sched.query_queue().await.unwrap();
        assert_eq!(out.trim(), "3 jobs for alice");
    }

    #[tokio::test]
    async fn test_query_failure_is_err_and_remove_failure_is_not() {
        let sched = CondorScheduler::from_config(&config_with("cat", "false", "false")).unwrap();
        assert!(sched.query_queue().await.is_err());
        assert!(sched.remove_jobs().await.is_ok());
    }

    #[test]
    fn test_malformed_command_is_config_error() {
        let err =
            CondorScheduler::from_config(&config_with("'unterminated", "condor_q", "condor_rm"))
                .unwrap_err();
        assert!(err.is_config());
    }
}
