use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::MaintenanceConfig;
use crate::services::auth_service::AuthSessionService;
use crate::services::password_reset_service::PasswordResetService;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub sessions_purged: usize,
    pub reset_tokens_purged: u64,
}

/// Periodically drops expired sessions and stale reset tokens.
pub struct MaintenanceScheduler {
    sessions: Arc<dyn AuthSessionService>,
    password_reset: Arc<dyn PasswordResetService>,
    config: MaintenanceConfig,
    running: Arc<AtomicBool>,
}

impl MaintenanceScheduler {
    pub fn new(
        sessions: Arc<dyn AuthSessionService>,
        password_reset: Arc<dyn PasswordResetService>,
        config: MaintenanceConfig,
    ) -> Self {
        Self {
            sessions,
            password_reset,
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs until [`Self::stop`] is called.
    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Maintenance sweeper is disabled in config");
            return Ok(());
        }

        self.running.store(true, Ordering::SeqCst);

        let mut sched = JobScheduler::new().await?;

        let sessions = Arc::clone(&self.sessions);
        let password_reset = Arc::clone(&self.password_reset);
        let running = Arc::clone(&self.running);
        let job = Job::new_async(self.config.cron_expression.as_str(), move |_uuid, _lock| {
            let sessions = Arc::clone(&sessions);
            let password_reset = Arc::clone(&password_reset);
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !running.load(Ordering::SeqCst) {
                    return;
                }
                sweep(sessions.as_ref(), password_reset.as_ref()).await;
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;
        info!(
            "Maintenance sweeper running with cron: {}",
            self.config.cron_expression
        );

        while self.running.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    pub fn stop(&self) {
        info!("Stopping maintenance sweeper...");
        self.running.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn run_once(&self) -> SweepReport {
        sweep(self.sessions.as_ref(), self.password_reset.as_ref()).await
    }
}

async fn sweep(
    sessions: &dyn AuthSessionService,
    password_reset: &dyn PasswordResetService,
) -> SweepReport {
    let start = std::time::Instant::now();
    info!(event = "job_started", job_name = "maintenance_sweep", "Starting maintenance sweep");

    let sessions_purged = sessions.purge_expired_sessions();

    let reset_tokens_purged = match password_reset.purge_stale_tokens().await {
        Ok(purged) => purged,
        Err(e) => {
            error!(event = "job_failed", job_name = "purge_reset_tokens", error = %e, "Reset token purge failed");
            0
        }
    };

    info!(
        event = "job_finished",
        job_name = "maintenance_sweep",
        sessions_purged,
        reset_tokens_purged,
        duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Maintenance sweep finished"
    );

    SweepReport {
        sessions_purged,
        reset_tokens_purged,
    }
}
