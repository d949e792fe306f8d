//! The manager: starts and stops the pipeline.
//!
//! `start_work` is idempotent-by-guard; it refuses when the daemon is
//! already active. `stop_work` winds the components down in reverse start
//! order and clears the persisted `active` flag.

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::state::DaemonState;
use marketd_bus::MessageBus;
use marketd_monitor::{FeedSupervisor, PriceSampler};
use marketd_store::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Sampler cadence (design constant).
const SAMPLER_INTERVAL: Duration = Duration::from_millis(500);

pub struct Manager {
    config: AppConfig,
    store: Arc<Store>,
    bus: Arc<MessageBus>,
    supervisor: Option<Arc<FeedSupervisor>>,
    supervisor_task: Option<JoinHandle<()>>,
    sampler: Option<Arc<PriceSampler>>,
    work_started: bool,
}

impl Manager {
    pub fn new(config: AppConfig, store: Arc<Store>) -> Manager {
        Manager {
            config,
            store,
            bus: Arc::new(MessageBus::new()),
            supervisor: None,
            supervisor_task: None,
            sampler: None,
            work_started: false,
        }
    }

    pub fn bus(&self) -> Arc<MessageBus> {
        Arc::clone(&self.bus)
    }

    /// Start the supervisor and the sampler. Rejected when already active.
    pub async fn start_work(&mut self) -> AppResult<()> {
        if self.work_started {
            return Err(AppError::AlreadyActive);
        }
        self.work_started = true;
        DaemonState::set_active(&self.config.daemon.state_file, true);

        info!("starting feed supervisor");
        let supervisor = Arc::new(FeedSupervisor::new(
            Arc::clone(&self.store),
            Arc::clone(&self.bus),
            self.config.adapter_config(),
        ));
        let task = tokio::spawn(Arc::clone(&supervisor).run());
        self.supervisor = Some(supervisor);
        self.supervisor_task = Some(task);

        info!("starting price sampler");
        let sampler = Arc::new(PriceSampler::new(
            Arc::clone(&self.store),
            Arc::clone(&self.bus),
            SAMPLER_INTERVAL,
        ));
        sampler.start().await?;
        self.sampler = Some(sampler);

        info!("pipeline started");
        Ok(())
    }

    /// Stop everything in reverse start order and clear the active flag.
    pub async fn stop_work(&mut self) {
        if !self.work_started {
            return;
        }
        self.work_started = false;

        if let Some(sampler) = self.sampler.take() {
            sampler.stop().await;
        }
        if let Some(supervisor) = self.supervisor.take() {
            supervisor.stop().await;
        }
        if let Some(task) = self.supervisor_task.take() {
            let _ = task.await;
        }

        DaemonState::set_active(&self.config.daemon.state_file, false);
        info!("pipeline stopped");
    }

    /// Run until interrupted, then shut down gracefully.
    pub async fn run(&mut self) -> AppResult<()> {
        self.start_work().await?;

        wait_for_shutdown_signal().await;
        info!("shutdown signal received");

        self.stop_work().await;
        self.store.close().await;
        Ok(())
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(e) => {
                error!(error = %e, "cannot install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
