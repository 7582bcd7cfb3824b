//! Background audit worker for store reconciliation
//!
//! Content and metadata are written as two separate steps, so a failure in
//! between leaves one store ahead of the other. This worker periodically
//! compares both stores and logs every mismatch for an operator. It never
//! repairs anything.

use crate::error::MediaError;
use crate::service::media_service::{AuditReport, MediaService};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

/// Background audit worker
pub struct AuditWorker {
    service: Arc<MediaService>,
    interval: Duration,
}

/// Shortest period the worker will run at; `tokio::time::interval` rejects zero
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

impl AuditWorker {
    pub fn new(service: Arc<MediaService>, interval: Duration) -> Self {
        let interval = if interval < MIN_INTERVAL {
            warn!(
                "Audit interval {:?} is below the minimum, using {}s",
                interval,
                MIN_INTERVAL.as_secs()
            );
            MIN_INTERVAL
        } else {
            interval
        };
        Self { service, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the audit worker as a background task (non-blocking)
    pub fn start_background(self) -> tokio::task::JoinHandle<()> {
        info!("Starting audit worker with {}s interval", self.interval().as_secs());

        tokio::spawn(async move {
            let mut interval = time::interval(self.interval());
            // First tick fires immediately
            interval.tick().await;

            loop {
                interval.tick().await;

                match self.run_once().await {
                    Ok(report) if !report.is_consistent() => warn!(
                        "Audit found {} orphaned objects and {} dangling records",
                        report.orphaned_content.len(),
                        report.dangling_metadata.len()
                    ),
                    Ok(_) => {}
                    Err(e) => error!("Error running audit: {}", e),
                }
            }
        })
    }

    /// Run a single audit pass off the async executor
    pub async fn run_once(&self) -> Result<AuditReport, MediaError> {
        let service = Arc::clone(&self.service);
        tokio::task::spawn_blocking(move || service.audit())
            .await
            .map_err(|e| MediaError::BackendUnavailable(format!("Audit task failed: {}", e)))?
    }
}
