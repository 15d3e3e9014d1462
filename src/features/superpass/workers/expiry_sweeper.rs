use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;

use crate::features::superpass::services::SuperpassService;

/// Background task that marks overdue Superpass tokens as expired
///
/// Verification checks the window on its own; the sweep only keeps stored
/// token status in line with the clock.
pub struct ExpirySweeper {
    service: Arc<SuperpassService>,
    period: Duration,
}

impl ExpirySweeper {
    pub fn new(service: Arc<SuperpassService>, period: Duration) -> Self {
        Self { service, period }
    }

    /// Run the sweeper in a background loop
    pub async fn run(&self) {
        tracing::info!(
            "Starting Superpass expiry sweeper (every {}s)",
            self.period.as_secs()
        );

        let mut interval = interval(self.period);

        loop {
            interval.tick().await;

            if let Err(e) = self.service.expire_overdue().await {
                tracing::error!("Error sweeping Superpass tokens: {:?}", e);
            }
        }
    }
}
