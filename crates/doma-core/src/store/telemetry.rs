// ── Telemetry store ──
//
// Periodic realtime polling per device plus one-shot reading and
// dashboard fetches. Dashboard aggregates pass straight through to the
// backend; only the poll loops keep local state.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use doma_api::ConsoleClient;
use doma_api::model::{DashboardData, EnergyDistribution, SecurityStatus, TemperatureTrend};
use doma_api::types::{
    HomeReadingsResponse, LatestReadingResponse, ReadingHistoryResponse, RealtimeReadingResponse,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::CoreError;

/// Poll cadence used when the caller has no preference.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Reactive store for sensor readings and dashboard aggregates.
#[derive(Clone)]
pub struct TelemetryStore {
    inner: Arc<TelemetryStoreInner>,
}

struct TelemetryStoreInner {
    client: ConsoleClient,
    /// Cancellation token of the active poll loop per device.
    polls: DashMap<i64, CancellationToken>,
    cancel: CancellationToken,
}

impl Drop for TelemetryStoreInner {
    fn drop(&mut self) {
        // Stops every poll loop still running.
        self.cancel.cancel();
    }
}

/// Live view of one device's poll loop.
pub struct PollHandle {
    device_id: i64,
    cancel: CancellationToken,
    readings: watch::Receiver<Option<Arc<RealtimeReadingResponse>>>,
}

impl PollHandle {
    pub fn device_id(&self) -> i64 {
        self.device_id
    }

    /// Stop the loop behind this handle. Idempotent.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Most recent reading, or `None` before the first fetch lands.
    pub fn latest(&self) -> Option<Arc<RealtimeReadingResponse>> {
        self.readings.borrow().clone()
    }

    /// Wait for the next reading. Returns false once the loop has
    /// stopped and no further readings will come.
    pub async fn changed(&mut self) -> bool {
        self.readings.changed().await.is_ok()
    }
}

impl TelemetryStore {
    pub fn new(client: ConsoleClient) -> Self {
        Self {
            inner: Arc::new(TelemetryStoreInner {
                client,
                polls: DashMap::new(),
                cancel: CancellationToken::new(),
            }),
        }
    }

    // ━━ Polling ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Start polling `device_id` every `every`. A loop already running
    /// for the device is stopped first; the first fetch fires
    /// immediately.
    pub fn start_polling(&self, device_id: i64, every: Duration) -> PollHandle {
        if let Some((_, previous)) = self.inner.polls.remove(&device_id) {
            previous.cancel();
        }

        let cancel = self.inner.cancel.child_token();
        let (tx, rx) = watch::channel(None);
        self.inner.polls.insert(device_id, cancel.clone());

        tokio::spawn(poll_task(
            self.inner.client.clone(),
            device_id,
            every,
            tx,
            cancel.clone(),
        ));

        PollHandle {
            device_id,
            cancel,
            readings: rx,
        }
    }

    /// Stop the poll loop for `device_id`, if one is running.
    pub fn stop_polling(&self, device_id: i64) {
        if let Some((_, cancel)) = self.inner.polls.remove(&device_id) {
            cancel.cancel();
        }
    }

    pub fn stop_all(&self) {
        self.inner.polls.retain(|_, cancel| {
            cancel.cancel();
            false
        });
    }

    /// Number of devices currently being polled.
    pub fn active_polls(&self) -> usize {
        self.inner.polls.len()
    }

    // ━━ One-shot reads ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub async fn latest_reading(&self, device_id: i64) -> Result<LatestReadingResponse, CoreError> {
        Ok(self.inner.client.latest_reading(device_id).await?)
    }

    pub async fn realtime_reading(
        &self,
        device_id: i64,
    ) -> Result<RealtimeReadingResponse, CoreError> {
        Ok(self.inner.client.realtime_reading(device_id).await?)
    }

    /// Reading history, newest first. The backend defaults to 10
    /// entries when `limit` is unset.
    pub async fn reading_history(
        &self,
        device_id: i64,
        limit: Option<u32>,
    ) -> Result<ReadingHistoryResponse, CoreError> {
        Ok(self.inner.client.reading_history(device_id, limit).await?)
    }

    pub async fn home_readings(&self, home_id: i64) -> Result<HomeReadingsResponse, CoreError> {
        Ok(self.inner.client.home_readings(home_id).await?)
    }

    // ━━ Dashboards ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub async fn dashboard_overview(&self) -> Result<DashboardData, CoreError> {
        Ok(self.inner.client.dashboard_overview().await?)
    }

    /// Hourly temperature trend ending now. The backend defaults to 24
    /// points when `hours` is unset.
    pub async fn temperature_trend(&self, hours: Option<u32>) -> Result<TemperatureTrend, CoreError> {
        Ok(self.inner.client.temperature_trend(hours).await?)
    }

    pub async fn energy_distribution(&self) -> Result<Vec<EnergyDistribution>, CoreError> {
        Ok(self.inner.client.energy_distribution().await?)
    }

    pub async fn security_status(&self) -> Result<SecurityStatus, CoreError> {
        Ok(self.inner.client.security_status().await?)
    }
}

/// Poll loop for one device. Fetch errors are logged and the loop keeps
/// going; the previous reading stays visible until a fetch succeeds.
async fn poll_task(
    client: ConsoleClient,
    device_id: i64,
    every: Duration,
    readings: watch::Sender<Option<Arc<RealtimeReadingResponse>>>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(every);
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => match client.realtime_reading(device_id).await {
                Ok(reading) => {
                    readings.send_replace(Some(Arc::new(reading)));
                }
                Err(e) => {
                    warn!(device = device_id, error = %e, "realtime poll failed");
                }
            },
        }
    }
}
