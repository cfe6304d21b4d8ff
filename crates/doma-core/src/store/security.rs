// ── Security store ──
//
// Flame and gas sensors plus the alarm review queue. Alarm resolution
// is optimistic: the record flips locally the moment the user acts, and
// rolls back if the backend rejects the transition. Only pending
// records are staged, so a rollback never touches a resolved record.

use std::sync::Arc;

use doma_api::ConsoleClient;
use doma_api::model::{AlarmRecord, AlarmStatus, SecuritySensor, SensorStatus};
use doma_api::types::AlarmQuery;
use tracing::warn;

use super::collection::Collection;
use super::freshness::{Freshness, FreshnessCell};
use super::journal::{Journal, MutationTicket};
use super::subscription::Subscription;
use crate::error::CoreError;

/// Which way the user resolved an alarm.
#[derive(Clone, Copy)]
enum Resolution {
    Confirm,
    Ignore,
}

impl Resolution {
    fn status(self) -> AlarmStatus {
        match self {
            Self::Confirm => AlarmStatus::Confirmed,
            Self::Ignore => AlarmStatus::Ignored,
        }
    }
}

/// Reactive store for one home's security posture.
#[derive(Clone)]
pub struct SecurityStore {
    inner: Arc<SecurityStoreInner>,
}

struct SecurityStoreInner {
    client: ConsoleClient,
    sensors: Collection<i64, SecuritySensor>,
    alarms: Collection<i64, AlarmRecord>,
    sensors_freshness: FreshnessCell,
    alarms_freshness: FreshnessCell,
    journal: Journal,
}

impl SecurityStore {
    pub fn new(client: ConsoleClient) -> Self {
        Self {
            inner: Arc::new(SecurityStoreInner {
                client,
                sensors: Collection::new(),
                alarms: Collection::new(),
                sensors_freshness: FreshnessCell::new(),
                alarms_freshness: FreshnessCell::new(),
                journal: Journal::new(),
            }),
        }
    }

    // ━━ Fetches ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub async fn fetch_sensors(&self, home_id: i64) -> Result<(), CoreError> {
        match self.inner.client.list_security_sensors(home_id).await {
            Ok(sensors) => {
                self.inner.sensors.replace_all(sensors, |s| s.id);
                self.inner.sensors_freshness.mark_fresh();
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.inner.sensors_freshness.mark_stale(&err);
                warn!(home = home_id, error = %err, "sensor refresh failed; serving the previous snapshot");
                Err(err)
            }
        }
    }

    /// Refresh the alarm queue, optionally filtered by time window,
    /// kind, or status.
    pub async fn fetch_alarms(&self, home_id: i64, query: &AlarmQuery) -> Result<(), CoreError> {
        match self.inner.client.list_alarms(home_id, query).await {
            Ok(alarms) => {
                self.inner.alarms.replace_all(alarms, |a| a.id);
                self.inner.alarms_freshness.mark_fresh();
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.inner.alarms_freshness.mark_stale(&err);
                warn!(home = home_id, error = %err, "alarm refresh failed; serving the previous snapshot");
                Err(err)
            }
        }
    }

    // ━━ Reads ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub fn sensors(&self) -> Arc<Vec<Arc<SecuritySensor>>> {
        self.inner.sensors.snapshot()
    }

    pub fn alarms(&self) -> Arc<Vec<Arc<AlarmRecord>>> {
        self.inner.alarms.snapshot()
    }

    pub fn alarm(&self, alarm_id: i64) -> Option<Arc<AlarmRecord>> {
        self.inner.alarms.get(&alarm_id)
    }

    pub fn subscribe_sensors(&self) -> Subscription<SecuritySensor> {
        Subscription::new(self.inner.sensors.subscribe())
    }

    pub fn subscribe_alarms(&self) -> Subscription<AlarmRecord> {
        Subscription::new(self.inner.alarms.subscribe())
    }

    pub fn sensors_freshness(&self) -> Freshness {
        self.inner.sensors_freshness.get()
    }

    pub fn alarms_freshness(&self) -> Freshness {
        self.inner.alarms_freshness.get()
    }

    pub fn pending_mutations(&self) -> usize {
        self.inner.journal.pending_count()
    }

    // ━━ Derived views ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Sensors the server reports abnormal. Never derived from value vs
    /// threshold locally.
    pub fn abnormal_sensors(&self) -> Vec<Arc<SecuritySensor>> {
        self.inner
            .sensors
            .snapshot()
            .iter()
            .filter(|s| s.status == SensorStatus::Abnormal)
            .cloned()
            .collect()
    }

    pub fn pending_alarms(&self) -> Vec<Arc<AlarmRecord>> {
        self.inner
            .alarms
            .snapshot()
            .iter()
            .filter(|a| a.status == AlarmStatus::Pending)
            .cloned()
            .collect()
    }

    /// True while any alarm awaits review or any sensor reads abnormal.
    pub fn has_alarm(&self) -> bool {
        !self.pending_alarms().is_empty() || !self.abnormal_sensors().is_empty()
    }

    // ━━ Alarm resolution ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub fn confirm_alarm(&self, home_id: i64, alarm_id: i64) -> Result<MutationTicket, CoreError> {
        self.resolve_alarm(home_id, alarm_id, Resolution::Confirm)
    }

    pub fn ignore_alarm(&self, home_id: i64, alarm_id: i64) -> Result<MutationTicket, CoreError> {
        self.resolve_alarm(home_id, alarm_id, Resolution::Ignore)
    }

    fn resolve_alarm(
        &self,
        home_id: i64,
        alarm_id: i64,
        resolution: Resolution,
    ) -> Result<MutationTicket, CoreError> {
        let Some(current) = self.inner.alarms.get(&alarm_id) else {
            return Err(CoreError::NotFound {
                entity: "alarm",
                id: alarm_id.to_string(),
            });
        };

        // Stage only pending records. The request still goes out for a
        // locally resolved one, and the server's verdict settles it.
        if current.status == AlarmStatus::Pending {
            let mut resolved = (*current).clone();
            resolved.status = resolution.status();
            self.inner.alarms.stage(&alarm_id, resolved);
        }

        let ticket = self.inner.journal.begin(format!("alarm {alarm_id}"));
        let mutation = ticket.id();

        let store = self.clone();
        tokio::spawn(async move {
            let outcome = match resolution {
                Resolution::Confirm => store.inner.client.confirm_alarm(home_id, alarm_id).await,
                Resolution::Ignore => store.inner.client.ignore_alarm(home_id, alarm_id).await,
            };
            match outcome {
                Ok(_) => {
                    store.inner.alarms.promote(&alarm_id);
                    store.inner.journal.applied(mutation);
                }
                Err(e) => {
                    let err = CoreError::from(e);
                    store.inner.alarms.revert(&alarm_id);
                    warn!(alarm = alarm_id, error = %err, "alarm resolution failed; draft rolled back");
                    store.inner.journal.reverted(mutation, err.to_string());
                }
            }
        });

        Ok(ticket)
    }
}
