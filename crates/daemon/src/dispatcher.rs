use std::sync::Arc;

use jobwatch_core::diff::compare;
use jobwatch_core::error::FetchError;
use jobwatch_core::model::{NotificationRecord, TransitionBatch};
use jobwatch_core::policy::{Delivery, NotificationPolicy};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::history::HistoryStore;
use crate::jenkins::JobSource;
use crate::sink::{Notification, NotificationSink};
use crate::store::SnapshotStore;

const EVENT_CAPACITY: usize = 64;

/// Counters for one successful poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub observed_at_ms: i64,
    pub jobs: usize,
    pub transitions: usize,
    pub delivered: usize,
    pub throttled: usize,
    pub sink_failures: usize,
    pub store_failures: usize,
}

/// Runs one poll cycle: fetch, swap snapshot, diff, filter, notify, record.
pub struct Dispatcher {
    source: Arc<dyn JobSource>,
    store: Arc<SnapshotStore>,
    policy: NotificationPolicy,
    sink: Arc<dyn NotificationSink>,
    history: Arc<dyn HistoryStore>,
    events: broadcast::Sender<TransitionBatch>,
}

impl Dispatcher {
    pub fn new(
        source: Arc<dyn JobSource>,
        store: Arc<SnapshotStore>,
        policy: NotificationPolicy,
        sink: Arc<dyn NotificationSink>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            source,
            store,
            policy,
            sink,
            history,
            events,
        }
    }

    /// Receives every non-empty transition batch, before policy filtering.
    pub fn subscribe(&self) -> broadcast::Receiver<TransitionBatch> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// A fetch error aborts the cycle before any state or store is touched.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, FetchError> {
        let snapshot = match self.source.fetch_jobs().await {
            Ok(s) => Arc::new(s),
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "fetch failed");
                return Err(e);
            }
        };

        let previous = self.store.replace(Arc::clone(&snapshot));
        let transitions = compare(previous.as_deref(), &snapshot);

        let mut report = CycleReport {
            observed_at_ms: snapshot.observed_at_ms,
            jobs: snapshot.len(),
            transitions: transitions.len(),
            ..CycleReport::default()
        };

        if !transitions.is_empty() {
            // No subscribers is fine.
            let _ = self.events.send(TransitionBatch {
                observed_at_ms: snapshot.observed_at_ms,
                transitions: transitions.clone(),
            });
        }

        for verdict in self.policy.filter(transitions) {
            let t = &verdict.transition;

            match verdict.delivery {
                Delivery::Send => {
                    let note = Notification::from(t);
                    match self.sink.deliver(&note).await {
                        Ok(()) => report.delivered += 1,
                        Err(e) => {
                            report.sink_failures += 1;
                            warn!(job = %t.job_name, error = %e, "notification delivery failed");
                        }
                    }
                }
                Delivery::Throttled => report.throttled += 1,
            }

            let record = NotificationRecord::from_transition(t, verdict.is_throttled());
            if let Err(e) = self.history.append(&record).await {
                report.store_failures += 1;
                warn!(job = %t.job_name, error = %e, "history write failed");
            }
        }

        if report.throttled > 0 {
            info!(throttled = report.throttled, "suppressed flicker notifications");
        }
        debug!(
            jobs = report.jobs,
            transitions = report.transitions,
            delivered = report.delivered,
            "poll cycle complete"
        );
        Ok(report)
    }
}
