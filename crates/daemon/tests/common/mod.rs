#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jobwatch_core::error::FetchError;
use jobwatch_core::model::{BuildState, Job, Snapshot};
use jobwatch_core::policy::{NotificationPolicy, PolicyConfig};
use jobwatch_daemon::dispatcher::Dispatcher;
use jobwatch_daemon::history::MemoryHistory;
use jobwatch_daemon::jenkins::JobSource;
use jobwatch_daemon::sink::MemorySink;
use jobwatch_daemon::store::SnapshotStore;
use tokio::net::TcpListener;
use tokio::time::Instant;

pub fn job(name: &str, state: BuildState) -> Job {
    Job {
        name: name.into(),
        url: format!("http://ci.local/job/{name}/"),
        type_name: "FreeStyleProject".into(),
        raw_status: String::new(),
        state,
        building: false,
    }
}

pub fn snap(at: i64, jobs: &[(&str, BuildState)]) -> Snapshot {
    Snapshot::new(at, jobs.iter().map(|(n, s)| job(n, *s)))
}

pub fn network_error() -> FetchError {
    FetchError::Network("connection refused".into())
}

/// Replays canned fetch results in order; an exhausted script keeps failing.
#[derive(Default)]
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<Snapshot, FetchError>>>,
    /// Simulated fetch latency.
    latency: Option<Duration>,
    started: Mutex<Vec<Instant>>,
    finished: Mutex<usize>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<Snapshot, FetchError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn started(&self) -> Vec<Instant> {
        self.started.lock().unwrap().clone()
    }

    pub fn finished(&self) -> usize {
        *self.finished.lock().unwrap()
    }
}

#[async_trait]
impl JobSource for ScriptedSource {
    async fn fetch_jobs(&self) -> Result<Snapshot, FetchError> {
        self.started.lock().unwrap().push(Instant::now());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        *self.finished.lock().unwrap() += 1;
        next.unwrap_or_else(|| Err(FetchError::Network("script exhausted".into())))
    }
}

pub struct Harness {
    pub source: Arc<ScriptedSource>,
    pub store: Arc<SnapshotStore>,
    pub sink: Arc<MemorySink>,
    pub history: Arc<MemoryHistory>,
    pub dispatcher: Dispatcher,
}

pub fn harness(source: ScriptedSource, policy: PolicyConfig) -> Harness {
    let source = Arc::new(source);
    let store = Arc::new(SnapshotStore::new());
    let sink = Arc::new(MemorySink::new());
    let history = Arc::new(MemoryHistory::new());
    let dispatcher = Dispatcher::new(
        source.clone(),
        store.clone(),
        NotificationPolicy::new(policy),
        sink.clone(),
        history.clone(),
    );
    Harness {
        source,
        store,
        sink,
        history,
        dispatcher,
    }
}

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn serve(app: axum::Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}
