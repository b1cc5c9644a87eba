use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic classification of a job's last-known outcome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    /// Last build passed (`blue`).
    Success,
    /// Last build unstable, usually failing tests (`yellow`).
    Unstable,
    /// Last build failed (`red`).
    Failure,
    /// Job is disabled (`disabled`, `grey`).
    Disabled,
    /// Last build was aborted.
    Aborted,
    /// Job has never been built.
    NotBuilt,
    /// Token not recognised.
    Unknown,
}

impl BuildState {
    /// Rank used for significance heuristics and transition ordering.
    ///
    /// Failure > Unstable > Aborted > Disabled = NotBuilt = Unknown > Success.
    pub fn severity(self) -> u8 {
        match self {
            BuildState::Failure => 4,
            BuildState::Unstable => 3,
            BuildState::Aborted => 2,
            BuildState::Disabled | BuildState::NotBuilt | BuildState::Unknown => 1,
            BuildState::Success => 0,
        }
    }

    /// Lowercase label used in messages.
    pub fn as_str(self) -> &'static str {
        match self {
            BuildState::Success => "success",
            BuildState::Unstable => "unstable",
            BuildState::Failure => "failure",
            BuildState::Disabled => "disabled",
            BuildState::Aborted => "aborted",
            BuildState::NotBuilt => "not built",
            BuildState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One CI job as reported by the server at a poll instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Job {
    /// Unique key within a snapshot.
    pub name: String,
    /// Job page URL.
    pub url: String,
    /// Job kind, e.g. `FreeStyleProject` or `WorkflowJob`.
    pub type_name: String,
    /// Literal status token, e.g. `blue` or `red_anime`.
    pub raw_status: String,
    /// Mapped from `raw_status`.
    pub state: BuildState,
    /// True while the server reports a build in progress.
    pub building: bool,
}

/// Immutable, timestamped view of every job at one poll instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    /// Unix epoch millis of the fetch.
    pub observed_at_ms: i64,
    jobs: BTreeMap<String, Job>,
}

impl Snapshot {
    /// Builds a snapshot keyed by job name. A repeated name keeps the later job.
    pub fn new(observed_at_ms: i64, jobs: impl IntoIterator<Item = Job>) -> Self {
        let jobs = jobs.into_iter().map(|j| (j.name.clone(), j)).collect();
        Self {
            observed_at_ms,
            jobs,
        }
    }

    /// Job by name.
    pub fn get(&self, name: &str) -> Option<&Job> {
        self.jobs.get(name)
    }

    /// True if a job with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    /// Jobs in ascending name order.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    /// Number of jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// True when the server reported no jobs.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// What happened to a job between two snapshots.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// State or building flag moved.
    Changed,
    /// Job is new since the previous snapshot.
    Appeared,
    /// Job is gone from the server.
    Removed,
}

/// Severity attached to a notification handed to a sink.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Good news or neutral.
    Info,
    /// Worth a look.
    Warning,
    /// Something broke.
    Error,
}

/// A detected difference for one job between two consecutive snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transition {
    /// Kind of change.
    pub kind: TransitionKind,
    /// Job the change belongs to.
    pub job_name: String,
    /// `None` when the job appeared.
    pub from_state: Option<BuildState>,
    /// `None` when the job was removed.
    pub to_state: Option<BuildState>,
    /// Building flag in the old snapshot.
    pub from_building: bool,
    /// Building flag in the new snapshot.
    pub to_building: bool,
    /// `observed_at_ms` of the newer snapshot.
    pub observed_at_ms: i64,
}

impl Transition {
    /// True when the semantic state moved, not just the building flag.
    pub fn state_changed(&self) -> bool {
        self.from_state != self.to_state
    }

    /// Alert level for this transition.
    pub fn severity(&self) -> Severity {
        match (self.kind, self.to_state) {
            (TransitionKind::Removed, _) => Severity::Warning,
            (_, Some(BuildState::Failure)) => Severity::Error,
            (_, Some(BuildState::Unstable | BuildState::Aborted)) => Severity::Warning,
            _ => Severity::Info,
        }
    }

    /// Human-readable one-liner naming the job and its old/new state.
    pub fn message(&self) -> String {
        let name = &self.job_name;
        match (self.kind, self.from_state, self.to_state) {
            (TransitionKind::Appeared, _, Some(to)) => format!("{name}: appeared ({to})"),
            (TransitionKind::Removed, Some(from), _) => format!("{name}: removed (was {from})"),
            (TransitionKind::Changed, Some(from), Some(to)) if from != to => {
                format!("{name}: {from} -> {to}")
            }
            (TransitionKind::Changed, _, Some(to)) if self.to_building => {
                format!("{name}: build started ({to})")
            }
            (TransitionKind::Changed, _, Some(to)) => format!("{name}: build finished ({to})"),
            _ => format!("{name}: changed"),
        }
    }
}

/// All transitions produced by one successful poll cycle, for observers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransitionBatch {
    /// Timestamp of the snapshot that produced the batch.
    pub observed_at_ms: i64,
    /// Ordered as returned by [`crate::diff::compare`].
    pub transitions: Vec<Transition>,
}

/// Append-only history entry for a transition that passed the notification policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationRecord {
    /// ULID string.
    pub id: String,
    /// Job the record belongs to.
    pub job_name: String,
    /// Kind of change.
    pub kind: TransitionKind,
    /// State before, if the job existed.
    pub from_state: Option<BuildState>,
    /// State after, if the job still exists.
    pub to_state: Option<BuildState>,
    /// Message as it was (or would have been) delivered.
    pub message: String,
    /// Unix epoch millis of the triggering snapshot.
    pub timestamp_ms: i64,
    /// Live delivery was skipped by flicker suppression.
    #[serde(default)]
    pub throttled: bool,
}

impl NotificationRecord {
    /// Builds the record for `t`. Each call gets a fresh id.
    pub fn from_transition(t: &Transition, throttled: bool) -> Self {
        Self {
            id: crate::new_record_id(),
            job_name: t.job_name.clone(),
            kind: t.kind,
            from_state: t.from_state,
            to_state: t.to_state,
            message: t.message(),
            timestamp_ms: t.observed_at_ms,
            throttled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changed(from: BuildState, to: BuildState, to_building: bool) -> Transition {
        Transition {
            kind: TransitionKind::Changed,
            job_name: "api".into(),
            from_state: Some(from),
            to_state: Some(to),
            from_building: false,
            to_building,
            observed_at_ms: 10,
        }
    }

    #[test]
    fn severity_order() {
        let ranked = [
            BuildState::Failure,
            BuildState::Unstable,
            BuildState::Aborted,
            BuildState::Unknown,
            BuildState::Success,
        ];
        for pair in ranked.windows(2) {
            assert!(pair[0].severity() > pair[1].severity(), "{pair:?}");
        }
        assert_eq!(BuildState::Disabled.severity(), BuildState::NotBuilt.severity());
        assert_eq!(BuildState::NotBuilt.severity(), BuildState::Unknown.severity());
    }

    #[test]
    fn snapshot_keeps_last_duplicate() {
        let job = |status: &str, state| Job {
            name: "dup".into(),
            url: String::new(),
            type_name: String::new(),
            raw_status: status.into(),
            state,
            building: false,
        };
        let snap = Snapshot::new(0, vec![job("blue", BuildState::Success), job("red", BuildState::Failure)]);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.get("dup").map(|j| j.state), Some(BuildState::Failure));
    }

    #[test]
    fn messages() {
        assert_eq!(
            changed(BuildState::Success, BuildState::Failure, false).message(),
            "api: success -> failure"
        );
        assert_eq!(
            changed(BuildState::Success, BuildState::Success, true).message(),
            "api: build started (success)"
        );
        let removed = Transition {
            kind: TransitionKind::Removed,
            to_state: None,
            ..changed(BuildState::Unstable, BuildState::Unstable, false)
        };
        assert_eq!(removed.message(), "api: removed (was unstable)");
        assert_eq!(removed.severity(), Severity::Warning);
    }

    #[test]
    fn record_copies_transition() {
        let t = changed(BuildState::Success, BuildState::Failure, false);
        let rec = NotificationRecord::from_transition(&t, true);
        assert_eq!(rec.job_name, "api");
        assert_eq!(rec.to_state, Some(BuildState::Failure));
        assert_eq!(rec.timestamp_ms, 10);
        assert!(rec.throttled);
        assert_eq!(rec.id.len(), 26);
    }
}
