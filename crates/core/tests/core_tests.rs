//! Integration tests for the core crate.

use jobwatch_core::diff::compare;
use jobwatch_core::model::{BuildState, Job, Snapshot, Transition, TransitionKind};
use jobwatch_core::policy::{Delivery, NotificationPolicy, PolicyConfig};
use jobwatch_core::status::StatusMapper;

fn job(name: &str, state: BuildState) -> Job {
    Job {
        name: name.into(),
        url: format!("http://ci.local/job/{name}/"),
        type_name: "WorkflowJob".into(),
        raw_status: String::new(),
        state,
        building: false,
    }
}

fn snap(at: i64, jobs: &[(&str, BuildState)]) -> Snapshot {
    Snapshot::new(at, jobs.iter().map(|(n, s)| job(n, *s)))
}

#[test]
fn test_build_state_serde() {
    let serialized = serde_json::to_string(&BuildState::NotBuilt).unwrap();
    assert_eq!(serialized, r#""not_built""#);
    let deserialized: BuildState = serde_json::from_str(&serialized).unwrap();
    assert_eq!(deserialized, BuildState::NotBuilt);
}

#[test]
fn test_transition_kind_serde() {
    let serialized = serde_json::to_string(&TransitionKind::Appeared).unwrap();
    assert_eq!(serialized, r#""appeared""#);
}

#[test]
fn first_snapshot_produces_nothing() {
    let s = snap(1, &[("a", BuildState::Failure), ("b", BuildState::Success)]);
    assert!(compare(None, &s).is_empty());
    assert!(compare(None, &Snapshot::new(1, vec![])).is_empty());
}

#[test]
fn unchanged_jobs_produce_nothing() {
    let old = snap(1, &[("a", BuildState::Failure), ("b", BuildState::Success)]);
    let new = snap(2, &[("a", BuildState::Failure), ("b", BuildState::Success)]);
    assert!(compare(Some(&old), &new).is_empty());
}

#[test]
fn compare_is_deterministic() {
    let old = snap(1, &[("x", BuildState::Success), ("y", BuildState::Unstable), ("z", BuildState::Aborted)]);
    let new = snap(2, &[("y", BuildState::Failure), ("z", BuildState::Success), ("w", BuildState::Unknown)]);
    let first = compare(Some(&old), &new);
    let second = compare(Some(&old), &new);
    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
}

#[test]
fn regression_listed_before_new_job() {
    let old = snap(1, &[("A", BuildState::Success), ("B", BuildState::Failure)]);
    let new = snap(2, &[("A", BuildState::Failure), ("B", BuildState::Failure), ("C", BuildState::Success)]);

    let out = compare(Some(&old), &new);
    assert_eq!(
        out,
        vec![
            Transition {
                kind: TransitionKind::Changed,
                job_name: "A".into(),
                from_state: Some(BuildState::Success),
                to_state: Some(BuildState::Failure),
                from_building: false,
                to_building: false,
                observed_at_ms: 2,
            },
            Transition {
                kind: TransitionKind::Appeared,
                job_name: "C".into(),
                from_state: None,
                to_state: Some(BuildState::Success),
                from_building: false,
                to_building: false,
                observed_at_ms: 2,
            },
        ]
    );
}

#[test]
fn vanished_job_is_removed_and_worthy() {
    let old = snap(1, &[("A", BuildState::Success)]);
    let new = Snapshot::new(2, vec![]);

    let out = compare(Some(&old), &new);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].kind, TransitionKind::Removed);
    assert_eq!(out[0].to_state, None);

    let mut policy = NotificationPolicy::default();
    let verdicts = policy.filter(out);
    assert_eq!(verdicts.len(), 1);
    assert_eq!(verdicts[0].delivery, Delivery::Send);
}

#[test]
fn flicker_inside_window_is_history_only() {
    let mut policy = NotificationPolicy::new(PolicyConfig {
        flicker_window_ms: 10_000,
        ..PolicyConfig::default()
    });
    let s0 = snap(0, &[("A", BuildState::Success)]);
    let s1 = snap(1_000, &[("A", BuildState::Failure)]);
    let s2 = snap(4_000, &[("A", BuildState::Success)]);

    let first = policy.filter(compare(Some(&s0), &s1));
    let second = policy.filter(compare(Some(&s1), &s2));
    assert_eq!(first[0].delivery, Delivery::Send);
    assert_eq!(second.len(), 1, "throttled transitions still reach history");
    assert_eq!(second[0].delivery, Delivery::Throttled);
}

#[test]
fn flicker_outside_window_reaches_sink() {
    let mut policy = NotificationPolicy::new(PolicyConfig {
        flicker_window_ms: 10_000,
        ..PolicyConfig::default()
    });
    let s0 = snap(0, &[("A", BuildState::Success)]);
    let s1 = snap(1_000, &[("A", BuildState::Failure)]);
    let s2 = snap(20_000, &[("A", BuildState::Success)]);

    let first = policy.filter(compare(Some(&s0), &s1));
    let second = policy.filter(compare(Some(&s1), &s2));
    assert_eq!(first[0].delivery, Delivery::Send);
    assert_eq!(second[0].delivery, Delivery::Send);
}

#[test]
fn mapper_is_total() {
    let mapper = StatusMapper::default();
    let inputs = ["", "blue", "RED_ANIME", "yellow_anime", "grey", "weird-token", "_anime", "anime", "   "];
    for raw in inputs {
        let (state, building) = mapper.map(raw);
        if state == BuildState::Unknown {
            assert!(!building, "{raw:?} unknown but building");
        }
    }
}
