use crate::model::{Job, Snapshot, Transition, TransitionKind};

/// Compares two snapshots and returns the transitions between them.
///
/// With no previous snapshot nothing is reported: everything "appearing" at
/// startup is not news. Output is grouped Changed, Appeared, Removed and within
/// a group ordered by descending `to_state` severity then ascending name, so the
/// first transitions are the most urgent ones.
pub fn compare(old: Option<&Snapshot>, new: &Snapshot) -> Vec<Transition> {
    let Some(old) = old else {
        return Vec::new();
    };
    let at = new.observed_at_ms;

    let mut out = Vec::new();
    for job in new.jobs() {
        match old.get(&job.name) {
            Some(prev) if prev.state != job.state || prev.building != job.building => {
                out.push(changed(prev, job, at));
            }
            Some(_) => {}
            None => out.push(appeared(job, at)),
        }
    }
    for prev in old.jobs().filter(|j| !new.contains(&j.name)) {
        out.push(removed(prev, at));
    }

    sort_transitions(&mut out);
    out
}

/// Stable ordering contract shared by every consumer of a transition list.
pub fn sort_transitions(transitions: &mut [Transition]) {
    transitions.sort_by(|a, b| {
        a.kind
            .cmp(&b.kind)
            .then_with(|| severity_of(b).cmp(&severity_of(a)))
            .then_with(|| a.job_name.cmp(&b.job_name))
    });
}

fn severity_of(t: &Transition) -> u8 {
    t.to_state.map(|s| s.severity()).unwrap_or(0)
}

fn changed(prev: &Job, job: &Job, at: i64) -> Transition {
    Transition {
        kind: TransitionKind::Changed,
        job_name: job.name.clone(),
        from_state: Some(prev.state),
        to_state: Some(job.state),
        from_building: prev.building,
        to_building: job.building,
        observed_at_ms: at,
    }
}

fn appeared(job: &Job, at: i64) -> Transition {
    Transition {
        kind: TransitionKind::Appeared,
        job_name: job.name.clone(),
        from_state: None,
        to_state: Some(job.state),
        from_building: false,
        to_building: job.building,
        observed_at_ms: at,
    }
}

fn removed(prev: &Job, at: i64) -> Transition {
    Transition {
        kind: TransitionKind::Removed,
        job_name: prev.name.clone(),
        from_state: Some(prev.state),
        to_state: None,
        from_building: prev.building,
        to_building: false,
        observed_at_ms: at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BuildState;

    fn job(name: &str, state: BuildState, building: bool) -> Job {
        Job {
            name: name.into(),
            url: format!("http://ci/job/{name}/"),
            type_name: "FreeStyleProject".into(),
            raw_status: String::new(),
            state,
            building,
        }
    }

    fn snap(at: i64, jobs: &[(&str, BuildState)]) -> Snapshot {
        Snapshot::new(at, jobs.iter().map(|(n, s)| job(n, *s, false)))
    }

    #[test]
    fn building_flip_is_a_change() {
        let old = Snapshot::new(1, vec![job("a", BuildState::Success, false)]);
        let new = Snapshot::new(2, vec![job("a", BuildState::Success, true)]);
        let out = compare(Some(&old), &new);
        assert_eq!(out.len(), 1);
        assert!(!out[0].state_changed());
        assert!(out[0].to_building);
        assert_eq!(out[0].observed_at_ms, 2);
    }

    #[test]
    fn changed_ordered_by_severity_then_name() {
        use BuildState::*;
        let old = snap(1, &[("a", Success), ("b", Success), ("c", Success), ("d", Failure)]);
        let new = snap(2, &[("a", Unstable), ("b", Failure), ("c", Failure), ("d", Success)]);
        let names: Vec<_> = compare(Some(&old), &new)
            .into_iter()
            .map(|t| t.job_name)
            .collect();
        assert_eq!(names, ["b", "c", "a", "d"]);
    }

    #[test]
    fn groups_by_kind() {
        use BuildState::*;
        let old = snap(1, &[("keep", Success), ("gone", Failure)]);
        let new = snap(2, &[("keep", Failure), ("new", Failure)]);
        let kinds: Vec<_> = compare(Some(&old), &new).into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            [TransitionKind::Changed, TransitionKind::Appeared, TransitionKind::Removed]
        );
    }
}
