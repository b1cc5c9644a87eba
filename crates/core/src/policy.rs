use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{Transition, TransitionKind};

/// Knobs for [`NotificationPolicy`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Minimum gap between two live alerts for the same job. Zero disables
    /// flicker suppression.
    pub flicker_window_ms: i64,
    /// Alert on building-flag-only flips (a rebuild starting or ending in the
    /// same state).
    pub notify_building_changes: bool,
    /// Alert when a job shows up after startup.
    pub notify_appeared: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            flicker_window_ms: 30_000,
            notify_building_changes: false,
            notify_appeared: true,
        }
    }
}

/// Whether a worthy transition reaches the live sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    /// Deliver to the live sink.
    Send,
    /// History only; the job alerted too recently.
    Throttled,
}

/// A transition that passed the worthiness rules, with its delivery decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// The worthy transition.
    pub transition: Transition,
    /// Live delivery decision.
    pub delivery: Delivery,
}

impl Verdict {
    /// True when live delivery was suppressed.
    pub fn is_throttled(&self) -> bool {
        self.delivery == Delivery::Throttled
    }
}

/// Decides which transitions are notification-worthy and throttles flicker.
///
/// Holds the last live-alert time per job, in memory only. Mutated by the
/// single poll cycle, so it needs no locking.
#[derive(Debug, Default)]
pub struct NotificationPolicy {
    config: PolicyConfig,
    last_notified_ms: HashMap<String, i64>,
}

impl NotificationPolicy {
    /// Fresh policy with an empty throttle map.
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config,
            last_notified_ms: HashMap::new(),
        }
    }

    /// Active settings.
    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Whether `t` should produce a notification at all, ignoring throttling.
    pub fn is_worthy(&self, t: &Transition) -> bool {
        match t.kind {
            TransitionKind::Removed => true,
            TransitionKind::Appeared => self.config.notify_appeared,
            TransitionKind::Changed => {
                t.state_changed() || (self.config.notify_building_changes && t.from_building != t.to_building)
            }
        }
    }

    /// Drops unworthy transitions and marks the rest Send or Throttled,
    /// preserving input order.
    pub fn filter(&mut self, transitions: Vec<Transition>) -> Vec<Verdict> {
        let mut out = Vec::with_capacity(transitions.len());
        for t in transitions {
            if !self.is_worthy(&t) {
                continue;
            }
            let delivery = self.delivery_for(&t);
            out.push(Verdict {
                transition: t,
                delivery,
            });
        }
        out
    }

    fn delivery_for(&mut self, t: &Transition) -> Delivery {
        if t.kind == TransitionKind::Removed {
            self.last_notified_ms.remove(&t.job_name);
            return Delivery::Send;
        }

        // A clock that stepped backwards gives negative elapsed time; that is
        // outside the window, not inside it.
        let now = t.observed_at_ms;
        if let Some(last) = self.last_notified_ms.get(&t.job_name) {
            let elapsed = now.saturating_sub(*last);
            if (0..self.config.flicker_window_ms).contains(&elapsed) {
                return Delivery::Throttled;
            }
        }
        self.last_notified_ms.insert(t.job_name.clone(), now);
        Delivery::Send
    }
}
