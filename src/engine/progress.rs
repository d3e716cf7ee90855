// src/engine/progress.rs

use std::fmt;
use std::sync::Mutex;

use serde::Serialize;

/// `(completed, total)` snapshot published after every change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: u64,
    pub total: u64,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.completed, self.total)
    }
}

type Publish = Box<dyn Fn(Progress) + Send + Sync>;

/// Aggregates done/total across every queued and running task.
///
/// Updates from several workers serialize on one mutex, so no increment is
/// lost. Each change publishes the new pair; once `completed` reaches
/// `total` the published pair is followed by a reset to `0/0`.
pub struct ProgressCounter {
    state: Mutex<Progress>,
    publish: Publish,
}

impl ProgressCounter {
    pub fn new(publish: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        Self {
            state: Mutex::new(Progress::default()),
            publish: Box::new(publish),
        }
    }

    /// Counter that publishes nowhere.
    pub fn silent() -> Self {
        Self::new(|_| {})
    }

    pub fn add_total(&self, count: u64) -> Progress {
        self.update(|p| p.total += count)
    }

    pub fn remove_total(&self, count: u64) -> Progress {
        self.update(|p| p.total = p.total.saturating_sub(count))
    }

    pub fn add_progress(&self, count: u64) -> Progress {
        self.update(|p| p.completed += count)
    }

    pub fn current(&self) -> Progress {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update(&self, change: impl FnOnce(&mut Progress)) -> Progress {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        change(&mut state);
        let snapshot = *state;
        (self.publish)(snapshot);
        if state.completed >= state.total {
            *state = Progress::default();
        }
        snapshot
    }
}

impl fmt::Debug for ProgressCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressCounter")
            .field("state", &self.current())
            .finish_non_exhaustive()
    }
}

