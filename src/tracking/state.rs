use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Initialized,
    Tracking,
    Disposed,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Tracking => "tracking",
            LifecycleState::Disposed => "disposed",
        }
    }
}

/// Mutable record of the current (or most recent) tracking run.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub state: LifecycleState,
    pub run_id: Option<Uuid>,
    pub exercise_type: String,
    pub exercise_name: Option<String>,
    pub repetitions: u32,
    pub accuracy: f64,
    /// Wall-clock start of the run; 0 when no run has started.
    pub started_at_millis: i64,
    pub feedback_log: Vec<String>,
    /// Monotonic start of the run, used for elapsed time and animation phase.
    pub run_anchor: Option<Instant>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tracking(&self) -> bool {
        self.state == LifecycleState::Tracking
    }

    pub fn can_track(&self) -> bool {
        matches!(self.state, LifecycleState::Initialized | LifecycleState::Tracking)
    }

    pub fn begin_run(&mut self, exercise_type: &str, exercise_name: &str, now: Instant) {
        *self = Self {
            state: LifecycleState::Tracking,
            run_id: Some(Uuid::new_v4()),
            exercise_type: exercise_type.to_string(),
            exercise_name: Some(exercise_name.to_string()),
            repetitions: 0,
            accuracy: 0.0,
            started_at_millis: Utc::now().timestamp_millis(),
            feedback_log: Vec::new(),
            run_anchor: Some(now),
        };
    }

    /// Leaves counters and the feedback log in place for later retrieval.
    pub fn stop(&mut self) {
        if self.state == LifecycleState::Tracking {
            self.state = LifecycleState::Initialized;
        }
        self.exercise_name = None;
    }

    pub fn dispose(&mut self) {
        *self = Self {
            state: LifecycleState::Disposed,
            ..Self::default()
        };
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.run_anchor
            .map(|anchor| anchor.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    pub fn duration_seconds(&self) -> u64 {
        self.run_anchor
            .map(|anchor| anchor.elapsed().as_secs())
            .unwrap_or(0)
    }

    pub fn latest_feedback(&self) -> Option<&str> {
        self.feedback_log.last().map(String::as_str)
    }
}
