use std::{sync::Arc, time::Duration};

use chrono::Utc;
use log::{info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::TrackerConfig,
    error::{Result, TrackingError},
    feedback::FeedbackSelector,
    pose::{generate_frame, ExerciseKind},
};

use super::{Broadcaster, LifecycleState, Session, TickUpdate, UpdateSink};

// The tick loop fires every interval; keep it quiet unless debugging.
const ENABLE_LOGS: bool = false;

use crate::{log_debug, log_info};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSnapshot {
    pub state: LifecycleState,
    pub run_id: Option<String>,
    pub repetitions: u32,
    pub accuracy: f64,
    pub duration_seconds: u64,
    pub feedback: Vec<String>,
    pub exercise_name: Option<String>,
    pub started_at_millis: i64,
    pub queried_at_millis: i64,
}

struct Ticker {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

impl Ticker {
    fn cancel(self) {
        self.cancel_token.cancel();
        self.handle.abort();
    }
}

/// Everything the commands and the tick loop share. Only ever touched while
/// holding the controller's lock.
struct Inner {
    session: Session,
    broadcaster: Broadcaster,
    rng: StdRng,
    /// Bumped whenever a run starts or ends; a tick from an older generation is stale.
    generation: u64,
    ticker: Option<Ticker>,
}

impl Inner {
    fn cancel_ticker(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }

    /// Runs one tick of `generation`. Returns false once the run is over.
    fn tick(&mut self, generation: u64, config: &TrackerConfig, feedback: &FeedbackSelector) -> bool {
        if generation != self.generation || !self.session.is_tracking() {
            return false;
        }

        if self.rng.gen_bool(config.repetition_probability) {
            self.session.repetitions = self.session.repetitions.saturating_add(1);
        }

        self.session.accuracy = (self.session.accuracy + config.accuracy_step)
            .min(config.accuracy_cap)
            .max(self.session.accuracy);

        if let Some(phrase) = feedback.maybe_append(&mut self.rng, &mut self.session.feedback_log) {
            log_debug!("New feedback: {}", phrase);
        }

        let keypoints = generate_frame(&self.session.exercise_type, self.session.elapsed_secs());

        let update = TickUpdate {
            repetitions: self.session.repetitions,
            accuracy: self.session.accuracy,
            latest_feedback: self.session.latest_feedback().map(str::to_string),
            tracking: true,
            keypoints,
        };

        self.broadcaster.publish(update);
        true
    }
}

#[derive(Clone)]
pub struct TrackingController {
    inner: Arc<Mutex<Inner>>,
    config: Arc<TrackerConfig>,
    feedback: FeedbackSelector,
}

impl TrackingController {
    pub fn new(config: TrackerConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    pub fn with_rng(config: TrackerConfig, rng: StdRng) -> Self {
        let config = config.sanitized();
        Self {
            feedback: FeedbackSelector::new(config.feedback_probability),
            inner: Arc::new(Mutex::new(Inner {
                session: Session::new(),
                broadcaster: Broadcaster::new(),
                rng,
                generation: 0,
                ticker: None,
            })),
            config: Arc::new(config),
        }
    }

    pub async fn state(&self) -> LifecycleState {
        self.inner.lock().await.session.state
    }

    pub async fn initialize(&self, sdk_key: Option<&str>) -> Result<bool> {
        let sdk_key = match sdk_key {
            Some(key) if !key.is_empty() => key,
            _ => {
                warn!("Rejected initialize: missing SDK key");
                return Err(TrackingError::InvalidCredential);
            }
        };

        let mut inner = self.inner.lock().await;
        if inner.session.state != LifecycleState::Tracking {
            inner.session.state = LifecycleState::Initialized;
        }

        let prefix: String = sdk_key.chars().take(10).collect();
        info!("Tracking SDK initialized with key: {}...", prefix);
        Ok(true)
    }

    /// Starts a run, restarting from zero if one is already in progress.
    pub async fn start_tracking(
        &self,
        exercise_type: Option<&str>,
        exercise_name: Option<&str>,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        if !inner.session.can_track() {
            warn!("Rejected startTracking: session is {}", inner.session.state.as_str());
            return Err(TrackingError::NotInitialized);
        }

        let (exercise_type, exercise_name) = match (exercise_type, exercise_name) {
            (Some(t), Some(n)) if !t.is_empty() && !n.is_empty() => (t, n),
            _ => {
                warn!("Rejected startTracking: exercise type and name are required");
                return Err(TrackingError::InvalidExercise);
            }
        };

        if inner.session.is_tracking() {
            info!("Restarting tracking run");
        }
        inner.cancel_ticker();
        inner.session.begin_run(exercise_type, exercise_name, Instant::now());

        let generation = inner.generation;
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(tick_loop(
            Arc::clone(&self.inner),
            generation,
            self.config.tick_interval(),
            cancel_token.clone(),
            Arc::clone(&self.config),
            self.feedback.clone(),
        ));
        inner.ticker = Some(Ticker {
            handle,
            cancel_token,
        });

        info!(
            "Started tracking exercise: {} ({}, {} motion)",
            exercise_name,
            exercise_type,
            ExerciseKind::classify(exercise_type).as_str()
        );
        Ok(true)
    }

    pub async fn stop_tracking(&self) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        inner.cancel_ticker();
        inner.session.stop();
        info!("Stopped exercise tracking");
        Ok(true)
    }

    pub async fn get_results(&self) -> Result<ResultsSnapshot> {
        let inner = self.inner.lock().await;
        let session = &inner.session;
        let snapshot = ResultsSnapshot {
            state: session.state,
            run_id: session.run_id.map(|id| id.to_string()),
            repetitions: session.repetitions,
            accuracy: session.accuracy,
            duration_seconds: session.duration_seconds(),
            feedback: session.feedback_log.clone(),
            exercise_name: session.exercise_name.clone(),
            started_at_millis: session.started_at_millis,
            queried_at_millis: Utc::now().timestamp_millis(),
        };
        info!(
            "Returning exercise results: {} reps, accuracy {:.2}, {}s",
            snapshot.repetitions, snapshot.accuracy, snapshot.duration_seconds
        );
        Ok(snapshot)
    }

    pub async fn dispose(&self) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        inner.cancel_ticker();
        inner.session.dispose();
        inner.broadcaster.detach();
        info!("Tracking session disposed");
        Ok(true)
    }

    pub async fn subscribe(&self, sink: Box<dyn UpdateSink>) {
        self.inner.lock().await.broadcaster.attach(sink);
        info!("Update listener attached");
    }

    /// Attaches a fresh unbounded channel and returns its receiving end.
    pub async fn subscribe_channel(&self) -> mpsc::UnboundedReceiver<TickUpdate> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribe(Box::new(tx)).await;
        rx
    }

    pub async fn unsubscribe(&self) {
        self.inner.lock().await.broadcaster.detach();
        info!("Update listener cancelled");
    }

    pub async fn has_subscriber(&self) -> bool {
        self.inner.lock().await.broadcaster.has_subscriber()
    }
}

async fn tick_loop(
    inner: Arc<Mutex<Inner>>,
    generation: u64,
    period: Duration,
    cancel_token: CancellationToken,
    config: Arc<TrackerConfig>,
    feedback: FeedbackSelector,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let mut guard = inner.lock().await;
                if cancel_token.is_cancelled() || !guard.tick(generation, &config, &feedback) {
                    break;
                }
            }
            _ = cancel_token.cancelled() => break,
        }
    }

    log_info!("Tick loop for generation {} finished", generation);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(seed: u64) -> TrackingController {
        TrackingController::with_rng(TrackerConfig::default(), StdRng::seed_from_u64(seed))
    }

    #[tokio::test]
    async fn test_initialize_requires_key() {
        let controller = controller(1);
        assert_eq!(controller.initialize(None).await, Err(TrackingError::InvalidCredential));
        assert_eq!(controller.initialize(Some("")).await, Err(TrackingError::InvalidCredential));
        assert_eq!(controller.state().await, LifecycleState::Uninitialized);
        assert_eq!(controller.initialize(Some("key123")).await, Ok(true));
        assert_eq!(controller.state().await, LifecycleState::Initialized);
    }

    #[tokio::test]
    async fn test_start_before_initialize_fails() {
        let controller = controller(1);
        let result = controller.start_tracking(Some("squat"), Some("Squats")).await;
        assert_eq!(result, Err(TrackingError::NotInitialized));
        let results = controller.get_results().await.unwrap();
        assert_eq!(results.repetitions, 0);
        assert_eq!(results.started_at_millis, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_exercise_leaves_run_untouched() {
        let controller = controller(2);
        controller.initialize(Some("key123")).await.unwrap();
        controller.start_tracking(Some("squat"), Some("Squats")).await.unwrap();
        time::sleep(Duration::from_millis(5_500)).await;
        let before = controller.get_results().await.unwrap();

        assert_eq!(
            controller.start_tracking(Some("squat"), Some("")).await,
            Err(TrackingError::InvalidExercise)
        );
        assert_eq!(
            controller.start_tracking(None, Some("Squats")).await,
            Err(TrackingError::InvalidExercise)
        );

        let after = controller.get_results().await.unwrap();
        assert_eq!(after.run_id, before.run_id);
        assert_eq!(after.repetitions, before.repetitions);
        assert_eq!(after.accuracy, before.accuracy);
        assert_eq!(after.feedback, before.feedback);
        assert_eq!(after.exercise_name.as_deref(), Some("Squats"));
        assert_eq!(controller.state().await, LifecycleState::Tracking);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_advance_accuracy_and_deliver_frames() {
        let controller = controller(3);
        let mut rx = controller.subscribe_channel().await;
        controller.initialize(Some("key123")).await.unwrap();
        controller.start_tracking(Some("squat"), Some("Squats")).await.unwrap();

        time::sleep(Duration::from_millis(10_500)).await;

        let mut updates = Vec::new();
        while let Ok(update) = rx.try_recv() {
            updates.push(update);
        }
        assert_eq!(updates.len(), 10);

        let mut last_accuracy = 0.0;
        let mut last_reps = 0;
        for update in &updates {
            assert_eq!(update.keypoints.len(), 17);
            assert!(update.tracking);
            assert!(update.accuracy >= last_accuracy);
            assert!(update.repetitions >= last_reps);
            last_accuracy = update.accuracy;
            last_reps = update.repetitions;
        }
        assert!((last_accuracy - 0.10).abs() < 1e-9);

        let results = controller.get_results().await.unwrap();
        assert_eq!(results.duration_seconds, 10);
        assert!(results.repetitions <= 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_accuracy_caps_at_095() {
        let controller = controller(4);
        controller.initialize(Some("key123")).await.unwrap();
        controller.start_tracking(Some("plank"), Some("Plank")).await.unwrap();

        time::sleep(Duration::from_secs(120)).await;

        let results = controller.get_results().await.unwrap();
        assert!((results.accuracy - 0.95).abs() < 1e-9);
        assert!(results.accuracy <= 0.95);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_delivery() {
        let controller = controller(5);
        let mut rx = controller.subscribe_channel().await;
        controller.initialize(Some("key123")).await.unwrap();
        controller.start_tracking(Some("lunge"), Some("Lunges")).await.unwrap();
        time::sleep(Duration::from_millis(3_500)).await;

        assert_eq!(controller.stop_tracking().await, Ok(true));
        while rx.try_recv().is_ok() {}

        time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
        assert!(controller.has_subscriber().await);

        let results = controller.get_results().await.unwrap();
        assert_eq!(results.state, LifecycleState::Initialized);
        assert_eq!(results.exercise_name, None);
        assert!((results.accuracy - 0.03).abs() < 1e-9);
    }

    async fn record_run(seed: u64) -> Vec<(u32, Option<String>)> {
        let controller = TrackingController::new(TrackerConfig {
            rng_seed: Some(seed),
            feedback_probability: 0.5,
            ..TrackerConfig::default()
        });
        let mut rx = controller.subscribe_channel().await;
        controller.initialize(Some("key123")).await.unwrap();
        controller.start_tracking(Some("squat"), Some("Squats")).await.unwrap();
        time::sleep(Duration::from_millis(20_500)).await;
        controller.dispose().await.unwrap();

        let mut seen = Vec::new();
        while let Ok(update) = rx.try_recv() {
            seen.push((update.repetitions, update.latest_feedback));
        }
        seen
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeded_sessions_repeat_exactly() {
        let first = record_run(42).await;
        let second = record_run(42).await;
        assert_eq!(first.len(), 20);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_stop_is_permissive() {
        let controller = controller(6);
        assert_eq!(controller.stop_tracking().await, Ok(true));
        assert_eq!(controller.stop_tracking().await, Ok(true));
        assert_eq!(controller.state().await, LifecycleState::Uninitialized);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_resets_run() {
        let controller = TrackingController::with_rng(
            TrackerConfig {
                repetition_probability: 1.0,
                feedback_probability: 1.0,
                ..TrackerConfig::default()
            },
            StdRng::seed_from_u64(7),
        );
        let mut rx = controller.subscribe_channel().await;
        controller.initialize(Some("key123")).await.unwrap();
        controller.start_tracking(Some("squat"), Some("Squats")).await.unwrap();
        time::sleep(Duration::from_millis(4_500)).await;

        let first = controller.get_results().await.unwrap();
        assert_eq!(first.repetitions, 4);
        assert!(!first.feedback.is_empty());

        controller.start_tracking(Some("push-up"), Some("Push Ups")).await.unwrap();
        let restarted = controller.get_results().await.unwrap();
        assert_eq!(restarted.repetitions, 0);
        assert!(restarted.feedback.is_empty());
        assert_eq!(restarted.accuracy, 0.0);
        assert_ne!(restarted.run_id, first.run_id);

        while rx.try_recv().is_ok() {}
        time::sleep(Duration::from_millis(1_500)).await;

        // Only the new run's ticker is alive.
        let mut updates = Vec::new();
        while let Ok(update) = rx.try_recv() {
            updates.push(update);
        }
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].repetitions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_resets_and_detaches() {
        let controller = controller(8);
        let mut rx = controller.subscribe_channel().await;
        controller.initialize(Some("key123")).await.unwrap();
        controller.start_tracking(Some("squat"), Some("Squats")).await.unwrap();
        time::sleep(Duration::from_millis(2_500)).await;

        assert_eq!(controller.dispose().await, Ok(true));
        assert_eq!(controller.dispose().await, Ok(true));
        assert!(!controller.has_subscriber().await);

        let results = controller.get_results().await.unwrap();
        assert_eq!(results.state, LifecycleState::Disposed);
        assert_eq!(results.repetitions, 0);
        assert_eq!(results.accuracy, 0.0);
        assert!(results.feedback.is_empty());
        assert_eq!(results.duration_seconds, 0);

        assert_eq!(
            controller.start_tracking(Some("squat"), Some("Squats")).await,
            Err(TrackingError::NotInitialized)
        );

        while rx.try_recv().is_ok() {}
        time::sleep(Duration::from_secs(3)).await;
        assert!(rx.try_recv().is_err());

        assert_eq!(controller.initialize(Some("key123")).await, Ok(true));
        assert_eq!(controller.state().await, LifecycleState::Initialized);
    }

    #[tokio::test]
    async fn test_initialize_while_tracking_keeps_run() {
        let controller = controller(9);
        controller.initialize(Some("key123")).await.unwrap();
        controller.start_tracking(Some("squat"), Some("Squats")).await.unwrap();
        controller.initialize(Some("another-key")).await.unwrap();
        assert_eq!(controller.state().await, LifecycleState::Tracking);
        controller.dispose().await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_generation_tick_is_noop() {
        let controller = controller(10);
        controller.initialize(Some("key123")).await.unwrap();
        controller.start_tracking(Some("squat"), Some("Squats")).await.unwrap();

        let mut inner = controller.inner.lock().await;
        let stale = inner.generation.wrapping_sub(1);
        let config = TrackerConfig::default();
        let feedback = FeedbackSelector::new(1.0);
        assert!(!inner.tick(stale, &config, &feedback));
        assert_eq!(inner.session.accuracy, 0.0);

        let current = inner.generation;
        assert!(inner.tick(current, &config, &feedback));
        assert!((inner.session.accuracy - 0.01).abs() < 1e-9);
        inner.cancel_ticker();
    }
}
