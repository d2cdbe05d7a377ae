use log::error;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::error::{ErrorPayload, TrackingError};

use super::{TickUpdate, TrackingController};

/// A request as it arrives from the host: a method name plus named arguments.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// String argument by name. Missing, null and non-string values are all absent.
    pub fn string_argument(&self, key: &str) -> Option<String> {
        self.arguments
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MethodResult {
    Success(Value),
    Error(ErrorPayload),
    NotImplemented,
}

impl MethodResult {
    pub fn is_success(&self) -> bool {
        matches!(self, MethodResult::Success(_))
    }
}

#[derive(Debug, Clone)]
enum Command {
    Initialize { sdk_key: Option<String> },
    StartTracking {
        exercise_type: Option<String>,
        exercise_name: Option<String>,
    },
    StopTracking,
    GetResults,
    Dispose,
    Subscribe,
    Unsubscribe,
}

impl Command {
    fn parse(call: &MethodCall) -> Option<Self> {
        let command = match call.method.as_str() {
            "initialize" => Command::Initialize {
                sdk_key: call.string_argument("sdkKey"),
            },
            "startTracking" => Command::StartTracking {
                exercise_type: call.string_argument("exerciseType"),
                exercise_name: call.string_argument("exerciseName"),
            },
            "stopTracking" => Command::StopTracking,
            "getResults" => Command::GetResults,
            "dispose" => Command::Dispose,
            "subscribe" => Command::Subscribe,
            "unsubscribe" => Command::Unsubscribe,
            _ => return None,
        };
        Some(command)
    }

    /// The error reported when this command faults internally.
    fn fault(&self, reason: String) -> TrackingError {
        match self {
            Command::Initialize { .. } => TrackingError::InitializationFailed(reason),
            Command::StartTracking { .. } => TrackingError::TrackingFailed(reason),
            Command::StopTracking => TrackingError::StopFailed(reason),
            // There is no listener-specific kind; detaching a listener is part of stopping delivery.
            Command::Subscribe | Command::Unsubscribe => TrackingError::StopFailed(reason),
            Command::GetResults => TrackingError::GetResultsFailed(reason),
            Command::Dispose => TrackingError::DisposeFailed(reason),
        }
    }

    async fn execute(
        self,
        controller: TrackingController,
        updates: mpsc::Sender<TickUpdate>,
    ) -> Result<Value, TrackingError> {
        match self {
            Command::Initialize { sdk_key } => {
                controller.initialize(sdk_key.as_deref()).await.map(Value::Bool)
            }
            Command::StartTracking {
                exercise_type,
                exercise_name,
            } => controller
                .start_tracking(exercise_type.as_deref(), exercise_name.as_deref())
                .await
                .map(Value::Bool),
            Command::StopTracking => controller.stop_tracking().await.map(Value::Bool),
            Command::GetResults => {
                let snapshot = controller.get_results().await?;
                serde_json::to_value(snapshot)
                    .map_err(|err| TrackingError::GetResultsFailed(err.to_string()))
            }
            Command::Dispose => controller.dispose().await.map(Value::Bool),
            Command::Subscribe => {
                controller.subscribe(Box::new(updates)).await;
                Ok(json!(true))
            }
            Command::Unsubscribe => {
                controller.unsubscribe().await;
                Ok(json!(true))
            }
        }
    }
}

/// Routes host method calls to the controller. Subscriptions attach the
/// dispatcher's update channel as the session's single listener.
#[derive(Clone)]
pub struct CommandDispatcher {
    controller: TrackingController,
    updates: mpsc::Sender<TickUpdate>,
}

impl CommandDispatcher {
    pub fn new(controller: TrackingController, updates: mpsc::Sender<TickUpdate>) -> Self {
        Self {
            controller,
            updates,
        }
    }

    pub fn controller(&self) -> &TrackingController {
        &self.controller
    }

    pub async fn handle(&self, call: &MethodCall) -> MethodResult {
        let Some(command) = Command::parse(call) else {
            return MethodResult::NotImplemented;
        };

        // Each command runs in its own task so a panic is reported as a fault
        // of that command instead of tearing down the host.
        let task = tokio::spawn(
            command
                .clone()
                .execute(self.controller.clone(), self.updates.clone()),
        );

        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(join_err) => {
                error!("{} faulted: {}", call.method, join_err);
                Err(command.fault(join_err.to_string()))
            }
        };

        match outcome {
            Ok(value) => MethodResult::Success(value),
            Err(err) => MethodResult::Error(ErrorPayload::from(&err)),
        }
    }
}
