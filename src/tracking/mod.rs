pub mod broadcaster;
pub mod commands;
pub mod controller;
pub mod state;

pub use broadcaster::{Broadcaster, TickUpdate, UpdateSink};
pub use commands::{CommandDispatcher, MethodCall, MethodResult};
pub use controller::{ResultsSnapshot, TrackingController};
pub use state::{LifecycleState, Session};
