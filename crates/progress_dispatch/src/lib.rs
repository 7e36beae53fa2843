//! Progress dispatch: debounced, coalescing delivery of progress events.
mod config;
mod controller;
mod executor;
mod sink;
mod timer;

pub use config::{Clock, DispatchConfig, DEFAULT_QUANTUM, MIN_REARM_DELAY};
pub use controller::Controller;
pub use executor::WorkerExecutor;
pub use sink::{ChannelSink, NullSink, RenderSink, SinkCall};
pub use timer::{ThreadTimer, Tick, TickScheduler};
