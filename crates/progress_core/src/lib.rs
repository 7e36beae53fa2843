//! Progress core: task handles, progress events, and the visible-task registry.
mod event;
mod registry;
mod task;
mod view;

pub use event::{EventKind, ProgressEvent};
pub use registry::{NotifyExecutor, RegistryChange, RegistryObserver, TaskRegistry};
pub use task::{TaskHandle, TaskId, TaskOptions, DEFAULT_INITIAL_DELAY};
pub use view::{RegistryView, TaskRowView};
