use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use progress_core::DEFAULT_INITIAL_DELAY;

/// Coalescing window: a burst of events inside one quantum collapses into a
/// single delivery per task.
pub const DEFAULT_QUANTUM: Duration = Duration::from_millis(400);

/// Lower bound for the shortened re-arm delay used while tasks wait out
/// their initial display delay.
pub const MIN_REARM_DELAY: Duration = Duration::from_millis(100);

/// Clock used by the controller; injected so tests control time.
pub type Clock = Arc<dyn Fn() -> Instant + Send + Sync>;

#[derive(Clone)]
pub struct DispatchConfig {
    pub quantum: Duration,
    /// Default grace period for tasks started without explicit options.
    pub initial_delay: Duration,
    pub clock: Clock,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            quantum: DEFAULT_QUANTUM,
            initial_delay: DEFAULT_INITIAL_DELAY,
            clock: Arc::new(Instant::now),
        }
    }
}

impl fmt::Debug for DispatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchConfig")
            .field("quantum", &self.quantum)
            .field("initial_delay", &self.initial_delay)
            .finish_non_exhaustive()
    }
}
