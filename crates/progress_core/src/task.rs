use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Identity of one progress-tracked operation. Never reused.
pub type TaskId = u64;

/// Grace period before a freshly started task becomes visible.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(500);

/// Per-task configuration, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskOptions {
    /// Grace period before the task is shown; a task that finishes sooner
    /// is never displayed at all.
    pub initial_delay: Duration,
    /// Whether the task was started by an explicit user action.
    pub user_initiated: bool,
    /// Custom-placed tasks bypass the initial delay entirely.
    pub custom_placed: bool,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            user_initiated: false,
            custom_placed: false,
        }
    }
}

#[derive(Debug)]
struct TaskState {
    id: TaskId,
    display_name: String,
    created_at: Instant,
    options: TaskOptions,
    asleep: AtomicBool,
}

/// Handle for one long-running operation being progress-tracked.
///
/// Cheap to clone; all clones refer to the same task. Equality and hashing
/// go by task id.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    state: Arc<TaskState>,
}

impl TaskHandle {
    pub fn new(
        id: TaskId,
        display_name: impl Into<String>,
        created_at: Instant,
        options: TaskOptions,
    ) -> Self {
        Self {
            state: Arc::new(TaskState {
                id,
                display_name: display_name.into(),
                created_at,
                options,
                asleep: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> TaskId {
        self.state.id
    }

    pub fn display_name(&self) -> &str {
        &self.state.display_name
    }

    pub fn created_at(&self) -> Instant {
        self.state.created_at
    }

    pub fn initial_delay(&self) -> Duration {
        self.state.options.initial_delay
    }

    pub fn is_user_initiated(&self) -> bool {
        self.state.options.user_initiated
    }

    pub fn is_custom_placed(&self) -> bool {
        self.state.options.custom_placed
    }

    /// A sleeping task only receives silent message updates and is a weak
    /// candidate for automatic selection.
    pub fn is_asleep(&self) -> bool {
        self.state.asleep.load(Ordering::Relaxed)
    }

    pub fn set_asleep(&self, asleep: bool) {
        self.state.asleep.store(asleep, Ordering::Relaxed);
    }

    /// Time elapsed since the task was created, as seen by `now`.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.state.created_at)
    }
}

impl PartialEq for TaskHandle {
    fn eq(&self, other: &Self) -> bool {
        self.state.id == other.state.id
    }
}

impl Eq for TaskHandle {}

impl Hash for TaskHandle {
    fn hash<H: Hasher>(&self, hasher: &mut H) {
        self.state.id.hash(hasher);
    }
}
