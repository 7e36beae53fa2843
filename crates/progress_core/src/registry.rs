use std::sync::{Arc, Mutex};

use crate::view::{RegistryView, TaskRowView};
use crate::TaskHandle;

/// Runs observer notifications strictly outside the registry lock.
pub trait NotifyExecutor: Send + Sync {
    fn execute(&self, work: Box<dyn FnOnce() + Send>);
}

/// One structural or selection change of the registry.
#[derive(Debug, Clone)]
pub enum RegistryChange {
    TaskAdded(TaskHandle),
    TaskRemoved(TaskHandle),
    SelectionChanged(Option<TaskHandle>),
}

pub trait RegistryObserver: Send + Sync {
    fn registry_changed(&self, change: &RegistryChange);
}

/// Ordered collection of currently-displayed tasks plus single-selection
/// state.
///
/// Insertion order is display order. At most one task is selected, and at
/// most one is explicitly pinned by the user; a pin always wins over the
/// automatic selection heuristic. All mutation and selection recomputation
/// runs under one registry-wide lock; observer notifications are handed to
/// the injected executor after the lock is released.
pub struct TaskRegistry {
    executor: Arc<dyn NotifyExecutor>,
    inner: Mutex<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    tasks: Vec<TaskHandle>,
    selected: Option<usize>,
    pinned: Option<TaskHandle>,
    observers: Vec<Arc<dyn RegistryObserver>>,
}

impl RegistryInner {
    fn position(&self, task: &TaskHandle) -> Option<usize> {
        self.tasks.iter().position(|candidate| candidate == task)
    }

    fn selected_handle(&self) -> Option<TaskHandle> {
        self.selected.and_then(|idx| self.tasks.get(idx).cloned())
    }

    /// Recomputes the selection per the rating heuristic. A pin always wins.
    /// An awake current selection is only displaced by a strictly higher
    /// rated task, so equal-rated newcomers never churn the selection.
    fn reconsider(&mut self) {
        if let Some(pinned) = self.pinned.clone() {
            self.selected = self.position(&pinned);
            return;
        }
        let keep_threshold = self
            .selected
            .and_then(|idx| self.tasks.get(idx))
            .filter(|task| !task.is_asleep())
            .map(rate);

        let mut best = None;
        let mut best_rating = 0u8;
        for (idx, task) in self.tasks.iter().enumerate() {
            let rating = rate(task);
            // `>=` so that later entries win ties.
            if rating >= best_rating {
                best_rating = rating;
                best = Some(idx);
            }
        }
        if let Some(current) = keep_threshold {
            if best_rating <= current {
                return;
            }
        }
        self.selected = best;
    }
}

/// Selection rating: 4 for being awake, 2 for being user-initiated, 1 for
/// existing at all.
fn rate(task: &TaskHandle) -> u8 {
    let mut rating = 1u8;
    if !task.is_asleep() {
        rating += 4;
    }
    if task.is_user_initiated() {
        rating += 2;
    }
    rating
}

impl TaskRegistry {
    pub fn new(executor: Arc<dyn NotifyExecutor>) -> Self {
        Self {
            executor,
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    pub fn subscribe(&self, observer: Arc<dyn RegistryObserver>) {
        self.lock().observers.push(observer);
    }

    /// Appends the task to the display order. No-op if already present.
    pub fn add_task(&self, task: &TaskHandle) {
        self.mutate(|inner, changes| {
            if inner.position(task).is_some() {
                return;
            }
            inner.tasks.push(task.clone());
            changes.push(RegistryChange::TaskAdded(task.clone()));
        });
    }

    /// Removes the task; clears the pin if it was the pinned one. Tolerates
    /// handles that were never (or are no longer) registered.
    pub fn remove_task(&self, task: &TaskHandle) {
        self.mutate(|inner, changes| {
            let Some(idx) = inner.position(task) else {
                return;
            };
            inner.tasks.remove(idx);
            changes.push(RegistryChange::TaskRemoved(task.clone()));
            if inner.pinned.as_ref() == Some(task) {
                inner.pinned = None;
            }
            match inner.selected {
                Some(selected) if selected == idx => inner.selected = None,
                Some(selected) if selected > idx => inner.selected = Some(selected - 1),
                _ => {}
            }
        });
    }

    /// Fixes the selection to `task`. No-op unless the task is registered.
    pub fn pin_selection(&self, task: &TaskHandle) {
        self.mutate(|inner, _changes| {
            if inner.position(task).is_some() {
                inner.pinned = Some(task.clone());
            }
        });
    }

    /// Drops the explicit pin and reverts to automatic selection.
    pub fn clear_pin(&self) {
        self.mutate(|inner, _changes| {
            inner.pinned = None;
            inner.selected = None;
        });
    }

    /// Re-runs the automatic selection heuristic, e.g. after a task changed
    /// its sleep state.
    pub fn reconsider_selection(&self) {
        self.mutate(|_inner, _changes| {});
    }

    pub fn selected_task(&self) -> Option<TaskHandle> {
        self.lock().selected_handle()
    }

    pub fn pinned_task(&self) -> Option<TaskHandle> {
        self.lock().pinned.clone()
    }

    pub fn is_pinned(&self, task: &TaskHandle) -> bool {
        self.lock().pinned.as_ref() == Some(task)
    }

    /// Snapshot of the display order.
    pub fn tasks(&self) -> Vec<TaskHandle> {
        self.lock().tasks.clone()
    }

    pub fn task_count(&self) -> usize {
        self.lock().tasks.len()
    }

    /// Plain-data snapshot for renderers.
    pub fn snapshot(&self) -> RegistryView {
        let inner = self.lock();
        RegistryView {
            rows: inner
                .tasks
                .iter()
                .map(|task| TaskRowView {
                    task_id: task.id(),
                    display_name: task.display_name().to_string(),
                    user_initiated: task.is_user_initiated(),
                    asleep: task.is_asleep(),
                })
                .collect(),
            selected: inner.selected_handle().map(|task| task.id()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Applies a mutation, reconsiders the selection, and queues observer
    /// notifications for delivery outside the lock.
    fn mutate(&self, apply: impl FnOnce(&mut RegistryInner, &mut Vec<RegistryChange>)) {
        let (observers, changes) = {
            let mut inner = self.lock();
            let before = inner.selected_handle();
            let mut changes = Vec::new();
            apply(&mut inner, &mut changes);
            inner.reconsider();
            let after = inner.selected_handle();
            if before != after {
                changes.push(RegistryChange::SelectionChanged(after));
            }
            if changes.is_empty() {
                return;
            }
            (inner.observers.clone(), changes)
        };

        for change in changes {
            for observer in &observers {
                let observer = Arc::clone(observer);
                let change = change.clone();
                self.executor
                    .execute(Box::new(move || observer.registry_changed(&change)));
            }
        }
    }
}
