use std::sync::{Arc, Mutex, Once};
use std::time::Instant;

use progress_core::{
    NotifyExecutor, RegistryChange, RegistryObserver, TaskHandle, TaskOptions, TaskRegistry,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(progress_logging::initialize_for_tests);
}

/// Runs notifications immediately; fine for tests that only care about
/// selection state.
struct InlineExecutor;

impl NotifyExecutor for InlineExecutor {
    fn execute(&self, work: Box<dyn FnOnce() + Send>) {
        work();
    }
}

/// Holds notifications until the test explicitly drains them.
#[derive(Default)]
struct QueueExecutor {
    queued: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

impl QueueExecutor {
    fn run_all(&self) {
        let drained: Vec<_> = self.queued.lock().unwrap().drain(..).collect();
        for work in drained {
            work();
        }
    }

    fn queued_len(&self) -> usize {
        self.queued.lock().unwrap().len()
    }
}

impl NotifyExecutor for QueueExecutor {
    fn execute(&self, work: Box<dyn FnOnce() + Send>) {
        self.queued.lock().unwrap().push(work);
    }
}

#[derive(Default)]
struct ChangeLog {
    changes: Mutex<Vec<String>>,
}

impl RegistryObserver for ChangeLog {
    fn registry_changed(&self, change: &RegistryChange) {
        let entry = match change {
            RegistryChange::TaskAdded(task) => format!("added:{}", task.id()),
            RegistryChange::TaskRemoved(task) => format!("removed:{}", task.id()),
            RegistryChange::SelectionChanged(task) => {
                format!("selected:{:?}", task.as_ref().map(|t| t.id()))
            }
        };
        self.changes.lock().unwrap().push(entry);
    }
}

fn task(id: u64, name: &str, user_initiated: bool) -> TaskHandle {
    TaskHandle::new(
        id,
        name,
        Instant::now(),
        TaskOptions {
            user_initiated,
            ..TaskOptions::default()
        },
    )
}

fn registry() -> TaskRegistry {
    TaskRegistry::new(Arc::new(InlineExecutor))
}

#[test]
fn rating_prefers_awake_user_initiated_tasks() {
    init_logging();
    let registry = registry();
    let a = task(1, "a", false);
    a.set_asleep(true);
    let b = task(2, "b", false);
    let c = task(3, "c", true);

    registry.add_task(&a);
    registry.add_task(&b);
    registry.add_task(&c);

    // a rates 1, b rates 5, c rates 7.
    assert_eq!(registry.selected_task(), Some(c));
}

#[test]
fn equal_rated_newcomer_does_not_displace_selection() {
    init_logging();
    let registry = registry();
    let first = task(1, "first", false);
    let second = task(2, "second", false);

    registry.add_task(&first);
    registry.add_task(&second);

    assert_eq!(registry.selected_task(), Some(first));
}

#[test]
fn tie_break_prefers_last_when_rescanning() {
    init_logging();
    let registry = registry();
    let stale = task(1, "stale", false);
    let left = task(2, "left", false);
    let right = task(3, "right", false);

    registry.add_task(&stale);
    registry.add_task(&left);
    registry.add_task(&right);
    assert_eq!(registry.selected_task(), Some(stale.clone()));

    // Once the selection goes to sleep the rescan runs; `left` and `right`
    // tie at rating 5 and the later entry wins.
    stale.set_asleep(true);
    registry.reconsider_selection();
    assert_eq!(registry.selected_task(), Some(right));
}

#[test]
fn pinned_selection_survives_other_mutations() {
    init_logging();
    let registry = registry();
    let pinned = task(1, "pinned", false);
    let loud = task(2, "loud", true);

    registry.add_task(&pinned);
    registry.pin_selection(&pinned);
    registry.add_task(&loud);
    assert_eq!(registry.selected_task(), Some(pinned.clone()));

    registry.remove_task(&loud);
    assert_eq!(registry.selected_task(), Some(pinned.clone()));

    // Removing the pinned task clears the pin and reverts to automatic
    // selection.
    registry.add_task(&loud);
    registry.remove_task(&pinned);
    assert!(registry.pinned_task().is_none());
    assert_eq!(registry.selected_task(), Some(loud));
}

#[test]
fn pinning_an_unknown_task_is_a_noop() {
    init_logging();
    let registry = registry();
    let member = task(1, "member", false);
    let stranger = task(2, "stranger", false);

    registry.add_task(&member);
    registry.pin_selection(&stranger);

    assert!(registry.pinned_task().is_none());
    assert_eq!(registry.selected_task(), Some(member));
}

#[test]
fn removing_unknown_task_is_tolerated() {
    init_logging();
    let registry = registry();
    let member = task(1, "member", false);
    let stranger = task(2, "stranger", false);

    registry.add_task(&member);
    registry.remove_task(&stranger);

    assert_eq!(registry.task_count(), 1);
    assert_eq!(registry.selected_task(), Some(member));
}

#[test]
fn snapshot_reflects_display_order_and_selection() {
    init_logging();
    let registry = registry();
    let first = task(1, "first", false);
    let second = task(2, "second", true);
    registry.add_task(&first);
    registry.add_task(&second);
    registry.pin_selection(&second);

    let view = registry.snapshot();
    let names: Vec<_> = view.rows.iter().map(|row| row.display_name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
    assert_eq!(view.selected, Some(2));
}

#[test]
fn notifications_are_deferred_to_the_executor() {
    init_logging();
    let executor = Arc::new(QueueExecutor::default());
    let registry = TaskRegistry::new(executor.clone());
    let log = Arc::new(ChangeLog::default());
    registry.subscribe(log.clone());

    let only = task(1, "only", false);
    registry.add_task(&only);

    // Nothing observed until the executor runs: add + selection change.
    assert!(log.changes.lock().unwrap().is_empty());
    assert_eq!(executor.queued_len(), 2);

    executor.run_all();
    assert_eq!(
        *log.changes.lock().unwrap(),
        vec!["added:1".to_string(), "selected:Some(1)".to_string()]
    );
}
