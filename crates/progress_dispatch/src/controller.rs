use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use progress_core::{
    EventKind, ProgressEvent, TaskHandle, TaskId, TaskOptions, TaskRegistry,
};
use progress_logging::{progress_debug, progress_trace};

use crate::config::{DispatchConfig, MIN_REARM_DELAY};
use crate::sink::{NullSink, RenderSink};
use crate::timer::TickScheduler;

/// Debounced, coalescing dispatcher of progress events.
///
/// Producers only enqueue events and arm or tighten the timer; the armed
/// tick drains the whole queue, merges it down to one event per task,
/// applies registry mutations, and publishes the merged batch to the render
/// sink after the controller lock is released. Tasks that start and finish
/// inside their initial display delay are never shown at all.
#[derive(Clone)]
pub struct Controller {
    shared: Arc<ControllerShared>,
}

struct ControllerShared {
    config: DispatchConfig,
    registry: Arc<TaskRegistry>,
    scheduler: Arc<dyn TickScheduler>,
    sink: Mutex<Arc<dyn RenderSink>>,
    state: Mutex<DispatchState>,
    next_task_id: AtomicU64,
}

struct DispatchState {
    queue: Vec<ProgressEvent>,
    timer_armed: bool,
    timer_start: Instant,
    timer_deadline: Instant,
    /// Most recently merged event per live task. Seeds merging so message
    /// and display-name inheritance and the switched latch hold across
    /// ticks; an entry is dropped when its task finishes.
    last_events: HashMap<TaskId, ProgressEvent>,
}

struct MergeOutcome {
    deliveries: Vec<ProgressEvent>,
    /// Smallest remaining initial delay across deferred young tasks, if any.
    min_remaining: Option<Duration>,
}

impl ControllerShared {
    fn lock_state(&self) -> MutexGuard<'_, DispatchState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn sink(&self) -> Arc<dyn RenderSink> {
        self.sink
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

fn slot_index(slots: &[ProgressEvent], id: TaskId) -> Option<usize> {
    slots.iter().position(|event| event.task().id() == id)
}

impl Controller {
    pub fn new(
        config: DispatchConfig,
        registry: Arc<TaskRegistry>,
        scheduler: Arc<dyn TickScheduler>,
    ) -> Self {
        let now = (config.clock)();
        Self {
            shared: Arc::new(ControllerShared {
                config,
                registry,
                scheduler,
                sink: Mutex::new(Arc::new(NullSink)),
                state: Mutex::new(DispatchState {
                    queue: Vec::new(),
                    timer_armed: false,
                    timer_start: now,
                    timer_deadline: now,
                    last_events: HashMap::new(),
                }),
                next_task_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn set_sink(&self, sink: Arc<dyn RenderSink>) {
        *self
            .shared
            .sink
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = sink;
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.shared.registry
    }

    /// Task options pre-filled with this controller's configured initial
    /// delay.
    pub fn task_options(&self) -> TaskOptions {
        TaskOptions {
            initial_delay: self.shared.config.initial_delay,
            ..TaskOptions::default()
        }
    }

    /// Creates a task and posts its `Start` event.
    ///
    /// Custom-placed tasks bypass the initial delay and flush immediately;
    /// everything else waits out the coalescing timer, shortened when the
    /// task's grace period is smaller than the quantum.
    pub fn begin_task(&self, display_name: impl Into<String>, options: TaskOptions) -> TaskHandle {
        let id = self.shared.next_task_id.fetch_add(1, Ordering::Relaxed);
        let task = TaskHandle::new(id, display_name, self.now(), options);
        progress_debug!("task {} started: {}", id, task.display_name());
        let event = ProgressEvent::started(task.clone()).with_watched(self.is_watched(&task));
        if task.is_custom_placed() {
            self.post_event(event, false);
            self.run_now();
        } else {
            let shorten = task.initial_delay() < self.shared.config.quantum;
            self.post_event(event, shorten);
        }
        task
    }

    pub fn report_progress(
        &self,
        task: &TaskHandle,
        message: Option<String>,
        workunits_done: Option<u32>,
        percentage_done: Option<f64>,
        estimate_secs: Option<u32>,
    ) {
        task.set_asleep(false);
        let event = ProgressEvent::progress(
            task.clone(),
            message,
            workunits_done,
            percentage_done,
            estimate_secs,
        )
        .with_watched(self.is_watched(task));
        self.post_event(event, false);
    }

    /// Progress update that also overrides the displayed name.
    pub fn report_progress_named(
        &self,
        task: &TaskHandle,
        display_name: impl Into<String>,
        message: Option<String>,
        workunits_done: Option<u32>,
        percentage_done: Option<f64>,
        estimate_secs: Option<u32>,
    ) {
        task.set_asleep(false);
        let event = ProgressEvent::progress_named(
            task.clone(),
            display_name,
            message,
            workunits_done,
            percentage_done,
            estimate_secs,
        )
        .with_watched(self.is_watched(task));
        self.post_event(event, false);
    }

    pub fn report_switch_to_indeterminate(&self, task: &TaskHandle) {
        task.set_asleep(false);
        let event =
            ProgressEvent::switched_to_indeterminate(task.clone()).with_watched(self.is_watched(task));
        self.post_event(event, false);
    }

    /// Message-only update; puts the task to sleep until the next progress
    /// or switch report.
    pub fn report_silent(&self, task: &TaskHandle, message: Option<String>) {
        task.set_asleep(true);
        let event = ProgressEvent::silent(task.clone(), message).with_watched(self.is_watched(task));
        self.post_event(event, false);
    }

    pub fn report_request_stop(&self, task: &TaskHandle) {
        let event = ProgressEvent::stop_requested(task.clone()).with_watched(self.is_watched(task));
        self.post_event(event, false);
    }

    pub fn report_finish(&self, task: &TaskHandle) {
        let event = ProgressEvent::finished(task.clone()).with_watched(self.is_watched(task));
        self.post_event(event, false);
    }

    /// Pins the selection to `task` and flushes without the coalescing
    /// delay, so explicit-selection changes reach the sink right away.
    pub fn pin_selection(&self, task: &TaskHandle) {
        self.shared.registry.pin_selection(task);
        self.run_now();
    }

    pub fn clear_pinned_selection(&self) {
        self.shared.registry.clear_pin();
        self.run_now();
    }

    /// Enqueues an event and arms or tightens the coalescing timer.
    ///
    /// With `shorten`, the timer deadline is pulled in to the posting task's
    /// initial delay when that is sooner than the pending quantum.
    pub fn post_event(&self, event: ProgressEvent, shorten: bool) {
        let task_delay = event.task().initial_delay();
        let now = self.now();
        let mut state = self.shared.lock_state();
        progress_trace!(
            "queued {:?} for task {}",
            event.kind(),
            event.task().id()
        );
        state.queue.push(event);
        if !state.timer_armed {
            let mut delay = self.shared.config.quantum;
            if shorten && task_delay < delay {
                delay = task_delay;
            }
            self.arm(&mut state, now, delay);
        } else if shorten {
            let elapsed = now.saturating_duration_since(state.timer_start);
            if elapsed >= task_delay {
                // Waited long enough already; fire on the next timer pass.
                self.rearm(&mut state, now, Duration::ZERO);
            } else {
                let desired = state.timer_start + task_delay;
                if desired < state.timer_deadline {
                    self.rearm(&mut state, now, desired - now);
                }
            }
        }
    }

    /// Flushes the pending queue on the calling thread, skipping the
    /// coalescing delay.
    pub fn run_now(&self) {
        self.run_tick();
    }

    /// Disarms the timer. Pending events stay queued and flush on the next
    /// post or explicit `run_now`.
    pub fn shutdown(&self) {
        let mut state = self.shared.lock_state();
        state.timer_armed = false;
        self.shared.scheduler.cancel();
    }

    fn now(&self) -> Instant {
        (self.shared.config.clock)()
    }

    fn is_watched(&self, task: &TaskHandle) -> bool {
        self.shared.registry.is_pinned(task)
    }

    fn arm(&self, state: &mut DispatchState, now: Instant, delay: Duration) {
        state.timer_armed = true;
        state.timer_start = now;
        state.timer_deadline = now + delay;
        self.schedule_tick(delay);
    }

    /// Pulls in the deadline of the already-armed timer without restarting
    /// the coalescing window.
    fn rearm(&self, state: &mut DispatchState, now: Instant, delay: Duration) {
        state.timer_deadline = now + delay;
        self.schedule_tick(delay);
    }

    fn schedule_tick(&self, delay: Duration) {
        let weak = Arc::downgrade(&self.shared);
        self.shared.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    Controller { shared }.run_tick();
                }
            }),
        );
    }

    fn run_tick(&self) {
        let pre_selection = self.shared.registry.selected_task();
        let (deliveries, selected) = {
            let mut state = self.shared.lock_state();
            state.timer_armed = false;
            let batch = std::mem::take(&mut state.queue);
            let now = self.now();
            let outcome = self.merge_batch(&mut state, batch, now);
            if let Some(remaining) = outcome.min_remaining {
                let delay = remaining.max(MIN_REARM_DELAY);
                progress_debug!("young tasks deferred; re-arming in {:?}", delay);
                self.arm(&mut state, now, delay);
            } else {
                self.shared.scheduler.cancel();
            }
            // Selection is resolved once per tick; fall back to the
            // pre-batch selection if the registry briefly had none while
            // mutating.
            let selected = self
                .shared
                .registry
                .selected_task()
                .or(pre_selection)
                .map(|task| task.id());
            (outcome.deliveries, selected)
        };

        if deliveries.is_empty() {
            return;
        }
        // Publish outside the lock so producers are never blocked on
        // rendering.
        let sink = self.shared.sink();
        for event in &deliveries {
            if selected == Some(event.task().id()) {
                sink.render_selected_update(event);
            }
            sink.render_update(event);
        }
    }

    /// Collapses a drained batch to at most one merged event per task.
    ///
    /// Runs under the controller lock. Start events for tasks still inside
    /// their grace period defer registry insertion; a finish arriving for
    /// such a task inside the same grace period drops the task entirely.
    /// Tasks still too young at the end of the pass are re-enqueued for the
    /// next, shortened tick.
    fn merge_batch(
        &self,
        state: &mut DispatchState,
        batch: Vec<ProgressEvent>,
        now: Instant,
    ) -> MergeOutcome {
        let registry = &self.shared.registry;
        let mut slots: Vec<ProgressEvent> = Vec::new();
        let mut just_started: Vec<TaskHandle> = Vec::new();
        let mut saw_silent = false;

        for event in batch {
            let task = event.task().clone();
            let id = task.id();
            let is_short = task.age(now) < task.initial_delay();
            match event.kind() {
                EventKind::Start => {
                    if task.is_custom_placed() || !is_short {
                        registry.add_task(&task);
                    } else if !just_started.iter().any(|started| started.id() == id) {
                        just_started.push(task.clone());
                    }
                }
                EventKind::Finish => {
                    if !just_started.iter().any(|started| started.id() == id) {
                        registry.remove_task(&task);
                    }
                }
                EventKind::Silent => saw_silent = true,
                _ => {}
            }

            let existing = slot_index(&slots, id);
            if event.kind() == EventKind::Finish && is_short {
                if let (Some(slot), Some(started)) = (
                    existing,
                    just_started.iter().position(|started| started.id() == id),
                ) {
                    // Started and finished inside the grace period: the task
                    // is never shown at all.
                    progress_debug!("suppressing short-lived task {}", id);
                    slots.remove(slot);
                    just_started.remove(started);
                    state.last_events.remove(&id);
                    continue;
                }
            }

            let mut merged = event;
            match existing {
                Some(idx) => {
                    merged.merge_from(&slots[idx]);
                    slots[idx] = merged;
                }
                None => {
                    if let Some(last) = state.last_events.get(&id) {
                        merged.merge_from(last);
                    }
                    slots.push(merged);
                }
            }
        }

        // Promote tasks that outlived their grace period; re-enqueue the
        // rest so the next tick reconsiders them.
        let mut min_remaining: Option<Duration> = None;
        for task in just_started {
            let age = task.age(now);
            if age >= task.initial_delay() {
                registry.add_task(&task);
            } else {
                let id = task.id();
                progress_trace!("task {} still inside its initial delay; deferring", id);
                state
                    .queue
                    .push(ProgressEvent::started(task.clone()).with_watched(registry.is_pinned(&task)));
                if let Some(idx) = slot_index(&slots, id) {
                    let pending = slots.remove(idx);
                    if pending.kind() != EventKind::Start {
                        state.queue.push(pending);
                    }
                }
                let remaining = task.initial_delay() - age;
                min_remaining = Some(match min_remaining {
                    Some(current) => current.min(remaining),
                    None => remaining,
                });
            }
        }

        if saw_silent {
            registry.reconsider_selection();
        }

        // Remember the merged snapshot per live task; finished tasks are
        // forgotten.
        for event in &slots {
            let id = event.task().id();
            if event.kind() == EventKind::Finish {
                state.last_events.remove(&id);
            } else {
                state.last_events.insert(id, event.clone());
            }
        }

        // Deliveries follow registry order; finished or unregistered tasks
        // trail in arrival order.
        let mut deliveries = Vec::with_capacity(slots.len());
        for task in registry.tasks() {
            if let Some(idx) = slot_index(&slots, task.id()) {
                deliveries.push(slots.remove(idx));
            }
        }
        deliveries.extend(slots);

        MergeOutcome {
            deliveries,
            min_remaining,
        }
    }
}
