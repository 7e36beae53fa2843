use crate::TaskHandle;

/// Kind of state transition a [`ProgressEvent`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Start,
    Progress,
    /// Toggle to indeterminate mode.
    Switch,
    /// Message-only update while the task is asleep.
    Silent,
    RequestStop,
    Finish,
}

/// Immutable record of one state transition for one running task.
///
/// Unknown quantities are `None`, never zero. Renderers must treat `None`
/// as "no information".
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    task: TaskHandle,
    kind: EventKind,
    message: Option<String>,
    display_name: Option<String>,
    workunits_done: Option<u32>,
    percentage_done: Option<f64>,
    estimate_secs: Option<u32>,
    watched: bool,
    switched: bool,
}

impl ProgressEvent {
    fn bare(task: TaskHandle, kind: EventKind) -> Self {
        Self {
            task,
            kind,
            message: None,
            display_name: None,
            workunits_done: None,
            percentage_done: None,
            estimate_secs: None,
            watched: false,
            // Only a Switch event carries the latch at construction; every
            // other event picks it up through merging.
            switched: kind == EventKind::Switch,
        }
    }

    pub fn started(task: TaskHandle) -> Self {
        Self::bare(task, EventKind::Start)
    }

    pub fn finished(task: TaskHandle) -> Self {
        Self::bare(task, EventKind::Finish)
    }

    pub fn switched_to_indeterminate(task: TaskHandle) -> Self {
        Self::bare(task, EventKind::Switch)
    }

    pub fn stop_requested(task: TaskHandle) -> Self {
        Self::bare(task, EventKind::RequestStop)
    }

    pub fn silent(task: TaskHandle, message: Option<String>) -> Self {
        let mut event = Self::bare(task, EventKind::Silent);
        event.message = message;
        event
    }

    pub fn progress(
        task: TaskHandle,
        message: Option<String>,
        workunits_done: Option<u32>,
        percentage_done: Option<f64>,
        estimate_secs: Option<u32>,
    ) -> Self {
        let mut event = Self::bare(task, EventKind::Progress);
        event.message = message;
        event.workunits_done = workunits_done;
        event.percentage_done = percentage_done;
        event.estimate_secs = estimate_secs;
        event
    }

    pub fn progress_named(
        task: TaskHandle,
        display_name: impl Into<String>,
        message: Option<String>,
        workunits_done: Option<u32>,
        percentage_done: Option<f64>,
        estimate_secs: Option<u32>,
    ) -> Self {
        let mut event =
            Self::progress(task, message, workunits_done, percentage_done, estimate_secs);
        event.display_name = Some(display_name.into());
        event
    }

    /// Marks whether the task was the explicitly pinned selection when this
    /// event was constructed.
    pub fn with_watched(mut self, watched: bool) -> Self {
        self.watched = watched;
        self
    }

    pub fn task(&self) -> &TaskHandle {
        &self.task
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn workunits_done(&self) -> Option<u32> {
        self.workunits_done
    }

    pub fn percentage_done(&self) -> Option<f64> {
        self.percentage_done
    }

    pub fn estimate_secs(&self) -> Option<u32> {
        self.estimate_secs
    }

    pub fn is_watched(&self) -> bool {
        self.watched
    }

    /// True once the task has toggled to indeterminate. One-way latch per
    /// task: carried forward by [`merge_from`](Self::merge_from) until the
    /// task finishes.
    pub fn is_switched(&self) -> bool {
        self.switched
    }

    /// Back-fills every field this event lacks from an earlier event for the
    /// same task, and carries the indeterminate latch forward.
    pub fn merge_from(&mut self, earlier: &ProgressEvent) {
        debug_assert_eq!(self.task, earlier.task);
        if self.message.is_none() {
            self.message = earlier.message.clone();
        }
        if self.display_name.is_none() {
            self.display_name = earlier.display_name.clone();
        }
        if self.workunits_done.is_none() {
            self.workunits_done = earlier.workunits_done;
        }
        if self.percentage_done.is_none() {
            self.percentage_done = earlier.percentage_done;
        }
        if self.estimate_secs.is_none() {
            self.estimate_secs = earlier.estimate_secs;
        }
        if earlier.switched {
            self.switched = true;
        }
    }
}
