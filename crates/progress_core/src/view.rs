use crate::TaskId;

/// Plain-data snapshot of the registry for renderers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegistryView {
    pub rows: Vec<TaskRowView>,
    pub selected: Option<TaskId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRowView {
    pub task_id: TaskId,
    pub display_name: String,
    pub user_initiated: bool,
    pub asleep: bool,
}
