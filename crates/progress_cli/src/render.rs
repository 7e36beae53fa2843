//! Terminal line rendering of merged progress events.

use progress_core::{EventKind, ProgressEvent};

const BAR_CELLS: usize = 10;

/// Formats one merged event as a single terminal line.
pub fn format_event(event: &ProgressEvent, selected: bool) -> String {
    let name = event
        .display_name()
        .unwrap_or_else(|| event.task().display_name());
    let marker = if selected { '>' } else { ' ' };

    let mut line = match event.kind() {
        EventKind::Finish => format!("{marker} [{}] done  {name}", "#".repeat(BAR_CELLS)),
        EventKind::RequestStop => format!("{marker} [{}] stop? {name}", "-".repeat(BAR_CELLS)),
        _ => match event.percentage_done() {
            // Indeterminate tasks keep a full-width rolling bar.
            _ if event.is_switched() => format!("{marker} [{}] ....  {name}", "~".repeat(BAR_CELLS)),
            Some(fraction) => {
                format!(
                    "{marker} [{}] {:>3.0}%  {name}",
                    bar(fraction),
                    fraction * 100.0
                )
            }
            None => format!("{marker} [{}]  ..%  {name}", ".".repeat(BAR_CELLS)),
        },
    };

    if let Some(message) = event.message() {
        line.push_str(" - ");
        line.push_str(message);
    }
    if let Some(secs) = event.estimate_secs() {
        line.push_str(&format!(" (~{secs}s left)"));
    }
    line
}

fn bar(fraction: f64) -> String {
    let filled = ((fraction.clamp(0.0, 1.0)) * BAR_CELLS as f64).round() as usize;
    let mut cells = "#".repeat(filled);
    cells.push_str(&".".repeat(BAR_CELLS - filled));
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use progress_core::{TaskHandle, TaskOptions};

    fn task() -> TaskHandle {
        TaskHandle::new(1, "indexing", Instant::now(), TaskOptions::default())
    }

    #[test]
    fn determinate_progress_renders_bar_and_message() {
        let event = ProgressEvent::progress(
            task(),
            Some("crawling".to_string()),
            None,
            Some(0.5),
            Some(7),
        );
        let line = format_event(&event, false);
        assert_eq!(line, "  [#####.....]  50%  indexing - crawling (~7s left)");
    }

    #[test]
    fn selected_task_is_marked() {
        let event = ProgressEvent::progress(task(), None, None, Some(1.0), None);
        let line = format_event(&event, true);
        assert!(line.starts_with("> [##########] 100%"));
    }

    #[test]
    fn unknown_percentage_is_not_rendered_as_zero() {
        let event = ProgressEvent::progress(task(), None, None, None, None);
        let line = format_event(&event, false);
        assert!(line.contains("..%"));
        assert!(!line.contains("0%"));
    }

    #[test]
    fn display_name_override_wins() {
        let event = ProgressEvent::progress_named(task(), "renamed", None, None, Some(0.1), None);
        assert!(format_event(&event, false).contains("renamed"));
    }
}
