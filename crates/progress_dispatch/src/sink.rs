use std::sync::mpsc;

use progress_core::ProgressEvent;

/// Rendering boundary of the dispatcher.
///
/// Delivery is fire-and-forget: every merged event carries full current
/// state rather than a delta, so a missed render is healed by the next
/// tick's snapshot.
pub trait RenderSink: Send + Sync {
    fn render_update(&self, event: &ProgressEvent);
    /// Called once per tick for the event belonging to the active selection,
    /// immediately before the generic call for that same event.
    fn render_selected_update(&self, event: &ProgressEvent);
}

/// Fallback sink used when a tick fires before a real sink was attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn render_update(&self, _event: &ProgressEvent) {}
    fn render_selected_update(&self, _event: &ProgressEvent) {}
}

/// One sink callback, as forwarded by [`ChannelSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Update(ProgressEvent),
    SelectedUpdate(ProgressEvent),
}

/// Forwards sink callbacks over a channel, e.g. into a render loop.
pub struct ChannelSink {
    tx: mpsc::Sender<SinkCall>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<SinkCall>) -> Self {
        Self { tx }
    }
}

impl RenderSink for ChannelSink {
    fn render_update(&self, event: &ProgressEvent) {
        let _ = self.tx.send(SinkCall::Update(event.clone()));
    }

    fn render_selected_update(&self, event: &ProgressEvent) {
        let _ = self.tx.send(SinkCall::SelectedUpdate(event.clone()));
    }
}
