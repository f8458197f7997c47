//! Defines an abstraction over the event sending mechanism.

use super::events::OrganizerEvent;

/// A trait that abstracts the sending of organizer events.
/// This is "fire-and-forget" and doesn't return a result, simplifying its use.
pub trait EventProxy: Send + Sync + Clone + 'static {
    fn send_event(&self, event: OrganizerEvent);
}

/// Channel-backed proxy: the caller drains the receiver on its own
/// context. This is what the CLI and the tests use.
impl EventProxy for tokio::sync::mpsc::UnboundedSender<OrganizerEvent> {
    fn send_event(&self, event: OrganizerEvent) {
        // The receiver half may be gone during shutdown; worker-side
        // notifications then have nowhere to go and are dropped.
        if let Err(err) = self.send(event) {
            tracing::warn!("Failed to deliver organizer event: {}", err);
        }
    }
}
