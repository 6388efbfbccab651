use crate::error::HeartlogError;
use crate::event::{Event, EventType};

/// Durable storage for ingested events.
///
/// The store assigns ids and its own `created_at` on insert. Implementations
/// must be shareable across connection tasks.
pub trait EventStore: Send + Sync {
    /// Persist one event.
    fn insert(
        &self,
        origin: &str,
        event_type: EventType,
        body: &str,
        owner: &str,
    ) -> Result<(), HeartlogError>;

    /// All events of one type, newest first.
    fn find(&self, event_type: EventType) -> Result<Vec<Event>, HeartlogError>;

    /// Delete every stored event.
    fn clear_all(&self) -> Result<(), HeartlogError>;
}
