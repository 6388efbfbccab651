use std::sync::Arc;

use tracing::{debug, instrument};

use crate::broadcaster::Broadcaster;
use crate::error::HeartlogError;
use crate::event::{Event, EventType};
use crate::traits::EventStore;

/// Persists inbound events and, once they are durable, fans them out live.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn EventStore>,
    broadcaster: Broadcaster,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn EventStore>, broadcaster: Broadcaster) -> Self {
        Self { store, broadcaster }
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Store one event, then offer it to live viewers.
    ///
    /// Viewers never see an event whose insert failed. Live delivery itself
    /// cannot fail the ingestion. Store errors are returned unlogged; the
    /// caller reports them.
    #[instrument(skip_all, fields(origin = %origin, event_type = %event_type))]
    pub fn ingest(
        &self,
        origin: &str,
        event_type: EventType,
        body: &str,
        owner: &str,
    ) -> Result<Arc<Event>, HeartlogError> {
        let event = Arc::new(Event::new(origin, event_type, body, owner));

        self.store.insert(origin, event_type, body, owner)?;

        let delivered = self.broadcaster.send(Arc::clone(&event));
        debug!(owner = %owner, delivered, "Event ingested");
        Ok(event)
    }

    /// All stored events of one type, newest first.
    pub fn find(&self, event_type: EventType) -> Result<Vec<Event>, HeartlogError> {
        self.store.find(event_type)
    }

    /// Remove every stored event.
    pub fn clear_all(&self) -> Result<(), HeartlogError> {
        self.store.clear_all()?;
        debug!("Event store cleared");
        Ok(())
    }
}
