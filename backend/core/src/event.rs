use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HeartlogError;

/// An immutable ingested record: either a log entry or a heartbeat.
///
/// `id` is assigned by the store on persistence. Events built by the
/// dispatcher for live delivery carry `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: Option<i64>,
    pub origin: String,
    pub event_type: EventType,
    pub body: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
}

/// The two kinds of records agents push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A free-form log entry
    Event,
    /// A heartbeat marking a source as alive at a point in time
    Monitor,
}

impl Event {
    /// Build an event stamped with the current instant.
    pub fn new(
        origin: impl Into<String>,
        event_type: EventType,
        body: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self::at(origin, event_type, body, owner, Utc::now())
    }

    /// Build an event with an explicit creation time.
    pub fn at(
        origin: impl Into<String>,
        event_type: EventType,
        body: impl Into<String>,
        owner: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            origin: origin.into(),
            event_type,
            body: body.into(),
            owner: owner.into(),
            created_at,
        }
    }
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Event => "event",
            EventType::Monitor => "monitor",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = HeartlogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "event" => Ok(EventType::Event),
            "monitor" => Ok(EventType::Monitor),
            other => Err(HeartlogError::InvalidEventType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = Event::new("backup", EventType::Event, "done", "nas");
        assert_eq!(event.origin, "backup");
        assert_eq!(event.event_type, EventType::Event);
        assert_eq!(event.owner, "nas");
        assert!(event.id.is_none());
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::new("cron", EventType::Monitor, "", "pi");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"monitor\""));
        let deserialized: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[test]
    fn test_event_type_parse() {
        assert_eq!("event".parse::<EventType>().unwrap(), EventType::Event);
        assert_eq!("monitor".parse::<EventType>().unwrap(), EventType::Monitor);
        assert!(matches!(
            "metric".parse::<EventType>(),
            Err(HeartlogError::InvalidEventType(s)) if s == "metric"
        ));
        assert_eq!(EventType::Monitor.to_string(), "monitor");
    }
}
