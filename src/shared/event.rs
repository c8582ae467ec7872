/**
 * Realtime Event System
 *
 * Server-pushed events delivered over the WebSocket channel. Frames are JSON
 * text of the form `{"event": "<name>", "data": {...}}`. The client never
 * acknowledges them.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::vitals::{Alert, VitalSigns};

/// Wire name of the vital-sign push event
pub const VITAL_SIGNS_UPDATE: &str = "vitalSigns:update";
/// Wire name of the alert push event
pub const ALERT_NEW: &str = "alert:new";

/// Kind of realtime event, used to key callback registries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    VitalSignsUpdate,
    AlertNew,
}

impl EventType {
    /// Name used on the wire
    pub fn wire_name(self) -> &'static str {
        match self {
            EventType::VitalSignsUpdate => VITAL_SIGNS_UPDATE,
            EventType::AlertNew => ALERT_NEW,
        }
    }
}

/// Payload of `vitalSigns:update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalSignsUpdate {
    pub student_id: String,
    pub data: VitalSigns,
    pub timestamp: DateTime<Utc>,
}

/// A decoded server push
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum RealtimeEvent {
    #[serde(rename = "vitalSigns:update")]
    VitalSignsUpdate(VitalSignsUpdate),
    #[serde(rename = "alert:new")]
    AlertNew(Alert),
}

impl RealtimeEvent {
    /// Decode a text frame.
    ///
    /// Returns `Ok(None)` for well-formed frames naming an event this client
    /// does not handle.
    pub fn from_frame(text: &str) -> Result<Option<Self>, serde_json::Error> {
        #[derive(Deserialize)]
        struct Envelope {
            event: String,
        }

        let envelope: Envelope = serde_json::from_str(text)?;
        if envelope.event != VITAL_SIGNS_UPDATE && envelope.event != ALERT_NEW {
            return Ok(None);
        }
        serde_json::from_str(text).map(Some)
    }

    /// Encode as a text frame
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn event_type(&self) -> EventType {
        match self {
            RealtimeEvent::VitalSignsUpdate(_) => EventType::VitalSignsUpdate,
            RealtimeEvent::AlertNew(_) => EventType::AlertNew,
        }
    }
}
