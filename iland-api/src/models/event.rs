use serde::{Deserialize, Serialize};

/// Envelope tag carrying a domain event
pub const EVENT_TYPE: &str = "EVENT";

/// Outer wrapper of every frame on the event socket
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Server-pushed notification of a state change
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    #[serde(rename = "uuid")]
    pub id: String,
    pub details: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "entity_uuid")]
    pub entity_id: String,
    pub entity_name: String,
    pub entity_type: String,
    pub owner_type: String,
    pub owner_id: String,
    #[serde(rename = "task_uuid")]
    pub task_id: String,
    #[serde(rename = "initiated_by_username")]
    pub initiated_by_user: String,
    #[serde(rename = "initiated_by_full_name")]
    pub initiated_by_name: String,
    pub timestamp: i64,
}
