use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Edit,
    Delete,
}

/// Permission seam consulted before any externally reachable resolver,
/// propagator or link-management entry point.
pub trait AccessChecker: Send + Sync {
    fn can_access(&self, actor_id: &str, entity_type: &str, action: Action) -> bool;
}

/// Default checker for deployments without an ACL backend.
pub struct AllowAll;

impl AccessChecker for AllowAll {
    fn can_access(&self, _actor_id: &str, _entity_type: &str, _action: Action) -> bool {
        true
    }
}

/// Fire-and-forget event notification sink, called after successful
/// attribute updates. Listeners only see the post-update value and the
/// originating payload, never the prior value.
pub trait EventSink: Send + Sync {
    fn notify(&self, topic: &str, payload: serde_json::Value);
}

/// Default sink: surfaces events on the debug log.
pub struct LogSink;

impl EventSink for LogSink {
    fn notify(&self, topic: &str, payload: serde_json::Value) {
        log::debug!("event {}: {}", topic, payload);
    }
}
