//! `generations` bookkeeping plus the matching activity events.
//!
//! Bookkeeping is best effort: a failed write is logged and the generation
//! itself carries on.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use studio_core::types::DbId;
use studio_core::usage::USAGE_PROVIDER;
use studio_db::models::generation::CreateGeneration;
use studio_events::{names, EventBus, PlatformEvent};

use crate::store::GenerationStore;

/// `generations.type` for chat-written stories and episode scripts.
pub const STORY_GENERATION: &str = "story";

/// An open `generations` row. `id` is `None` when the row could not be
/// created; events are still published.
#[derive(Debug, Clone)]
pub struct ActivityHandle {
    pub id: Option<DbId>,
    kind: String,
}

#[derive(Clone)]
pub struct ActivityTracker {
    store: Arc<dyn GenerationStore>,
    events: Arc<EventBus>,
}

impl ActivityTracker {
    pub fn new(store: Arc<dyn GenerationStore>, events: Arc<EventBus>) -> Self {
        Self { store, events }
    }

    pub async fn start(
        &self,
        kind: &str,
        story_id: Option<DbId>,
        metadata: serde_json::Value,
    ) -> ActivityHandle {
        let input = CreateGeneration {
            kind: kind.to_string(),
            provider: USAGE_PROVIDER.to_string(),
            story_id,
            metadata: Some(metadata.clone()),
        };
        let id = match self.store.create_generation(&input).await {
            Ok(row) => Some(row.id),
            Err(e) => {
                tracing::warn!(kind, error = %e, "Failed to create generation record");
                None
            }
        };

        let mut event = PlatformEvent::new(names::GENERATION_STARTED).with_payload(json!({
            "type": kind,
            "metadata": metadata,
        }));
        if let Some(id) = id {
            event = event.with_source("generation", id);
        }
        self.events.publish(event);

        ActivityHandle {
            id,
            kind: kind.to_string(),
        }
    }

    pub async fn complete(
        &self,
        handle: &ActivityHandle,
        story_id: Option<DbId>,
        metadata: serde_json::Value,
    ) {
        if let Some(id) = handle.id {
            if let Err(e) = self
                .store
                .complete_generation(id, story_id, Utc::now(), Some(&metadata))
                .await
            {
                tracing::warn!(generation_id = id, error = %e, "Failed to complete generation record");
            }
        }
        self.publish(handle, names::GENERATION_COMPLETED, json!({
            "type": handle.kind,
            "story_id": story_id,
            "metadata": metadata,
        }));
    }

    pub async fn fail(&self, handle: &ActivityHandle, error: &str) {
        if let Some(id) = handle.id {
            if let Err(e) = self.store.fail_generation(id, Utc::now(), error).await {
                tracing::warn!(generation_id = id, error = %e, "Failed to mark generation failed");
            }
        }
        self.publish(handle, names::GENERATION_FAILED, json!({
            "type": handle.kind,
            "error": error,
        }));
    }

    fn publish(&self, handle: &ActivityHandle, event_type: &str, payload: serde_json::Value) {
        let mut event = PlatformEvent::new(event_type).with_payload(payload);
        if let Some(id) = handle.id {
            event = event.with_source("generation", id);
        }
        self.events.publish(event);
    }
}
