//! Event types and the closed lifecycle-tag enumeration.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The stable wire enumeration of lifecycle tags (spec.md §3.1, §6).
///
/// Adding a variant is an additive change; removing or renaming one is not,
/// since `EventType` is the stable contract between producers and
/// consumers of the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
	PreToolUse,
	PostToolUse,
	PostToolUseFailure,
	PreCompact,
	ContextCompacted,
	UserPromptSubmit,
	SessionStart,
	SessionEnd,
	Stop,
	SubagentStart,
	SubagentStop,
	Notification,
	TokenUsage,
	PermissionRequest,
	ModelSelected,
	MCPToolsChanged,
}

/// Opaque, type-erased event payload.
///
/// The bus never inspects the payload; it is sized and boxed here so that
/// `Event` stays `Clone` (required for fan-out to multiple subscriber
/// queues) without forcing every collaborator to agree on one payload
/// enum. Collaborators that want a closed payload shape can define their
/// own enum and box it in; the bus is indifferent.
pub type Payload = std::sync::Arc<dyn std::any::Any + Send + Sync>;

/// A timestamped, typed record of a lifecycle occurrence.
#[derive(Clone)]
pub struct Event {
	pub id: String,
	pub event_type: EventType,
	pub timestamp: DateTime<Utc>,
	pub session_id: Option<String>,
	pub request_id: Option<String>,
	pub payload: Option<Payload>,
}

impl std::fmt::Debug for Event {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Event")
			.field("id", &self.id)
			.field("event_type", &self.event_type)
			.field("timestamp", &self.timestamp)
			.field("session_id", &self.session_id)
			.field("request_id", &self.request_id)
			.finish_non_exhaustive()
	}
}

static NEXT_EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

impl Event {
	/// Construct an event for the given type, leaving `id`/`timestamp` to be
	/// auto-populated by [`crate::EventBus::publish`] if left at their
	/// defaults.
	pub fn new(event_type: EventType) -> Self {
		Self {
			id: String::new(),
			event_type,
			timestamp: DateTime::<Utc>::UNIX_EPOCH,
			session_id: None,
			request_id: None,
			payload: None,
		}
	}

	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = id.into();
		self
	}

	pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
		self.session_id = Some(session_id.into());
		self
	}

	pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
		self.request_id = Some(request_id.into());
		self
	}

	pub fn with_payload<T: Send + Sync + 'static>(mut self, payload: T) -> Self {
		self.payload = Some(std::sync::Arc::new(payload));
		self
	}

	/// Monotonic counter suffices for auto-generated ids (spec.md §3.1).
	pub(crate) fn next_auto_id() -> String {
		let seq = NEXT_EVENT_SEQ.fetch_add(1, Ordering::Relaxed);
		format!("evt-auto-{seq}")
	}
}
