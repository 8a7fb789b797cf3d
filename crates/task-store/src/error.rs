//! Error taxonomy (spec.md §4.2).
//!
//! spec.md's taxonomy also lists `ErrInvalidTaskStatus` for "status not
//! in the enum". That check is a static guarantee here rather than a
//! runtime one: [`crate::TaskStatus`] is a closed Rust enum (the same
//! treatment `event_bus::EventType` gets for spec.md §3.1's "type is
//! non-empty" invariant), so every [`crate::TaskUpdate::status`] value
//! the type system accepts is already valid by construction — there is
//! no string-typed entry point into this crate that could produce an
//! "unknown status" at runtime. No variant for it is declared below.

use thiserror::Error;

use crate::task::TaskId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskStoreError {
	#[error("subject must not be empty")]
	EmptySubject,

	/// A blank or whitespace-only id was passed to an operation that
	/// requires a real id (spec.md §4.2 error taxonomy). Distinct from
	/// [`TaskStoreError::TaskNotFound`], which means "well-formed id, no
	/// such task".
	#[error("invalid task id")]
	InvalidTaskId,

	#[error("task not found: {0}")]
	TaskNotFound(TaskId),

	#[error("task is blocked by an incomplete dependency")]
	TaskBlocked,

	#[error("adding this dependency would introduce a cycle")]
	DependencyCycle,

	#[error("a task cannot depend on itself")]
	SelfDependency,

	#[error("exhausted id generation attempts")]
	IdExhausted,
}

pub type Result<T> = std::result::Result<T, TaskStoreError>;
