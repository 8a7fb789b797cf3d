//! The `Task` data model (spec.md §3.4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, URL-safe task identifier generated from a cryptographic random
/// source (see [`crate::id`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub(crate) String);

impl TaskId {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for TaskId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Lifecycle status. Wire strings are exactly `pending`, `in_progress`,
/// `completed`, `blocked` (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
	Pending,
	InProgress,
	Completed,
	Blocked,
}

/// A node in the task dependency DAG.
///
/// # Invariants
///
/// 1. `B ∈ A.blocks ⇔ A ∈ B.blockedBy` after every public operation
///    returns success (tolerated transiently dangling during internal
///    bookkeeping, never observable by a caller).
///    - Enforced in: `TaskStore::add_dependency`, `remove_dependency`,
///      `delete`.
/// 2. `status == Blocked` iff at least one extant blocker has a status
///    other than `Completed`, and the task was not itself just completed
///    by the caller.
///    - Enforced in: `TaskStore::apply_status_transition`,
///      `TaskStore::cascade_*`.
/// 3. The dependency graph is acyclic.
///    - Enforced in: `TaskStore::would_introduce_cycle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
	pub id: TaskId,
	pub subject: String,
	pub description: Option<String>,
	pub active_form: Option<String>,
	pub owner: Option<String>,
	pub status: TaskStatus,
	pub blocks: Vec<TaskId>,
	pub blocked_by: Vec<TaskId>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// Clones a task, returning `None` for `None` input (spec.md §4.2 "Clone
/// discipline"). Trivial in Rust's ownership model, but kept as an
/// explicit, unit-tested seam so every copy-out path in `TaskStore` goes
/// through the same function rather than ad hoc `.clone()` calls.
pub(crate) fn clone_task(task: Option<&Task>) -> Option<Task> {
	task.cloned()
}
