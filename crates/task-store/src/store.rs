//! The task store: operations, status transitions, cascades, cycle
//! detection (spec.md §4.2).

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use chrono::Utc;

use crate::error::{Result, TaskStoreError};
use crate::id::{IdSource, UuidIdSource, MAX_ID_ATTEMPTS};
use crate::task::{clone_task, Task, TaskId, TaskStatus};

/// Non-nil fields are applied; all others are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
	pub subject: Option<String>,
	pub description: Option<String>,
	pub active_form: Option<String>,
	pub owner: Option<String>,
	pub status: Option<TaskStatus>,
}

struct Inner {
	tasks: std::collections::HashMap<TaskId, Task>,
	order: Vec<TaskId>,
}

impl Inner {
	fn new() -> Self {
		Self {
			tasks: std::collections::HashMap::new(),
			order: Vec::new(),
		}
	}
}

/// In-memory DAG of tasks with automatic block/unblock propagation.
///
/// A single mutex protects the task map, insertion order, and all edge
/// fields; every compound operation (e.g. `update` with a status
/// cascade) holds the lock for its entire duration so cascades are
/// observed atomically by other callers (spec.md §5).
pub struct TaskStore {
	inner: Mutex<Inner>,
	id_source: Box<dyn IdSource>,
}

impl Default for TaskStore {
	fn default() -> Self {
		Self::new()
	}
}

impl TaskStore {
	pub fn new() -> Self {
		Self {
			inner: Mutex::new(Inner::new()),
			id_source: Box::new(UuidIdSource),
		}
	}

	#[cfg(test)]
	pub(crate) fn with_id_source(id_source: Box<dyn IdSource>) -> Self {
		Self {
			inner: Mutex::new(Inner::new()),
			id_source,
		}
	}

	/// Creates a task in `pending` status. `subject` is trimmed and must
	/// be non-empty after trimming.
	#[tracing::instrument(skip(self, description, active_form))]
	pub fn create(
		&self,
		subject: impl Into<String>,
		description: Option<String>,
		active_form: Option<String>,
	) -> Result<Task> {
		let trimmed = subject.into().trim().to_string();
		if trimmed.is_empty() {
			return Err(TaskStoreError::EmptySubject);
		}

		let mut inner = self.inner.lock().unwrap();
		let id = Self::generate_unique_id(&inner, self.id_source.as_ref())?;
		let now = Utc::now();
		let task = Task {
			id: id.clone(),
			subject: trimmed,
			description,
			active_form,
			owner: None,
			status: TaskStatus::Pending,
			blocks: Vec::new(),
			blocked_by: Vec::new(),
			created_at: now,
			updated_at: now,
		};
		inner.tasks.insert(id.clone(), task.clone());
		inner.order.push(id);
		tracing::debug!(task_id = %task.id, "task created");
		Ok(task)
	}

	fn generate_unique_id(inner: &Inner, source: &dyn IdSource) -> Result<TaskId> {
		for _ in 0..MAX_ID_ATTEMPTS {
			let candidate = source.generate();
			if !inner.tasks.contains_key(&candidate) {
				return Ok(candidate);
			}
		}
		Err(TaskStoreError::IdExhausted)
	}

	/// Rejects blank ids before a lookup is attempted, so "malformed
	/// input" (spec.md §4.2 `ErrInvalidTaskID`) stays distinct from
	/// "well-formed id, no such task" (`ErrTaskNotFound`).
	fn check_id(id: &TaskId) -> Result<()> {
		if id.as_str().trim().is_empty() {
			return Err(TaskStoreError::InvalidTaskId);
		}
		Ok(())
	}

	/// Returns a deep copy of the task.
	pub fn get(&self, id: &TaskId) -> Result<Task> {
		Self::check_id(id)?;
		let inner = self.inner.lock().unwrap();
		clone_task(inner.tasks.get(id)).ok_or_else(|| TaskStoreError::TaskNotFound(id.clone()))
	}

	/// Returns deep copies of every live task, in insertion order. Ids in
	/// the order list that no longer resolve (dangling bookkeeping) are
	/// skipped rather than faulting.
	pub fn list(&self) -> Vec<Task> {
		let inner = self.inner.lock().unwrap();
		inner
			.order
			.iter()
			.filter_map(|id| clone_task(inner.tasks.get(id)))
			.collect()
	}

	/// Applies non-nil fields of `update`. Status transitions are gated
	/// (spec.md §4.2 transition table); a successful transition to
	/// `completed` cascades one hop of unblocking, and a reopen
	/// (`completed` → `pending`) cascades a transitive re-block of every
	/// downstream task still reachable via an active blocker chain.
	///
	/// All validation happens before any field is mutated, so a rejected
	/// update (empty subject, disallowed status transition) leaves the
	/// task entirely untouched (spec.md §7 "constraint violation ...
	/// returned; no state change").
	#[tracing::instrument(skip(self, update))]
	pub fn update(&self, id: &TaskId, update: TaskUpdate) -> Result<Task> {
		Self::check_id(id)?;
		let mut inner = self.inner.lock().unwrap();
		if !inner.tasks.contains_key(id) {
			return Err(TaskStoreError::TaskNotFound(id.clone()));
		}

		let trimmed_subject = match &update.subject {
			Some(subject) => {
				let trimmed = subject.trim().to_string();
				if trimmed.is_empty() {
					return Err(TaskStoreError::EmptySubject);
				}
				Some(trimmed)
			}
			None => None,
		};

		if let Some(new_status) = update.status {
			Self::check_status_transition(&inner, id, new_status)?;
		}

		if let Some(trimmed) = trimmed_subject {
			inner.tasks.get_mut(id).unwrap().subject = trimmed;
		}
		if let Some(description) = update.description {
			inner.tasks.get_mut(id).unwrap().description = Some(description);
		}
		if let Some(active_form) = update.active_form {
			inner.tasks.get_mut(id).unwrap().active_form = Some(active_form);
		}
		if let Some(owner) = update.owner {
			inner.tasks.get_mut(id).unwrap().owner = Some(owner);
		}

		if let Some(new_status) = update.status {
			Self::commit_status_transition(&mut inner, id, new_status);
		}

		let now = Utc::now();
		let task = inner.tasks.get_mut(id).unwrap();
		task.updated_at = task.updated_at.max(now);
		Ok(task.clone())
	}

	fn active_blockers(inner: &Inner, task: &Task) -> Vec<TaskId> {
		task.blocked_by
			.iter()
			.filter(|blocker_id| {
				inner
					.tasks
					.get(blocker_id)
					.map(|blocker| blocker.status != TaskStatus::Completed)
					.unwrap_or(false) // dangling blocker ids are not active blockers
			})
			.cloned()
			.collect()
	}

	/// Read-only gate: does `new_status` violate the transition table for
	/// `id`'s current status and active-blocker set? Run before any field
	/// of the task is mutated so a rejection leaves no partial state
	/// change behind.
	fn check_status_transition(inner: &Inner, id: &TaskId, new_status: TaskStatus) -> Result<()> {
		let current_status = inner.tasks.get(id).unwrap().status;

		let has_active_blockers = {
			let task = inner.tasks.get(id).unwrap();
			!Self::active_blockers(inner, task).is_empty()
		};

		// Any transition away from `blocked` requires active blockers to
		// have cleared; any transition *into* `in_progress`/`completed`
		// requires the same, regardless of the current state.
		let blocked_departure_needs_clear = current_status == TaskStatus::Blocked && new_status != TaskStatus::Blocked;
		let entering_active_work = matches!(new_status, TaskStatus::InProgress | TaskStatus::Completed);
		if has_active_blockers && (blocked_departure_needs_clear || entering_active_work) {
			return Err(TaskStoreError::TaskBlocked);
		}

		Ok(())
	}

	/// Applies an already-validated status transition and its cascades.
	/// Must only be called after [`Self::check_status_transition`] has
	/// returned `Ok` for the same `(id, new_status)` pair under the same
	/// lock guard.
	fn commit_status_transition(inner: &mut Inner, id: &TaskId, new_status: TaskStatus) {
		let current_status = inner.tasks.get(id).unwrap().status;
		inner.tasks.get_mut(id).unwrap().status = new_status;

		match (current_status, new_status) {
			(_, TaskStatus::Completed) => Self::cascade_unblock_one_hop(inner, id),
			(TaskStatus::Completed, TaskStatus::Pending) => Self::cascade_reblock_transitive(inner, id),
			_ => {}
		}
	}

	/// On `X → completed`: for each task `Y` directly in `X.blocks`,
	/// recompute `Y`'s active blockers; if none remain and `Y` is
	/// `blocked`, move `Y` to `pending`. Does not recurse further — a
	/// grandchild only unblocks when its own direct blocker completes
	/// (spec.md §8 scenario S1).
	fn cascade_unblock_one_hop(inner: &mut Inner, completed_id: &TaskId) {
		let downstream = inner
			.tasks
			.get(completed_id)
			.map(|t| t.blocks.clone())
			.unwrap_or_default();

		let now = Utc::now();
		for downstream_id in downstream {
			let still_blocked = inner
				.tasks
				.get(&downstream_id)
				.map(|t| !Self::active_blockers(inner, t).is_empty())
				.unwrap_or(true);

			if let Some(task) = inner.tasks.get_mut(&downstream_id) {
				if !still_blocked && task.status == TaskStatus::Blocked {
					task.status = TaskStatus::Pending;
					task.updated_at = task.updated_at.max(now);
				}
			}
		}
	}

	/// On `completed → pending` (reopen): every task transitively
	/// reachable from `reopened_id` via `blocks` edges now has at least
	/// one active blocker again (the reopened task itself, or a
	/// downstream task this function has already re-blocked), so the
	/// whole downstream closure is marked `blocked` (spec.md §8 scenario
	/// S3) — including tasks a caller had manually completed, since the
	/// concrete reopen scenario requires that override.
	fn cascade_reblock_transitive(inner: &mut Inner, reopened_id: &TaskId) {
		let mut visited: HashSet<TaskId> = HashSet::new();
		let mut queue: VecDeque<TaskId> = inner
			.tasks
			.get(reopened_id)
			.map(|t| t.blocks.clone().into())
			.unwrap_or_default();

		let now = Utc::now();
		while let Some(id) = queue.pop_front() {
			if !visited.insert(id.clone()) {
				continue;
			}
			let Some(task) = inner.tasks.get_mut(&id) else {
				continue; // tolerate dangling edges
			};
			task.status = TaskStatus::Blocked;
			task.updated_at = task.updated_at.max(now);
			queue.extend(task.blocks.clone());
		}
	}

	/// Removes the task from the `blocks`/`blockedBy` sets of all
	/// neighbors, then re-evaluates every former direct downstream task
	/// (tasks this one was blocking may now be unblocked).
	#[tracing::instrument(skip(self))]
	pub fn delete(&self, id: &TaskId) -> Result<()> {
		Self::check_id(id)?;
		let mut inner = self.inner.lock().unwrap();
		let task = inner
			.tasks
			.remove(id)
			.ok_or_else(|| TaskStoreError::TaskNotFound(id.clone()))?;

		for blocker_id in &task.blocked_by {
			if let Some(blocker) = inner.tasks.get_mut(blocker_id) {
				blocker.blocks.retain(|b| b != id);
			}
		}

		let now = Utc::now();
		for downstream_id in &task.blocks {
			if let Some(downstream) = inner.tasks.get_mut(downstream_id) {
				downstream.blocked_by.retain(|b| b != id);
			}
			let still_blocked = inner
				.tasks
				.get(downstream_id)
				.map(|t| !Self::active_blockers(inner, t).is_empty())
				.unwrap_or(true);
			if let Some(downstream) = inner.tasks.get_mut(downstream_id) {
				if !still_blocked && downstream.status == TaskStatus::Blocked {
					downstream.status = TaskStatus::Pending;
					downstream.updated_at = downstream.updated_at.max(now);
				}
			}
		}

		inner.order.retain(|existing| existing != id);
		Ok(())
	}

	/// Adds a dependency edge: `task_id` is blocked by `blocker_id`.
	/// Idempotent if the edge already exists. Rejects self-edges and
	/// edges that would introduce a cycle.
	#[tracing::instrument(skip(self))]
	pub fn add_dependency(&self, task_id: &TaskId, blocker_id: &TaskId) -> Result<()> {
		Self::check_id(task_id)?;
		Self::check_id(blocker_id)?;
		if task_id == blocker_id {
			return Err(TaskStoreError::SelfDependency);
		}

		let mut inner = self.inner.lock().unwrap();
		if !inner.tasks.contains_key(task_id) {
			return Err(TaskStoreError::TaskNotFound(task_id.clone()));
		}
		if !inner.tasks.contains_key(blocker_id) {
			return Err(TaskStoreError::TaskNotFound(blocker_id.clone()));
		}

		let already_present = inner
			.tasks
			.get(task_id)
			.map(|t| t.blocked_by.contains(blocker_id))
			.unwrap_or(false);
		if already_present {
			return Ok(());
		}

		if Self::would_introduce_cycle(&inner, task_id, blocker_id) {
			return Err(TaskStoreError::DependencyCycle);
		}

		inner.tasks.get_mut(task_id).unwrap().blocked_by.push(blocker_id.clone());
		inner.tasks.get_mut(blocker_id).unwrap().blocks.push(task_id.clone());

		let blocker_completed = inner
			.tasks
			.get(blocker_id)
			.map(|b| b.status == TaskStatus::Completed)
			.unwrap_or(false);
		if !blocker_completed {
			let task = inner.tasks.get_mut(task_id).unwrap();
			if task.status != TaskStatus::Completed {
				task.status = TaskStatus::Blocked;
				task.updated_at = Utc::now().max(task.updated_at);
			}
		}

		Ok(())
	}

	/// Adding edge `task ← blocker` would cycle iff `task` is already
	/// reachable from `blocker` via existing `blocks` edges. Tolerates
	/// dangling references by skipping missing nodes.
	fn would_introduce_cycle(inner: &Inner, task_id: &TaskId, blocker_id: &TaskId) -> bool {
		let mut visited: HashSet<TaskId> = HashSet::new();
		let mut queue: VecDeque<TaskId> = VecDeque::new();
		queue.push_back(blocker_id.clone());

		while let Some(current) = queue.pop_front() {
			if current == *task_id {
				return true;
			}
			if !visited.insert(current.clone()) {
				continue;
			}
			if let Some(task) = inner.tasks.get(&current) {
				queue.extend(task.blocks.clone());
			}
		}

		false
	}

	/// Removes a dependency edge. Idempotent if the edge is absent. If no
	/// remaining blockers are active, transitions `task_id` back to
	/// `pending` — only if it was `blocked`.
	#[tracing::instrument(skip(self))]
	pub fn remove_dependency(&self, task_id: &TaskId, blocker_id: &TaskId) -> Result<()> {
		Self::check_id(task_id)?;
		Self::check_id(blocker_id)?;
		let mut inner = self.inner.lock().unwrap();
		if !inner.tasks.contains_key(task_id) {
			return Err(TaskStoreError::TaskNotFound(task_id.clone()));
		}
		if !inner.tasks.contains_key(blocker_id) {
			return Err(TaskStoreError::TaskNotFound(blocker_id.clone()));
		}

		if let Some(blocker) = inner.tasks.get_mut(blocker_id) {
			blocker.blocks.retain(|b| b != task_id);
		}
		if let Some(task) = inner.tasks.get_mut(task_id) {
			task.blocked_by.retain(|b| b != blocker_id);
		}

		let still_blocked = inner
			.tasks
			.get(task_id)
			.map(|t| !Self::active_blockers(inner, t).is_empty())
			.unwrap_or(false);

		if !still_blocked {
			let task = inner.tasks.get_mut(task_id).unwrap();
			if task.status == TaskStatus::Blocked {
				task.status = TaskStatus::Pending;
				task.updated_at = Utc::now().max(task.updated_at);
			}
		}

		Ok(())
	}

	/// Tasks blocked by `id` (outgoing edges), as deep copies.
	pub fn get_blocked_tasks(&self, id: &TaskId) -> Option<Vec<Task>> {
		if id.as_str().is_empty() {
			return None;
		}
		let inner = self.inner.lock().unwrap();
		let task = inner.tasks.get(id)?;
		Some(
			task.blocks
				.iter()
				.filter_map(|downstream_id| clone_task(inner.tasks.get(downstream_id)))
				.collect(),
		)
	}

	/// Tasks blocking `id` (incoming edges), as deep copies.
	pub fn get_blocking_tasks(&self, id: &TaskId) -> Option<Vec<Task>> {
		if id.as_str().is_empty() {
			return None;
		}
		let inner = self.inner.lock().unwrap();
		let task = inner.tasks.get(id)?;
		Some(
			task.blocked_by
				.iter()
				.filter_map(|blocker_id| clone_task(inner.tasks.get(blocker_id)))
				.collect(),
		)
	}
}
