//! An in-memory task dependency DAG with automatic block/unblock
//! propagation.
//!
//! # Mental model
//!
//! `TaskStore` owns a map of [`Task`] nodes linked by `blocks` /
//! `blockedBy` edges. Every accessor (`get`, `list`,
//! `get_blocked_tasks`, `get_blocking_tasks`) hands back deep copies —
//! callers can never observe or corrupt internal state through a
//! returned `Task`. Status transitions that complete or reopen a task
//! trigger cascades that keep downstream tasks' `blocked` status
//! consistent with their blockers' statuses; see [`TaskStore::update`]
//! for the exact propagation rules.
//!
//! ```ignore
//! let store = TaskStore::new();
//! let a = store.create("write design doc", None, None)?;
//! let b = store.create("implement", None, None)?;
//! store.add_dependency(&b.id, &a.id)?; // b is blocked by a
//! store.update(&a.id, TaskUpdate { status: Some(TaskStatus::Completed), ..Default::default() })?;
//! assert_eq!(store.get(&b.id)?.status, TaskStatus::Pending);
//! ```
//!
//! # Bridging to other systems
//!
//! This crate has no dependency on the event bus crate in this
//! workspace. A caller that wants task transitions to emit bus events
//! (or vice versa — external signals driving task status) owns that
//! wiring itself, typically by wrapping [`TaskStore`] and publishing
//! after each successful mutation.

mod error;
mod id;
mod store;
mod task;

pub use error::{Result, TaskStoreError};
pub use store::{TaskStore, TaskUpdate};
pub use task::{Task, TaskId, TaskStatus};
