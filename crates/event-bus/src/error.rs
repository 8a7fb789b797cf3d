//! Error types for the event bus.

use thiserror::Error;

/// Errors returned by [`crate::EventBus::publish`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
	/// The bus has started or finished closing; no further events are
	/// accepted (spec.md §4.1 state machine).
	#[error("event bus is closed")]
	Closed,
}

pub type Result<T> = std::result::Result<T, BusError>;
