//! Bus configuration, enumerated at construction time (spec.md §4.1).

use std::time::Duration;

/// Defaults per spec.md §4.1's configuration table.
pub const DEFAULT_QUEUE_DEPTH: usize = 64;
pub const DEFAULT_BUFFER_SIZE: usize = 16;
pub const DEFAULT_DEDUP_LIMIT: usize = 256;

/// Construction-time configuration for an [`crate::EventBus`].
///
/// All capacities clamp to a floor of 1 (spec.md §8 boundary behaviors):
/// a bus configured with `buffer_size(0)` behaves as if configured with
/// `buffer_size(1)`.
#[derive(Debug, Clone)]
pub struct BusConfig {
	pub(crate) buffer_size: usize,
	pub(crate) queue_depth: usize,
	pub(crate) dedup_limit: Option<usize>,
	pub(crate) subscription_timeout: Option<Duration>,
}

impl Default for BusConfig {
	fn default() -> Self {
		Self {
			buffer_size: DEFAULT_BUFFER_SIZE,
			queue_depth: DEFAULT_QUEUE_DEPTH,
			dedup_limit: Some(DEFAULT_DEDUP_LIMIT),
			subscription_timeout: None,
		}
	}
}

impl BusConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// Capacity of the central dispatch queue. Clamped to a floor of 1.
	pub fn queue_depth(mut self, depth: usize) -> Self {
		self.queue_depth = depth.max(1);
		self
	}

	/// Capacity of each per-subscriber queue. Clamped to a floor of 1.
	pub fn buffer_size(mut self, size: usize) -> Self {
		self.buffer_size = size.max(1);
		self
	}

	/// Enables the dedup window with the given retained-id limit, clamped
	/// to a floor of 1. `dedup_limit(0)` still enables dedup (with a
	/// 1-id window) — use [`BusConfig::no_dedup`] to disable explicitly.
	pub fn dedup_limit(mut self, limit: usize) -> Self {
		self.dedup_limit = Some(limit.max(1));
		self
	}

	/// Explicitly disables duplicate suppression.
	pub fn no_dedup(mut self) -> Self {
		self.dedup_limit = None;
		self
	}

	/// Per-event wall-clock deadline for subscription handlers.
	pub fn subscription_timeout(mut self, timeout: Duration) -> Self {
		self.subscription_timeout = Some(timeout);
		self
	}
}
