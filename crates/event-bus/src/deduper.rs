//! Bounded, insertion-ordered duplicate suppression (spec.md §3.3).

use std::collections::HashSet;
use std::collections::VecDeque;

/// Insertion-ordered LRU set of retained event ids.
///
/// Invariant: `order.len() == set.len() <= limit`. Admission records the
/// id at the tail; overflow evicts the head. This is LRU-by-insertion, not
/// LRU-by-access — re-publishing an id already in the window does not
/// move it to the tail (it is suppressed, not re-admitted).
#[derive(Debug)]
pub(crate) struct Deduper {
	limit: usize,
	order: VecDeque<String>,
	set: HashSet<String>,
}

impl Deduper {
	pub(crate) fn new(limit: usize) -> Self {
		Self {
			limit: limit.max(1),
			order: VecDeque::with_capacity(limit.max(1)),
			set: HashSet::with_capacity(limit.max(1)),
		}
	}

	/// Returns `true` if `id` was already present (a duplicate). Otherwise
	/// admits `id` into the window, evicting the oldest entry if the
	/// window is now over capacity.
	pub(crate) fn check_and_admit(&mut self, id: &str) -> bool {
		if self.set.contains(id) {
			return true;
		}

		self.order.push_back(id.to_owned());
		self.set.insert(id.to_owned());

		while self.order.len() > self.limit {
			if let Some(oldest) = self.order.pop_front() {
				self.set.remove(&oldest);
			}
		}

		false
	}

	#[cfg(test)]
	pub(crate) fn len(&self) -> usize {
		debug_assert_eq!(self.order.len(), self.set.len());
		self.order.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn admits_then_suppresses_duplicate() {
		let mut d = Deduper::new(3);
		assert!(!d.check_and_admit("a"));
		assert!(d.check_and_admit("a"));
	}

	#[test]
	fn evicts_oldest_over_limit() {
		let mut d = Deduper::new(3);
		assert!(!d.check_and_admit("a"));
		assert!(!d.check_and_admit("b"));
		assert!(!d.check_and_admit("c"));
		assert!(!d.check_and_admit("d")); // evicts "a"
		assert_eq!(d.len(), 3);
		// "a" was evicted, so it is admitted again rather than suppressed.
		assert!(!d.check_and_admit("a"));
	}

	#[test]
	fn zero_limit_clamps_to_one() {
		let mut d = Deduper::new(0);
		assert!(!d.check_and_admit("a"));
		assert!(!d.check_and_admit("b")); // evicts "a" immediately
		assert!(!d.check_and_admit("a"));
	}

	#[test]
	fn scenario_s5_dedup_window() {
		// Dedup limit = 3. Publish a, b, c, a, d, a.
		// Expect delivered sequence: a, b, c, d, a.
		let mut d = Deduper::new(3);
		let ids = ["a", "b", "c", "a", "d", "a"];
		let mut delivered = Vec::new();
		for id in ids {
			if !d.check_and_admit(id) {
				delivered.push(id);
			}
		}
		assert_eq!(delivered, vec!["a", "b", "c", "d", "a"]);
	}

	proptest::proptest! {
		/// No matter the sequence of ids admitted, the window never retains
		/// more than `limit` distinct ids (spec.md §8 invariant 3).
		#[test]
		fn window_never_exceeds_limit(
			limit in 1usize..16,
			ids in proptest::collection::vec(0i32..8, 0..200),
		) {
			let mut d = Deduper::new(limit);
			for id in &ids {
				d.check_and_admit(&id.to_string());
				proptest::prop_assert!(d.len() <= limit);
			}
		}

		/// An id already admitted and still within the window is always
		/// reported as a duplicate; one that has scrolled out of the
		/// window is always re-admitted.
		#[test]
		fn repeated_id_within_limit_is_always_suppressed(limit in 1usize..8) {
			let mut d = Deduper::new(limit);
			proptest::prop_assert!(!d.check_and_admit("x"));
			for i in 0..limit.saturating_sub(1) {
				d.check_and_admit(&format!("filler-{i}"));
			}
			// "x" has not yet been pushed out since only `limit - 1` other
			// distinct ids were admitted after it.
			proptest::prop_assert!(d.check_and_admit("x"));
		}
	}
}
