//! Task id generation: cryptographically random, URL-safe, with bounded
//! collision retry (spec.md §4.2 "ID generation").

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::task::TaskId;

/// "the cited implementation tries up to a handful of times, then
/// surfaces an exhaustion error" — spec.md §4.2. Picked 8 as a concrete
/// handful; this is an Open Question resolution, recorded in DESIGN.md.
pub(crate) const MAX_ID_ATTEMPTS: usize = 8;

/// Seam allowing tests to inject a degenerate random source (spec.md §8
/// "Id generation under a degenerate random source") without `TaskStore`
/// depending on anything beyond this trait.
pub(crate) trait IdSource: Send + Sync {
	fn generate(&self) -> TaskId;
}

pub(crate) struct UuidIdSource;

impl IdSource for UuidIdSource {
	fn generate(&self) -> TaskId {
		let bytes = uuid::Uuid::new_v4();
		TaskId(URL_SAFE_NO_PAD.encode(bytes.as_bytes()))
	}
}

#[cfg(test)]
pub(crate) struct ConstantIdSource(pub(crate) &'static str);

#[cfg(test)]
impl IdSource for ConstantIdSource {
	fn generate(&self) -> TaskId {
		TaskId(self.0.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;

	#[test]
	fn uuid_source_produces_url_safe_unique_ids() {
		let source = UuidIdSource;
		let mut seen = HashSet::new();
		for _ in 0..256 {
			let id = source.generate();
			assert!(!id.as_str().contains('+'));
			assert!(!id.as_str().contains('/'));
			assert!(!id.as_str().contains('='));
			assert!(seen.insert(id));
		}
	}
}
