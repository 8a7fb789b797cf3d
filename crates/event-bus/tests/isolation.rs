//! S6 — Handler isolation (spec.md §8).
//!
//! Subscriber H1 always faults; H2 counts events. Publish 10
//! `Notification` events. H2 must observe all 10; the bus must remain
//! `close()`-able within bounded time.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use event_bus::{Event, EventBus, EventType};

#[tokio::test(flavor = "current_thread")]
async fn faulting_subscriber_does_not_affect_others_or_close() {
	let bus = EventBus::new();

	let h1_calls = Arc::new(AtomicU32::new(0));
	let h1_calls2 = h1_calls.clone();
	let _h1 = bus.subscribe(
		EventType::Notification,
		Arc::new(move |_ctx, _event| {
			h1_calls2.fetch_add(1, Ordering::SeqCst);
			Box::pin(async { panic!("H1 always faults") })
		}),
	);

	let h2_calls = Arc::new(AtomicU32::new(0));
	let h2_calls2 = h2_calls.clone();
	let _h2 = bus.subscribe(
		EventType::Notification,
		Arc::new(move |_ctx, _event| {
			let h2_calls = h2_calls2.clone();
			Box::pin(async move {
				h2_calls.fetch_add(1, Ordering::SeqCst);
			})
		}),
	);

	for i in 0..10 {
		bus.publish(Event::new(EventType::Notification).with_id(format!("evt-{i}")))
			.await
			.unwrap();
	}

	tokio::time::sleep(Duration::from_millis(50)).await;

	assert_eq!(h2_calls.load(Ordering::SeqCst), 10);
	assert_eq!(h1_calls.load(Ordering::SeqCst), 10);

	let closed = tokio::time::timeout(Duration::from_secs(5), bus.close()).await;
	assert!(closed.is_ok(), "close() must complete within a bounded time");
}
