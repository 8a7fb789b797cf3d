//! S4 — Bus ordering under load (spec.md §8).
//!
//! Buffer size = 4, queue depth = 4. Publish 1,000 `Notification` events
//! with ids `evt-1..evt-1000`. A subscriber that sleeps 1ms between
//! events must observe them strictly in ascending id order.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use event_bus::{BusConfig, Event, EventBus, EventType};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn strictly_ascending_per_type_per_subscriber() {
	let bus = EventBus::with_config(BusConfig::new().buffer_size(4).queue_depth(4).no_dedup());

	let observed = Arc::new(Mutex::new(Vec::with_capacity(1000)));
	let observed2 = observed.clone();

	let unsub = bus.subscribe(
		EventType::Notification,
		Arc::new(move |_ctx, event| {
			let observed = observed2.clone();
			Box::pin(async move {
				tokio::time::sleep(Duration::from_millis(1)).await;
				observed.lock().unwrap().push(event.id);
			})
		}),
	);

	for i in 1..=1000 {
		bus.publish(Event::new(EventType::Notification).with_id(format!("evt-{i}")))
			.await
			.unwrap();
	}

	bus.close().await;
	unsub.unsubscribe();

	let observed = observed.lock().unwrap();
	assert_eq!(observed.len(), 1000);
	for i in 1..=1000 {
		assert_eq!(observed[i - 1], format!("evt-{i}"));
	}
}
