//! The event bus: dispatch loop, publish/subscribe/close, state machine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, OnceCell};
use tokio_util::sync::CancellationToken;

use crate::config::BusConfig;
use crate::deduper::Deduper;
use crate::error::{BusError, Result};
use crate::event::{Event, EventType};
use crate::subscription::{Handler, SubscribeOptions, Subscription, SubscriptionInner};

const RUNNING: u8 = 0;
const CLOSING: u8 = 1;
const CLOSED: u8 = 2;

type SubsByType = Arc<RwLock<HashMap<EventType, Vec<Arc<SubscriptionInner>>>>>;

/// Typed publish/subscribe bus with ordered fan-out, per-subscriber
/// bounded queues, handler isolation, and optional duplicate suppression.
///
/// # Invariants
///
/// 1. For two events E1, E2 of the same type published in order, every
///    subscriber of that type observes E1 before E2.
///    - Enforced in: `dispatch_loop` (single reader of the central queue,
///      snapshot-then-enqueue per subscriber in iteration order).
///    - Tested by: `tests/ordering.rs`.
/// 2. A slow or crashing subscriber cannot block other subscribers or the
///    dispatch loop beyond its own queue capacity.
///    - Enforced in: `SubscriptionInner::enqueue`, one `mpsc` channel per
///      subscription.
///    - Tested by: `tests/isolation.rs`.
/// 3. The number of distinct retained dedup ids never exceeds the
///    configured limit.
///    - Enforced in: `Deduper::check_and_admit`.
///    - Tested by: `tests/dedup.rs`.
pub struct EventBus {
	state: AtomicU8,
	config: BusConfig,
	dispatch_tx: mpsc::Sender<Event>,
	dispatch_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
	subs_by_type: SubsByType,
	subs_registry: Mutex<Vec<Subscription>>,
	deduper: Option<Mutex<Deduper>>,
	token: CancellationToken,
	close_once: OnceCell<()>,
}

impl EventBus {
	/// Builds a bus with default configuration (queue depth 64, buffer
	/// size 16, dedup limit 256).
	pub fn new() -> Arc<Self> {
		Self::with_config(BusConfig::default())
	}

	pub fn with_config(config: BusConfig) -> Arc<Self> {
		let (dispatch_tx, dispatch_rx) = mpsc::channel(config.queue_depth.max(1));
		let token = CancellationToken::new();
		let subs_by_type: SubsByType = Arc::new(RwLock::new(HashMap::new()));
		let deduper = config.dedup_limit.map(|limit| Mutex::new(Deduper::new(limit)));

		let dispatch_task = tokio::spawn(dispatch_loop(
			dispatch_rx,
			subs_by_type.clone(),
			token.child_token(),
		));

		Arc::new(Self {
			state: AtomicU8::new(RUNNING),
			config,
			dispatch_tx,
			dispatch_task: Mutex::new(Some(dispatch_task)),
			subs_by_type,
			subs_registry: Mutex::new(Vec::new()),
			deduper,
			token,
			close_once: OnceCell::new(),
		})
	}

	/// Validates, assigns id/timestamp if missing, consults the deduper,
	/// then enqueues on the central dispatch queue. May block the caller
	/// if the central queue is full (spec.md §5 suspension points).
	#[tracing::instrument(skip(self, event), fields(event_type = ?event.event_type))]
	pub async fn publish(&self, mut event: Event) -> Result<()> {
		if self.state.load(Ordering::Acquire) != RUNNING {
			return Err(BusError::Closed);
		}

		if event.id.is_empty() {
			event.id = Event::next_auto_id();
		}
		if event.timestamp == DateTime::<Utc>::UNIX_EPOCH {
			event.timestamp = Utc::now();
		}

		if let Some(deduper) = &self.deduper {
			let mut guard = deduper.lock().unwrap();
			if guard.check_and_admit(&event.id) {
				tracing::debug!(event_id = %event.id, "duplicate event suppressed");
				return Ok(());
			}
		}

		self.dispatch_tx
			.send(event)
			.await
			.map_err(|_| BusError::Closed)
	}

	/// Registers a handler for one event type. Returns an idempotent
	/// cancellation handle. Returns a no-op handle if the bus is not
	/// running (spec.md §4.1 state machine).
	pub fn subscribe(self: &Arc<Self>, event_type: EventType, handler: Handler) -> Unsubscribe {
		self.subscribe_with(event_type, handler, SubscribeOptions::default())
	}

	pub fn subscribe_with(
		self: &Arc<Self>,
		event_type: EventType,
		handler: Handler,
		options: SubscribeOptions,
	) -> Unsubscribe {
		if self.state.load(Ordering::Acquire) != RUNNING {
			return Unsubscribe::noop();
		}

		let timeout = options.timeout.or(self.config.subscription_timeout);
		let sub = Subscription::spawn(
			event_type,
			self.config.buffer_size,
			timeout,
			handler,
			&self.token,
		);
		let inner = sub.inner.clone();

		{
			let mut map = self.subs_by_type.write().unwrap();
			map.entry(event_type).or_default().push(inner.clone());
		}
		{
			let mut registry = self.subs_registry.lock().unwrap();
			registry.push(sub);
		}

		Unsubscribe::new(self.clone(), event_type, inner)
	}

	/// Stops dispatch, stops every subscription, and waits for all drain
	/// loops to finish. Idempotent: concurrent/repeated callers coalesce
	/// onto the same close operation.
	pub async fn close(&self) {
		self.close_once
			.get_or_init(|| async {
				self.state.store(CLOSING, Ordering::Release);
				self.token.cancel();

				let dispatch_task = self.dispatch_task.lock().unwrap().take();
				if let Some(task) = dispatch_task {
					let _ = task.await;
				}

				let subs: Vec<Subscription> = {
					let mut registry = self.subs_registry.lock().unwrap();
					registry.drain(..).collect()
				};
				for sub in subs {
					sub.stop();
					sub.join().await;
				}

				self.state.store(CLOSED, Ordering::Release);
			})
			.await;
	}
}

async fn dispatch_loop(mut rx: mpsc::Receiver<Event>, subs_by_type: SubsByType, token: CancellationToken) {
	loop {
		let event = tokio::select! {
			biased;
			_ = token.cancelled() => break,
			event = rx.recv() => match event {
				Some(event) => event,
				None => break,
			},
		};

		let snapshot: Vec<Arc<SubscriptionInner>> = {
			let map = subs_by_type.read().unwrap();
			map.get(&event.event_type).cloned().unwrap_or_default()
		};

		for subscription in snapshot {
			subscription.enqueue(event.clone()).await;
		}
	}
}

struct UnsubTarget {
	bus: Arc<EventBus>,
	event_type: EventType,
	inner: Arc<SubscriptionInner>,
}

/// Idempotent cancellation handle returned by [`EventBus::subscribe`].
pub struct Unsubscribe {
	target: Option<UnsubTarget>,
	done: AtomicBool,
}

impl Unsubscribe {
	pub(crate) fn new(bus: Arc<EventBus>, event_type: EventType, inner: Arc<SubscriptionInner>) -> Self {
		Self {
			target: Some(UnsubTarget {
				bus,
				event_type,
				inner,
			}),
			done: AtomicBool::new(false),
		}
	}

	pub(crate) fn noop() -> Self {
		Self {
			target: None,
			done: AtomicBool::new(true),
		}
	}

	/// Removes the subscription from the bus's dispatch index, then stops
	/// its drain loop outside that lock. Safe to call multiple times or
	/// concurrently; only the first call has an effect.
	pub fn unsubscribe(&self) {
		if self.done.swap(true, Ordering::AcqRel) {
			return;
		}
		let Some(target) = &self.target else {
			return;
		};

		{
			let mut map = target.bus.subs_by_type.write().unwrap();
			if let Some(list) = map.get_mut(&target.event_type) {
				list.retain(|s| s.id != target.inner.id);
			}
		}
		target.inner.stop();
	}
}
