//! A single subscription's queue, drain loop, and handler invocation.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::event::{Event, EventType};

/// Handle passed to every subscription handler invocation.
///
/// Carries the per-event cancellation token so a handler that chooses to
/// observe it can cooperate with [`crate::EventBus::close`] and the
/// per-subscription timeout. The bus never forces cancellation of user
/// code beyond cancelling this token (spec.md §5).
#[derive(Clone)]
pub struct HandlerContext {
	pub cancellation: CancellationToken,
}

pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
pub type Handler = Arc<dyn Fn(HandlerContext, Event) -> BoxFuture + Send + Sync>;

const STATE_ACTIVE: u8 = 0;
const STATE_STOPPED: u8 = 1;

static NEXT_SUB_ID: AtomicU64 = AtomicU64::new(1);

/// Options accepted by [`crate::EventBus::subscribe`].
#[derive(Default, Clone, Copy)]
pub struct SubscribeOptions {
	pub timeout: Option<Duration>,
}

pub(crate) struct SubscriptionInner {
	pub(crate) id: u64,
	pub(crate) event_type: EventType,
	state: AtomicU8,
	tx: mpsc::Sender<Event>,
	token: CancellationToken,
}

impl SubscriptionInner {
	/// Enqueue onto this subscription's bounded queue. Silently drops the
	/// event if the subscription has been stopped (spec.md §4.1 state
	/// machine: "post-stop enqueue is a silent drop"). Blocks the caller
	/// (the dispatch loop) when the queue is full, providing back-pressure
	/// without affecting other subscribers.
	pub(crate) async fn enqueue(&self, event: Event) {
		if self.state.load(Ordering::Acquire) == STATE_STOPPED {
			return;
		}
		// A closed receiver (drain loop already exited) also means a
		// silent drop; `send` returning Err is the expected case there.
		let _ = self.tx.send(event).await;
	}

	pub(crate) fn stop(&self) {
		self.state.store(STATE_STOPPED, Ordering::Release);
		self.token.cancel();
	}
}

/// A live subscription: its queue-owning handle plus the drain task.
pub(crate) struct Subscription {
	pub(crate) inner: Arc<SubscriptionInner>,
	drain_task: tokio::task::JoinHandle<()>,
}

impl Subscription {
	pub(crate) fn spawn(
		event_type: EventType,
		buffer_size: usize,
		timeout: Option<Duration>,
		handler: Handler,
		parent_token: &CancellationToken,
	) -> Self {
		let id = NEXT_SUB_ID.fetch_add(1, Ordering::Relaxed);
		let (tx, rx) = mpsc::channel(buffer_size.max(1));
		let token = parent_token.child_token();

		let inner = Arc::new(SubscriptionInner {
			id,
			event_type,
			state: AtomicU8::new(STATE_ACTIVE),
			tx,
			token: token.clone(),
		});

		let drain_task = tokio::spawn(drain_loop(rx, handler, timeout, token));

		Self { inner, drain_task }
	}

	pub(crate) fn stop(&self) {
		self.inner.stop();
	}

	/// Waits for the drain loop to observe cancellation and exit. Must be
	/// called outside any lock guarding the subscription index (spec.md
	/// §5: `subsMu` must not be held while stopping a subscription).
	pub(crate) async fn join(self) {
		let _ = self.drain_task.await;
	}
}

/// One subscription's drain loop: pulls events off its queue in order and
/// invokes the handler, isolating both panics and slow/never-returning
/// handlers from the rest of the bus (spec.md §4.1 "Fan-out isolation").
async fn drain_loop(
	mut rx: mpsc::Receiver<Event>,
	handler: Handler,
	timeout: Option<Duration>,
	token: CancellationToken,
) {
	loop {
		let event = tokio::select! {
			biased;
			_ = token.cancelled() => break,
			event = rx.recv() => match event {
				Some(event) => event,
				None => break,
			},
		};

		invoke_handler(&handler, event, timeout, &token).await;
	}
}

/// Runs one handler invocation on its own task so that a timeout can stop
/// *waiting* for it without cancelling it — per spec.md §9, a handler that
/// outlives its timeout keeps running detached rather than being killed.
/// Panics inside the handler are caught and swallowed (spec.md §4.1
/// "Handler fault is recovered and swallowed").
async fn invoke_handler(
	handler: &Handler,
	event: Event,
	timeout: Option<Duration>,
	token: &CancellationToken,
) {
	let handler = handler.clone();
	let ctx = HandlerContext {
		cancellation: token.clone(),
	};
	let event_id = event.id.clone();

	let task = tokio::spawn(async move {
		let fut = (handler)(ctx, event);
		if let Err(panic) = AssertUnwindSafe(fut).catch_unwind().await {
			tracing::error!(event_id = %event_id, ?panic, "subscription handler panicked");
		}
	});

	match timeout {
		Some(duration) => {
			tokio::select! {
				res = task => {
					if let Err(join_err) = res {
						tracing::error!(%join_err, "subscription handler task failed");
					}
				}
				_ = tokio::time::sleep(duration) => {
					tracing::warn!(
						"subscription handler exceeded timeout; continuing to run detached"
					);
				}
			}
		}
		None => {
			if let Err(join_err) = task.await {
				tracing::error!(%join_err, "subscription handler task failed");
			}
		}
	}
}
