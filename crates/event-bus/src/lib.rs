//! Typed event bus with ordered fan-out and bounded de-duplication.
//!
//! # Mental model
//!
//! A single dispatch loop reads from a central bounded queue and fans
//! each event out to every subscription registered for that event's
//! type. Each subscription owns its own bounded queue and drain loop, so
//! a slow or panicking handler cannot stall delivery to any other
//! subscriber — only its own queue backs up.
//!
//! ```ignore
//! use event_bus::{EventBus, EventType, Event};
//!
//! # async fn example() {
//! let bus = EventBus::new();
//! let unsub = bus.subscribe(EventType::Notification, std::sync::Arc::new(|_ctx, _event| {
//!     Box::pin(async { /* handle it */ })
//! }));
//! bus.publish(Event::new(EventType::Notification)).await.unwrap();
//! unsub.unsubscribe();
//! bus.close().await;
//! # }
//! ```
//!
//! # Bridging to the task store
//!
//! This crate has no dependency on `task-store` and vice versa. A caller
//! that wants task-transition notifications publishes an event (for
//! example `EventType::Notification` carrying a task id payload) from
//! whatever code already calls `TaskStore::update`. That bridging code is
//! an external collaborator's responsibility, not this crate's.

mod bus;
mod config;
mod deduper;
mod error;
mod event;
mod subscription;

pub use bus::{EventBus, Unsubscribe};
pub use config::BusConfig;
pub use error::{BusError, Result};
pub use event::{Event, EventType, Payload};
pub use subscription::{BoxFuture, Handler, HandlerContext, SubscribeOptions};
