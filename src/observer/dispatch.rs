//! Deferred dispatch
//!
//! Batches from the backend are not delivered inside the backend's callback.
//! The dispatch task waits for the next frame boundary, folds in every batch
//! that arrived in the meantime, and then notifies handlers in the order the
//! backend reported the events.

use super::registry::Registry;
use crate::backend::{BatchReceiver, WatchBackend};
use crate::events::ChangeEvent;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// The single coalescing boundary between receiving a batch and dispatching it
#[async_trait]
pub trait FrameScheduler: Send {
	/// Resolve at the next boundary the host provides
	async fn next_frame(&mut self);
}

/// Fixed-period frame clock. Boundaries are aligned to the clock's origin.
#[derive(Debug, Clone)]
pub struct FrameClock {
	origin: Instant,
	period: Duration,
}

impl FrameClock {
	pub fn new(period: Duration) -> Self {
		Self { origin: Instant::now(), period }
	}

	pub fn period(&self) -> Duration {
		self.period
	}

	/// First boundary strictly after `now`
	pub fn next_boundary(&self, now: Instant) -> Instant {
		let period = self.period.as_nanos().max(1);
		let elapsed = now.saturating_duration_since(self.origin).as_nanos();
		let frames = elapsed / period + 1;
		self.origin + Duration::from_nanos((frames * period) as u64)
	}
}

#[async_trait]
impl FrameScheduler for FrameClock {
	async fn next_frame(&mut self) {
		let boundary = self.next_boundary(Instant::now());
		tokio::time::sleep_until(boundary).await;
	}
}

/// Yields to the runtime once instead of waiting on a clock
#[derive(Debug, Clone, Copy, Default)]
pub struct NextTick;

#[async_trait]
impl FrameScheduler for NextTick {
	async fn next_frame(&mut self) {
		tokio::task::yield_now().await;
	}
}

/// Drain batches until every sender is gone
pub(crate) async fn run_dispatch_loop<B: WatchBackend>(
	observer_id: Uuid,
	registry: Arc<Mutex<Registry<B>>>,
	mut batches: BatchReceiver<B::Event>,
	mut frames: Box<dyn FrameScheduler>,
) {
	debug!("Dispatch loop started for observer {}", observer_id);

	while let Some(mut batch) = batches.recv().await {
		frames.next_frame().await;

		let mut coalesced = 1u64;
		while let Ok(more) = batches.try_recv() {
			batch.extend(more);
			coalesced += 1;
		}
		trace!(
			"Observer {} dispatching {} events from {} batches",
			observer_id,
			batch.len(),
			coalesced
		);

		dispatch_cycle(&registry, batch, coalesced);
	}

	debug!("Dispatch loop ended for observer {}", observer_id);
}

/// Notify current handlers for each event, in order.
///
/// A cycle covers every batch coalesced since the previous frame, so a pair
/// is called once per event for its target, which can mean several calls in
/// one cycle when the target changed more than once before the boundary.
///
/// The lock is released before handlers run so they may add or remove
/// registrations, or shut the observer down, from inside `handle_change`.
/// A panicking handler is logged and skipped; the rest of the cycle goes on.
pub(crate) fn dispatch_cycle<B: WatchBackend>(
	registry: &Mutex<Registry<B>>,
	batch: Vec<B::Event>,
	coalesced: u64,
) {
	registry.lock().record_cycle(coalesced);

	for event in batch {
		let handlers = registry.lock().take_handlers(event.target());
		if handlers.is_empty() {
			trace!("Dropping event for untracked target {:?}", event.target());
			continue;
		}
		for handler in &handlers {
			let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle_change(&event)));
			if outcome.is_err() {
				warn!("Handler panicked on change of {:?}", event.target());
				registry.lock().record_handler_panic();
			}
		}
	}
}
