//! Common test utilities for the shared-observer library

#![allow(dead_code)]

use parking_lot::Mutex;
use shared_observer::{
	ChangeHandler, HandlerRef, MemoryBackend, MemoryHost, ObserverConfig, ResizeEntry, SharedObserver,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Route library logs to the test output
pub fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Let the dispatch task run through several frames
pub async fn wait_for_dispatch() {
	tokio::time::sleep(Duration::from_millis(100)).await;
}

/// Host plus a shared observer over it, dispatching on the default frame clock
pub fn setup_observer() -> (MemoryHost, Arc<SharedObserver<MemoryBackend>>) {
	init_tracing();
	let host = MemoryHost::new();
	let observer = SharedObserver::for_host(ObserverConfig::default(), &host)
		.expect("Failed to create shared observer");
	(host, Arc::new(observer))
}

/// Handler recording every entry it receives
#[derive(Default)]
pub struct ResizeProbe {
	calls: AtomicUsize,
	entries: Mutex<Vec<ResizeEntry>>,
}

impl ResizeProbe {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn last_width(&self) -> Option<f64> {
		self.entries.lock().last().map(|e| e.content_rect.width)
	}

	pub fn targets(&self) -> Vec<shared_observer::ElementId> {
		self.entries.lock().iter().map(|e| e.target).collect()
	}

	pub fn clear(&self) {
		self.calls.store(0, Ordering::SeqCst);
		self.entries.lock().clear();
	}
}

impl ChangeHandler<ResizeEntry> for ResizeProbe {
	fn handle_change(&self, event: &ResizeEntry) {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.entries.lock().push(event.clone());
	}
}

pub fn handler(probe: &Arc<ResizeProbe>) -> HandlerRef<ResizeEntry> {
	probe.clone()
}
