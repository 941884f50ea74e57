use serde::Serialize;

/// Snapshot of a shared observer's bookkeeping and dispatch activity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ObserverStats {
	/// Targets the backend is currently watching
	pub watched_targets: usize,
	/// Live (target, handler) pairs
	pub registrations: usize,
	pub batches_received: u64,
	pub dispatch_cycles: u64,
	/// Events that found at least one handler
	pub events_dispatched: u64,
	/// Events whose target had no registration at dispatch time
	pub events_dropped: u64,
	/// Individual `handle_change` calls scheduled
	pub notifications: u64,
	pub handler_panics: u64,
}

impl ObserverStats {
	pub fn new() -> Self {
		Self::default()
	}

	/// Record one dispatch cycle covering `batches` coalesced batches
	pub fn record_cycle(&mut self, batches: u64) {
		self.dispatch_cycles += 1;
		self.batches_received += batches;
	}

	pub fn record_dispatched(&mut self, handlers: usize) {
		self.events_dispatched += 1;
		self.notifications += handlers as u64;
	}

	pub fn record_dropped(&mut self) {
		self.events_dropped += 1;
	}

	pub fn record_handler_panic(&mut self) {
		self.handler_panics += 1;
	}

	/// Average handlers notified per dispatched event
	pub fn average_fan_out(&self) -> f32 {
		if self.events_dispatched == 0 {
			return 0.0;
		}
		self.notifications as f32 / self.events_dispatched as f32
	}
}
