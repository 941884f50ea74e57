//! Synchronous stand-in for a shared observer
//!
//! Consumers that take an `Arc<dyn ObserverHub<..>>` can be tested against
//! [`MockSharedObserver`] instead of a real backend. Give it the event each
//! target should report; every new registration on such a target is answered
//! immediately with that event, followed by the add-complete callback, so a
//! test can wait until the consumer has seen its size.
//!
//! ```
//! use shared_observer::{
//! 	ChangeHandler, ElementId, HandlerRef, MockSharedObserver, ObserveOptions, ObserverHub, Rect,
//! 	ResizeEntry,
//! };
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! struct Nav;
//!
//! impl ChangeHandler<ResizeEntry> for Nav {
//! 	fn handle_change(&self, entry: &ResizeEntry) {
//! 		assert_eq!(entry.content_rect.width, 150.0);
//! 	}
//! }
//!
//! let nav = ElementId(1);
//! let sizes = HashMap::from([(nav, ResizeEntry::new(nav, Rect::sized(150.0, 20.0), 0.0))]);
//! let hub: Arc<dyn ObserverHub<ResizeEntry, ObserveOptions>> =
//! 	Arc::new(MockSharedObserver::with_responses(sizes));
//!
//! let handler: HandlerRef<ResizeEntry> = Arc::new(Nav);
//! hub.add_observer(handler, nav, None).unwrap();
//! ```

use crate::error::Result;
use crate::events::ChangeEvent;
use crate::handler::{HandlerKey, HandlerRef};
use crate::observer::ObserverHub;
use parking_lot::Mutex;
use std::collections::HashMap;

type AddComplete = Box<dyn Fn() + Send + Sync>;

pub struct MockSharedObserver<E: ChangeEvent> {
	table: Mutex<HashMap<E::Target, HashMap<HandlerKey, HandlerRef<E>>>>,
	responses: HashMap<E::Target, E>,
	add_complete: Option<AddComplete>,
}

impl<E: ChangeEvent> Default for MockSharedObserver<E> {
	fn default() -> Self {
		Self::with_responses(HashMap::new())
	}
}

impl<E: ChangeEvent> MockSharedObserver<E> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Answer registrations on each target with the given event
	pub fn with_responses(responses: HashMap<E::Target, E>) -> Self {
		Self { table: Mutex::new(HashMap::new()), responses, add_complete: None }
	}

	/// Call `callback` after each canned response has been delivered
	pub fn on_add_complete(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
		self.add_complete = Some(Box::new(callback));
		self
	}

	/// Deliver `event` to every handler registered for its target, right now
	pub fn emit(&self, event: &E) -> usize {
		let handlers: Vec<_> = self
			.table
			.lock()
			.get(event.target())
			.map(|set| set.values().cloned().collect())
			.unwrap_or_default();
		for handler in &handlers {
			handler.handle_change(event);
		}
		handlers.len()
	}

	pub fn is_observing(&self, target: &E::Target) -> bool {
		self.table.lock().contains_key(target)
	}

	pub fn handler_count(&self, target: &E::Target) -> usize {
		self.table.lock().get(target).map_or(0, HashMap::len)
	}
}

impl<E: ChangeEvent + Sync, O> ObserverHub<E, O> for MockSharedObserver<E> {
	fn add_observer(
		&self,
		handler: HandlerRef<E>,
		target: E::Target,
		_options: Option<O>,
	) -> Result<()> {
		let key = HandlerKey::of(&handler);
		let added = self
			.table
			.lock()
			.entry(target.clone())
			.or_default()
			.insert(key, handler.clone())
			.is_none();

		if added {
			if let Some(response) = self.responses.get(&target) {
				handler.handle_change(response);
				if let Some(callback) = &self.add_complete {
					callback();
				}
			}
		}
		Ok(())
	}

	fn remove_observer(&self, handler: &HandlerRef<E>, target: &E::Target) {
		let mut table = self.table.lock();
		let Some(handlers) = table.get_mut(target) else {
			return;
		};
		handlers.remove(&HandlerKey::of(handler));
		if handlers.is_empty() {
			table.remove(target);
		}
	}

	fn shutdown(&self) {
		self.table.lock().clear();
	}
}
