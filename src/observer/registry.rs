//! Registration table
//!
//! Maps each watched target to the set of handlers interested in it, and keeps
//! the backend's watches in lockstep with the table: a target is present iff
//! it has at least one handler iff the backend is watching it. Empty handler
//! sets are never stored.

use super::stats::ObserverStats;
use crate::backend::{TargetOf, WatchBackend};
use crate::error::Result;
use crate::handler::{HandlerKey, HandlerRef};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::{debug, trace, warn};

type HandlerSet<E> = HashMap<HandlerKey, HandlerRef<E>>;

pub(crate) struct Registry<B: WatchBackend> {
	backend: B,
	table: HashMap<TargetOf<B>, HandlerSet<B::Event>>,
	stats: ObserverStats,
}

impl<B: WatchBackend> Registry<B> {
	pub(crate) fn new(backend: B) -> Self {
		Self { backend, table: HashMap::new(), stats: ObserverStats::new() }
	}

	pub(crate) fn backend(&self) -> &B {
		&self.backend
	}

	/// Register `handler` for `target`, watching the target if it is new.
	///
	/// Options only reach the backend on the first registration for a target.
	pub(crate) fn add(
		&mut self,
		handler: HandlerRef<B::Event>,
		target: TargetOf<B>,
		options: Option<B::Options>,
	) -> Result<()> {
		let key = HandlerKey::of(&handler);
		match self.table.entry(target) {
			Entry::Occupied(mut entry) => {
				if let Some(options) = options {
					debug!(
						"Options {:?} for {:?} ignored: target is already watched",
						options,
						entry.key()
					);
				}
				if entry.get_mut().insert(key, handler).is_some() {
					trace!("Duplicate registration on {:?} collapsed", entry.key());
				}
			}
			Entry::Vacant(entry) => {
				// Observe before inserting so a failed watch leaves no entry behind
				self.backend.observe(entry.key(), options.as_ref())?;
				debug!("Watching {:?}", entry.key());
				entry.insert(HashMap::from([(key, handler)]));
			}
		}
		Ok(())
	}

	/// Unregister `handler` from `target`; unwatch the target when its last handler leaves
	pub(crate) fn remove(&mut self, handler: &HandlerRef<B::Event>, target: &TargetOf<B>) {
		let Some(handlers) = self.table.get_mut(target) else {
			trace!("Remove on unregistered target {:?} ignored", target);
			return;
		};
		if handlers.remove(&HandlerKey::of(handler)).is_none() {
			trace!("Remove of unregistered handler on {:?} ignored", target);
			return;
		}
		if handlers.is_empty() {
			self.table.remove(target);
			self.unobserve(target);
		}
	}

	/// Unwatch every target and clear the table; returns how many targets were released
	pub(crate) fn shutdown(&mut self) -> usize {
		let targets: Vec<_> = self.table.drain().map(|(target, _)| target).collect();
		for target in &targets {
			self.unobserve(target);
		}
		targets.len()
	}

	fn unobserve(&mut self, target: &TargetOf<B>) {
		match self.backend.unobserve(target) {
			Ok(()) => debug!("Stopped watching {:?}", target),
			Err(e) => warn!("Failed to unobserve {:?}: {}", target, e),
		}
	}

	/// Handlers registered for `target` right now, recorded as one dispatched or dropped event
	pub(crate) fn take_handlers(&mut self, target: &TargetOf<B>) -> Vec<HandlerRef<B::Event>> {
		match self.table.get(target) {
			Some(handlers) => {
				let snapshot: Vec<_> = handlers.values().cloned().collect();
				self.stats.record_dispatched(snapshot.len());
				snapshot
			}
			None => {
				self.stats.record_dropped();
				Vec::new()
			}
		}
	}

	pub(crate) fn record_cycle(&mut self, batches: u64) {
		self.stats.record_cycle(batches);
	}

	pub(crate) fn record_handler_panic(&mut self) {
		self.stats.record_handler_panic();
	}

	pub(crate) fn is_observing(&self, target: &TargetOf<B>) -> bool {
		self.table.contains_key(target)
	}

	pub(crate) fn handler_count(&self, target: &TargetOf<B>) -> usize {
		self.table.get(target).map_or(0, HashMap::len)
	}

	pub(crate) fn watched_targets(&self) -> Vec<TargetOf<B>> {
		self.table.keys().cloned().collect()
	}

	pub(crate) fn stats(&self) -> ObserverStats {
		ObserverStats {
			watched_targets: self.table.len(),
			registrations: self.table.values().map(HashMap::len).sum(),
			..self.stats.clone()
		}
	}
}
