//! In-process element host
//!
//! [`MemoryHost`] keeps the geometry of a set of elements and behaves like a
//! host environment's resize watcher: observing an element raises an initial
//! entry, and every geometry update raises entries for the observed elements
//! whose observed box changed size. Updates applied together are reported as
//! one batch, in the order they were applied.
//!
//! It also records how often each element was observed and unobserved, which
//! is what conformance tests of the shared observer check against.

use super::{BatchSender, WatchBackend};
use crate::error::{ObserverError, Result};
use crate::events::{BoxModel, BoxSize, ElementId, ObserveOptions, Rect, ResizeEntry};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy)]
struct Element {
	rect: Rect,
	inset: f64,
}

impl Element {
	fn entry(&self, id: ElementId) -> ResizeEntry {
		ResizeEntry::new(id, self.rect, self.inset)
	}
}

#[derive(Debug, Clone, Copy)]
struct Watch {
	box_model: BoxModel,
	last_size: Option<BoxSize>,
}

#[derive(Debug)]
struct HostState {
	next_id: u64,
	device_pixel_ratio: f64,
	elements: HashMap<ElementId, Element>,
	watches: HashMap<ElementId, Watch>,
	observe_calls: HashMap<ElementId, usize>,
	unobserve_calls: HashMap<ElementId, usize>,
	sender: Option<BatchSender<ResizeEntry>>,
}

impl HostState {
	fn observed_size(&self, element: &Element, box_model: BoxModel) -> BoxSize {
		let content = element.rect.size();
		match box_model {
			BoxModel::ContentBox => content,
			BoxModel::BorderBox => BoxSize {
				inline_size: content.inline_size + 2.0 * element.inset,
				block_size: content.block_size + 2.0 * element.inset,
			},
			BoxModel::DevicePixelContentBox => BoxSize {
				inline_size: content.inline_size * self.device_pixel_ratio,
				block_size: content.block_size * self.device_pixel_ratio,
			},
		}
	}

	/// Entry for `id` if it is watched and its observed size moved since the last report
	fn collect_change(&mut self, id: ElementId) -> Option<ResizeEntry> {
		let element = *self.elements.get(&id)?;
		let box_model = self.watches.get(&id)?.box_model;
		let size = self.observed_size(&element, box_model);
		let watch = self.watches.get_mut(&id)?;
		if watch.last_size == Some(size) {
			return None;
		}
		watch.last_size = Some(size);
		Some(element.entry(id))
	}

	fn send(&self, batch: Vec<ResizeEntry>) -> usize {
		let count = batch.len();
		if count == 0 {
			return 0;
		}
		match &self.sender {
			Some(sender) => {
				if sender.send(batch).is_err() {
					trace!("Resize batch dropped: observer is gone");
				}
			}
			None => trace!("Resize batch dropped: no backend attached"),
		}
		count
	}
}

/// Cloneable handle to a shared element host
#[derive(Debug, Clone)]
pub struct MemoryHost {
	state: Arc<Mutex<HostState>>,
}

impl Default for MemoryHost {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryHost {
	pub fn new() -> Self {
		Self::with_device_pixel_ratio(1.0)
	}

	pub fn with_device_pixel_ratio(device_pixel_ratio: f64) -> Self {
		Self {
			state: Arc::new(Mutex::new(HostState {
				next_id: 1,
				device_pixel_ratio,
				elements: HashMap::new(),
				watches: HashMap::new(),
				observe_calls: HashMap::new(),
				unobserve_calls: HashMap::new(),
				sender: None,
			})),
		}
	}

	/// Attach a batch channel and return the backend half of this host.
	///
	/// A host serves one backend at a time. Attaching fails while a previous
	/// backend's channel is still open; once its observer is gone the host can
	/// be attached again.
	pub fn backend(&self, sender: BatchSender<ResizeEntry>) -> Result<MemoryBackend> {
		let mut state = self.state.lock();
		if state.sender.as_ref().is_some_and(|attached| !attached.is_closed()) {
			return Err(ObserverError::backend(
				"attach",
				"memory host",
				"host already serves a live backend",
			));
		}
		state.sender = Some(sender);
		Ok(MemoryBackend { host: self.clone() })
	}

	/// Add an element with the given content rect and no border or padding
	pub fn insert_element(&self, rect: Rect) -> ElementId {
		let mut state = self.state.lock();
		let id = ElementId(state.next_id);
		state.next_id += 1;
		state.elements.insert(id, Element { rect, inset: 0.0 });
		id
	}

	/// Remove an element's geometry. Watches on it stay in place.
	pub fn remove_element(&self, id: ElementId) -> bool {
		self.state.lock().elements.remove(&id).is_some()
	}

	pub fn rect(&self, id: ElementId) -> Option<Rect> {
		self.state.lock().elements.get(&id).map(|e| e.rect)
	}

	/// Replace an element's content rect; returns the number of entries raised
	pub fn set_rect(&self, id: ElementId, rect: Rect) -> usize {
		self.apply_batch([(id, rect)])
	}

	/// Change an element's content size, keeping its position
	pub fn resize(&self, id: ElementId, width: f64, height: f64) -> usize {
		let Some(current) = self.rect(id) else {
			debug!("Resize of unknown {} ignored", id);
			return 0;
		};
		self.set_rect(id, Rect::new(current.x, current.y, width, height))
	}

	/// Change the border plus padding thickness on every side of an element
	pub fn set_inset(&self, id: ElementId, inset: f64) -> usize {
		let mut state = self.state.lock();
		let Some(element) = state.elements.get_mut(&id) else {
			return 0;
		};
		element.inset = inset;
		let batch: Vec<_> = state.collect_change(id).into_iter().collect();
		state.send(batch)
	}

	/// Apply several rect updates and report their changes as one batch
	pub fn apply_batch(&self, updates: impl IntoIterator<Item = (ElementId, Rect)>) -> usize {
		let mut state = self.state.lock();
		let mut batch = Vec::new();
		for (id, rect) in updates {
			match state.elements.get_mut(&id) {
				Some(element) => element.rect = rect,
				None => {
					debug!("Update of unknown {} ignored", id);
					continue;
				}
			}
			// Later updates to the same element in one batch replace the earlier entry
			batch.retain(|entry: &ResizeEntry| entry.target != id);
			if let Some(entry) = state.collect_change(id) {
				batch.push(entry);
			}
		}
		state.send(batch)
	}

	/// Send entries as-is, whether or not their targets are watched
	pub fn raise_batch(&self, entries: Vec<ResizeEntry>) -> usize {
		self.state.lock().send(entries)
	}

	pub fn is_watching(&self, id: ElementId) -> bool {
		self.state.lock().watches.contains_key(&id)
	}

	pub fn active_watches(&self) -> usize {
		self.state.lock().watches.len()
	}

	pub fn observe_calls(&self, id: ElementId) -> usize {
		self.state.lock().observe_calls.get(&id).copied().unwrap_or(0)
	}

	pub fn unobserve_calls(&self, id: ElementId) -> usize {
		self.state.lock().unobserve_calls.get(&id).copied().unwrap_or(0)
	}
}

/// Backend half of a [`MemoryHost`]
#[derive(Debug)]
pub struct MemoryBackend {
	host: MemoryHost,
}

impl MemoryBackend {
	pub fn host(&self) -> &MemoryHost {
		&self.host
	}
}

impl WatchBackend for MemoryBackend {
	type Event = ResizeEntry;
	type Options = ObserveOptions;

	fn observe(&mut self, target: &ElementId, options: Option<&ObserveOptions>) -> Result<()> {
		let mut state = self.host.state.lock();
		*state.observe_calls.entry(*target).or_default() += 1;

		let box_model = options.copied().unwrap_or_default().box_model;
		state.watches.insert(*target, Watch { box_model, last_size: None });
		debug!("Host watching {} ({:?})", target, box_model);

		// Initial observation, like a host resize watcher reports on observe
		let batch: Vec<_> = state.collect_change(*target).into_iter().collect();
		state.send(batch);
		Ok(())
	}

	fn unobserve(&mut self, target: &ElementId) -> Result<()> {
		let mut state = self.host.state.lock();
		*state.unobserve_calls.entry(*target).or_default() += 1;

		if state.watches.remove(target).is_none() {
			return Err(ObserverError::backend("unobserve", target, "target is not watched"));
		}
		debug!("Host stopped watching {}", target);
		Ok(())
	}
}
