//! Watch primitives the shared observer multiplexes
//!
//! A backend owns the expensive underlying watcher. The shared observer calls
//! [`WatchBackend::observe`] when a target gains its first handler and
//! [`WatchBackend::unobserve`] when it loses its last one; the backend reports
//! changes by sending batches through the [`BatchSender`] it was built with.
//!
//! - [`memory`] - in-process element host raising resize entries
//! - [`file_size`] - notify-driven file length watcher

pub mod file_size;
pub mod memory;

use crate::error::Result;
use crate::events::ChangeEvent;
use std::fmt::Debug;
use tokio::sync::mpsc;

/// Channel end a backend pushes change batches into
pub type BatchSender<E> = mpsc::UnboundedSender<Vec<E>>;

/// Channel end the dispatch task drains
pub type BatchReceiver<E> = mpsc::UnboundedReceiver<Vec<E>>;

/// Target type observed by a backend
pub type TargetOf<B> = <<B as WatchBackend>::Event as ChangeEvent>::Target;

pub trait WatchBackend: Send + 'static {
	type Event: ChangeEvent;
	type Options: Clone + Debug + Send + Sync + 'static;

	/// Start watching a target. Called at most once per active watch.
	fn observe(&mut self, target: &TargetOf<Self>, options: Option<&Self::Options>) -> Result<()>;

	/// Stop watching a target previously passed to `observe`.
	fn unobserve(&mut self, target: &TargetOf<Self>) -> Result<()>;
}

pub use file_size::FileSizeBackend;
pub use memory::{MemoryBackend, MemoryHost};
