use super::dispatch::run_dispatch_loop;
use super::hub::ObserverHub;
use super::registry::Registry;
use super::stats::ObserverStats;
use crate::backend::{BatchSender, FileSizeBackend, MemoryBackend, MemoryHost, TargetOf, WatchBackend};
use crate::config::{FileWatchConfig, ObserverConfig};
use crate::error::{ObserverError, Result};
use crate::handler::HandlerRef;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// One watch backend shared by any number of handlers.
///
/// Each target is watched once no matter how many handlers register for it,
/// and every handler registered for a target is notified of each of its
/// change events, one frame boundary after the backend reported them.
///
/// Construct one explicitly and hand it (in an `Arc`) to every consumer that
/// needs change notifications. Must be created inside a tokio runtime, which
/// drives the dispatch task. Dropping the observer unwatches every target
/// still registered and stops that task.
pub struct SharedObserver<B: WatchBackend> {
	id: Uuid,
	registry: Arc<Mutex<Registry<B>>>,
	dispatcher: JoinHandle<()>,
}

impl<B: WatchBackend> SharedObserver<B> {
	/// Build the backend with the batch channel it reports into, and start dispatching.
	///
	/// Errors from `make_backend` are returned unchanged.
	pub fn new<F>(config: ObserverConfig, make_backend: F) -> Result<Self>
	where
		F: FnOnce(BatchSender<B::Event>) -> Result<B>,
	{
		config.validate()?;
		let runtime = tokio::runtime::Handle::try_current().map_err(|_| ObserverError::NoRuntime)?;

		let (batch_tx, batch_rx) = mpsc::unbounded_channel();
		let backend = make_backend(batch_tx)?;

		let id = Uuid::new_v4();
		let registry = Arc::new(Mutex::new(Registry::new(backend)));
		let dispatcher = runtime.spawn(run_dispatch_loop(
			id,
			Arc::clone(&registry),
			batch_rx,
			config.scheduler(),
		));

		info!("Shared observer {} started ({:?})", id, config.dispatch);
		Ok(Self { id, registry, dispatcher })
	}

	pub fn id(&self) -> Uuid {
		self.id
	}

	/// Register `handler` for change events on `target`.
	///
	/// The first registration for a target makes the backend watch it with
	/// `options`. While the target stays watched, options passed with later
	/// registrations are ignored (and logged at debug level); they only take
	/// effect once every handler has left and the target is registered anew.
	///
	/// Registering a pair that is already registered changes nothing. Fails
	/// only when the backend cannot watch a new target, in which case nothing
	/// is registered.
	pub fn add_observer(
		&self,
		handler: HandlerRef<B::Event>,
		target: TargetOf<B>,
		options: Option<B::Options>,
	) -> Result<()> {
		self.registry.lock().add(handler, target, options)
	}

	/// Unregister `handler` from `target`. Unknown pairs are ignored.
	///
	/// The backend stops watching the target when its last handler leaves.
	pub fn remove_observer(&self, handler: &HandlerRef<B::Event>, target: &TargetOf<B>) {
		self.registry.lock().remove(handler, target);
	}

	/// Stop watching every target and drop all registrations.
	///
	/// Batches already received but not yet dispatched deliver nothing
	/// afterwards: handlers are looked up at dispatch time.
	pub fn shutdown(&self) {
		let released = self.registry.lock().shutdown();
		if released > 0 {
			debug!("Shared observer {} released {} targets", self.id, released);
		}
	}

	pub fn is_observing(&self, target: &TargetOf<B>) -> bool {
		self.registry.lock().is_observing(target)
	}

	/// Number of distinct handlers registered for `target`
	pub fn handler_count(&self, target: &TargetOf<B>) -> usize {
		self.registry.lock().handler_count(target)
	}

	pub fn watched_targets(&self) -> Vec<TargetOf<B>> {
		self.registry.lock().watched_targets()
	}

	pub fn stats(&self) -> ObserverStats {
		self.registry.lock().stats()
	}

	/// Inspect the backend. Do not call back into this observer from `f`.
	pub fn with_backend<R>(&self, f: impl FnOnce(&B) -> R) -> R {
		f(self.registry.lock().backend())
	}
}

impl SharedObserver<MemoryBackend> {
	/// Share the watcher of an in-process element host.
	///
	/// Fails if another live observer is already attached to `host`.
	pub fn for_host(config: ObserverConfig, host: &MemoryHost) -> Result<Self> {
		Self::new(config, |batch_tx| host.backend(batch_tx))
	}
}

impl SharedObserver<FileSizeBackend> {
	/// Share one notify watcher reporting file length changes
	pub fn for_file_sizes(config: ObserverConfig, watch_config: FileWatchConfig) -> Result<Self> {
		Self::new(config, |batch_tx| FileSizeBackend::new(watch_config, batch_tx))
	}
}

impl<B: WatchBackend> ObserverHub<B::Event, B::Options> for SharedObserver<B> {
	fn add_observer(
		&self,
		handler: HandlerRef<B::Event>,
		target: TargetOf<B>,
		options: Option<B::Options>,
	) -> Result<()> {
		SharedObserver::add_observer(self, handler, target, options)
	}

	fn remove_observer(&self, handler: &HandlerRef<B::Event>, target: &TargetOf<B>) {
		SharedObserver::remove_observer(self, handler, target)
	}

	fn shutdown(&self) {
		SharedObserver::shutdown(self)
	}
}

impl<B: WatchBackend> Drop for SharedObserver<B> {
	fn drop(&mut self) {
		let released = self.registry.lock().shutdown();
		self.dispatcher.abort();
		debug!("Shared observer {} dropped, released {} targets", self.id, released);
	}
}
