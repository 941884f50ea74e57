use super::{BatchSender, WatchBackend};
use crate::config::FileWatchConfig;
use crate::error::{ObserverError, Result};
use crate::events::FileSizeEvent;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Per-observation options for [`FileSizeBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileWatchOptions {
	/// Send the file's current length as soon as the watch is established
	pub report_initial: bool,
}

impl Default for FileWatchOptions {
	fn default() -> Self {
		Self { report_initial: true }
	}
}

#[derive(Debug)]
struct TrackedFile {
	target: PathBuf,
	len: u64,
}

type TrackedFiles = Arc<Mutex<HashMap<PathBuf, TrackedFile>>>;

/// Watches file lengths with a single notify watcher.
///
/// Targets are paths as the caller spelled them; internally every watch is
/// keyed by the canonical path so notify's reported paths can be matched back.
pub struct FileSizeBackend {
	watcher: RecommendedWatcher,
	tracked: TrackedFiles,
	canonical: HashMap<PathBuf, PathBuf>,
	sender: BatchSender<FileSizeEvent>,
}

impl FileSizeBackend {
	pub fn new(config: FileWatchConfig, sender: BatchSender<FileSizeEvent>) -> Result<Self> {
		config.validate()?;

		let tracked: TrackedFiles = Arc::new(Mutex::new(HashMap::new()));
		let callback_tracked = Arc::clone(&tracked);
		let callback_sender = sender.clone();

		let watcher = RecommendedWatcher::new(
			move |result: notify::Result<Event>| match result {
				Ok(event) => Self::process_notify_event(&callback_tracked, &callback_sender, event),
				Err(e) => warn!("Notify error: {}", e),
			},
			Config::default().with_poll_interval(config.poll_interval),
		)?;

		Ok(Self { watcher, tracked, canonical: HashMap::new(), sender })
	}

	/// Number of files currently watched
	pub fn watched_files(&self) -> usize {
		self.canonical.len()
	}

	/// Turn one notify event into a batch of length changes
	fn process_notify_event(
		tracked: &TrackedFiles,
		sender: &BatchSender<FileSizeEvent>,
		event: Event,
	) {
		trace!("Received notify event: {:?}", event);

		let mut tracked = tracked.lock();
		let mut batch = Vec::new();
		for path in &event.paths {
			let key = std::fs::canonicalize(path).unwrap_or_else(|_| path.clone());
			let Some(file) = tracked.get_mut(&key) else {
				continue;
			};
			let len = match std::fs::metadata(&key) {
				Ok(metadata) => metadata.len(),
				Err(e) => {
					debug!("Cannot stat {:?}: {}", key, e);
					continue;
				}
			};
			if len == file.len {
				continue;
			}
			let previous = file.len;
			file.len = len;
			batch.push(FileSizeEvent::new(file.target.clone(), len, Some(previous)));
		}

		if !batch.is_empty() && sender.send(batch).is_err() {
			trace!("File size batch dropped: observer is gone");
		}
	}
}

impl WatchBackend for FileSizeBackend {
	type Event = FileSizeEvent;
	type Options = FileWatchOptions;

	fn observe(&mut self, target: &PathBuf, options: Option<&FileWatchOptions>) -> Result<()> {
		let canonical = std::fs::canonicalize(target)?;
		if self.tracked.lock().contains_key(&canonical) {
			return Err(ObserverError::backend(
				"observe",
				target,
				"file is already watched under another path",
			));
		}
		let len = std::fs::metadata(&canonical)?.len();

		// The tracked lock must not be held here: notify's event thread takes it
		self.watcher.watch(&canonical, RecursiveMode::NonRecursive)?;

		self.tracked
			.lock()
			.insert(canonical.clone(), TrackedFile { target: target.clone(), len });
		self.canonical.insert(target.clone(), canonical);
		debug!("Watching file size of {:?} ({} bytes)", target, len);

		if options.copied().unwrap_or_default().report_initial
			&& self.sender.send(vec![FileSizeEvent::new(target.clone(), len, None)]).is_err()
		{
			trace!("Initial file size dropped: observer is gone");
		}
		Ok(())
	}

	fn unobserve(&mut self, target: &PathBuf) -> Result<()> {
		let Some(canonical) = self.canonical.remove(target) else {
			return Err(ObserverError::backend("unobserve", target, "file is not watched"));
		};
		self.tracked.lock().remove(&canonical);
		self.watcher.unwatch(&canonical)?;
		debug!("Stopped watching {:?}", target);
		Ok(())
	}
}
