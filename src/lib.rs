pub mod backend;
mod config;
mod error;
mod events;
mod handler;
pub mod mock;
pub mod observer;

pub use backend::file_size::FileWatchOptions;
pub use backend::{BatchSender, FileSizeBackend, MemoryBackend, MemoryHost, TargetOf, WatchBackend};
pub use config::{DispatchTiming, FileWatchConfig, ObserverConfig, DEFAULT_FRAME_INTERVAL};
pub use error::{ObserverError, Result};
pub use events::{
	BoxModel, BoxSize, ChangeEvent, ElementId, FileSizeEvent, ObserveOptions, Rect, ResizeEntry,
};
pub use handler::{ChangeHandler, HandlerKey, HandlerRef};
pub use mock::MockSharedObserver;
pub use observer::{FrameClock, FrameScheduler, NextTick, ObserverHub, ObserverStats, SharedObserver};
