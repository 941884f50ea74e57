use crate::error::{ObserverError, Result};
use crate::observer::dispatch::{FrameClock, FrameScheduler, NextTick};
use std::time::Duration;

/// Frame period used when none is configured (about 60 Hz)
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// When a received batch is handed to handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchTiming {
	/// Wait for the next boundary of a fixed-period frame clock
	FrameInterval(Duration),
	/// Yield to the runtime once, for hosts without a frame concept
	NextTick,
}

/// Configuration for a shared observer
#[derive(Debug, Clone)]
pub struct ObserverConfig {
	pub dispatch: DispatchTiming,
}

impl Default for ObserverConfig {
	fn default() -> Self {
		Self { dispatch: DispatchTiming::FrameInterval(DEFAULT_FRAME_INTERVAL) }
	}
}

impl ObserverConfig {
	/// Create a configuration dispatching on a custom frame period
	pub fn with_frame_interval(frame_ms: u64) -> Self {
		Self { dispatch: DispatchTiming::FrameInterval(Duration::from_millis(frame_ms)) }
	}

	/// Create a configuration dispatching on the next runtime tick
	pub fn next_tick() -> Self {
		Self { dispatch: DispatchTiming::NextTick }
	}

	pub fn validate(&self) -> Result<()> {
		if let DispatchTiming::FrameInterval(period) = self.dispatch {
			if period.is_zero() {
				return Err(ObserverError::configuration_error(
					"frame_interval",
					"must be greater than zero",
				));
			}
		}
		Ok(())
	}

	pub(crate) fn scheduler(&self) -> Box<dyn FrameScheduler> {
		match self.dispatch {
			DispatchTiming::FrameInterval(period) => Box::new(FrameClock::new(period)),
			DispatchTiming::NextTick => Box::new(NextTick),
		}
	}
}

/// Configuration for the notify-backed file size watcher
#[derive(Debug, Clone)]
pub struct FileWatchConfig {
	/// Poll interval used when notify falls back to its polling watcher
	pub poll_interval: Duration,
}

impl Default for FileWatchConfig {
	fn default() -> Self {
		Self { poll_interval: Duration::from_millis(100) }
	}
}

impl FileWatchConfig {
	pub fn validate(&self) -> Result<()> {
		if self.poll_interval.is_zero() {
			return Err(ObserverError::configuration_error(
				"poll_interval",
				"must be greater than zero",
			));
		}
		Ok(())
	}
}
