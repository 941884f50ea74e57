use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;
use std::path::PathBuf;

/// A change notification that knows which target it belongs to.
///
/// The shared observer reads nothing from an event except its target; the
/// payload is forwarded to handlers untouched.
pub trait ChangeEvent: Send + 'static {
	type Target: Clone + Eq + Hash + Debug + Send + Sync + 'static;

	fn target(&self) -> &Self::Target;
}

/// Opaque handle to an element living in a [`crate::MemoryHost`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl std::fmt::Display for ElementId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "element#{}", self.0)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
	pub x: f64,
	pub y: f64,
	pub width: f64,
	pub height: f64,
}

impl Rect {
	pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
		Self { x, y, width, height }
	}

	/// A rect anchored at the origin
	pub fn sized(width: f64, height: f64) -> Self {
		Self::new(0.0, 0.0, width, height)
	}

	pub fn top(&self) -> f64 {
		self.y
	}

	pub fn left(&self) -> f64 {
		self.x
	}

	pub fn right(&self) -> f64 {
		self.x + self.width
	}

	pub fn bottom(&self) -> f64 {
		self.y + self.height
	}

	pub fn size(&self) -> BoxSize {
		BoxSize { inline_size: self.width, block_size: self.height }
	}
}

/// Box dimensions in a horizontal writing mode (inline = width, block = height)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoxSize {
	pub inline_size: f64,
	pub block_size: f64,
}

/// Which box of an element an observation tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BoxModel {
	#[default]
	ContentBox,
	BorderBox,
	DevicePixelContentBox,
}

/// Options passed through to the backend on the first registration for a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObserveOptions {
	pub box_model: BoxModel,
}

impl ObserveOptions {
	pub fn border_box() -> Self {
		Self { box_model: BoxModel::BorderBox }
	}
}

/// New geometry of an observed element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResizeEntry {
	pub target: ElementId,
	pub content_rect: Rect,
	pub content_box_size: BoxSize,
	pub border_box_size: BoxSize,
	pub observed_at: DateTime<Utc>,
}

impl ResizeEntry {
	/// Build an entry for an element whose border and padding add `inset` on every side
	pub fn new(target: ElementId, content_rect: Rect, inset: f64) -> Self {
		let content_box_size = content_rect.size();
		Self {
			target,
			content_rect,
			content_box_size,
			border_box_size: BoxSize {
				inline_size: content_box_size.inline_size + 2.0 * inset,
				block_size: content_box_size.block_size + 2.0 * inset,
			},
			observed_at: Utc::now(),
		}
	}

	pub fn to_json(&self) -> Result<String> {
		Ok(serde_json::to_string(self)?)
	}
}

impl ChangeEvent for ResizeEntry {
	type Target = ElementId;

	fn target(&self) -> &ElementId {
		&self.target
	}
}

/// New length of a watched file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSizeEvent {
	pub path: PathBuf,
	pub len: u64,
	pub previous_len: Option<u64>, // None for the initial observation
	pub timestamp: DateTime<Utc>,
}

impl FileSizeEvent {
	pub fn new(path: PathBuf, len: u64, previous_len: Option<u64>) -> Self {
		Self { path, len, previous_len, timestamp: Utc::now() }
	}

	pub fn is_initial(&self) -> bool {
		self.previous_len.is_none()
	}

	pub fn to_json(&self) -> Result<String> {
		Ok(serde_json::to_string(self)?)
	}
}

impl ChangeEvent for FileSizeEvent {
	type Target = PathBuf;

	fn target(&self) -> &PathBuf {
		&self.path
	}
}
