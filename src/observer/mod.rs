//! Shared observer: one watch backend multiplexed across many handlers
//!
//! # Module Organization
//!
//! - [`registry`] - target to handler-set table kept in lockstep with the backend's watches
//! - [`dispatch`] - frame-deferred delivery of backend batches
//! - [`hub`] - registration interface consumers depend on
//! - [`shared`] - the [`SharedObserver`] tying backend, table and dispatch task together
//! - [`stats`] - bookkeeping and dispatch counters

pub mod dispatch;
pub mod hub;
pub(crate) mod registry;
pub mod shared;
pub mod stats;

pub use dispatch::{FrameClock, FrameScheduler, NextTick};
pub use hub::ObserverHub;
pub use shared::SharedObserver;
pub use stats::ObserverStats;
