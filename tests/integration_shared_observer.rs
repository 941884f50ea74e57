// Integration tests for the shared observer over an in-process element host
// Tests the public API using only public interfaces

use shared_observer::{
	ChangeHandler, ElementId, HandlerRef, MemoryBackend, MemoryHost, ObserveOptions, ObserverConfig,
	Rect, ResizeEntry, SharedObserver,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

mod common;

use common::{handler, setup_observer, wait_for_dispatch, ResizeProbe};

#[tokio::test(start_paused = true)]
async fn test_resize_reaches_every_registered_handler() {
	let (host, observer) = setup_observer();
	let target = host.insert_element(Rect::sized(100.0, 100.0));

	let a = ResizeProbe::new();
	observer.add_observer(handler(&a), target, None).unwrap();
	wait_for_dispatch().await;
	assert_eq!(a.calls(), 1, "initial observation");
	assert_eq!(a.last_width(), Some(100.0));

	host.resize(target, 50.0, 100.0);
	wait_for_dispatch().await;
	assert_eq!(a.calls(), 2);
	assert_eq!(a.last_width(), Some(50.0));

	let b = ResizeProbe::new();
	observer.add_observer(handler(&b), target, None).unwrap();
	host.resize(target, 75.0, 100.0);
	wait_for_dispatch().await;
	assert_eq!(a.calls(), 3);
	assert_eq!(b.calls(), 1);
	assert_eq!(a.last_width(), Some(75.0));
	assert_eq!(b.last_width(), Some(75.0));
}

#[tokio::test(start_paused = true)]
async fn test_target_watched_once_per_registration_lifetime() {
	let (host, observer) = setup_observer();
	let target = host.insert_element(Rect::sized(100.0, 100.0));
	let probes: Vec<_> = (0..5).map(|_| ResizeProbe::new()).collect();

	for probe in &probes {
		observer.add_observer(handler(probe), target, None).unwrap();
	}
	assert_eq!(host.observe_calls(target), 1);
	assert_eq!(observer.handler_count(&target), 5);

	for probe in &probes {
		observer.remove_observer(&handler(probe), &target);
		let remaining = observer.handler_count(&target);
		let expected_unobserves = if remaining == 0 { 1 } else { 0 };
		assert_eq!(host.unobserve_calls(target), expected_unobserves);
	}
	assert!(!observer.is_observing(&target));
	assert!(!host.is_watching(target));

	// A second 0 -> 1 -> 0 cycle watches and unwatches once more
	observer.add_observer(handler(&probes[0]), target, None).unwrap();
	observer.add_observer(handler(&probes[1]), target, None).unwrap();
	observer.remove_observer(&handler(&probes[0]), &target);
	observer.remove_observer(&handler(&probes[1]), &target);
	assert_eq!(host.observe_calls(target), 2);
	assert_eq!(host.unobserve_calls(target), 2);
	assert_eq!(host.active_watches(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_one_event_notifies_each_handler_once() {
	let (host, observer) = setup_observer();
	let target = host.insert_element(Rect::sized(100.0, 100.0));
	let probes: Vec<_> = (0..8).map(|_| ResizeProbe::new()).collect();
	for probe in &probes {
		observer.add_observer(handler(probe), target, None).unwrap();
	}
	wait_for_dispatch().await;
	probes.iter().for_each(|p| p.clear());
	let before = observer.stats();

	host.resize(target, 60.0, 100.0);
	wait_for_dispatch().await;

	for probe in &probes {
		assert_eq!(probe.calls(), 1);
	}
	let after = observer.stats();
	assert_eq!(after.notifications - before.notifications, 8);
	assert_eq!(after.events_dispatched - before.events_dispatched, 1);
	assert_eq!(after.registrations, 8);
	assert_eq!(after.watched_targets, 1);
}

#[tokio::test(start_paused = true)]
async fn test_adding_same_pair_twice_notifies_once() {
	let (host, observer) = setup_observer();
	let target = host.insert_element(Rect::sized(100.0, 100.0));
	let probe = ResizeProbe::new();

	observer.add_observer(handler(&probe), target, None).unwrap();
	wait_for_dispatch().await;
	assert_eq!(probe.calls(), 1);

	observer.add_observer(handler(&probe), target, None).unwrap();
	wait_for_dispatch().await;
	assert_eq!(probe.calls(), 1);
	assert_eq!(observer.handler_count(&target), 1);

	host.resize(target, 50.0, 100.0);
	wait_for_dispatch().await;
	assert_eq!(probe.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_removing_one_of_two_handlers_keeps_watch() {
	let (host, observer) = setup_observer();
	let target = host.insert_element(Rect::sized(100.0, 100.0));
	let (a, b) = (ResizeProbe::new(), ResizeProbe::new());
	observer.add_observer(handler(&a), target, None).unwrap();
	observer.add_observer(handler(&b), target, None).unwrap();
	wait_for_dispatch().await;
	assert_eq!(a.calls() + b.calls(), 2);

	observer.remove_observer(&handler(&a), &target);
	assert_eq!(host.unobserve_calls(target), 0);
	assert!(observer.is_observing(&target));

	host.resize(target, 50.0, 100.0);
	wait_for_dispatch().await;
	assert_eq!(a.calls(), 1);
	assert_eq!(b.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_removing_unknown_pair_is_harmless() {
	let (host, observer) = setup_observer();
	let target = host.insert_element(Rect::sized(100.0, 100.0));
	let (registered, stranger) = (ResizeProbe::new(), ResizeProbe::new());

	observer.remove_observer(&handler(&stranger), &target);
	observer.remove_observer(&handler(&stranger), &ElementId(9999));
	assert_eq!(host.unobserve_calls(target), 0);

	observer.add_observer(handler(&registered), target, None).unwrap();
	observer.remove_observer(&handler(&stranger), &target);
	host.resize(target, 75.0, 100.0);
	wait_for_dispatch().await;

	assert_eq!(stranger.calls(), 0);
	assert_eq!(registered.last_width(), Some(75.0));
	assert_eq!(host.unobserve_calls(target), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_clears_all_watches() {
	let (host, observer) = setup_observer();
	let first = host.insert_element(Rect::sized(100.0, 100.0));
	let second = host.insert_element(Rect::sized(20.0, 20.0));
	let probe = ResizeProbe::new();
	observer.add_observer(handler(&probe), first, None).unwrap();
	observer.add_observer(handler(&probe), second, None).unwrap();
	wait_for_dispatch().await;
	assert_eq!(probe.calls(), 2);

	observer.shutdown();
	assert_eq!(host.active_watches(), 0);
	assert_eq!(host.unobserve_calls(first), 1);
	assert_eq!(host.unobserve_calls(second), 1);
	assert!(observer.watched_targets().is_empty());

	host.resize(first, 75.0, 100.0);
	host.raise_batch(vec![ResizeEntry::new(second, Rect::sized(1.0, 1.0), 0.0)]);
	wait_for_dispatch().await;
	assert_eq!(probe.calls(), 2);

	observer.shutdown();
	assert_eq!(host.unobserve_calls(first), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_dispatch() {
	let (host, observer) = setup_observer();
	let target = host.insert_element(Rect::sized(100.0, 100.0));
	let probe = ResizeProbe::new();
	observer.add_observer(handler(&probe), target, None).unwrap();
	wait_for_dispatch().await;

	// The batch is queued but its frame has not come yet
	host.resize(target, 50.0, 100.0);
	observer.shutdown();
	wait_for_dispatch().await;

	assert_eq!(probe.calls(), 1);
	assert_eq!(observer.stats().events_dropped, 1);
}

#[tokio::test(start_paused = true)]
async fn test_removal_before_frame_boundary_prevents_delivery() {
	let (host, observer) = setup_observer();
	let target = host.insert_element(Rect::sized(100.0, 100.0));
	let (leaving, staying) = (ResizeProbe::new(), ResizeProbe::new());
	observer.add_observer(handler(&leaving), target, None).unwrap();
	observer.add_observer(handler(&staying), target, None).unwrap();
	wait_for_dispatch().await;

	host.resize(target, 50.0, 100.0);
	observer.remove_observer(&handler(&leaving), &target);
	wait_for_dispatch().await;

	assert_eq!(leaving.calls(), 1);
	assert_eq!(staying.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_removal_after_dispatch_keeps_delivered_event() {
	let (host, observer) = setup_observer();
	let target = host.insert_element(Rect::sized(100.0, 100.0));
	let probe = ResizeProbe::new();
	observer.add_observer(handler(&probe), target, None).unwrap();

	host.resize(target, 50.0, 100.0);
	wait_for_dispatch().await;
	observer.remove_observer(&handler(&probe), &target);
	host.resize(target, 75.0, 100.0);
	wait_for_dispatch().await;

	// Initial observation and the resize to 50 land in the same cycle
	assert_eq!(probe.calls(), 2);
	assert_eq!(probe.last_width(), Some(50.0));
	assert_eq!(host.unobserve_calls(target), 1);
}

#[tokio::test(start_paused = true)]
async fn test_events_for_untracked_targets_are_dropped() {
	let (host, observer) = setup_observer();
	let tracked = host.insert_element(Rect::sized(100.0, 100.0));
	let probe = ResizeProbe::new();
	observer.add_observer(handler(&probe), tracked, None).unwrap();
	wait_for_dispatch().await;

	host.raise_batch(vec![
		ResizeEntry::new(ElementId(4242), Rect::sized(1.0, 1.0), 0.0),
		ResizeEntry::new(tracked, Rect::sized(30.0, 30.0), 0.0),
	]);
	wait_for_dispatch().await;

	assert_eq!(probe.calls(), 2);
	assert_eq!(probe.last_width(), Some(30.0));
	assert_eq!(observer.stats().events_dropped, 1);
}

#[tokio::test(start_paused = true)]
async fn test_batch_dispatched_in_reported_order() {
	let (host, observer) = setup_observer();
	let a = host.insert_element(Rect::sized(10.0, 10.0));
	let b = host.insert_element(Rect::sized(10.0, 10.0));
	let c = host.insert_element(Rect::sized(10.0, 10.0));
	let probe = ResizeProbe::new();
	for target in [a, b, c] {
		observer.add_observer(handler(&probe), target, None).unwrap();
	}
	wait_for_dispatch().await;
	probe.clear();

	host.apply_batch([
		(c, Rect::sized(11.0, 10.0)),
		(a, Rect::sized(12.0, 10.0)),
		(b, Rect::sized(13.0, 10.0)),
	]);
	wait_for_dispatch().await;

	assert_eq!(probe.targets(), vec![c, a, b]);
}

#[tokio::test(start_paused = true)]
async fn test_batches_before_frame_share_one_cycle() {
	let (host, observer) = setup_observer();
	let target = host.insert_element(Rect::sized(100.0, 100.0));
	let probe = ResizeProbe::new();
	observer.add_observer(handler(&probe), target, None).unwrap();
	wait_for_dispatch().await;
	let cycles_before = observer.stats().dispatch_cycles;

	host.resize(target, 50.0, 100.0);
	host.resize(target, 60.0, 100.0);
	host.resize(target, 70.0, 100.0);
	wait_for_dispatch().await;

	let stats = observer.stats();
	assert_eq!(stats.dispatch_cycles, cycles_before + 1);
	assert_eq!(probe.calls(), 4);
	assert_eq!(probe.last_width(), Some(70.0));
}

#[tokio::test(start_paused = true)]
async fn test_options_only_apply_to_first_registration() {
	let (host, observer) = setup_observer();
	let target = host.insert_element(Rect::sized(100.0, 100.0));
	let (content, border) = (ResizeProbe::new(), ResizeProbe::new());

	observer.add_observer(handler(&content), target, None).unwrap();
	observer
		.add_observer(handler(&border), target, Some(ObserveOptions::border_box()))
		.unwrap();
	wait_for_dispatch().await;
	content.clear();
	border.clear();

	// The active watch tracks the content box, so a border change goes unreported
	host.set_inset(target, 5.0);
	wait_for_dispatch().await;
	assert_eq!(border.calls(), 0);
	assert_eq!(host.observe_calls(target), 1);
}

#[tokio::test(start_paused = true)]
async fn test_next_tick_dispatch() {
	let host = MemoryHost::new();
	let observer = SharedObserver::for_host(ObserverConfig::next_tick(), &host).unwrap();
	let target = host.insert_element(Rect::sized(100.0, 100.0));
	let probe = ResizeProbe::new();

	observer.add_observer(handler(&probe), target, None).unwrap();
	host.resize(target, 40.0, 100.0);
	wait_for_dispatch().await;

	assert_eq!(probe.calls(), 2);
	assert_eq!(probe.last_width(), Some(40.0));
}

/// Unregisters itself from inside its first notification
struct RemovesItself {
	observer: Weak<SharedObserver<MemoryBackend>>,
	me: OnceLock<HandlerRef<ResizeEntry>>,
	target: ElementId,
	calls: AtomicUsize,
}

impl ChangeHandler<ResizeEntry> for RemovesItself {
	fn handle_change(&self, _event: &ResizeEntry) {
		self.calls.fetch_add(1, Ordering::SeqCst);
		if let (Some(observer), Some(me)) = (self.observer.upgrade(), self.me.get()) {
			observer.remove_observer(me, &self.target);
		}
	}
}

#[tokio::test(start_paused = true)]
async fn test_handler_can_unregister_during_dispatch() {
	let (host, observer) = setup_observer();
	let target = host.insert_element(Rect::sized(100.0, 100.0));
	let handler_impl = Arc::new(RemovesItself {
		observer: Arc::downgrade(&observer),
		me: OnceLock::new(),
		target,
		calls: AtomicUsize::new(0),
	});
	let me: HandlerRef<ResizeEntry> = handler_impl.clone();
	let _ = handler_impl.me.set(me.clone());

	observer.add_observer(me, target, None).unwrap();
	wait_for_dispatch().await;
	host.resize(target, 10.0, 10.0);
	wait_for_dispatch().await;

	assert_eq!(handler_impl.calls.load(Ordering::SeqCst), 1);
	assert!(!observer.is_observing(&target));
	assert_eq!(host.unobserve_calls(target), 1);
}

#[tokio::test(start_paused = true)]
async fn test_independent_observers_do_not_share_tables() {
	let host_a = MemoryHost::new();
	let host_b = MemoryHost::new();
	let observer_a = SharedObserver::for_host(ObserverConfig::default(), &host_a).unwrap();
	let observer_b = SharedObserver::for_host(ObserverConfig::default(), &host_b).unwrap();
	let target = host_a.insert_element(Rect::sized(10.0, 10.0));
	let probe = ResizeProbe::new();

	observer_a.add_observer(handler(&probe), target, None).unwrap();

	assert_ne!(observer_a.id(), observer_b.id());
	assert!(observer_a.is_observing(&target));
	assert!(!observer_b.is_observing(&target));
}

#[tokio::test(start_paused = true)]
async fn test_host_serves_one_observer_at_a_time() {
	let (host, observer) = setup_observer();
	let target = host.insert_element(Rect::sized(100.0, 100.0));
	let probe = ResizeProbe::new();
	observer.add_observer(handler(&probe), target, None).unwrap();

	let second = SharedObserver::for_host(ObserverConfig::default(), &host);

	assert!(matches!(second, Err(shared_observer::ObserverError::Backend { .. })));
	host.resize(target, 50.0, 100.0);
	wait_for_dispatch().await;
	assert_eq!(probe.last_width(), Some(50.0));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_observer_releases_watches() {
	let (host, observer) = setup_observer();
	let target = host.insert_element(Rect::sized(100.0, 100.0));
	let probe = ResizeProbe::new();
	observer.add_observer(handler(&probe), target, None).unwrap();
	wait_for_dispatch().await;

	drop(observer);
	assert_eq!(host.active_watches(), 0);
	assert!(!host.is_watching(target));
	assert_eq!(host.unobserve_calls(target), 1);

	host.resize(target, 50.0, 100.0);
	host.raise_batch(vec![ResizeEntry::new(target, Rect::sized(60.0, 100.0), 0.0)]);
	wait_for_dispatch().await;

	assert_eq!(probe.calls(), 1);
}

/// Panics on its first notification only
struct PanicsOnce {
	calls: AtomicUsize,
}

impl ChangeHandler<ResizeEntry> for PanicsOnce {
	fn handle_change(&self, _event: &ResizeEntry) {
		if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
			panic!("layout callback failed");
		}
	}
}

#[tokio::test(start_paused = true)]
async fn test_panicking_handler_leaves_other_targets_served() {
	let (host, observer) = setup_observer();
	let faulty = host.insert_element(Rect::sized(100.0, 100.0));
	let healthy = host.insert_element(Rect::sized(100.0, 100.0));
	let panics = Arc::new(PanicsOnce { calls: AtomicUsize::new(0) });
	let probe = ResizeProbe::new();

	observer.add_observer(panics.clone(), faulty, None).unwrap();
	wait_for_dispatch().await;
	observer.add_observer(handler(&probe), healthy, None).unwrap();
	host.resize(healthy, 40.0, 100.0);
	host.resize(faulty, 30.0, 100.0);
	wait_for_dispatch().await;

	assert_eq!(probe.last_width(), Some(40.0));
	assert_eq!(probe.calls(), 2);
	assert_eq!(panics.calls.load(Ordering::SeqCst), 2);
	assert_eq!(observer.stats().handler_panics, 1);
}
