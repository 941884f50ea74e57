use crate::error::Result;
use crate::events::ChangeEvent;
use crate::handler::HandlerRef;

/// The registration interface consumers depend on.
///
/// Consumers receive an explicitly constructed hub (usually an
/// `Arc<dyn ObserverHub<..>>`) so the real shared observer and test doubles
/// such as [`crate::MockSharedObserver`] are interchangeable.
pub trait ObserverHub<E: ChangeEvent, O>: Send + Sync {
	/// Register `handler` for change events on `target`
	fn add_observer(
		&self,
		handler: HandlerRef<E>,
		target: E::Target,
		options: Option<O>,
	) -> Result<()>;

	/// Unregister `handler` from `target`; unknown pairs are ignored
	fn remove_observer(&self, handler: &HandlerRef<E>, target: &E::Target);

	/// Drop every registration
	fn shutdown(&self);
}
