use std::sync::Arc;

/// A consumer interested in change events for the targets it registers on.
///
/// Handlers are compared by identity: two registrations of the same
/// [`HandlerRef`] (or clones of it) for one target collapse into one.
pub trait ChangeHandler<E>: Send + Sync {
	fn handle_change(&self, event: &E);
}

/// Shared handle to a handler; its allocation address is its identity
pub type HandlerRef<E> = Arc<dyn ChangeHandler<E>>;

/// Identity key of a handler, stable for as long as any clone of it is alive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerKey(usize);

impl HandlerKey {
	pub fn of<E>(handler: &HandlerRef<E>) -> Self {
		// Thin data pointer only; vtable pointers are not unique per type
		Self(Arc::as_ptr(handler) as *const () as usize)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Noop;

	impl ChangeHandler<u32> for Noop {
		fn handle_change(&self, _event: &u32) {}
	}

	#[test]
	fn test_handler_identity_follows_allocation() {
		let a: HandlerRef<u32> = Arc::new(Noop);
		let a_clone = a.clone();
		let b: HandlerRef<u32> = Arc::new(Noop);

		assert_eq!(HandlerKey::of(&a), HandlerKey::of(&a_clone));
		assert_ne!(HandlerKey::of(&a), HandlerKey::of(&b));
	}
}
