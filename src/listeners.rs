//! Callback registries with disposable [`Subscription`] handles.

use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashMap;
use std::rc::{Rc, Weak};
use tracing::{trace, warn};

type Callback<T> = Rc<RefCell<dyn FnMut(&T)>>;

struct Registry<T: ?Sized> {
	next_id: u64,
	callbacks: HashMap<u64, Callback<T>>,
}

/// A set of callbacks that are all invoked by [`Listeners::emit`], in subscription order.
///
/// Clones share the same set.
pub struct Listeners<T: 'static> {
	registry: Rc<RefCell<Registry<T>>>,
}

impl<T: 'static> Clone for Listeners<T> {
	fn clone(&self) -> Self {
		Self {
			registry: Rc::clone(&self.registry),
		}
	}
}

impl<T: 'static> Default for Listeners<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: 'static> Debug for Listeners<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Listeners").field("len", &self.len()).finish()
	}
}

impl<T: 'static> Listeners<T> {
	#[must_use]
	pub fn new() -> Self {
		Self {
			registry: Rc::new(RefCell::new(Registry {
				next_id: 0,
				callbacks: HashMap::new(),
			})),
		}
	}

	/// Registers `callback` until the returned [`Subscription`] is disposed or dropped.
	pub fn subscribe(&self, callback: impl FnMut(&T) + 'static) -> Subscription {
		let id = {
			let mut registry = self.registry.borrow_mut();
			let id = registry.next_id;
			registry.next_id += 1;
			registry.callbacks.insert(id, Rc::new(RefCell::new(callback)));
			id
		};
		trace!(id, "Subscribed listener.");

		let registry: Weak<RefCell<Registry<T>>> = Rc::downgrade(&self.registry);
		Subscription::new(move || {
			if let Some(registry) = registry.upgrade() {
				registry.borrow_mut().callbacks.remove(&id);
				trace!(id, "Unsubscribed listener.");
			}
		})
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.registry.borrow().callbacks.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Calls every current listener with `value`.
	///
	/// Listeners may (un)subscribe while being called; such changes apply to the next emission.
	pub fn emit(&self, value: &T) {
		let mut callbacks: Vec<(u64, Callback<T>)> = self.registry.borrow().callbacks.iter().map(|(&id, callback)| (id, Rc::clone(callback))).collect();
		callbacks.sort_unstable_by_key(|&(id, _)| id);

		for (id, callback) in callbacks {
			match callback.try_borrow_mut() {
				Ok(mut callback) => (&mut *callback)(value),
				Err(_) => warn!(id, "Skipped re-entrant listener call."),
			}
		}
	}
}

/// Keeps a registration alive. Dropping it (or calling [`Subscription::dispose`]) unregisters.
#[must_use = "Dropping a `Subscription` unsubscribes immediately."]
pub struct Subscription {
	dispose: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
	pub fn new(dispose: impl FnOnce() + 'static) -> Self {
		Self {
			dispose: Some(Box::new(dispose)),
		}
	}

	pub fn dispose(mut self) {
		if let Some(dispose) = self.dispose.take() {
			dispose();
		}
	}

	/// Keeps the registration for the rest of the program.
	pub fn forget(mut self) {
		self.dispose = None;
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(dispose) = self.dispose.take() {
			dispose();
		}
	}
}

impl Debug for Subscription {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription").field("active", &self.dispose.is_some()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn emits_in_subscription_order_until_disposed() {
		let listeners = Listeners::<u32>::new();
		let seen = Rc::new(RefCell::new(Vec::new()));

		let first = {
			let seen = Rc::clone(&seen);
			listeners.subscribe(move |v| seen.borrow_mut().push(("first", *v)))
		};
		let second = {
			let seen = Rc::clone(&seen);
			listeners.subscribe(move |v| seen.borrow_mut().push(("second", *v)))
		};
		assert_eq!(listeners.len(), 2);

		listeners.emit(&1);
		first.dispose();
		listeners.emit(&2);
		drop(second);
		listeners.emit(&3);

		assert_eq!(*seen.borrow(), [("first", 1), ("second", 1), ("second", 2)]);
		assert!(listeners.is_empty());
	}

	#[test]
	fn forgotten_subscriptions_stay() {
		let listeners = Listeners::<()>::new();
		let count = Rc::new(RefCell::new(0));
		{
			let count = Rc::clone(&count);
			listeners.subscribe(move |()| *count.borrow_mut() += 1).forget();
		}
		listeners.emit(&());
		listeners.clone().emit(&());
		assert_eq!(*count.borrow(), 2);
	}

	#[test]
	fn disposing_after_registry_is_gone_is_harmless() {
		let listeners = Listeners::<()>::new();
		let subscription = listeners.subscribe(|()| ());
		drop(listeners);
		subscription.dispose();
	}
}
