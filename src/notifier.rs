use crate::event::{Event, EventKind, EventSink};
use std::{cell::RefCell, collections::HashMap, rc::Rc};

/// A registered callback. Identity (for [`Notifier::off`]) is the allocation
/// behind the handle, so clones of the same handle compare equal while two
/// handles wrapping identical closures do not.
#[derive(Clone)]
pub struct ListenerHandle(Rc<dyn Fn(&Event)>);

impl ListenerHandle {
	pub fn new<F>(callback: F) -> Self
	where
		F: Fn(&Event) + 'static,
	{
		Self(Rc::new(callback))
	}

	fn call(&self, event: &Event) {
		(self.0)(event);
	}
}

impl PartialEq for ListenerHandle {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

/// In-process publish/subscribe register. Listeners for one event kind are
/// invoked synchronously, in registration order. Clones share one registry.
#[derive(Clone, Default)]
pub struct Notifier {
	listeners: Rc<RefCell<HashMap<EventKind, Vec<ListenerHandle>>>>,
}

impl Notifier {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends the handle to the listener sequence for `kind`. Registering
	/// the same handle twice yields two invocations per dispatch.
	pub fn on(&self, kind: EventKind, handle: &ListenerHandle) {
		let mut listeners = self.listeners.borrow_mut();
		listeners.entry(kind).or_default().push(handle.clone());
	}

	/// Removes the first occurrence of the handle for `kind`; a handle that
	/// was never registered is a no-op.
	pub fn off(&self, kind: EventKind, handle: &ListenerHandle) {
		let mut listeners = self.listeners.borrow_mut();
		let Some(registered) = listeners.get_mut(&kind) else {
			return;
		};
		if let Some(index) = registered.iter().position(|entry| entry == handle) {
			registered.remove(index);
		}
	}

	/// Delivers the event to every listener registered for its kind at the
	/// moment of dispatch. Iteration runs over a snapshot, so a listener
	/// that registers or removes listeners mid-dispatch cannot disturb the
	/// current delivery.
	pub fn dispatch(&self, event: &Event) {
		let snapshot = {
			let listeners = self.listeners.borrow();
			listeners.get(&event.kind()).cloned().unwrap_or_default()
		};
		log::trace!(target: "auth", "Dispatching {} to {} listener(s)", event.kind(), snapshot.len());
		for listener in &snapshot {
			listener.call(event);
		}
	}

	/// Adapts this notifier into the single sink an adapter reports through.
	pub fn sink(&self) -> EventSink {
		let notifier = self.clone();
		Rc::new(move |event| notifier.dispatch(&event))
	}
}
