//! Event bus for broadcasting order-flow events.
//!
//! Listeners register for an event name with [`EventBus::on`] and are invoked
//! synchronously, in registration order, whenever a matching event is
//! published. Every event is also broadcast to async subscribers obtained
//! through [`EventBus::subscribe`].

use orderflow_types::MarketEvent;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Callback invoked for every published event with a matching name.
pub type Listener = Arc<dyn Fn(&MarketEvent) + Send + Sync>;

/// Identifies a registered listener so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ListenerTable = HashMap<String, Vec<(ListenerId, Listener)>>;

/// Process-wide publish/subscribe channel.
///
/// Cloning the bus yields another handle to the same channel.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<MarketEvent>,
	listeners: Arc<RwLock<ListenerTable>>,
	next_id: Arc<AtomicU64>,
}

impl EventBus {
	/// Creates a bus whose async subscribers buffer up to `capacity` events.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity.max(1));
		Self {
			sender,
			listeners: Arc::new(RwLock::new(HashMap::new())),
			next_id: Arc::new(AtomicU64::new(1)),
		}
	}

	/// Registers `listener` for events named `event_name`.
	pub fn on<F>(&self, event_name: &str, listener: F) -> ListenerId
	where
		F: Fn(&MarketEvent) + Send + Sync + 'static,
	{
		let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
		self.listeners
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.entry(event_name.to_string())
			.or_default()
			.push((id, Arc::new(listener)));
		id
	}

	/// Removes a listener. Returns false if it was not registered.
	pub fn off(&self, event_name: &str, id: ListenerId) -> bool {
		let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
		let Some(registered) = listeners.get_mut(event_name) else {
			return false;
		};
		let before = registered.len();
		registered.retain(|(listener_id, _)| *listener_id != id);
		let removed = registered.len() != before;
		if registered.is_empty() {
			listeners.remove(event_name);
		}
		removed
	}

	pub fn listener_count(&self, event_name: &str) -> usize {
		self.listeners
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.get(event_name)
			.map_or(0, Vec::len)
	}

	/// Creates an async subscriber receiving every event published from now on.
	pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event and returns the number of deliveries made.
	///
	/// Listeners run outside the table lock, so they may publish or
	/// (un)register re-entrantly. A panicking listener is logged and skipped.
	pub fn publish(&self, event: MarketEvent) -> usize {
		let name = event.name();
		let listeners: Vec<Listener> = self
			.listeners
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.get(name)
			.map(|registered| registered.iter().map(|(_, l)| Arc::clone(l)).collect())
			.unwrap_or_default();

		// Broadcast first so subscribers see events in causal order even when a
		// listener publishes re-entrantly. No async subscribers is not an error.
		let mut delivered = self.sender.send(event.clone()).unwrap_or(0);
		for listener in listeners {
			match catch_unwind(AssertUnwindSafe(|| listener(&event))) {
				Ok(()) => delivered += 1,
				Err(_) => tracing::warn!(event = name, "Event listener panicked"),
			}
		}

		delivered
	}

	/// Alias of [`EventBus::publish`].
	pub fn trigger(&self, event: MarketEvent) -> usize {
		self.publish(event)
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(1024)
	}
}
