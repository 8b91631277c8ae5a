//! User notification sinks.

use crate::engine::event_bus::EventBus;
use orderflow_types::{MarketEvent, Notification, NotificationLevel};

/// Delivers messages meant for the user.
pub trait Notifier: Send + Sync {
	fn notify(&self, notification: Notification);
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
	fn notify(&self, notification: Notification) {
		let header = notification.header.as_deref().unwrap_or_default();
		match notification.level {
			NotificationLevel::Error => tracing::error!(header, "{}", notification.message),
			NotificationLevel::Warning => tracing::warn!(header, "{}", notification.message),
			NotificationLevel::Success => tracing::info!(header, "{}", notification.message),
		}
	}
}

/// Publishes notifications as `notification` events, e.g. for a UI to render.
#[derive(Clone)]
pub struct BusNotifier {
	bus: EventBus,
}

impl BusNotifier {
	pub fn new(bus: EventBus) -> Self {
		Self { bus }
	}
}

impl Notifier for BusNotifier {
	fn notify(&self, notification: Notification) {
		self.bus.publish(MarketEvent::Notification(notification));
	}
}
