//! Event bus for communication between the engine and its background handlers.
//!
//! Built on a tokio broadcast channel. Publishing never blocks; subscribers
//! that fall behind lose the oldest events and are told how many they missed.

use tokio::sync::broadcast;
use trigal_types::FulfillmentEvent;

/// Broadcast bus carrying [`FulfillmentEvent`]s.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<FulfillmentEvent>,
}

impl EventBus {
	/// Creates a bus that buffers up to `capacity` events per subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Subscribes to all events published after this call.
	pub fn subscribe(&self) -> broadcast::Receiver<FulfillmentEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event to all current subscribers.
	///
	/// Fails only when nobody is subscribed, which callers ignore.
	pub fn publish(
		&self,
		event: FulfillmentEvent,
	) -> Result<(), broadcast::error::SendError<FulfillmentEvent>> {
		self.sender.send(event)?;
		Ok(())
	}
}
