//! DevTools connection layer.
//!
//! Implements request/response correlation on top of a [`Transport`]:
//! - Generating sequential request IDs
//! - Correlating responses with pending requests
//! - Distinguishing events from responses
//! - Broadcasting events to subscribers (pages filter by session id)
//!
//! # Message Flow
//!
//! 1. Caller invokes [`Connection::send_message`] with session, method and params
//! 2. Connection allocates an ID and parks a oneshot sender under it
//! 3. Request is queued for the writer task
//! 4. Dispatch loop receives the response and completes the oneshot
//! 5. Caller receives the result
//!
//! When the transport ends, every pending request resolves to
//! [`Error::ChannelClosed`].


use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::task::{Context, Poll};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::error::{Error, Result};
use crate::protocol::{CdpEvent, Message, Request};
use crate::transport::{Transport, TransportParts, TransportReceiver};

/// Capacity of the event broadcast channel.
const EVENT_CAPACITY: usize = 512;

struct Pending {
	method: String,
	tx: oneshot::Sender<Result<Value>>,
}

/// Pending request callbacks keyed by request ID.
type CallbackMap = Arc<Mutex<HashMap<u32, Pending>>>;

/// RAII guard removing the callback when a request future is dropped early.
struct CancelGuard {
	id: u32,
	callbacks: CallbackMap,
	completed: bool,
}

impl CancelGuard {
	fn new(id: u32, callbacks: CallbackMap) -> Self {
		Self {
			id,
			callbacks,
			completed: false,
		}
	}

	fn complete(&mut self) {
		self.completed = true;
	}
}

impl Drop for CancelGuard {
	fn drop(&mut self) {
		if self.completed {
			return;
		}
		if self.callbacks.lock().remove(&self.id).is_some() {
			tracing::debug!(id = self.id, "CancelGuard: removed orphaned callback");
		}
	}
}

/// Future returned by [`Connection::send_message`] with automatic cancellation cleanup.
struct ResponseFuture {
	rx: oneshot::Receiver<Result<Value>>,
	guard: CancelGuard,
}

impl Future for ResponseFuture {
	type Output = Result<Value>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(result) => {
				self.guard.complete();
				Poll::Ready(result.map_err(|_| Error::ChannelClosed).and_then(|r| r))
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

/// Transport halves waiting for [`Connection::run`] to take them.
struct Idle {
	sender: Box<dyn Transport>,
	receiver: Box<dyn TransportReceiver>,
	message_rx: mpsc::UnboundedReceiver<Value>,
	outbound_rx: mpsc::UnboundedReceiver<Value>,
}

/// DevTools connection to one browser.
pub struct Connection {
	/// Sequential request ID counter
	last_id: AtomicU32,
	/// Pending request callbacks keyed by request ID
	callbacks: CallbackMap,
	/// Channel for sending outbound messages to the writer task
	outbound_tx: mpsc::UnboundedSender<Value>,
	/// Event fan-out
	events_tx: broadcast::Sender<CdpEvent>,
	/// Transport parts, taken once by `run()`
	idle: Mutex<Option<Idle>>,
	/// Set once the dispatch loop has ended
	closed: AtomicBool,
}

impl Connection {
	/// Create a new Connection over the given transport.
	pub fn new(parts: TransportParts) -> Self {
		let TransportParts {
			sender,
			receiver,
			message_rx,
		} = parts;

		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
		let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);

		Self {
			last_id: AtomicU32::new(0),
			callbacks: Arc::new(Mutex::new(HashMap::new())),
			outbound_tx,
			events_tx,
			idle: Mutex::new(Some(Idle {
				sender,
				receiver,
				message_rx,
				outbound_rx,
			})),
			closed: AtomicBool::new(false),
		}
	}

	/// Subscribe to every event received after this call.
	pub fn subscribe(&self) -> broadcast::Receiver<CdpEvent> {
		self.events_tx.subscribe()
	}

	/// Returns true once the dispatch loop has ended.
	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	/// Sends a command and awaits the raw result.
	pub async fn send_message(&self, session_id: Option<&str>, method: &str, params: Value) -> Result<Value> {
		if self.is_closed() {
			return Err(Error::ChannelClosed);
		}

		let id = self.last_id.fetch_add(1, Ordering::SeqCst);
		tracing::debug!(id, method, session = session_id.unwrap_or("-"), "Sending command");

		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().insert(
			id,
			Pending {
				method: method.to_string(),
				tx,
			},
		);
		let guard = CancelGuard::new(id, Arc::clone(&self.callbacks));

		let request = Request {
			id,
			method: method.to_string(),
			params,
			session_id: session_id.map(str::to_string),
		};
		let request_value = serde_json::to_value(&request)?;

		if self.outbound_tx.send(request_value).is_err() || self.is_closed() {
			tracing::error!(id, method, "Failed to queue command: connection closed");
			return Err(Error::ChannelClosed);
		}

		ResponseFuture { rx, guard }.await
	}

	/// Sends a command and deserializes its result.
	pub async fn call<T: DeserializeOwned>(&self, session_id: Option<&str>, method: &str, params: Value) -> Result<T> {
		let value = self.send_message(session_id, method, params).await?;
		serde_json::from_value(value)
			.map_err(|e| Error::ProtocolError(format!("unexpected {method} result: {e}")))
	}

	/// Run the message dispatch loop until the transport ends.
	pub async fn run(self: &Arc<Self>) -> Result<()> {
		let Idle {
			mut sender,
			receiver,
			mut message_rx,
			mut outbound_rx,
		} = self
			.idle
			.lock()
			.take()
			.ok_or_else(|| Error::ProtocolError("dispatch loop already started".into()))?;

		let reader_handle = tokio::spawn(async move {
			if let Err(e) = receiver.run().await {
				tracing::error!("Transport read error: {}", e);
			}
		});

		let writer_handle = tokio::spawn(async move {
			while let Some(message) = outbound_rx.recv().await {
				if let Err(e) = sender.send(message).await {
					tracing::error!("Transport write error: {}", e);
					break;
				}
			}
		});

		while let Some(message_value) = message_rx.recv().await {
			match serde_json::from_value::<Message>(message_value) {
				Ok(message) => {
					if let Err(e) = self.dispatch_internal(message) {
						tracing::warn!("Error dispatching message: {}", e);
					}
				}
				Err(e) => tracing::error!("Failed to parse message: {}", e),
			}
		}

		self.closed.store(true, Ordering::SeqCst);
		let pending = std::mem::take(&mut *self.callbacks.lock());
		if !pending.is_empty() {
			tracing::debug!(count = pending.len(), "Failing pending commands: connection closed");
		}
		for (_, callback) in pending {
			let _ = callback.tx.send(Err(Error::ChannelClosed));
		}

		writer_handle.abort();
		let _ = reader_handle.await;
		Ok(())
	}

	/// Dispatch an incoming message (test-only public version)
	#[cfg(test)]
	pub(crate) fn dispatch(&self, message: Message) -> Result<()> {
		self.dispatch_internal(message)
	}

	fn dispatch_internal(&self, message: Message) -> Result<()> {
		match message {
			Message::Response(response) => {
				let callback = self.callbacks.lock().remove(&response.id).ok_or_else(|| {
					Error::ProtocolError(format!("Cannot find request to respond: id={}", response.id))
				})?;

				let result = match response.error {
					Some(error) => Err(Error::Remote {
						method: callback.method,
						code: error.code,
						message: error.message,
					}),
					None => Ok(response.result.unwrap_or(Value::Null)),
				};

				let _ = callback.tx.send(result);
				Ok(())
			}
			Message::Event(event) => {
				tracing::trace!(method = %event.method, session = ?event.session_id, "event");
				// No subscribers is fine: events nobody waits for are dropped.
				let _ = self.events_tx.send(event);
				Ok(())
			}
			Message::Unknown(value) => {
				tracing::debug!(
					"Unknown message type (ignored): {}",
					serde_json::to_string(&value).unwrap_or_else(|_| "<serialization failed>".to_string())
				);
				Ok(())
			}
		}
	}
}
