//! DevTools transport over WebSocket.
//!
//! The browser exposes one WebSocket per debugging endpoint. Each text frame
//! is a complete JSON message, so unlike a pipe there is no length framing:
//! the transport only converts between frames and [`serde_json::Value`].
//!
//! A transport is split into a sender (owned by the connection's writer task)
//! and a receiver (driven by [`TransportReceiver::run`], which pushes decoded
//! messages into an unbounded channel).

#[cfg(test)]
mod tests;

use std::future::Future;
use std::pin::Pin;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::error::{Error, Result};

/// Outbound half of a transport.
pub trait Transport: Send {
	/// Serialize and send one message.
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Inbound half of a transport.
pub trait TransportReceiver: Send {
	/// Read messages until the peer closes, forwarding each to the message channel.
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// Both halves of a transport plus the channel the receiver feeds.
pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub receiver: Box<dyn TransportReceiver>,
	pub message_rx: mpsc::UnboundedReceiver<Value>,
}

/// Connects to a DevTools WebSocket endpoint.
pub struct WebSocketTransport;

impl WebSocketTransport {
	/// Open the socket at `url` and split it into [`TransportParts`].
	pub async fn connect(url: &str) -> Result<TransportParts> {
		tracing::debug!(url, "Connecting to DevTools endpoint");

		let (stream, _response) = tokio_tungstenite::connect_async(url)
			.await
			.map_err(|e| Error::ConnectionFailed(format!("{url}: {e}")))?;

		let (sink, stream) = stream.split();
		Ok(Self::from_split(sink, stream))
	}

	/// Build transport parts from an already split socket.
	pub fn from_split<W, R>(sink: W, stream: R) -> TransportParts
	where
		W: Sink<WsMessage, Error = WsError> + Unpin + Send + 'static,
		R: Stream<Item = std::result::Result<WsMessage, WsError>> + Unpin + Send + 'static,
	{
		let (message_tx, message_rx) = mpsc::unbounded_channel();

		TransportParts {
			sender: Box::new(WebSocketTransportSender { sink }),
			receiver: Box::new(WebSocketTransportReceiver { stream, message_tx }),
			message_rx,
		}
	}
}

/// Sending half of a WebSocket transport.
pub struct WebSocketTransportSender<W> {
	sink: W,
}

impl<W> Transport for WebSocketTransportSender<W>
where
	W: Sink<WsMessage, Error = WsError> + Unpin + Send,
{
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move {
			let text = serde_json::to_string(&message)?;
			tracing::trace!(bytes = text.len(), "ws send");
			self.sink
				.send(WsMessage::Text(text))
				.await
				.map_err(|e| Error::TransportError(e.to_string()))
		})
	}
}

/// Receiving half of a WebSocket transport.
pub struct WebSocketTransportReceiver<R> {
	stream: R,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl<R> TransportReceiver for WebSocketTransportReceiver<R>
where
	R: Stream<Item = std::result::Result<WsMessage, WsError>> + Unpin + Send + 'static,
{
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move {
			let WebSocketTransportReceiver {
				mut stream,
				message_tx,
			} = *self;

			while let Some(frame) = stream.next().await {
				let text = match frame {
					Ok(WsMessage::Text(text)) => text,
					Ok(WsMessage::Close(frame)) => {
						tracing::debug!(?frame, "DevTools socket closed by peer");
						break;
					}
					Ok(_) => continue,
					Err(e) => return Err(Error::TransportError(e.to_string())),
				};

				match serde_json::from_str::<Value>(&text) {
					Ok(value) => {
						if message_tx.send(value).is_err() {
							break;
						}
					}
					Err(e) => {
						tracing::warn!(error = %e, "Dropping malformed DevTools frame");
					}
				}
			}

			Ok(())
		})
	}
}
