use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::*;

/// Accepts one WebSocket client on a loopback port and returns its URL plus the server socket.
async fn loopback_server() -> (
	String,
	tokio::task::JoinHandle<tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>>,
) {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	let accept = tokio::spawn(async move {
		let (stream, _) = listener.accept().await.unwrap();
		tokio_tungstenite::accept_async(stream).await.unwrap()
	});
	(format!("ws://{addr}"), accept)
}

#[tokio::test]
async fn test_send_message_as_text_frame() {
	let (url, accept) = loopback_server().await;
	let mut parts = WebSocketTransport::connect(&url).await.unwrap();
	let mut server = accept.await.unwrap();

	let message = serde_json::json!({"id": 1, "method": "Page.enable", "params": {}});
	parts.sender.send(message.clone()).await.unwrap();

	let frame = server.next().await.unwrap().unwrap();
	let text = match frame {
		WsMessage::Text(text) => text,
		other => panic!("expected text frame, got {other:?}"),
	};
	let received: serde_json::Value = serde_json::from_str(&text).unwrap();
	assert_eq!(received, message);
}

#[tokio::test]
async fn test_receiver_forwards_messages_in_order() {
	let (url, accept) = loopback_server().await;
	let parts = WebSocketTransport::connect(&url).await.unwrap();
	let mut server = accept.await.unwrap();

	let TransportParts {
		receiver,
		mut message_rx,
		..
	} = parts;
	let read_task = tokio::spawn(receiver.run());

	let messages = vec![
		serde_json::json!({"id": 1, "result": {}}),
		serde_json::json!({"method": "Page.loadEventFired", "params": {"timestamp": 1.0}}),
		serde_json::json!({"id": 2, "result": {"frameId": "F"}}),
	];
	for msg in &messages {
		server
			.send(WsMessage::Text(serde_json::to_string(msg).unwrap()))
			.await
			.unwrap();
	}

	for expected in &messages {
		let received = message_rx.recv().await.unwrap();
		assert_eq!(&received, expected);
	}

	server.close(None).await.unwrap();
	assert!(read_task.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_receiver_skips_malformed_and_binary_frames() {
	let (url, accept) = loopback_server().await;
	let parts = WebSocketTransport::connect(&url).await.unwrap();
	let mut server = accept.await.unwrap();

	let TransportParts {
		receiver,
		mut message_rx,
		..
	} = parts;
	let read_task = tokio::spawn(receiver.run());

	server.send(WsMessage::Text("{not json".into())).await.unwrap();
	server.send(WsMessage::Binary(vec![1, 2, 3])).await.unwrap();
	server
		.send(WsMessage::Text(r#"{"id": 9, "result": {}}"#.into()))
		.await
		.unwrap();

	let received = message_rx.recv().await.unwrap();
	assert_eq!(received["id"], 9);

	server.close(None).await.unwrap();
	let _ = read_task.await;
}

#[tokio::test]
async fn test_connect_refused() {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	drop(listener);

	let result = WebSocketTransport::connect(&format!("ws://{addr}")).await;
	assert!(matches!(result, Err(Error::ConnectionFailed(_))));
}
