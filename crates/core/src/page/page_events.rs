//! Translation of DevTools events into [`PageEvent`]s.

use std::sync::Arc;

use dashcheck_runtime::{CdpEvent, Connection};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::api::{ConsoleMessage, ConsoleMessageKind, PageEvent};
use crate::cdp::{ConsoleApiCalled, ExceptionThrown};

/// Map one DevTools event to a page event, if it is one we surface.
pub(crate) fn translate_event(event: &CdpEvent) -> Option<PageEvent> {
	match event.method.as_str() {
		"Runtime.consoleAPICalled" => {
			let call: ConsoleApiCalled = serde_json::from_value(event.params.clone()).ok()?;
			let text = call
				.args
				.iter()
				.map(|arg| arg.display())
				.collect::<Vec<_>>()
				.join(" ");
			Some(PageEvent::Console(ConsoleMessage::new(
				ConsoleMessageKind::from_cdp(&call.kind),
				text,
			)))
		}
		"Runtime.exceptionThrown" => {
			let thrown: ExceptionThrown = serde_json::from_value(event.params.clone()).ok()?;
			Some(PageEvent::PageError(thrown.exception_details.message()))
		}
		"Page.loadEventFired" => Some(PageEvent::Load),
		_ => None,
	}
}

/// Forward this session's events from the connection to the page channel.
pub(super) fn spawn_pump(
	connection: &Arc<Connection>,
	session_id: String,
	events_tx: broadcast::Sender<PageEvent>,
) -> JoinHandle<()> {
	let mut rx = connection.subscribe();

	tokio::spawn(async move {
		loop {
			match rx.recv().await {
				Ok(event) if event.is_from(&session_id) => {
					if let Some(page_event) = translate_event(&event) {
						let _ = events_tx.send(page_event);
					}
				}
				Ok(_) => continue,
				Err(broadcast::error::RecvError::Lagged(n)) => {
					tracing::warn!(dropped = n, session = %session_id, "Page event pump lagged");
				}
				Err(broadcast::error::RecvError::Closed) => break,
			}
		}
	})
}
