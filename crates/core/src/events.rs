//! Callback-style page event handlers.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::api::{Page, PageEvent};

/// RAII handle that cancels an event callback when dropped.
///
/// ```ignore
/// let sub = on_page_event(&page, |event| println!("{event:?}"));
/// // Handler is active while `sub` is held...
/// drop(sub);  // Handler is cancelled
/// ```
pub struct EventSubscription {
	task: Option<JoinHandle<()>>,
}

impl EventSubscription {
	/// Explicitly cancels the subscription, equivalent to dropping it.
	pub fn unsubscribe(mut self) {
		if let Some(task) = self.task.take() {
			task.abort();
		}
	}
}

impl Drop for EventSubscription {
	fn drop(&mut self) {
		if let Some(task) = self.task.take() {
			task.abort();
		}
	}
}

impl std::fmt::Debug for EventSubscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EventSubscription")
			.field("active", &self.task.is_some())
			.finish()
	}
}

/// Run `handler` on a background task for every event the page emits.
pub fn on_page_event<P, F>(page: &P, handler: F) -> EventSubscription
where
	P: Page + ?Sized,
	F: Fn(PageEvent) + Send + Sync + 'static,
{
	let mut rx = page.events();

	let task = tokio::spawn(async move {
		loop {
			match rx.recv().await {
				Ok(event) => handler(event),
				Err(broadcast::error::RecvError::Lagged(n)) => {
					tracing::warn!(dropped = n, "Page event callback lagged");
				}
				Err(broadcast::error::RecvError::Closed) => break,
			}
		}
	});

	EventSubscription { task: Some(task) }
}
