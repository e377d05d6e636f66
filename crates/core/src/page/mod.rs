//! [`CdpPage`]: a browser tab driven over a flattened DevTools session.

mod eval;
mod input;
mod page_events;
mod screenshot;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashcheck_runtime::{Connection, Error, Result};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::api::{Page, PageEvent};
use crate::cdp::NavigateResult;
use crate::locator::Locator;

/// Capacity of the per-page event channel.
const PAGE_EVENT_CAPACITY: usize = 256;

/// A browser tab attached through its own DevTools session.
///
/// Cloning is cheap; clones share the session and event stream.
#[derive(Clone)]
pub struct CdpPage {
	inner: Arc<PageInner>,
}

struct PageInner {
	connection: Arc<Connection>,
	target_id: String,
	session_id: String,
	events_tx: broadcast::Sender<PageEvent>,
	pump: JoinHandle<()>,
}

impl Drop for PageInner {
	fn drop(&mut self) {
		self.pump.abort();
	}
}

impl std::fmt::Debug for CdpPage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CdpPage")
			.field("target_id", &self.inner.target_id)
			.field("session_id", &self.inner.session_id)
			.finish()
	}
}

impl CdpPage {
	/// Wire up an attached session: start the event pump, then enable domains.
	pub(crate) async fn attach(connection: Arc<Connection>, target_id: String, session_id: String) -> Result<Self> {
		let (events_tx, _) = broadcast::channel(PAGE_EVENT_CAPACITY);
		let pump = page_events::spawn_pump(&connection, session_id.clone(), events_tx.clone());

		let page = Self {
			inner: Arc::new(PageInner {
				connection,
				target_id,
				session_id,
				events_tx,
				pump,
			}),
		};

		page.send("Page.enable", serde_json::json!({})).await?;
		page.send("Runtime.enable", serde_json::json!({})).await?;
		tracing::debug!(target_id = %page.inner.target_id, "Page attached");
		Ok(page)
	}

	/// DevTools target id of this tab.
	pub fn target_id(&self) -> &str {
		&self.inner.target_id
	}

	/// Send a command on this page's session.
	pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
		self.inner
			.connection
			.send_message(Some(&self.inner.session_id), method, params)
			.await
	}

	async fn call<T: serde::de::DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
		self.inner
			.connection
			.call(Some(&self.inner.session_id), method, params)
			.await
	}

	async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
		let events = self.inner.events_tx.subscribe();

		tokio::time::timeout(timeout, self.navigate_and_wait_for_load(url, events))
			.await
			.map_err(|_| Error::NavigationTimeout {
				url: url.to_string(),
				duration_ms: timeout.as_millis() as u64,
			})?
	}

	async fn navigate_and_wait_for_load(&self, url: &str, mut events: broadcast::Receiver<PageEvent>) -> Result<()> {
		let result: NavigateResult = self.call("Page.navigate", serde_json::json!({ "url": url })).await?;
		if let Some(reason) = result.error_text.filter(|t| !t.is_empty()) {
			return Err(Error::NavigationFailed {
				url: url.to_string(),
				reason,
			});
		}

		loop {
			match events.recv().await {
				Ok(PageEvent::Load) => return Ok(()),
				Ok(_) => continue,
				Err(broadcast::error::RecvError::Lagged(n)) => {
					tracing::warn!(dropped = n, "Page event receiver lagged during navigation");
				}
				Err(broadcast::error::RecvError::Closed) => {
					return Err(Error::TargetClosed {
						target_type: "page".into(),
					});
				}
			}
		}
	}
}

#[async_trait]
impl Page for CdpPage {
	fn events(&self) -> broadcast::Receiver<PageEvent> {
		self.inner.events_tx.subscribe()
	}

	async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
		tracing::info!(target: "dashcheck", url, "goto");
		self.navigate(url, timeout).await
	}

	async fn count(&self, locator: &Locator) -> Result<usize> {
		self.query_count(locator).await
	}

	async fn is_visible(&self, locator: &Locator) -> Result<bool> {
		self.query_visible(locator).await
	}

	async fn fill(&self, locator: &Locator, value: &str, timeout: Duration) -> Result<()> {
		self.wait_for_match(locator, timeout).await?;
		self.fill_value(locator, value).await
	}

	async fn dispatch_event(&self, locator: &Locator, event_type: &str, timeout: Duration) -> Result<()> {
		self.wait_for_match(locator, timeout).await?;
		self.dispatch_dom_event(locator, event_type).await
	}

	async fn screenshot(&self) -> Result<Vec<u8>> {
		self.capture_png().await
	}
}
