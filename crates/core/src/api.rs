//! Browser and page abstractions.
//!
//! Scenarios are written against [`Browser`] and [`Page`] rather than the
//! DevTools-backed types so they can run against an in-memory double.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use dashcheck_runtime::Result;
use tokio::sync::broadcast;

use crate::locator::Locator;

/// Something emitted by the page while a scenario runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
	/// `console.*` call from page scripts.
	Console(ConsoleMessage),
	/// Uncaught exception in page scripts.
	PageError(String),
	/// The main frame fired `load`.
	Load,
}

/// Console message from JavaScript `console.*` calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleMessage {
	kind: ConsoleMessageKind,
	text: String,
}

impl ConsoleMessage {
	pub fn new(kind: ConsoleMessageKind, text: impl Into<String>) -> Self {
		Self {
			kind,
			text: text.into(),
		}
	}

	/// Returns the type of console message.
	pub fn kind(&self) -> ConsoleMessageKind {
		self.kind
	}

	/// Returns the text content of the message.
	pub fn text(&self) -> &str {
		&self.text
	}
}

/// The type of console message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleMessageKind {
	Log,
	Debug,
	Info,
	Warning,
	Error,
	Trace,
	Assert,
	Other,
}

impl ConsoleMessageKind {
	/// Map a DevTools `Runtime.consoleAPICalled` type.
	pub fn from_cdp(kind: &str) -> Self {
		match kind {
			"log" => Self::Log,
			"debug" => Self::Debug,
			"info" => Self::Info,
			"warning" => Self::Warning,
			"error" => Self::Error,
			"trace" => Self::Trace,
			"assert" => Self::Assert,
			_ => Self::Other,
		}
	}
}

impl std::fmt::Display for ConsoleMessageKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			Self::Log => "log",
			Self::Debug => "debug",
			Self::Info => "info",
			Self::Warning => "warning",
			Self::Error => "error",
			Self::Trace => "trace",
			Self::Assert => "assert",
			Self::Other => "other",
		};
		f.write_str(s)
	}
}

/// A single browser tab.
#[async_trait]
pub trait Page: Send + Sync {
	/// Subscribe to events emitted after this call.
	fn events(&self) -> broadcast::Receiver<PageEvent>;

	/// Navigate and wait for the `load` event.
	async fn goto(&self, url: &str, timeout: Duration) -> Result<()>;

	/// Number of elements currently matching `locator`.
	async fn count(&self, locator: &Locator) -> Result<usize>;

	/// True if any matching element is visible. No match counts as hidden.
	async fn is_visible(&self, locator: &Locator) -> Result<bool>;

	/// Set the value of the single `<input>`/`<textarea>` matching `locator`.
	///
	/// Waits up to `timeout` for the element to exist.
	async fn fill(&self, locator: &Locator, value: &str, timeout: Duration) -> Result<()>;

	/// Dispatch a bubbling DOM event of `event_type` on the single element matching `locator`.
	async fn dispatch_event(&self, locator: &Locator, event_type: &str, timeout: Duration) -> Result<()>;

	/// Capture the viewport as PNG bytes.
	async fn screenshot(&self) -> Result<Vec<u8>>;

	/// Capture the viewport and write it to `path`, replacing any existing file.
	async fn screenshot_to_file(&self, path: &Path) -> Result<()> {
		let bytes = self.screenshot().await?;
		if let Some(parent) = path.parent() {
			if !parent.as_os_str().is_empty() {
				tokio::fs::create_dir_all(parent).await?;
			}
		}
		tokio::fs::write(path, &bytes).await?;
		tracing::debug!(path = %path.display(), bytes = bytes.len(), "Screenshot written");
		Ok(())
	}
}

/// A browser able to open pages.
#[async_trait]
pub trait Browser: Send + Sync {
	type Page: Page;

	/// Open a new blank tab.
	async fn new_page(&self) -> Result<Self::Page>;

	/// Close the browser. Calling it again is a no-op.
	async fn close(&self) -> Result<()>;
}
