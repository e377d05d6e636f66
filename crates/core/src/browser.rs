//! [`CdpBrowser`]: a launched Chromium and its DevTools connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashcheck_runtime::{BrowserProcess, Connection, Error, LaunchOptions, Result, TransportParts, WebSocketTransport};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::api::Browser;
use crate::cdp::{AttachToTargetResult, CreateTargetResult};
use crate::page::CdpPage;

/// How long `Browser.close` may take before the process is killed.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// A Chromium instance driven over DevTools, usually owned by this process.
pub struct CdpBrowser {
	connection: Arc<Connection>,
	process: Mutex<Option<BrowserProcess>>,
	dispatch: Mutex<Option<JoinHandle<()>>>,
	closed: AtomicBool,
}

impl CdpBrowser {
	/// Launch Chromium and connect to its browser-level DevTools endpoint.
	pub async fn launch(options: &LaunchOptions) -> Result<Self> {
		let process = dashcheck_runtime::launch(options).await?;

		let parts = match WebSocketTransport::connect(process.ws_url()).await {
			Ok(parts) => parts,
			Err(e) => {
				let _ = process.shutdown(Duration::ZERO).await;
				return Err(e);
			}
		};

		Ok(Self::from_parts(parts, Some(process)))
	}

	/// Attach to an already running browser at its `ws://` DevTools endpoint.
	///
	/// The browser is still asked to exit on [`close`](Browser::close), but no
	/// process is waited on.
	pub async fn connect(ws_url: &str) -> Result<Self> {
		let parts = WebSocketTransport::connect(ws_url).await?;
		Ok(Self::from_parts(parts, None))
	}

	fn from_parts(parts: TransportParts, process: Option<BrowserProcess>) -> Self {
		let connection = Arc::new(Connection::new(parts));
		let dispatch = {
			let connection = Arc::clone(&connection);
			tokio::spawn(async move {
				if let Err(e) = connection.run().await {
					tracing::error!(error = %e, "DevTools dispatch loop failed");
				}
			})
		};

		Self {
			connection,
			process: Mutex::new(process),
			dispatch: Mutex::new(Some(dispatch)),
			closed: AtomicBool::new(false),
		}
	}

	/// Underlying DevTools connection.
	pub fn connection(&self) -> &Arc<Connection> {
		&self.connection
	}

	/// Returns true once [`close`](Browser::close) has run.
	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl Browser for CdpBrowser {
	type Page = CdpPage;

	async fn new_page(&self) -> Result<CdpPage> {
		if self.is_closed() {
			return Err(Error::TargetClosed {
				target_type: "browser".into(),
			});
		}

		let target: CreateTargetResult = self
			.connection
			.call(None, "Target.createTarget", serde_json::json!({ "url": "about:blank" }))
			.await?;

		let attached: AttachToTargetResult = self
			.connection
			.call(
				None,
				"Target.attachToTarget",
				serde_json::json!({ "targetId": target.target_id, "flatten": true }),
			)
			.await?;

		CdpPage::attach(Arc::clone(&self.connection), target.target_id, attached.session_id).await
	}

	async fn close(&self) -> Result<()> {
		if self.closed.swap(true, Ordering::SeqCst) {
			tracing::debug!("Browser already closed");
			return Ok(());
		}

		tracing::info!(target: "dashcheck", "closing browser");

		// The browser may drop the socket before answering.
		match tokio::time::timeout(
			CLOSE_GRACE,
			self.connection.send_message(None, "Browser.close", serde_json::json!({})),
		)
		.await
		{
			Ok(Ok(_)) | Ok(Err(Error::ChannelClosed)) => {}
			Ok(Err(e)) => tracing::warn!(error = %e, "Browser.close failed"),
			Err(_) => tracing::warn!("Browser.close did not answer"),
		}

		let process = self.process.lock().take();
		let shutdown = match process {
			Some(process) => process.shutdown(CLOSE_GRACE).await,
			None => Ok(()),
		};

		let dispatch = self.dispatch.lock().take();
		if let Some(dispatch) = dispatch {
			dispatch.abort();
		}

		shutdown
	}
}
