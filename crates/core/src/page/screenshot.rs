//! Screenshot capture for [`CdpPage`].

use base64::Engine;
use dashcheck_runtime::{Error, Result};

use super::CdpPage;
use crate::cdp::CaptureScreenshotResult;

impl CdpPage {
	/// Captures the viewport and returns PNG bytes.
	pub(super) async fn capture_png(&self) -> Result<Vec<u8>> {
		let response: CaptureScreenshotResult = self
			.call("Page.captureScreenshot", serde_json::json!({ "format": "png" }))
			.await?;

		base64::prelude::BASE64_STANDARD
			.decode(&response.data)
			.map_err(|e| Error::ProtocolError(format!("decode screenshot: {e}")))
	}
}
