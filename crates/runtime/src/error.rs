//! Error types for the dashcheck runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the browser.
#[derive(Debug, Error)]
pub enum Error {
	/// No Chromium executable could be located.
	#[error("Chromium executable not found. Install Chrome/Chromium or set DASHCHECK_CHROME")]
	ExecutableNotFound,

	/// Failed to launch the browser process.
	#[error("Failed to launch browser: {0}")]
	LaunchFailed(String),

	/// Failed to establish the DevTools connection.
	#[error("Failed to connect to browser: {0}")]
	ConnectionFailed(String),

	/// Transport-level error (WebSocket communication).
	#[error("Transport error: {0}")]
	TransportError(String),

	/// Protocol-level error (malformed or unexpected message).
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	/// Error returned by the browser for a DevTools command.
	#[error("{method} failed: {message} (code {code})")]
	Remote {
		/// DevTools method that failed
		method: String,
		/// JSON-RPC style error code
		code: i64,
		/// Human-readable error message
		message: String,
	},

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// Navigation was rejected by the browser (DNS, connection refused, ...).
	#[error("Navigation to '{url}' failed: {reason}")]
	NavigationFailed { url: String, reason: String },

	/// Navigation did not reach the load event in time.
	#[error("Navigation timeout after {duration_ms}ms navigating to '{url}'")]
	NavigationTimeout { url: String, duration_ms: u64 },

	/// Target was closed (browser or page).
	#[error("Target closed: Cannot perform operation on closed {target_type}")]
	TargetClosed { target_type: String },

	/// Connection channel closed unexpectedly.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,

	/// Invalid argument provided to a method.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	/// No element matched a locator.
	#[error("Element not found: {0}")]
	ElementNotFound(String),

	/// A single-element action matched several elements.
	#[error("strict mode violation: {locator} resolved to {count} elements")]
	StrictModeViolation { locator: String, count: usize },

	/// Page-side script threw.
	#[error("Evaluation failed: {0}")]
	Evaluation(String),

	/// Assertion timeout (expect API).
	#[error("Assertion timeout: {0}")]
	AssertionTimeout(String),
}

impl Error {
	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::NavigationTimeout { .. } | Error::AssertionTimeout(_))
	}

	/// Returns true if the error comes from resolving a locator.
	pub fn is_locator_error(&self) -> bool {
		matches!(
			self,
			Error::ElementNotFound(_) | Error::StrictModeViolation { .. }
		)
	}

	/// Returns true if the error is a navigation failure or navigation timeout.
	pub fn is_navigation_error(&self) -> bool {
		matches!(
			self,
			Error::NavigationFailed { .. } | Error::NavigationTimeout { .. }
		)
	}
}
