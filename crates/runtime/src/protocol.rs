//! DevTools wire messages.
//!
//! Every frame on the DevTools socket is one JSON object:
//!
//! - requests carry `id`, `method`, `params` and an optional `sessionId`
//! - responses echo `id` with either `result` or `error`
//! - events carry `method` and `params` but no `id`
//!
//! With flattened sessions, messages for a page target carry that target's
//! `sessionId`; browser-level messages omit it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Command sent to the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
	/// Unique request ID for correlating responses
	pub id: u32,
	/// DevTools method (e.g. `Page.navigate`)
	pub method: String,
	/// Method parameters as JSON object
	pub params: Value,
	/// Target session, absent for browser-level commands
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
}

/// Reply to a [`Request`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
	/// Request ID this response correlates to
	pub id: u32,
	/// Success result (mutually exclusive with error)
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	/// Error result (mutually exclusive with result)
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<RemoteError>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
}

/// Error payload of a failed command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteError {
	pub code: i64,
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<String>,
}

/// Unsolicited notification from the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdpEvent {
	/// Event name (e.g. `Runtime.consoleAPICalled`)
	pub method: String,
	/// Event parameters as JSON object
	#[serde(default)]
	pub params: Value,
	/// Session of the emitting target, absent for browser-level events
	#[serde(
		default,
		skip_serializing_if = "Option::is_none",
		serialize_with = "serialize_opt_arc_str",
		deserialize_with = "deserialize_opt_arc_str"
	)]
	pub session_id: Option<Arc<str>>,
}

impl CdpEvent {
	/// Returns true if the event was emitted by the given session.
	pub fn is_from(&self, session_id: &str) -> bool {
		self.session_id.as_deref() == Some(session_id)
	}
}

/// Discriminated union of inbound messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
	/// Response message (has `id` field)
	Response(Response),
	/// Event message (has `method`, no `id`)
	Event(CdpEvent),
	/// Unknown message type (forward-compatible catch-all)
	Unknown(Value),
}

fn serialize_opt_arc_str<S>(value: &Option<Arc<str>>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
	S: serde::Serializer,
{
	match value {
		Some(s) => serializer.serialize_some(s.as_ref()),
		None => serializer.serialize_none(),
	}
}

fn deserialize_opt_arc_str<'de, D>(deserializer: D) -> std::result::Result<Option<Arc<str>>, D::Error>
where
	D: serde::Deserializer<'de>,
{
	let s: Option<String> = Deserialize::deserialize(deserializer)?;
	Ok(s.map(|s| Arc::from(s.as_str())))
}
