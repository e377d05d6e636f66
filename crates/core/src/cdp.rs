//! Payloads of the DevTools commands and events this crate uses.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateTargetResult {
	pub target_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AttachToTargetResult {
	pub session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NavigateResult {
	#[serde(default)]
	pub error_text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CaptureScreenshotResult {
	pub data: String,
}

/// `Runtime.RemoteObject`, reduced to the fields used for display and values.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RemoteObject {
	#[serde(rename = "type", default)]
	pub kind: String,
	#[serde(default)]
	pub value: Option<Value>,
	#[serde(default)]
	pub unserializable_value: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
}

impl RemoteObject {
	/// Render the way a console shows a logged argument.
	pub fn display(&self) -> String {
		match &self.value {
			Some(Value::String(s)) => s.clone(),
			Some(Value::Null) if self.kind == "undefined" => "undefined".to_string(),
			Some(other) => other.to_string(),
			None => self
				.unserializable_value
				.clone()
				.or_else(|| self.description.clone())
				.unwrap_or_else(|| self.kind.clone()),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExceptionDetails {
	#[serde(default)]
	pub text: String,
	#[serde(default)]
	pub exception: Option<RemoteObject>,
}

impl ExceptionDetails {
	/// Prefer the exception's own description (`Error: msg` plus stack).
	pub fn message(&self) -> String {
		self.exception
			.as_ref()
			.and_then(|e| e.description.clone())
			.unwrap_or_else(|| self.text.clone())
	}
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EvaluateResult {
	pub result: RemoteObject,
	#[serde(default)]
	pub exception_details: Option<ExceptionDetails>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConsoleApiCalled {
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub args: Vec<RemoteObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExceptionThrown {
	pub exception_details: ExceptionDetails,
}
