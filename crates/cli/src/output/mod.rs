//! Structured verification report.
//!
//! In `json` format the report is the only thing written to stdout:
//!
//! ```json
//! {
//!   "schemaVersion": 1,
//!   "ok": false,
//!   "outcome": "failed",
//!   "url": "http://localhost:5173/dashboard",
//!   "completedSteps": ["attach_observers", "navigate"],
//!   "failedStep": "wait_for_dashboard",
//!   "error": { "code": "DASHBOARD_NOT_LOADED", "message": "..." },
//!   "artifacts": [{ "kind": "error", "path": "verification/error.png" }],
//!   "console": ["Navigating to Dashboard..."],
//!   "timings": { "durationMs": 5012 }
//! }
//! ```
//!
//! In `text` format progress lines are streamed as they happen and failures
//! are summarised on stderr.


use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::VerifyError;
use crate::verifier::Step;

/// Bump on breaking changes to the report layout.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Progress transcript on stdout (default)
	#[default]
	Text,
	/// Single JSON report on stdout
	Json,
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Text => write!(f, "text"),
			OutputFormat::Json => write!(f, "json"),
		}
	}
}

/// Failure categories, each with its own process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// Anything not covered below
	InternalError,
	/// Dashboard unreachable or navigation timed out
	NavigationFailed,
	/// Heading never became visible
	DashboardNotLoaded,
	/// Warning visibility did not match the expected state
	AssertionFailed,
	/// Form control missing or ambiguous
	SelectorNotFound,
	/// Browser could not be started
	BrowserLaunchFailed,
	/// Screenshot capture or write failed
	ScreenshotFailed,
	/// Configuration rejected
	InvalidInput,
}

impl ErrorCode {
	pub fn exit_code(self) -> i32 {
		match self {
			ErrorCode::InternalError => 1,
			ErrorCode::NavigationFailed => 2,
			ErrorCode::DashboardNotLoaded => 3,
			ErrorCode::AssertionFailed => 4,
			ErrorCode::SelectorNotFound => 5,
			ErrorCode::BrowserLaunchFailed => 6,
			ErrorCode::ScreenshotFailed => 7,
			ErrorCode::InvalidInput => 8,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
	Passed,
	Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportError {
	pub code: ErrorCode,
	pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
	Default,
	Warning,
	Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
	pub kind: ArtifactKind,
	pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
	pub duration_ms: u64,
}

/// Result of one verification run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
	pub schema_version: u32,
	pub ok: bool,
	pub outcome: Outcome,
	pub url: String,
	pub completed_steps: Vec<Step>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub failed_step: Option<Step>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<ReportError>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub artifacts: Vec<Artifact>,
	/// Progress lines plus forwarded console output, in arrival order.
	#[serde(default)]
	pub console: Vec<String>,
	pub timings: Timings,
}

impl VerificationReport {
	pub fn passed(url: &str, completed_steps: Vec<Step>, artifacts: Vec<Artifact>, console: Vec<String>, elapsed: Duration) -> Self {
		Self {
			schema_version: SCHEMA_VERSION,
			ok: true,
			outcome: Outcome::Passed,
			url: url.to_string(),
			completed_steps,
			failed_step: None,
			error: None,
			artifacts,
			console,
			timings: Timings {
				duration_ms: elapsed.as_millis() as u64,
			},
		}
	}

	pub fn failed(
		url: &str,
		completed_steps: Vec<Step>,
		err: &VerifyError,
		artifacts: Vec<Artifact>,
		console: Vec<String>,
		elapsed: Duration,
	) -> Self {
		Self {
			schema_version: SCHEMA_VERSION,
			ok: false,
			outcome: Outcome::Failed,
			url: url.to_string(),
			completed_steps,
			failed_step: err.step(),
			error: Some(ReportError {
				code: err.code(),
				message: err.to_string(),
			}),
			artifacts,
			console,
			timings: Timings {
				duration_ms: elapsed.as_millis() as u64,
			},
		}
	}

	/// Process exit status for this report.
	pub fn exit_code(&self) -> i32 {
		match &self.error {
			None => 0,
			Some(error) => error.code.exit_code(),
		}
	}
}

/// Write the report in the requested format.
pub fn print_report(report: &VerificationReport, format: OutputFormat) {
	match format {
		OutputFormat::Json => {
			let stdout = io::stdout();
			let mut handle = stdout.lock();
			match serde_json::to_string_pretty(report) {
				Ok(json) => {
					let _ = writeln!(handle, "{json}");
					let _ = handle.flush();
				}
				Err(e) => tracing::error!(error = %e, "failed to serialize report"),
			}
		}
		OutputFormat::Text => {
			if let Some(error) = &report.error {
				print_error_stderr(error);
			}
		}
	}
}

/// Human-readable failure summary on stderr.
pub fn print_error_stderr(error: &ReportError) {
	let stderr = io::stderr();
	let mut handle = stderr.lock();
	let _ = writeln!(handle, "error[{}]: {}", error_code_name(error.code), error.message);
}

fn error_code_name(code: ErrorCode) -> String {
	serde_json::to_value(code)
		.ok()
		.and_then(|v| v.as_str().map(str::to_string))
		.unwrap_or_else(|| format!("{code:?}"))
}
