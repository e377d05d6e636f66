//! Verifier configuration.
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! command-line flags. Every file field is optional.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use dashcheck_core::{LaunchOptions, Locator};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VerifyError};

pub const DEFAULT_URL: &str = "http://localhost:5173/dashboard";
pub const DEFAULT_OUT_DIR: &str = "verification";

/// How the verifier finds the form control it manipulates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ControlBinding {
	/// The `<input>` placed after the labelled container.
	#[default]
	Structural,
	/// An element carrying `data-testid="<id>"`.
	TestId(String),
}

impl ControlBinding {
	pub fn locator(&self, label: &str) -> Locator {
		match self {
			ControlBinding::Structural => Locator::input_after_label(label),
			ControlBinding::TestId(id) => Locator::test_id(id.as_str()),
		}
	}
}

impl FromStr for ControlBinding {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		if s == "structural" {
			return Ok(ControlBinding::Structural);
		}
		match s.strip_prefix("test-id:") {
			Some(id) if !id.trim().is_empty() => Ok(ControlBinding::TestId(id.trim().to_string())),
			Some(_) => Err("test-id binding needs an id, e.g. test-id:down-payment".to_string()),
			None => Err(format!("unknown control binding: {s} (expected structural or test-id:<ID>)")),
		}
	}
}

impl TryFrom<String> for ControlBinding {
	type Error = String;

	fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<ControlBinding> for String {
	fn from(value: ControlBinding) -> Self {
		value.to_string()
	}
}

impl fmt::Display for ControlBinding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ControlBinding::Structural => f.write_str("structural"),
			ControlBinding::TestId(id) => write!(f, "test-id:{id}"),
		}
	}
}

/// Browser launch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserConfig {
	pub executable: Option<PathBuf>,
	pub headless: bool,
	pub window_width: u32,
	pub window_height: u32,
	pub args: Vec<String>,
	pub launch_timeout_ms: u64,
}

impl Default for BrowserConfig {
	fn default() -> Self {
		let launch = LaunchOptions::default();
		Self {
			executable: None,
			headless: launch.headless,
			window_width: launch.window_size.0,
			window_height: launch.window_size.1,
			args: Vec::new(),
			launch_timeout_ms: launch.timeout.as_millis() as u64,
		}
	}
}

impl BrowserConfig {
	pub fn launch_options(&self) -> LaunchOptions {
		LaunchOptions {
			executable: self.executable.clone(),
			headless: self.headless,
			window_size: (self.window_width, self.window_height),
			args: self.args.clone(),
			timeout: Duration::from_millis(self.launch_timeout_ms),
		}
	}
}

/// Everything a verification run needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifierConfig {
	pub url: String,
	pub out_dir: PathBuf,
	/// Accessible name of the heading that marks a loaded dashboard.
	pub heading: String,
	/// Text of the warning flag.
	pub warning_text: String,
	/// Exact text of the label paired with the control.
	pub control_label: String,
	pub control: ControlBinding,
	pub fill_value: String,
	pub navigation_timeout_ms: u64,
	pub load_timeout_ms: u64,
	pub assertion_timeout_ms: u64,
	pub action_timeout_ms: u64,
	/// Fixed pause before the final assertion. The assertion polls either way.
	pub settle_ms: u64,
	pub browser: BrowserConfig,
}

impl Default for VerifierConfig {
	fn default() -> Self {
		Self {
			url: DEFAULT_URL.to_string(),
			out_dir: PathBuf::from(DEFAULT_OUT_DIR),
			heading: "Stakeholder Dashboard".to_string(),
			warning_text: "Day 1 Cash Insolvency Risk".to_string(),
			control_label: "Investor Down Payment".to_string(),
			control: ControlBinding::Structural,
			fill_value: "100000".to_string(),
			navigation_timeout_ms: 30_000,
			load_timeout_ms: 5_000,
			assertion_timeout_ms: 5_000,
			action_timeout_ms: 5_000,
			settle_ms: 1_000,
			browser: BrowserConfig::default(),
		}
	}
}

/// Values given on the command line. `None` leaves the lower layer alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
	pub url: Option<String>,
	pub out_dir: Option<PathBuf>,
	pub chrome: Option<PathBuf>,
	pub headed: bool,
	pub settle_ms: Option<u64>,
	pub control: Option<ControlBinding>,
}

impl VerifierConfig {
	/// Build the effective configuration and validate it.
	pub fn resolve(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
		let mut config = match file {
			Some(path) => Self::from_file(path),
			None => Ok(Self::default()),
		}
		.map_err(VerifyError::Config)?;

		config.apply(overrides);
		config.validate().map_err(VerifyError::Config)?;
		Ok(config)
	}

	pub fn from_file(path: &Path) -> anyhow::Result<Self> {
		let raw = std::fs::read_to_string(path)
			.with_context(|| format!("failed to read config file {}", path.display()))?;
		serde_json::from_str(&raw).with_context(|| format!("failed to parse config file {}", path.display()))
	}

	pub fn apply(&mut self, overrides: &Overrides) {
		if let Some(url) = &overrides.url {
			self.url = url.clone();
		}
		if let Some(out_dir) = &overrides.out_dir {
			self.out_dir = out_dir.clone();
		}
		if let Some(chrome) = &overrides.chrome {
			self.browser.executable = Some(chrome.clone());
		}
		if overrides.headed {
			self.browser.headless = false;
		}
		if let Some(settle_ms) = overrides.settle_ms {
			self.settle_ms = settle_ms;
		}
		if let Some(control) = &overrides.control {
			self.control = control.clone();
		}
	}

	pub fn validate(&self) -> anyhow::Result<()> {
		let url = url::Url::parse(&self.url).with_context(|| format!("invalid url {:?}", self.url))?;
		if !matches!(url.scheme(), "http" | "https" | "file") {
			bail!("unsupported url scheme {:?} in {}", url.scheme(), self.url);
		}
		for (field, value) in [
			("heading", &self.heading),
			("warning_text", &self.warning_text),
			("control_label", &self.control_label),
		] {
			if value.trim().is_empty() {
				bail!("{field} must not be empty");
			}
		}
		if self.browser.window_width == 0 || self.browser.window_height == 0 {
			bail!("browser window size must be non-zero");
		}
		Ok(())
	}

	pub fn heading_locator(&self) -> Locator {
		Locator::heading(&self.heading)
	}

	pub fn warning_locator(&self) -> Locator {
		Locator::text(self.warning_text.as_str())
	}

	pub fn control_locator(&self) -> Locator {
		self.control.locator(&self.control_label)
	}

	pub fn navigation_timeout(&self) -> Duration {
		Duration::from_millis(self.navigation_timeout_ms)
	}

	pub fn load_timeout(&self) -> Duration {
		Duration::from_millis(self.load_timeout_ms)
	}

	pub fn assertion_timeout(&self) -> Duration {
		Duration::from_millis(self.assertion_timeout_ms)
	}

	pub fn action_timeout(&self) -> Duration {
		Duration::from_millis(self.action_timeout_ms)
	}

	pub fn settle(&self) -> Duration {
		Duration::from_millis(self.settle_ms)
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;

	fn write_config(json: &str) -> tempfile::NamedTempFile {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(json.as_bytes()).unwrap();
		file
	}

	#[test]
	fn defaults_reproduce_the_dashboard_flow() {
		let config = VerifierConfig::resolve(None, &Overrides::default()).unwrap();
		assert_eq!(config.url, DEFAULT_URL);
		assert_eq!(config.out_dir, PathBuf::from("verification"));
		assert_eq!(config.fill_value, "100000");
		assert_eq!(config.settle(), Duration::from_millis(1000));
		assert_eq!(config.load_timeout(), Duration::from_millis(5000));
		assert!(config.browser.headless);
		assert_eq!(
			config.control_locator(),
			Locator::xpath("//label[text()='Investor Down Payment']/../following-sibling::input")
		);
	}

	#[test]
	fn file_overrides_defaults_and_flags_override_file() {
		let file = write_config(r#"{"url": "http://127.0.0.1:4000/dashboard", "settle_ms": 250, "out_dir": "shots"}"#);

		let from_file = VerifierConfig::resolve(Some(file.path()), &Overrides::default()).unwrap();
		assert_eq!(from_file.url, "http://127.0.0.1:4000/dashboard");
		assert_eq!(from_file.settle_ms, 250);
		assert_eq!(from_file.out_dir, PathBuf::from("shots"));
		assert_eq!(from_file.heading, "Stakeholder Dashboard");

		let overrides = Overrides {
			settle_ms: Some(1000),
			headed: true,
			..Overrides::default()
		};
		let layered = VerifierConfig::resolve(Some(file.path()), &overrides).unwrap();
		assert_eq!(layered.url, "http://127.0.0.1:4000/dashboard");
		assert_eq!(layered.settle_ms, 1000);
		assert!(!layered.browser.headless);
	}

	#[test]
	fn nested_browser_section_is_partial() {
		let file = write_config(r#"{"browser": {"args": ["--disable-gpu"]}}"#);
		let config = VerifierConfig::resolve(Some(file.path()), &Overrides::default()).unwrap();
		assert_eq!(config.browser.args, vec!["--disable-gpu".to_string()]);
		assert_eq!(config.browser.window_width, 1280);
		assert_eq!(config.browser.launch_options().timeout, Duration::from_secs(20));
	}

	#[test]
	fn unknown_fields_are_rejected() {
		let file = write_config(r#"{"ulr": "http://localhost"}"#);
		let err = VerifierConfig::resolve(Some(file.path()), &Overrides::default()).unwrap_err();
		assert!(matches!(err, VerifyError::Config(_)));
		assert!(err.to_string().contains("failed to parse config file"));
	}

	#[test]
	fn missing_file_is_a_config_error() {
		let err = VerifierConfig::resolve(Some(Path::new("/nonexistent/dashcheck.json")), &Overrides::default())
			.unwrap_err();
		assert!(err.to_string().contains("failed to read config file"));
	}

	#[test]
	fn bad_urls_are_rejected() {
		for url in ["localhost:5173", "not a url", "ftp://example.com/dashboard"] {
			let overrides = Overrides {
				url: Some(url.to_string()),
				..Overrides::default()
			};
			assert!(
				VerifierConfig::resolve(None, &overrides).is_err(),
				"{url} should be rejected"
			);
		}
	}

	#[test]
	fn control_binding_parses() {
		assert_eq!("structural".parse::<ControlBinding>(), Ok(ControlBinding::Structural));
		assert_eq!(
			"test-id:down-payment".parse::<ControlBinding>(),
			Ok(ControlBinding::TestId("down-payment".into()))
		);
		assert!("test-id:".parse::<ControlBinding>().is_err());
		assert!("label".parse::<ControlBinding>().is_err());
		assert_eq!(ControlBinding::TestId("x".into()).to_string(), "test-id:x");
	}

	#[test]
	fn control_binding_in_file() {
		let file = write_config(r#"{"control": "test-id:investor-down-payment"}"#);
		let config = VerifierConfig::resolve(Some(file.path()), &Overrides::default()).unwrap();
		assert_eq!(config.control_locator(), Locator::test_id("investor-down-payment"));
	}
}
