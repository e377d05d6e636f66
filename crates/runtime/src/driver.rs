//! Chromium process management.
//!
//! Locates a Chromium-family executable, launches it headless with remote
//! debugging on an ephemeral port, and reads the DevTools WebSocket URL the
//! browser prints on stderr.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, Command};

use crate::error::{Error, Result};

/// Environment variable overriding executable discovery.
pub const CHROME_ENV: &str = "DASHCHECK_CHROME";

/// Prefix of the stderr line announcing the DevTools endpoint.
const DEVTOOLS_PREFIX: &str = "DevTools listening on ";

/// How to start the browser.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
	/// Explicit executable; discovered when `None`.
	pub executable: Option<PathBuf>,
	pub headless: bool,
	/// Viewport size passed as `--window-size`.
	pub window_size: (u32, u32),
	/// Additional command-line switches.
	pub args: Vec<String>,
	/// Maximum time to wait for the DevTools endpoint.
	pub timeout: Duration,
}

impl Default for LaunchOptions {
	fn default() -> Self {
		Self {
			executable: None,
			headless: true,
			window_size: (1280, 720),
			args: Vec::new(),
			timeout: Duration::from_secs(20),
		}
	}
}

impl LaunchOptions {
	/// Command-line switches for this launch, excluding the executable.
	pub fn command_args(&self, user_data_dir: &Path) -> Vec<String> {
		let mut args = vec![
			"--remote-debugging-port=0".to_string(),
			format!("--user-data-dir={}", user_data_dir.display()),
			"--no-first-run".to_string(),
			"--no-default-browser-check".to_string(),
			"--disable-background-networking".to_string(),
			"--disable-extensions".to_string(),
			format!("--window-size={},{}", self.window_size.0, self.window_size.1),
		];
		if self.headless {
			args.push("--headless=new".to_string());
			args.push("--hide-scrollbars".to_string());
			args.push("--mute-audio".to_string());
		}
		args.extend(self.args.iter().cloned());
		args.push("about:blank".to_string());
		args
	}
}

/// A running browser process and its DevTools endpoint.
///
/// The child is killed if this value is dropped without [`shutdown`](Self::shutdown).
#[derive(Debug)]
pub struct BrowserProcess {
	child: Child,
	ws_url: String,
	_profile: TempDir,
}

impl BrowserProcess {
	/// Browser-level DevTools WebSocket URL.
	pub fn ws_url(&self) -> &str {
		&self.ws_url
	}

	/// Wait for the process to exit on its own, killing it after `grace`.
	pub async fn shutdown(mut self, grace: Duration) -> Result<()> {
		match tokio::time::timeout(grace, self.child.wait()).await {
			Ok(status) => {
				let status = status?;
				tracing::debug!(%status, "Browser process exited");
			}
			Err(_) => {
				tracing::warn!(grace_ms = grace.as_millis() as u64, "Browser did not exit, killing");
				self.child.kill().await?;
			}
		}
		Ok(())
	}
}

/// Find Chrome/Chromium on the system.
///
/// Checks [`CHROME_ENV`] first, then well-known command names and install paths.
pub fn find_chromium_executable() -> Option<PathBuf> {
	if let Some(path) = std::env::var_os(CHROME_ENV) {
		let path = PathBuf::from(path);
		if path.exists() {
			return Some(path);
		}
		if let Ok(found) = which::which(&path) {
			return Some(found);
		}
		tracing::warn!(path = %path.display(), "{CHROME_ENV} does not point to an executable");
	}

	let candidates: &[&str] = if cfg!(target_os = "macos") {
		&[
			"/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
			"/Applications/Chromium.app/Contents/MacOS/Chromium",
			"/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
		]
	} else if cfg!(target_os = "windows") {
		&[
			r"C:\Program Files\Google\Chrome\Application\chrome.exe",
			r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
			r"C:\Program Files\Chromium\Application\chrome.exe",
		]
	} else {
		&[
			"chromium",
			"chromium-browser",
			"google-chrome-stable",
			"google-chrome",
			"headless_shell",
			"/usr/bin/chromium",
			"/usr/bin/chromium-browser",
			"/usr/bin/google-chrome",
			"/snap/bin/chromium",
		]
	};

	for candidate in candidates {
		let path = Path::new(candidate);
		if path.is_absolute() {
			if path.exists() {
				return Some(path.to_path_buf());
			}
		} else if let Ok(found) = which::which(candidate) {
			return Some(found);
		}
	}

	None
}

/// Extract the WebSocket URL from a Chromium stderr line.
pub(crate) fn parse_devtools_line(line: &str) -> Option<&str> {
	let url = line.trim().strip_prefix(DEVTOOLS_PREFIX)?.trim();
	(url.starts_with("ws://") || url.starts_with("wss://")).then_some(url)
}

/// Read stderr until the DevTools announcement, keeping a short tail for diagnostics.
async fn read_devtools_url(lines: &mut Lines<BufReader<ChildStderr>>) -> Result<String> {
	let mut tail = Vec::new();
	while let Some(line) = lines.next_line().await? {
		if let Some(url) = parse_devtools_line(&line) {
			return Ok(url.to_string());
		}
		tracing::trace!(target: "dashcheck_runtime::browser", "{line}");
		tail.push(line);
		if tail.len() > 8 {
			tail.remove(0);
		}
	}
	Err(Error::LaunchFailed(format!(
		"browser exited before DevTools endpoint was ready: {}",
		tail.join(" | ")
	)))
}

/// Launch Chromium and wait for its DevTools endpoint.
pub async fn launch(options: &LaunchOptions) -> Result<BrowserProcess> {
	let executable = match &options.executable {
		Some(path) => path.clone(),
		None => find_chromium_executable().ok_or(Error::ExecutableNotFound)?,
	};

	let profile = tempfile::Builder::new().prefix("dashcheck-profile-").tempdir()?;
	let args = options.command_args(profile.path());
	tracing::debug!(executable = %executable.display(), ?args, "Launching browser");

	let mut child = Command::new(&executable)
		.args(&args)
		.stdin(Stdio::null())
		.stdout(Stdio::null())
		.stderr(Stdio::piped())
		.kill_on_drop(true)
		.spawn()
		.map_err(|e| Error::LaunchFailed(format!("{}: {e}", executable.display())))?;

	let stderr = child
		.stderr
		.take()
		.ok_or_else(|| Error::LaunchFailed("browser stderr not captured".into()))?;
	let mut lines = BufReader::new(stderr).lines();

	let found = tokio::time::timeout(options.timeout, read_devtools_url(&mut lines)).await;

	let ws_url = match found {
		Ok(result) => result?,
		Err(_) => {
			let _ = child.kill().await;
			return Err(Error::LaunchFailed(format!(
				"DevTools endpoint not announced within {}ms",
				options.timeout.as_millis()
			)));
		}
	};

	// Keep draining stderr so the browser never blocks on a full pipe.
	tokio::spawn(async move {
		while let Ok(Some(line)) = lines.next_line().await {
			tracing::trace!(target: "dashcheck_runtime::browser", "{line}");
		}
	});

	tracing::info!(ws_url = %ws_url, "Browser launched");

	Ok(BrowserProcess {
		child,
		ws_url,
		_profile: profile,
	})
}
