//! The dashboard verification scenario.
//!
//! [`DashboardVerifier::run`] opens one page, walks the [`Step`]s in order
//! and always closes the browser before returning, whatever the outcome.
//! On failure an `error.png` is captured first.

mod step;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashcheck_core::{Browser, EventSubscription, Page, PageEvent, expect, on_page_event};
use parking_lot::Mutex;
use tokio::time::Instant;

pub use self::step::Step;
use crate::config::VerifierConfig;
use crate::error::{Result, VerifyError};
use crate::output::{Artifact, ArtifactKind, VerificationReport};

pub const DEFAULT_SCREENSHOT: &str = "1_dashboard_default.png";
pub const WARNING_SCREENSHOT: &str = "2_dashboard_warning.png";
pub const ERROR_SCREENSHOT: &str = "error.png";

/// Progress and console lines collected during a run.
///
/// Clones share the same buffer. With `echo` set each line is also printed
/// to stdout as it arrives.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
	lines: Arc<Mutex<Vec<String>>>,
	echo: bool,
}

impl Transcript {
	pub fn new(echo: bool) -> Self {
		Self {
			lines: Arc::default(),
			echo,
		}
	}

	pub fn line(&self, line: impl Into<String>) {
		let line = line.into();
		if self.echo {
			println!("{line}");
		}
		self.lines.lock().push(line);
	}

	pub fn lines(&self) -> Vec<String> {
		self.lines.lock().clone()
	}
}

/// Bookkeeping for a single run.
#[derive(Debug, Default)]
struct Progress {
	completed: Vec<Step>,
	artifacts: Vec<Artifact>,
}

impl Progress {
	fn complete(&mut self, step: Step) {
		tracing::info!(target: "dashcheck", %step, "step complete");
		self.completed.push(step);
	}
}

pub struct DashboardVerifier {
	config: VerifierConfig,
	transcript: Transcript,
}

impl DashboardVerifier {
	pub fn new(config: VerifierConfig, transcript: Transcript) -> Self {
		Self { config, transcript }
	}

	pub fn config(&self) -> &VerifierConfig {
		&self.config
	}

	pub fn transcript(&self) -> &Transcript {
		&self.transcript
	}

	/// Run every step against `browser`, then close it.
	pub async fn run<B: Browser>(&self, browser: &B) -> VerificationReport {
		let started = Instant::now();
		let mut progress = Progress::default();

		let result = self.with_browser(browser, &mut progress).await;

		match result {
			Ok(()) => VerificationReport::passed(
				&self.config.url,
				progress.completed,
				progress.artifacts,
				self.transcript.lines(),
				started.elapsed(),
			),
			Err(err) => VerificationReport::failed(
				&self.config.url,
				progress.completed,
				&err,
				progress.artifacts,
				self.transcript.lines(),
				started.elapsed(),
			),
		}
	}

	/// Report for a run that never reached a browser.
	pub fn report_failure(&self, err: &VerifyError) -> VerificationReport {
		self.transcript.line(format!("Verification failed: {err}"));
		VerificationReport::failed(
			&self.config.url,
			Vec::new(),
			err,
			Vec::new(),
			self.transcript.lines(),
			std::time::Duration::ZERO,
		)
	}

	async fn with_browser<B: Browser>(&self, browser: &B, progress: &mut Progress) -> Result<()> {
		// The page and its observers stay alive until the browser is closed.
		let mut attached = None;
		let result = match browser.new_page().await {
			Ok(page) => {
				let observers = self.observe(&page);
				progress.complete(Step::AttachObservers);

				let result = self.verify(&page, progress).await;
				if let Err(err) = &result {
					self.transcript.line(format!("Verification failed: {err}"));
					self.capture_error(&page, progress).await;
				}
				attached = Some((page, observers));
				result
			}
			Err(e) => {
				let err = VerifyError::BrowserLaunch(e);
				self.transcript.line(format!("Verification failed: {err}"));
				Err(err)
			}
		};

		if let Err(e) = browser.close().await {
			tracing::warn!(error = %e, "browser close failed");
		}
		drop(attached);

		result
	}

	/// Forward console output and uncaught page errors to the transcript.
	fn observe<P: Page>(&self, page: &P) -> EventSubscription {
		let transcript = self.transcript.clone();
		on_page_event(page, move |event| match event {
			PageEvent::Console(msg) => transcript.line(format!("Console: {}", msg.text())),
			PageEvent::PageError(message) => transcript.line(format!("Page Error: {message}")),
			PageEvent::Load => {}
		})
	}

	async fn verify<P: Page>(&self, page: &P, progress: &mut Progress) -> Result<()> {
		let config = &self.config;
		let heading = config.heading_locator();
		let warning = config.warning_locator();
		let control = config.control_locator();

		self.say("Navigating to Dashboard...");
		page.goto(&config.url, config.navigation_timeout())
			.await
			.map_err(VerifyError::at(Step::Navigate))?;
		progress.complete(Step::Navigate);

		self.say("Waiting for dashboard load...");
		expect(page, &heading)
			.with_timeout(config.load_timeout())
			.to_be_visible()
			.await
			.map_err(VerifyError::at(Step::WaitForDashboard))?;
		progress.complete(Step::WaitForDashboard);

		self.say("Checking default state...");
		expect(page, &warning)
			.with_timeout(config.assertion_timeout())
			.not()
			.to_be_visible()
			.await
			.map_err(VerifyError::at(Step::AssertWarningHidden))?;
		progress.complete(Step::AssertWarningHidden);

		self.capture(page, Step::CaptureDefault, ArtifactKind::Default, DEFAULT_SCREENSHOT, progress)
			.await?;

		self.say("Adjusting parameters to trigger warning...");
		expect(page, &control)
			.with_timeout(config.action_timeout())
			.to_be_attached()
			.await
			.map_err(VerifyError::at(Step::LocateControl))?;
		progress.complete(Step::LocateControl);

		self.say(format!("Setting {} to {}...", config.control_label, config.fill_value));
		page.fill(&control, &config.fill_value, config.action_timeout())
			.await
			.map_err(VerifyError::at(Step::FillControl))?;
		progress.complete(Step::FillControl);

		page.dispatch_event(&control, "change", config.action_timeout())
			.await
			.map_err(VerifyError::at(Step::DispatchChange))?;
		progress.complete(Step::DispatchChange);

		let settle = config.settle();
		if !settle.is_zero() {
			tracing::debug!(settle_ms = config.settle_ms, "settling");
			tokio::time::sleep(settle).await;
		}
		progress.complete(Step::Settle);

		self.say("Checking for warning...");
		expect(page, &warning)
			.with_timeout(config.assertion_timeout())
			.to_be_visible()
			.await
			.map_err(VerifyError::at(Step::AssertWarningVisible))?;
		progress.complete(Step::AssertWarningVisible);

		self.capture(page, Step::CaptureWarning, ArtifactKind::Warning, WARNING_SCREENSHOT, progress)
			.await?;

		self.say("Verification complete.");
		Ok(())
	}

	async fn capture<P: Page>(
		&self,
		page: &P,
		step: Step,
		kind: ArtifactKind,
		file_name: &str,
		progress: &mut Progress,
	) -> Result<()> {
		let path = self.artifact_path(file_name);
		page.screenshot_to_file(&path).await.map_err(VerifyError::at(step))?;
		progress.artifacts.push(Artifact { kind, path });
		progress.complete(step);
		Ok(())
	}

	/// Best effort: a failing error screenshot must not mask the step failure.
	async fn capture_error<P: Page>(&self, page: &P, progress: &mut Progress) {
		let path = self.artifact_path(ERROR_SCREENSHOT);
		match page.screenshot_to_file(&path).await {
			Ok(()) => progress.artifacts.push(Artifact {
				kind: ArtifactKind::Error,
				path,
			}),
			Err(e) => tracing::warn!(error = %e, path = %path.display(), "error screenshot failed"),
		}
	}

	fn artifact_path(&self, file_name: &str) -> PathBuf {
		Path::new(&self.config.out_dir).join(file_name)
	}

	fn say(&self, line: impl Into<String>) {
		self.transcript.line(line);
	}
}
