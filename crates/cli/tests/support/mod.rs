//! In-memory stand-in for the dashboard and the browser hosting it.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashcheck_core::{Browser, ConsoleMessage, ConsoleMessageKind, Error, Locator, Page, PageEvent, Result};
use parking_lot::Mutex;
use tokio::sync::broadcast;

pub const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
pub const CONTROL_TEST_ID: &str = "investor-down-payment";

/// How the fake dashboard behaves.
#[derive(Debug, Clone, Copy)]
pub struct Scenario {
	pub unreachable: bool,
	/// Heading becomes visible on this visibility check (0 = immediately).
	pub heading_after_checks: Option<usize>,
	pub warning_by_default: bool,
	pub has_control: bool,
	pub duplicate_control: bool,
	/// The control also carries `data-testid`.
	pub control_has_test_id: bool,
	pub warning_reacts: bool,
	pub screenshot_fails: bool,
}

impl Scenario {
	pub fn healthy() -> Self {
		Self {
			unreachable: false,
			heading_after_checks: Some(0),
			warning_by_default: false,
			has_control: true,
			duplicate_control: false,
			control_has_test_id: false,
			warning_reacts: true,
			screenshot_fails: false,
		}
	}
}

pub struct PageState {
	pub scenario: Scenario,
	pub filled: Mutex<Option<String>>,
	pub changed: AtomicBool,
	pub fills: AtomicUsize,
	pub heading_checks: AtomicUsize,
	pub screenshots: AtomicUsize,
	events: broadcast::Sender<PageEvent>,
}

#[derive(Clone)]
pub struct DashboardPage {
	pub state: Arc<PageState>,
}

impl DashboardPage {
	pub fn new(scenario: Scenario) -> Self {
		Self {
			state: Arc::new(PageState {
				scenario,
				filled: Mutex::new(None),
				changed: AtomicBool::new(false),
				fills: AtomicUsize::new(0),
				heading_checks: AtomicUsize::new(0),
				screenshots: AtomicUsize::new(0),
				events: broadcast::channel(16).0,
			}),
		}
	}

	fn is_heading(locator: &Locator) -> bool {
		*locator == Locator::heading("Stakeholder Dashboard")
	}

	fn is_warning(locator: &Locator) -> bool {
		*locator == Locator::text("Day 1 Cash Insolvency Risk")
	}

	fn is_control(&self, locator: &Locator) -> bool {
		*locator == Locator::input_after_label("Investor Down Payment")
			|| (self.state.scenario.control_has_test_id && *locator == Locator::test_id(CONTROL_TEST_ID))
	}

	fn control_count(&self) -> usize {
		match (self.state.scenario.has_control, self.state.scenario.duplicate_control) {
			(false, _) => 0,
			(true, false) => 1,
			(true, true) => 2,
		}
	}

	fn warning_visible(&self) -> bool {
		let scenario = self.state.scenario;
		scenario.warning_by_default
			|| (scenario.warning_reacts
				&& self.state.changed.load(Ordering::SeqCst)
				&& self.state.filled.lock().as_deref() == Some("100000"))
	}

	fn single_control(&self, locator: &Locator) -> Result<()> {
		let count = if self.is_control(locator) { self.control_count() } else { 0 };
		match count {
			0 => Err(Error::ElementNotFound(locator.to_string())),
			1 => Ok(()),
			count => Err(Error::StrictModeViolation {
				locator: locator.to_string(),
				count,
			}),
		}
	}
}

#[async_trait]
impl Page for DashboardPage {
	fn events(&self) -> broadcast::Receiver<PageEvent> {
		self.state.events.subscribe()
	}

	async fn goto(&self, url: &str, _timeout: Duration) -> Result<()> {
		if self.state.scenario.unreachable {
			return Err(Error::NavigationFailed {
				url: url.to_string(),
				reason: "net::ERR_CONNECTION_REFUSED".into(),
			});
		}
		let _ = self.state.events.send(PageEvent::Console(ConsoleMessage::new(
			ConsoleMessageKind::Log,
			"dashboard mounted",
		)));
		let _ = self
			.state
			.events
			.send(PageEvent::PageError("ReferenceError: chart is not defined".into()));
		let _ = self.state.events.send(PageEvent::Load);
		Ok(())
	}

	async fn count(&self, locator: &Locator) -> Result<usize> {
		if self.is_control(locator) {
			return Ok(self.control_count());
		}
		Ok(usize::from(self.is_visible(locator).await?))
	}

	async fn is_visible(&self, locator: &Locator) -> Result<bool> {
		if Self::is_heading(locator) {
			let n = self.state.heading_checks.fetch_add(1, Ordering::SeqCst);
			return Ok(self.state.scenario.heading_after_checks.is_some_and(|after| n >= after));
		}
		if Self::is_warning(locator) {
			return Ok(self.warning_visible());
		}
		Ok(self.is_control(locator) && self.control_count() > 0)
	}

	async fn fill(&self, locator: &Locator, value: &str, _timeout: Duration) -> Result<()> {
		self.single_control(locator)?;
		*self.state.filled.lock() = Some(value.to_string());
		self.state.fills.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}

	async fn dispatch_event(&self, locator: &Locator, event_type: &str, _timeout: Duration) -> Result<()> {
		self.single_control(locator)?;
		if event_type == "change" {
			self.state.changed.store(true, Ordering::SeqCst);
		}
		Ok(())
	}

	async fn screenshot(&self) -> Result<Vec<u8>> {
		if self.state.scenario.screenshot_fails {
			return Err(Error::Io(std::io::Error::other("compositor unavailable")));
		}
		self.state.screenshots.fetch_add(1, Ordering::SeqCst);
		let _ = self.state.events.send(PageEvent::Console(ConsoleMessage::new(
			ConsoleMessageKind::Debug,
			"frame captured",
		)));
		Ok(PNG_MAGIC.to_vec())
	}
}

/// Browser handing out a single [`DashboardPage`] and counting closes.
pub struct FakeBrowser {
	pub page: DashboardPage,
	pub closes: AtomicUsize,
	pub fail_new_page: bool,
}

impl FakeBrowser {
	pub fn new(scenario: Scenario) -> Self {
		Self {
			page: DashboardPage::new(scenario),
			closes: AtomicUsize::new(0),
			fail_new_page: false,
		}
	}

	pub fn close_count(&self) -> usize {
		self.closes.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl Browser for FakeBrowser {
	type Page = DashboardPage;

	async fn new_page(&self) -> Result<DashboardPage> {
		if self.fail_new_page {
			return Err(Error::TargetClosed {
				target_type: "browser".into(),
			});
		}
		Ok(self.page.clone())
	}

	async fn close(&self) -> Result<()> {
		self.closes.fetch_add(1, Ordering::SeqCst);
		// Shutting down takes a moment, like the real thing.
		tokio::time::sleep(Duration::from_millis(10)).await;
		Ok(())
	}
}

/// Sorted file names in `dir`.
pub fn files_in(dir: &Path) -> Vec<String> {
	let mut names: Vec<String> = match std::fs::read_dir(dir) {
		Ok(entries) => entries
			.filter_map(|e| e.ok())
			.map(|e| e.file_name().to_string_lossy().into_owned())
			.collect(),
		Err(_) => Vec::new(),
	};
	names.sort();
	names
}
