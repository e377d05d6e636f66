//! Auto-retrying assertions on locators.
//!
//! ```ignore
//! expect(&page, &Locator::heading("Dashboard"))
//!     .with_timeout(Duration::from_secs(5))
//!     .to_be_visible()
//!     .await?;
//! expect(&page, &warning).not().to_be_visible().await?;
//! ```
//!
//! The condition is re-evaluated with backoff (100, 250, 500, then every
//! 1000 ms) until it holds or the timeout passes. It is always evaluated at
//! least once, so a zero timeout is a plain check.

use std::time::Duration;

use dashcheck_runtime::{Error, Result};
use tokio::time::Instant;

use crate::api::Page;
use crate::locator::Locator;

/// Default timeout for assertions.
pub const DEFAULT_ASSERTION_TIMEOUT: Duration = Duration::from_millis(5000);

const POLL_INTERVALS_MS: [u64; 4] = [100, 250, 500, 1000];

/// Start an assertion on `locator` within `page`.
pub fn expect<'a, P: Page + ?Sized>(page: &'a P, locator: &'a Locator) -> Expectation<'a, P> {
	Expectation {
		page,
		locator,
		timeout: DEFAULT_ASSERTION_TIMEOUT,
		negate: false,
	}
}

/// Pending assertion built by [`expect`].
pub struct Expectation<'a, P: ?Sized> {
	page: &'a P,
	locator: &'a Locator,
	timeout: Duration,
	negate: bool,
}

impl<'a, P: Page + ?Sized> Expectation<'a, P> {
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	/// Invert the following matcher.
	pub fn not(mut self) -> Self {
		self.negate = !self.negate;
		self
	}

	/// Passes once any matching element is visible.
	pub async fn to_be_visible(self) -> Result<()> {
		self.poll(Condition::Visible(true)).await
	}

	/// Passes once no matching element is visible (absent counts as hidden).
	pub async fn to_be_hidden(self) -> Result<()> {
		self.poll(Condition::Visible(false)).await
	}

	/// Passes once at least one element matches, visible or not.
	pub async fn to_be_attached(self) -> Result<()> {
		self.poll(Condition::Attached(true)).await
	}

	async fn check(&self, condition: Condition) -> Result<bool> {
		match condition {
			Condition::Visible(_) => self.page.is_visible(self.locator).await,
			Condition::Attached(_) => Ok(self.page.count(self.locator).await? > 0),
		}
	}

	async fn poll(self, condition: Condition) -> Result<()> {
		let expected = condition.wanted() != self.negate;
		let deadline = Instant::now() + self.timeout;
		let mut attempt = 0usize;

		loop {
			let last_error = match self.check(condition).await {
				Ok(actual) if actual == expected => return Ok(()),
				Ok(_) => None,
				Err(e @ (Error::ChannelClosed | Error::TargetClosed { .. })) => return Err(e),
				Err(e) => {
					tracing::debug!(locator = %self.locator, error = %e, "expectation check failed, retrying");
					Some(e.to_string())
				}
			};

			let now = Instant::now();
			if now >= deadline {
				return Err(Error::AssertionTimeout(self.describe_failure(condition, last_error)));
			}

			let interval = Duration::from_millis(POLL_INTERVALS_MS[attempt.min(POLL_INTERVALS_MS.len() - 1)]);
			tokio::time::sleep(interval.min(deadline - now)).await;
			attempt += 1;
		}
	}

	fn describe_failure(&self, condition: Condition, last_error: Option<String>) -> String {
		let not = if self.negate { "not()." } else { "" };
		let mut message = format!(
			"expect({}).{not}{}() timed out after {}ms",
			self.locator,
			condition.matcher(),
			self.timeout.as_millis()
		);
		if let Some(err) = last_error {
			message.push_str(&format!(" (last error: {err})"));
		}
		message
	}
}

#[derive(Debug, Clone, Copy)]
enum Condition {
	Visible(bool),
	Attached(bool),
}

impl Condition {
	fn wanted(self) -> bool {
		match self {
			Self::Visible(v) | Self::Attached(v) => v,
		}
	}

	fn matcher(self) -> &'static str {
		match self {
			Self::Visible(true) => "to_be_visible",
			Self::Visible(false) => "to_be_hidden",
			Self::Attached(_) => "to_be_attached",
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use async_trait::async_trait;
	use tokio::sync::broadcast;

	use super::*;
	use crate::api::PageEvent;

	/// Page whose visibility answer flips after a number of checks.
	struct FlippingPage {
		visible_after: Option<usize>,
		/// The first checks fail with an evaluation error.
		failing_checks: usize,
		checks: Arc<AtomicUsize>,
		events: broadcast::Sender<PageEvent>,
	}

	impl FlippingPage {
		fn new(visible_after: Option<usize>) -> Self {
			Self {
				visible_after,
				failing_checks: 0,
				checks: Arc::new(AtomicUsize::new(0)),
				events: broadcast::channel(4).0,
			}
		}
	}

	#[async_trait]
	impl Page for FlippingPage {
		fn events(&self) -> broadcast::Receiver<PageEvent> {
			self.events.subscribe()
		}

		async fn goto(&self, _url: &str, _timeout: Duration) -> Result<()> {
			Ok(())
		}

		async fn count(&self, _locator: &Locator) -> Result<usize> {
			Ok(1)
		}

		async fn is_visible(&self, _locator: &Locator) -> Result<bool> {
			let n = self.checks.fetch_add(1, Ordering::SeqCst);
			if n < self.failing_checks {
				return Err(Error::Evaluation("document is still loading".into()));
			}
			Ok(self.visible_after.is_some_and(|after| n >= after))
		}

		async fn fill(&self, _locator: &Locator, _value: &str, _timeout: Duration) -> Result<()> {
			Ok(())
		}

		async fn dispatch_event(&self, _locator: &Locator, _event_type: &str, _timeout: Duration) -> Result<()> {
			Ok(())
		}

		async fn screenshot(&self) -> Result<Vec<u8>> {
			Ok(Vec::new())
		}
	}

	#[tokio::test(start_paused = true)]
	async fn visible_immediately_checks_once() {
		let page = FlippingPage::new(Some(0));
		let locator = Locator::text("ready");
		expect(&page, &locator).to_be_visible().await.unwrap();
		assert_eq!(page.checks.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn retries_until_visible() {
		let page = FlippingPage::new(Some(3));
		let locator = Locator::text("ready");
		let start = Instant::now();
		expect(&page, &locator).to_be_visible().await.unwrap();
		assert_eq!(page.checks.load(Ordering::SeqCst), 4);
		// 100 + 250 + 500 ms of backoff before the fourth check.
		assert_eq!(start.elapsed(), Duration::from_millis(850));
	}

	#[tokio::test(start_paused = true)]
	async fn times_out_at_deadline() {
		let page = FlippingPage::new(None);
		let locator = Locator::heading("Stakeholder Dashboard");
		let start = Instant::now();
		let err = expect(&page, &locator)
			.with_timeout(Duration::from_millis(5000))
			.to_be_visible()
			.await
			.unwrap_err();

		assert!(matches!(err, Error::AssertionTimeout(_)));
		assert!(err.to_string().contains("to_be_visible() timed out after 5000ms"));
		assert!(err.to_string().contains("role=heading"));
		assert_eq!(start.elapsed(), Duration::from_millis(5000));
	}

	#[tokio::test(start_paused = true)]
	async fn negated_visible_passes_when_hidden() {
		let page = FlippingPage::new(None);
		let locator = Locator::text("Day 1 Cash Insolvency Risk");
		expect(&page, &locator).not().to_be_visible().await.unwrap();
		expect(&page, &locator).to_be_hidden().await.unwrap();
	}

	#[tokio::test(start_paused = true)]
	async fn negated_visible_fails_when_shown() {
		let page = FlippingPage::new(Some(0));
		let locator = Locator::text("Day 1 Cash Insolvency Risk");
		let err = expect(&page, &locator)
			.not()
			.to_be_visible()
			.await
			.unwrap_err();
		assert!(err.to_string().contains("not().to_be_visible()"));
	}

	#[tokio::test(start_paused = true)]
	async fn zero_timeout_is_single_check() {
		let page = FlippingPage::new(Some(1));
		let locator = Locator::text("late");
		let result = expect(&page, &locator)
			.with_timeout(Duration::ZERO)
			.to_be_visible()
			.await;
		assert!(result.is_err());
		assert_eq!(page.checks.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn attached_uses_count() {
		let page = FlippingPage::new(None);
		let locator = Locator::input_after_label("Investor Down Payment");
		expect(&page, &locator).to_be_attached().await.unwrap();
		assert_eq!(page.checks.load(Ordering::SeqCst), 0);

		let err = expect(&page, &locator)
			.not()
			.with_timeout(Duration::from_millis(300))
			.to_be_attached()
			.await
			.unwrap_err();
		assert!(err.to_string().contains("not().to_be_attached() timed out after 300ms"));
	}

	#[tokio::test(start_paused = true)]
	async fn timeout_reports_only_a_final_check_error() {
		let locator = Locator::text("late");

		let page = FlippingPage {
			failing_checks: usize::MAX,
			..FlippingPage::new(None)
		};
		let err = expect(&page, &locator)
			.with_timeout(Duration::from_millis(300))
			.to_be_visible()
			.await
			.unwrap_err();
		assert!(err.to_string().contains("(last error: Evaluation failed: document is still loading)"));

		let page = FlippingPage {
			failing_checks: 1,
			..FlippingPage::new(None)
		};
		let err = expect(&page, &locator)
			.with_timeout(Duration::from_millis(300))
			.to_be_visible()
			.await
			.unwrap_err();
		assert!(page.checks.load(Ordering::SeqCst) > 1);
		assert!(!err.to_string().contains("last error"), "{err}");
	}
}
