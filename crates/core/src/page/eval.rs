//! JavaScript evaluation and locator queries for [`CdpPage`].

use std::time::Duration;

use dashcheck_runtime::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;

use super::CdpPage;
use crate::cdp::EvaluateResult;
use crate::locator::{Locator, RESOLVER_JS};

/// Interval between element lookups while an action waits for its target.
const ACTION_POLL: Duration = Duration::from_millis(100);

/// Wrap `body` so it runs with `dc` bound to the resolver and `els` to the matches of `locator`.
pub(crate) fn locator_script(locator: &Locator, body: &str) -> String {
	format!(
		"((dc) => {{ const els = dc.resolve({query}); {body} }})({resolver})",
		query = locator.to_query_json(),
		resolver = RESOLVER_JS.trim(),
	)
}

impl CdpPage {
	/// Evaluates an expression in the page and deserializes its JSON value.
	pub async fn evaluate<T: DeserializeOwned>(&self, expression: &str) -> Result<T> {
		let response: EvaluateResult = self
			.call(
				"Runtime.evaluate",
				serde_json::json!({
					"expression": expression,
					"returnByValue": true,
					"awaitPromise": true,
				}),
			)
			.await?;

		if let Some(details) = response.exception_details {
			return Err(Error::Evaluation(details.message()));
		}

		let value = response.result.value.unwrap_or(Value::Null);
		serde_json::from_value(value).map_err(|e| Error::Evaluation(format!("unexpected result: {e}")))
	}

	pub(super) async fn query_count(&self, locator: &Locator) -> Result<usize> {
		self.evaluate(&locator_script(locator, "return els.length;")).await
	}

	pub(super) async fn query_visible(&self, locator: &Locator) -> Result<bool> {
		self.evaluate(&locator_script(locator, "return els.some((el) => dc.isVisible(el));"))
			.await
	}

	/// Wait until at least one element matches, failing with [`Error::ElementNotFound`].
	pub(super) async fn wait_for_match(&self, locator: &Locator, timeout: Duration) -> Result<()> {
		let deadline = Instant::now() + timeout;
		loop {
			if self.query_count(locator).await? > 0 {
				return Ok(());
			}
			let now = Instant::now();
			if now >= deadline {
				return Err(Error::ElementNotFound(format!(
					"{locator} (waited {}ms)",
					timeout.as_millis()
				)));
			}
			tokio::time::sleep(ACTION_POLL.min(deadline - now)).await;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn script_embeds_locator_and_body() {
		let script = locator_script(&Locator::text("Day 1 Cash Insolvency Risk"), "return els.length;");
		assert!(script.starts_with("((dc) => { const els = dc.resolve("));
		assert!(script.contains(r#""kind":"text""#));
		assert!(script.contains(r#""text":"Day 1 Cash Insolvency Risk""#));
		assert!(script.contains("return els.length;"));
		assert!(script.trim_end().ends_with("}))"));
	}

	#[test]
	fn script_escapes_quotes_through_json() {
		let script = locator_script(&Locator::css(r#"input[name="down"]"#), "return 0;");
		assert!(script.contains(r#""selector":"input[name=\"down\"]""#));
	}
}
