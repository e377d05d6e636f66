//! Form input and DOM event methods for [`CdpPage`].

use dashcheck_runtime::{Error, Result};
use serde::Deserialize;

use super::CdpPage;
use super::eval::locator_script;
use crate::locator::Locator;

/// Sets the value through the prototype setter so frameworks that track the
/// property (React and friends) observe the change, then fires `input`.
const FILL_BODY: &str = r#"
if (els.length !== 1) return { count: els.length };
const el = els[0];
const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype
	: el instanceof HTMLInputElement ? HTMLInputElement.prototype : null;
if (!proto) return { count: 1, error: `Element is not an <input> or <textarea>: <${el.tagName.toLowerCase()}>` };
el.focus();
Object.getOwnPropertyDescriptor(proto, "value").set.call(el, VALUE);
el.dispatchEvent(new Event("input", { bubbles: true }));
return { count: 1 };
"#;

const DISPATCH_BODY: &str = r#"
if (els.length !== 1) return { count: els.length };
els[0].dispatchEvent(new Event(EVENT_TYPE, { bubbles: true, cancelable: true }));
return { count: 1 };
"#;

/// What a single-element action script reports back.
#[derive(Debug, Deserialize)]
struct ActionOutcome {
	count: usize,
	#[serde(default)]
	error: Option<String>,
}

impl ActionOutcome {
	fn into_result(self, locator: &Locator) -> Result<()> {
		match self.count {
			0 => Err(Error::ElementNotFound(locator.to_string())),
			1 => match self.error {
				Some(message) => Err(Error::InvalidArgument(message)),
				None => Ok(()),
			},
			count => Err(Error::StrictModeViolation {
				locator: locator.to_string(),
				count,
			}),
		}
	}
}

/// Encode a Rust string as a JavaScript string literal.
fn js_string(value: &str) -> String {
	serde_json::Value::String(value.to_string()).to_string()
}

impl CdpPage {
	pub(super) async fn fill_value(&self, locator: &Locator, value: &str) -> Result<()> {
		tracing::info!(target: "dashcheck", %locator, value, "fill");
		let body = FILL_BODY.replace("VALUE", &js_string(value));
		let outcome: ActionOutcome = self.evaluate(&locator_script(locator, &body)).await?;
		outcome.into_result(locator)
	}

	pub(super) async fn dispatch_dom_event(&self, locator: &Locator, event_type: &str) -> Result<()> {
		tracing::info!(target: "dashcheck", %locator, event_type, "dispatch_event");
		let body = DISPATCH_BODY.replace("EVENT_TYPE", &js_string(event_type));
		let outcome: ActionOutcome = self.evaluate(&locator_script(locator, &body)).await?;
		outcome.into_result(locator)
	}
}
