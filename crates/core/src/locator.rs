//! Element locators.
//!
//! A [`Locator`] is a description, not a handle: it is re-resolved against the
//! live DOM every time it is used, so it survives re-renders. Resolution runs
//! in the page through the resolver script in `js/resolver.js`, which receives
//! the locator serialized as JSON.
//!
//! Matching rules for `Role` names and `Text`:
//! - whitespace is collapsed and trimmed on both sides
//! - without `exact`, matching is a case-insensitive substring test
//! - `Text` yields the innermost matching elements only

use std::fmt;

use serde::{Deserialize, Serialize};

/// Page-side resolver object with `resolve(query)` and `isVisible(el)`.
pub(crate) const RESOLVER_JS: &str = include_str!("js/resolver.js");

/// Describes how to find elements in the current page state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Locator {
	/// CSS selector.
	Css { selector: String },
	/// XPath expression; only element nodes are kept.
	#[serde(rename = "xpath")]
	XPath { expression: String },
	/// ARIA role (explicit or implicit) with an optional accessible name.
	Role {
		role: String,
		#[serde(default)]
		name: Option<String>,
		#[serde(default)]
		exact: bool,
	},
	/// Element containing the given text.
	Text {
		text: String,
		#[serde(default)]
		exact: bool,
	},
	/// Element carrying `data-testid`.
	TestId { id: String },
}

impl Locator {
	pub fn css(selector: impl Into<String>) -> Self {
		Self::Css {
			selector: selector.into(),
		}
	}

	pub fn xpath(expression: impl Into<String>) -> Self {
		Self::XPath {
			expression: expression.into(),
		}
	}

	pub fn role(role: impl Into<String>, name: Option<&str>) -> Self {
		Self::Role {
			role: role.into(),
			name: name.map(str::to_string),
			exact: false,
		}
	}

	/// Heading (`h1`-`h6` or `role=heading`) whose accessible name contains `name`.
	pub fn heading(name: &str) -> Self {
		Self::role("heading", Some(name))
	}

	pub fn text(text: impl Into<String>) -> Self {
		Self::Text {
			text: text.into(),
			exact: false,
		}
	}

	pub fn text_exact(text: impl Into<String>) -> Self {
		Self::Text {
			text: text.into(),
			exact: true,
		}
	}

	pub fn test_id(id: impl Into<String>) -> Self {
		Self::TestId { id: id.into() }
	}

	/// The `<input>` following the container of the `<label>` with exactly this text.
	///
	/// Matches markup shaped like
	/// `<div><div><label>Text</label></div><input></div>`.
	pub fn input_after_label(label: &str) -> Self {
		Self::xpath(format!(
			"//label[text()={}]/../following-sibling::input",
			xpath_literal(label)
		))
	}

	/// JSON form consumed by the page-side resolver.
	pub(crate) fn to_query_json(&self) -> String {
		// Serializing a plain enum of strings and bools cannot fail.
		serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
	}
}

impl fmt::Display for Locator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Locator::Css { selector } => write!(f, "css={selector}"),
			Locator::XPath { expression } => write!(f, "xpath={expression}"),
			Locator::Role { role, name, exact } => match name {
				Some(name) if *exact => write!(f, "role={role}[name=\"{name}\" s]"),
				Some(name) => write!(f, "role={role}[name=\"{name}\"]"),
				None => write!(f, "role={role}"),
			},
			Locator::Text { text, exact: true } => write!(f, "text=\"{text}\""),
			Locator::Text { text, exact: false } => write!(f, "text={text}"),
			Locator::TestId { id } => write!(f, "testid={id}"),
		}
	}
}

/// Quote a string as an XPath 1.0 literal.
///
/// XPath has no escape sequences, so a value containing both quote kinds is
/// assembled with `concat()`.
pub fn xpath_literal(value: &str) -> String {
	if !value.contains('\'') {
		return format!("'{value}'");
	}
	if !value.contains('"') {
		return format!("\"{value}\"");
	}

	let parts: Vec<String> = value
		.split('\'')
		.map(|part| format!("'{part}'"))
		.collect();
	format!("concat({})", parts.join(", \"'\", "))
}
