//! dashcheck-core: pages, locators and assertions over the Chrome DevTools Protocol.
//!
//! ```ignore
//! use dashcheck_core::{Browser, CdpBrowser, LaunchOptions, Locator, Page, expect};
//!
//! let browser = CdpBrowser::launch(&LaunchOptions::default()).await?;
//! let page = browser.new_page().await?;
//! page.goto("http://localhost:5173/dashboard", Duration::from_secs(30)).await?;
//! expect(&page, &Locator::heading("Stakeholder Dashboard")).to_be_visible().await?;
//! browser.close().await?;
//! ```
//!
//! Scenarios should be generic over [`Browser`] / [`Page`] so they can be
//! exercised against in-memory doubles.

mod api;
mod browser;
mod cdp;
pub mod events;
pub mod expect;
pub mod locator;
mod page;

pub use api::{Browser, ConsoleMessage, ConsoleMessageKind, Page, PageEvent};
pub use browser::CdpBrowser;
pub use dashcheck_runtime::{Error, LaunchOptions, Result, find_chromium_executable};
pub use events::{EventSubscription, on_page_event};
pub use expect::{DEFAULT_ASSERTION_TIMEOUT, Expectation, expect};
pub use locator::Locator;
pub use page::CdpPage;
