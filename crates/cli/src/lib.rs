//! dashcheck: headless verification of the stakeholder dashboard.
//!
//! The binary launches Chromium, runs [`verifier::DashboardVerifier`] and
//! exits with a status derived from [`output::ErrorCode`].

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod verifier;

use dashcheck_core::CdpBrowser;

use crate::cli::Cli;
use crate::config::VerifierConfig;
use crate::error::VerifyError;
use crate::output::{OutputFormat, VerificationReport};
use crate::verifier::{DashboardVerifier, Transcript};

/// Resolve configuration, launch the browser and run the verification.
pub async fn execute(cli: &Cli) -> VerificationReport {
	let transcript = Transcript::new(cli.format == OutputFormat::Text);

	let config = match VerifierConfig::resolve(cli.config.as_deref(), &cli.overrides()) {
		Ok(config) => config,
		Err(err) => {
			let mut fallback = VerifierConfig::default();
			if let Some(url) = &cli.url {
				fallback.url = url.clone();
			}
			return DashboardVerifier::new(fallback, transcript).report_failure(&err);
		}
	};

	tracing::debug!(?config, "effective configuration");
	let verifier = DashboardVerifier::new(config, transcript);

	let browser = match CdpBrowser::launch(&verifier.config().browser.launch_options()).await {
		Ok(browser) => browser,
		Err(e) => return verifier.report_failure(&VerifyError::BrowserLaunch(e)),
	};

	verifier.run(&browser).await
}
