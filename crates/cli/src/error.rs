use thiserror::Error;

use crate::output::ErrorCode;
use crate::verifier::Step;

pub type Result<T> = std::result::Result<T, VerifyError>;

#[derive(Debug, Error)]
pub enum VerifyError {
	#[error("invalid configuration: {0:#}")]
	Config(anyhow::Error),

	#[error("browser launch failed: {0}")]
	BrowserLaunch(#[source] dashcheck_core::Error),

	#[error("{step} failed: {source}")]
	Step {
		step: Step,
		#[source]
		source: dashcheck_core::Error,
	},
}

impl VerifyError {
	pub fn at(step: Step) -> impl FnOnce(dashcheck_core::Error) -> VerifyError {
		move |source| VerifyError::Step { step, source }
	}

	/// The step that failed, if the run got that far.
	pub fn step(&self) -> Option<Step> {
		match self {
			VerifyError::Step { step, .. } => Some(*step),
			_ => None,
		}
	}

	/// Classify the failure for the report and exit status.
	pub fn code(&self) -> ErrorCode {
		use dashcheck_core::Error as E;

		match self {
			VerifyError::Config(_) => ErrorCode::InvalidInput,
			VerifyError::BrowserLaunch(_) => ErrorCode::BrowserLaunchFailed,
			VerifyError::Step { source: E::ChannelClosed | E::TargetClosed { .. }, .. } => ErrorCode::InternalError,
			VerifyError::Step { step, source } => match step {
				_ if source.is_navigation_error() => ErrorCode::NavigationFailed,
				Step::Navigate => ErrorCode::NavigationFailed,
				Step::WaitForDashboard if source.is_timeout() => ErrorCode::DashboardNotLoaded,
				Step::AssertWarningHidden | Step::AssertWarningVisible if source.is_timeout() => {
					ErrorCode::AssertionFailed
				}
				_ if source.is_locator_error() => ErrorCode::SelectorNotFound,
				s if s.touches_control() => ErrorCode::SelectorNotFound,
				s if s.is_capture() => ErrorCode::ScreenshotFailed,
				_ if matches!(source, E::Io(_)) => ErrorCode::ScreenshotFailed,
				_ => ErrorCode::InternalError,
			},
		}
	}

	pub fn exit_code(&self) -> i32 {
		self.code().exit_code()
	}
}

#[cfg(test)]
mod tests {
	use dashcheck_core::Error as E;

	use super::*;

	fn step_error(step: Step, source: E) -> VerifyError {
		VerifyError::Step { step, source }
	}

	fn timeout() -> E {
		E::AssertionTimeout("expect(...) timed out after 5000ms".into())
	}

	#[test]
	fn steps_map_to_categories() {
		let cases = [
			(
				step_error(
					Step::Navigate,
					E::NavigationFailed {
						url: "http://localhost:5173/dashboard".into(),
						reason: "net::ERR_CONNECTION_REFUSED".into(),
					},
				),
				ErrorCode::NavigationFailed,
				2,
			),
			(step_error(Step::WaitForDashboard, timeout()), ErrorCode::DashboardNotLoaded, 3),
			(step_error(Step::AssertWarningHidden, timeout()), ErrorCode::AssertionFailed, 4),
			(step_error(Step::AssertWarningVisible, timeout()), ErrorCode::AssertionFailed, 4),
			(step_error(Step::LocateControl, timeout()), ErrorCode::SelectorNotFound, 5),
			(
				step_error(
					Step::FillControl,
					E::StrictModeViolation {
						locator: "css=input".into(),
						count: 2,
					},
				),
				ErrorCode::SelectorNotFound,
				5,
			),
			(
				step_error(Step::CaptureDefault, E::Io(std::io::Error::other("disk full"))),
				ErrorCode::ScreenshotFailed,
				7,
			),
			(
				VerifyError::BrowserLaunch(E::ExecutableNotFound),
				ErrorCode::BrowserLaunchFailed,
				6,
			),
			(
				VerifyError::Config(anyhow::anyhow!("invalid url")),
				ErrorCode::InvalidInput,
				8,
			),
		];

		for (err, code, exit) in cases {
			assert_eq!(err.code(), code, "{err}");
			assert_eq!(err.exit_code(), exit, "{err}");
		}
	}

	#[test]
	fn lost_connection_is_internal() {
		let err = step_error(Step::AssertWarningVisible, E::ChannelClosed);
		assert_eq!(err.code(), ErrorCode::InternalError);
		assert_eq!(err.exit_code(), 1);
	}

	#[test]
	fn evaluation_failure_outside_control_steps_is_internal() {
		let err = step_error(Step::WaitForDashboard, E::Evaluation("ReferenceError".into()));
		assert_eq!(err.code(), ErrorCode::InternalError);
	}

	#[test]
	fn message_names_the_step() {
		let err = step_error(Step::WaitForDashboard, timeout());
		assert!(err.to_string().starts_with("step 3 (wait_for_dashboard) failed: "));
		assert_eq!(err.step(), Some(Step::WaitForDashboard));
	}
}
