use std::fmt;

use serde::{Deserialize, Serialize};

/// One stage of the dashboard verification, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
	AttachObservers,
	Navigate,
	WaitForDashboard,
	AssertWarningHidden,
	CaptureDefault,
	LocateControl,
	FillControl,
	DispatchChange,
	Settle,
	AssertWarningVisible,
	CaptureWarning,
}

impl Step {
	pub const ALL: [Step; 11] = [
		Step::AttachObservers,
		Step::Navigate,
		Step::WaitForDashboard,
		Step::AssertWarningHidden,
		Step::CaptureDefault,
		Step::LocateControl,
		Step::FillControl,
		Step::DispatchChange,
		Step::Settle,
		Step::AssertWarningVisible,
		Step::CaptureWarning,
	];

	/// 1-based position in the run.
	pub fn number(self) -> usize {
		Self::ALL.iter().position(|s| *s == self).map_or(0, |i| i + 1)
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Step::AttachObservers => "attach_observers",
			Step::Navigate => "navigate",
			Step::WaitForDashboard => "wait_for_dashboard",
			Step::AssertWarningHidden => "assert_warning_hidden",
			Step::CaptureDefault => "capture_default",
			Step::LocateControl => "locate_control",
			Step::FillControl => "fill_control",
			Step::DispatchChange => "dispatch_change",
			Step::Settle => "settle",
			Step::AssertWarningVisible => "assert_warning_visible",
			Step::CaptureWarning => "capture_warning",
		}
	}

	/// Steps that act on the bound form control.
	pub fn touches_control(self) -> bool {
		matches!(self, Step::LocateControl | Step::FillControl | Step::DispatchChange)
	}

	pub fn is_capture(self) -> bool {
		matches!(self, Step::CaptureDefault | Step::CaptureWarning)
	}
}

impl fmt::Display for Step {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "step {} ({})", self.number(), self.as_str())
	}
}
