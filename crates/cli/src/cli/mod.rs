
use std::path::PathBuf;

use clap::Parser;

use crate::config::{ControlBinding, Overrides};
use crate::output::OutputFormat;

/// Verify that the stakeholder dashboard raises its Day 1 insolvency warning.
#[derive(Parser, Debug)]
#[command(name = "dashcheck")]
#[command(version)]
pub struct Cli {
	/// Dashboard URL [default: http://localhost:5173/dashboard]
	#[arg(long, env = "DASHCHECK_URL", value_name = "URL")]
	pub url: Option<String>,

	/// Directory for screenshots [default: verification]
	#[arg(long, value_name = "DIR")]
	pub out_dir: Option<PathBuf>,

	/// JSON configuration file; flags override its values
	#[arg(long, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Chromium executable
	#[arg(long, env = "DASHCHECK_CHROME", value_name = "PATH")]
	pub chrome: Option<PathBuf>,

	/// Show the browser window
	#[arg(long)]
	pub headed: bool,

	/// Fixed pause before checking for the warning (default 1000, 0 disables)
	#[arg(long, value_name = "MS")]
	pub settle_ms: Option<u64>,

	/// How to find the down payment control: structural or test-id:<ID>
	#[arg(long, value_name = "BINDING")]
	pub control: Option<ControlBinding>,

	/// Output format: text (default) or json
	#[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
	pub format: OutputFormat,

	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,
}

impl Cli {
	pub fn overrides(&self) -> Overrides {
		Overrides {
			url: self.url.clone(),
			out_dir: self.out_dir.clone(),
			chrome: self.chrome.clone(),
			headed: self.headed,
			settle_ms: self.settle_ms,
			control: self.control.clone(),
		}
	}
}
