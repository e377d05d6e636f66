use clap::Parser;
use dashcheck_cli::{cli::Cli, logging, output};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let report = dashcheck_cli::execute(&cli).await;
	output::print_report(&report, cli.format);

	std::process::exit(report.exit_code());
}
