use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Diagnostics go to stderr so stdout carries only the transcript or report.
pub fn init_logging(verbosity: u8) {
	// 0 = errors only, CDP traffic silenced
	// 1 (-v) = verifier actions, runtime warnings
	// 2+ (-vv) = debug for everything, including protocol traffic
	let filter = match verbosity {
		0 => "error,dashcheck_runtime=off",
		1 => "info,dashcheck_runtime=warn",
		_ => "debug",
	};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	// A second init (tests, embedding) keeps the first subscriber.
	let _ = tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.try_init();
}
