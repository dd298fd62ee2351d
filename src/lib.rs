pub mod aggregate;
pub mod client;
pub mod compare;
pub mod config;
pub mod constants;
pub mod error;
pub mod estimator;
pub mod interrupt;
pub mod measure;
pub mod provider;
pub mod report;
pub mod sampler;
pub mod snapshot;
pub mod system;
pub mod util;

use std::io::{self, Write};

use tracing::{error, info};

use crate::client::create_client;
use crate::config::BenchConfig;
use crate::error::{Error, Result};
use crate::measure::MeasurementCoordinator;
use crate::provider::create_provider;
use crate::report::RunReport;
use crate::system::SystemInfo;

/// What the process should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
	/// One measurement and report
	Single,
	/// A report every interval until interrupted
	Continuous,
	/// The fixed set of speed tests
	Suite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
	Text,
	Json,
}

/// Runs the benchmark in the requested mode, writing to stdout
pub fn run(config: &BenchConfig, mode: Mode, format: OutputFormat) -> Result<()> {
	match mode {
		Mode::Single => generate_report(config, format).map(|_| ()),
		Mode::Continuous => run_continuous(config, format),
		Mode::Suite => run_speed_suite(config, format),
	}
}

fn build_coordinator(config: &BenchConfig) -> Result<MeasurementCoordinator> {
	let client = create_client(config).map_err(|e| Error::Config(format!("cannot build HTTP client: {e}")))?;
	Ok(MeasurementCoordinator::new(client, create_provider(), config))
}

/// Health check, system information, one measurement and its comparison
pub fn generate_report(config: &BenchConfig, format: OutputFormat) -> Result<RunReport> {
	let mut coordinator = build_coordinator(config)?;
	let mut out = io::stdout().lock();
	let text = format == OutputFormat::Text;

	if text {
		let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
		report::write_header(&mut out, &now)?;
	}

	let health = coordinator.check_server();
	if text {
		report::write_server_status(&mut out, coordinator.server_url(), health.is_ok())?;
	}
	health?;

	if text {
		let provider = create_provider();
		report::write_system_info(&mut out, &SystemInfo::collect(provider.as_ref()))?;
		writeln!(out)?;
		writeln!(out, "Running inference test...")?;
		out.flush()?;
	}

	let result = match coordinator.measure(&config.prompt, config.max_tokens) {
		Ok(result) => result,
		Err(e) => {
			if text {
				report::write_failure(&mut out, &e.to_string())?;
			}
			return Err(e);
		},
	};

	let comparison = config.baseline.compare(&result);
	let run_report = RunReport { result, comparison };

	if text {
		report::write_run(&mut out, &run_report)?;
	} else {
		write_json(&mut out, &run_report)?;
	}

	Ok(run_report)
}

/// Repeats [`generate_report`] until SIGINT, carrying no state between runs
pub fn run_continuous(config: &BenchConfig, format: OutputFormat) -> Result<()> {
	interrupt::install_handler()?;

	let interval = config.continuous_interval();
	if format == OutputFormat::Text {
		println!("Starting continuous monitoring... (Ctrl+C to stop)");
	}

	loop {
		if let Err(e) = generate_report(config, format) {
			error!("Run failed: {}", e);
		}

		if interrupt::interrupted() {
			break;
		}

		if format == OutputFormat::Text {
			println!();
			println!("{}", "=".repeat(50));
			println!("Waiting {} seconds before next test...", interval.as_secs());
		}

		if interrupt::sleep_unless_interrupted(interval) {
			break;
		}
	}

	info!("Continuous monitoring stopped");
	if format == OutputFormat::Text {
		println!();
		println!("Monitoring stopped.");
	}
	Ok(())
}

/// Runs every speed test against the server and prints the summary
pub fn run_speed_suite(config: &BenchConfig, format: OutputFormat) -> Result<()> {
	let mut coordinator = build_coordinator(config)?;
	coordinator.check_server()?;

	let summary = match format {
		OutputFormat::Text => {
			let mut out = io::stdout().lock();
			writeln!(out, "Token Generation Speed Test")?;
			writeln!(out, "==================================")?;
			writeln!(out)?;

			let summary = speed_test::run_suite(&mut coordinator, &speed_test::SPEED_TESTS, &mut out)?;
			speed_test::write_summary(&mut out, &summary)?;
			summary
		},
		OutputFormat::Json => {
			let summary = speed_test::run_suite(&mut coordinator, &speed_test::SPEED_TESTS, &mut io::sink())?;
			write_json(&mut io::stdout().lock(), &summary)?;
			summary
		},
	};

	if summary.entries.is_empty() && !summary.failures.is_empty() {
		return Err(Error::SuiteFailed(summary.failures.len()));
	}
	Ok(())
}

fn write_json(out: &mut impl Write, value: &impl serde::Serialize) -> Result<()> {
	serde_json::to_writer(&mut *out, value).map_err(io::Error::from)?;
	writeln!(out)?;
	out.flush()?;
	Ok(())
}
