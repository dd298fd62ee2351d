use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

use inference_power::client::ApiFlavor;
use inference_power::config::BenchConfig;
use inference_power::{Mode, OutputFormat};

/// Measures throughput and estimated CPU energy of a local inference server
#[derive(Parser, Debug)]
#[command(name = "inference-power")]
#[command(version)]
struct Args {
	/// Inference server base URL
	#[arg(short, long)]
	url: Option<String>,

	/// Server API flavor
	#[arg(long, value_enum)]
	api: Option<ApiFlavor>,

	/// Prompt sent for the measurement
	#[arg(short, long)]
	prompt: Option<String>,

	/// Maximum tokens to generate
	#[arg(short = 'n', long)]
	max_tokens: Option<u32>,

	/// Repeat the report until interrupted
	#[arg(long, conflicts_with = "suite")]
	continuous: bool,

	/// Seconds between runs in continuous mode
	#[arg(long)]
	interval_secs: Option<u64>,

	/// Run the fixed token-speed test suite
	#[arg(long)]
	suite: bool,

	/// Print results as JSON instead of a text report
	#[arg(long)]
	json: bool,

	/// TOML config file with an [inference_power] section
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Log level (trace, debug, info, warn, error)
	#[arg(long)]
	log_level: Option<String>,
}

impl Args {
	fn apply(&self, config: &mut BenchConfig) {
		if let Some(url) = &self.url {
			config.server_url = url.clone();
		}
		if let Some(api) = self.api {
			config.api = api;
		}
		if let Some(prompt) = &self.prompt {
			config.prompt = prompt.clone();
		}
		if let Some(max_tokens) = self.max_tokens {
			config.max_tokens = max_tokens;
		}
		if let Some(secs) = self.interval_secs {
			config.continuous_interval_secs = secs;
		}
		if let Some(level) = &self.log_level {
			config.log_level = level.clone();
		}
	}

	fn mode(&self) -> Mode {
		if self.continuous {
			Mode::Continuous
		} else if self.suite {
			Mode::Suite
		} else {
			Mode::Single
		}
	}
}

fn init_logging(level: &str) {
	let level = match level.to_lowercase().as_str() {
		"trace" => Level::TRACE,
		"debug" => Level::DEBUG,
		"info" => Level::INFO,
		"error" => Level::ERROR,
		_ => Level::WARN,
	};

	let subscriber = FmtSubscriber::builder()
		.with_max_level(level)
		.with_target(false)
		.with_writer(std::io::stderr)
		.finish();

	if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
		eprintln!("Logging setup failed: {}", e);
	}
}

fn main() -> ExitCode {
	let args = Args::parse();

	let mut config = match BenchConfig::load(args.config.as_deref()) {
		Ok(config) => config,
		Err(e) => {
			eprintln!("{}", e);
			return ExitCode::FAILURE;
		},
	};
	args.apply(&mut config);

	init_logging(&config.log_level);

	if let Err(e) = config.validate() {
		eprintln!("{}", e);
		return ExitCode::FAILURE;
	}

	let format = if args.json { OutputFormat::Json } else { OutputFormat::Text };
	let mode = args.mode();

	match inference_power::run(&config, mode, format) {
		Ok(()) => {
			if mode == Mode::Single && format == OutputFormat::Text {
				println!();
				println!("Tip: Run with --continuous for ongoing monitoring");
			}
			ExitCode::SUCCESS
		},
		Err(e) => {
			debug!("Run failed: {:?}", e);
			eprintln!("Error: {}", e);
			ExitCode::FAILURE
		},
	}
}
