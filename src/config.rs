use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::client::ApiFlavor;
use crate::compare::BaselineFactors;
use crate::constants::*;
use crate::error::{Error, Result};
use crate::estimator::EnergyModel;

/// Everything a benchmark run can be tuned with
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
	pub server_url: String,
	pub api: ApiFlavor,
	pub health_timeout_secs: u64,
	pub request_timeout_secs: u64,
	pub prompt: String,
	pub max_tokens: u32,
	pub request_temperature: f32,
	pub sample_interval_ms: u64,
	pub energy_window_ms: u64,
	pub continuous_interval_secs: u64,
	pub log_level: String,
	pub energy: EnergyModel,
	pub baseline: BaselineFactors,
}

impl Default for BenchConfig {
	fn default() -> Self {
		Self {
			server_url: DEFAULT_SERVER_URL.to_string(),
			api: ApiFlavor::default(),
			health_timeout_secs: HEALTH_TIMEOUT_SECS,
			request_timeout_secs: REQUEST_TIMEOUT_SECS,
			prompt: DEFAULT_PROMPT.to_string(),
			max_tokens: DEFAULT_MAX_TOKENS,
			request_temperature: DEFAULT_REQUEST_TEMPERATURE,
			sample_interval_ms: DATA_COLLECTION_INTERVAL_MS,
			energy_window_ms: ENERGY_READING_WINDOW_MS,
			continuous_interval_secs: CONTINUOUS_INTERVAL_SECS,
			log_level: "warn".to_string(),
			energy: EnergyModel::default(),
			baseline: BaselineFactors::default(),
		}
	}
}

/// Optional overrides read from the TOML config section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
	server_url: Option<String>,
	api: Option<ApiFlavor>,
	health_timeout_secs: Option<u64>,
	request_timeout_secs: Option<u64>,
	prompt: Option<String>,
	max_tokens: Option<u32>,
	request_temperature: Option<f32>,
	sample_interval_ms: Option<u64>,
	energy_window_ms: Option<u64>,
	continuous_interval_secs: Option<u64>,
	log_level: Option<String>,
	energy: Option<EnergyModel>,
	baseline: Option<BaselineFactors>,
}

impl BenchConfig {
	/// Defaults, then the config file, then `INFERENCE_POWER_*` variables
	///
	/// The file is `path` when given, else `INFERENCE_POWER_CONFIG` when set.
	/// Values are not validated here; callers apply their own overrides first
	/// and then call [`BenchConfig::validate`].
	pub fn load(path: Option<&Path>) -> Result<Self> {
		let mut config = Self::default();

		let path = path
			.map(Path::to_path_buf)
			.or_else(|| env::var(format!("{ENV_PREFIX}CONFIG")).ok().map(PathBuf::from));

		if let Some(path) = path {
			config.apply_file(&path)?;
		}

		config.apply_env_with(|key| env::var(key).ok())?;
		Ok(config)
	}

	/// Merges the `[inference_power]` section of a TOML file
	pub fn apply_file(&mut self, path: &Path) -> Result<()> {
		let contents = fs::read_to_string(path)
			.map_err(|e| Error::Config(format!("config file '{}' not accessible: {e}", path.display())))?;
		self.apply_toml(&contents)
	}

	pub fn apply_toml(&mut self, contents: &str) -> Result<()> {
		let document: HashMap<String, toml::Value> =
			toml::from_str(contents).map_err(|e| Error::Config(format!("invalid TOML: {e}")))?;

		let Some(section) = document.get(DEFAULT_CONFIG_SECTION) else {
			return Err(Error::Config(format!(
				"config section '{DEFAULT_CONFIG_SECTION}' not found"
			)));
		};

		let file: FileConfig = section
			.clone()
			.try_into()
			.map_err(|e| Error::Config(format!("failed to parse section '{DEFAULT_CONFIG_SECTION}': {e}")))?;

		if let Some(v) = file.server_url {
			self.server_url = v;
		}
		if let Some(v) = file.api {
			self.api = v;
		}
		if let Some(v) = file.health_timeout_secs {
			self.health_timeout_secs = v;
		}
		if let Some(v) = file.request_timeout_secs {
			self.request_timeout_secs = v;
		}
		if let Some(v) = file.prompt {
			self.prompt = v;
		}
		if let Some(v) = file.max_tokens {
			self.max_tokens = v;
		}
		if let Some(v) = file.request_temperature {
			self.request_temperature = v;
		}
		if let Some(v) = file.sample_interval_ms {
			self.sample_interval_ms = v;
		}
		if let Some(v) = file.energy_window_ms {
			self.energy_window_ms = v;
		}
		if let Some(v) = file.continuous_interval_secs {
			self.continuous_interval_secs = v;
		}
		if let Some(v) = file.log_level {
			self.log_level = v;
		}
		if let Some(v) = file.energy {
			self.energy = v;
		}
		if let Some(v) = file.baseline {
			self.baseline = v;
		}

		Ok(())
	}

	/// Applies `INFERENCE_POWER_*` overrides looked up through `lookup`
	pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
		let var = |name: &str| {
			lookup(&format!("{ENV_PREFIX}{name}"))
				.filter(|v| !v.trim().is_empty())
				.map(|v| (format!("{ENV_PREFIX}{name}"), v))
		};

		if let Some((_, v)) = var("SERVER_URL") {
			self.server_url = v;
		}
		if let Some((key, v)) = var("API") {
			self.api = <ApiFlavor as clap::ValueEnum>::from_str(&v, true)
				.map_err(|_| Error::Config(format!("{key}: unknown API flavor '{v}'")))?;
		}
		if let Some((_, v)) = var("LOG_LEVEL") {
			self.log_level = v;
		}
		if let Some((_, v)) = var("PROMPT") {
			self.prompt = v;
		}

		parse_var(var("HEALTH_TIMEOUT_SECS"), &mut self.health_timeout_secs)?;
		parse_var(var("REQUEST_TIMEOUT_SECS"), &mut self.request_timeout_secs)?;
		parse_var(var("MAX_TOKENS"), &mut self.max_tokens)?;
		parse_var(var("REQUEST_TEMPERATURE"), &mut self.request_temperature)?;
		parse_var(var("SAMPLE_INTERVAL_MS"), &mut self.sample_interval_ms)?;
		parse_var(var("ENERGY_WINDOW_MS"), &mut self.energy_window_ms)?;
		parse_var(var("CONTINUOUS_INTERVAL_SECS"), &mut self.continuous_interval_secs)?;
		parse_var(var("WATTS_PER_GHZ"), &mut self.energy.watts_per_ghz)?;
		parse_var(var("DEFAULT_FREQUENCY_MHZ"), &mut self.energy.default_frequency_mhz)?;
		parse_var(var("SPEED_FACTOR"), &mut self.baseline.speed_factor)?;
		parse_var(var("CPU_FACTOR"), &mut self.baseline.cpu_factor)?;
		parse_var(var("CPU_CAP"), &mut self.baseline.cpu_cap)?;
		parse_var(var("ENERGY_FACTOR"), &mut self.baseline.energy_factor)?;
		parse_var(var("ENERGY_FLOOR_WATTS"), &mut self.baseline.energy_floor_watts)?;

		Ok(())
	}

	/// Rejects values that would make a run meaningless
	pub fn validate(&self) -> Result<()> {
		let invalid = |what: &str| Err(Error::Config(what.to_string()));

		if self.server_url.is_empty() {
			return invalid("server_url must not be empty");
		}
		if self.max_tokens == 0 {
			return invalid("max_tokens must be positive");
		}
		if self.sample_interval_ms == 0 {
			return invalid("sample_interval_ms must be positive");
		}
		if self.energy_window_ms == 0 {
			return invalid("energy_window_ms must be positive");
		}
		if self.health_timeout_secs == 0 || self.request_timeout_secs == 0 {
			return invalid("timeouts must be positive");
		}
		if !(self.energy.watts_per_ghz.is_finite() && self.energy.watts_per_ghz >= 0.0) {
			return invalid("energy.watts_per_ghz must be a non-negative number");
		}
		if !(self.energy.default_frequency_mhz.is_finite() && self.energy.default_frequency_mhz > 0.0) {
			return invalid("energy.default_frequency_mhz must be positive");
		}

		let b = &self.baseline;
		let factors = [b.speed_factor, b.cpu_factor, b.energy_factor, b.energy_floor_watts];
		if factors.iter().any(|f| !(f.is_finite() && *f > 0.0)) {
			return invalid("baseline factors and energy floor must be positive");
		}
		if !(b.cpu_cap > 0.0 && b.cpu_cap <= 100.0) {
			return invalid("baseline.cpu_cap must be within (0, 100]");
		}

		Ok(())
	}

	pub fn sample_interval(&self) -> Duration {
		Duration::from_millis(self.sample_interval_ms)
	}

	pub fn energy_window(&self) -> Duration {
		Duration::from_millis(self.energy_window_ms)
	}

	pub fn continuous_interval(&self) -> Duration {
		Duration::from_secs(self.continuous_interval_secs)
	}
}

fn parse_var<T: FromStr>(var: Option<(String, String)>, target: &mut T) -> Result<()> {
	if let Some((key, value)) = var {
		*target = value
			.trim()
			.parse()
			.map_err(|_| Error::Config(format!("{key}: invalid value '{value}'")))?;
	}
	Ok(())
}
