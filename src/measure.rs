use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::aggregate;
use crate::client::{CompletionRequest, InferenceClient};
use crate::config::BenchConfig;
use crate::constants::MIN_DURATION_SECS;
use crate::error::{Error, Result};
use crate::estimator::{EnergyModel, energy_delta};
use crate::provider::MetricsProvider;
use crate::sampler::{Sampler, SamplerState};

/// Outcome of one completed measurement run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MeasurementResult {
	/// Wall time of the inference call in seconds
	pub duration_secs: f64,
	pub tokens_generated: u64,
	pub prompt_tokens: Option<u64>,
	pub tokens_per_second: f64,
	/// Average CPU utilization while sampling, in percent
	pub cpu_avg: f64,
	/// Peak CPU utilization while sampling, in percent
	pub cpu_peak: f64,
	pub sample_count: usize,
	pub average_temperature: Option<f64>,
	/// Mean clock speed across samples, 0 when it could not be read
	pub average_frequency_mhz: f64,
	/// Post-call minus pre-call power estimate in watts; may be negative
	pub estimated_energy: f64,
	/// Server timing breakdown, as reported
	pub timings: BTreeMap<String, f64>,
	pub model: String,
	/// Text the server generated
	pub response: String,
}

/// Runs inference calls while the sampler records CPU activity
pub struct MeasurementCoordinator {
	client: Box<dyn InferenceClient>,
	provider: Box<dyn MetricsProvider>,
	sampler: Sampler,
	energy: EnergyModel,
	energy_window: Duration,
	request_temperature: f32,
}

impl MeasurementCoordinator {
	pub fn new(client: Box<dyn InferenceClient>, provider: Box<dyn MetricsProvider>, config: &BenchConfig) -> Self {
		let sampler = Sampler::new(provider.clone_box(), config.sample_interval());

		Self {
			client,
			provider,
			sampler,
			energy: config.energy,
			energy_window: config.energy_window(),
			request_temperature: config.request_temperature,
		}
	}

	pub fn sampler_state(&self) -> SamplerState {
		self.sampler.state()
	}

	pub fn server_url(&self) -> &str {
		self.client.base_url()
	}

	/// Probes the server before any measurement is attempted
	pub fn check_server(&self) -> Result<()> {
		self.client.health().map_err(|e| Error::ServerUnreachable {
			url: self.client.base_url().to_string(),
			reason: e.to_string(),
		})
	}

	/// Runs one generation and measures it
	///
	/// The sampler runs for the whole call and is stopped and joined before
	/// this returns, whether or not the call succeeded.
	pub fn measure(&mut self, prompt: &str, max_tokens: u32) -> Result<MeasurementResult> {
		let request = CompletionRequest {
			prompt: prompt.to_string(),
			max_tokens,
			temperature: self.request_temperature,
		};

		self.sampler.start()?;

		let before = self.energy.read(self.provider.as_mut(), self.energy_window);
		debug!("Pre-call estimate: {:.2} W at {:.1}% load", before.watts, before.cpu_percent);

		let started = Instant::now();
		let outcome = self.client.complete(&request);
		let elapsed = started.elapsed();

		let completion = match outcome {
			Ok(completion) => completion,
			Err(e) => {
				if let Err(stop_err) = self.sampler.stop() {
					warn!("Sampler shutdown after failed call: {}", stop_err);
				}
				warn!("Inference call failed after {:.2}s: {}", elapsed.as_secs_f64(), e);
				return Err(Error::InferenceCallFailed(e));
			},
		};

		let after = self.energy.read(self.provider.as_mut(), self.energy_window);
		debug!("Post-call estimate: {:.2} W at {:.1}% load", after.watts, after.cpu_percent);

		let mut samples = self.sampler.stop()?;
		let cpu = aggregate(&mut samples);

		let duration_secs = elapsed.as_secs_f64().max(MIN_DURATION_SECS);
		let tokens_per_second = completion.tokens_generated as f64 / duration_secs;

		info!(
			"Generated {} tokens in {:.2}s ({:.2} tok/s, {} CPU samples)",
			completion.tokens_generated, duration_secs, tokens_per_second, cpu.count
		);

		Ok(MeasurementResult {
			duration_secs,
			tokens_generated: completion.tokens_generated,
			prompt_tokens: completion.prompt_tokens,
			tokens_per_second,
			cpu_avg: cpu.average,
			cpu_peak: cpu.peak,
			sample_count: cpu.count,
			average_temperature: cpu.average_temperature,
			average_frequency_mhz: cpu.average_frequency_mhz,
			estimated_energy: energy_delta(&before, &after),
			timings: completion.timings,
			model: completion.model,
			response: completion.content,
		})
	}
}
