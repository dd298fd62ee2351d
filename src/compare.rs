use serde::{Deserialize, Serialize};

use crate::constants::{
	BASELINE_CPU_CAP, BASELINE_CPU_FACTOR, BASELINE_ENERGY_FACTOR, BASELINE_SPEED_FACTOR, MIN_ENERGY_WATTS,
};
use crate::measure::MeasurementResult;

/// Scaling used to synthesize the comparison baseline
///
/// These are rough estimates of how an unquantized model behaves relative to
/// the measured one, not measured values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineFactors {
	/// Measured throughput is this many times the baseline's
	pub speed_factor: f64,

	/// Baseline CPU usage is measured usage times this
	pub cpu_factor: f64,

	/// Upper bound for baseline CPU usage, in percent
	pub cpu_cap: f64,

	/// Baseline power is measured power times this
	pub energy_factor: f64,

	/// Lower bound applied to every power figure used as a divisor
	pub energy_floor_watts: f64,
}

impl Default for BaselineFactors {
	fn default() -> Self {
		Self {
			speed_factor: BASELINE_SPEED_FACTOR,
			cpu_factor: BASELINE_CPU_FACTOR,
			cpu_cap: BASELINE_CPU_CAP,
			energy_factor: BASELINE_ENERGY_FACTOR,
			energy_floor_watts: MIN_ENERGY_WATTS,
		}
	}
}

/// Synthetic baseline derived from a measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaselineEstimate {
	pub tokens_per_second: f64,
	pub cpu_percent: f64,
	pub energy_watts: f64,
}

/// A measurement set against its synthetic baseline
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparison {
	pub baseline: BaselineEstimate,

	/// Tokens per watt of the measured run, with the energy floor applied
	pub tokens_per_watt: f64,

	/// Tokens per watt of the baseline, with the energy floor applied
	pub baseline_tokens_per_watt: f64,

	/// Measured over baseline throughput
	///
	/// The baseline throughput is itself the measured throughput divided by
	/// `speed_factor`, so this always equals `speed_factor`. Kept for report
	/// compatibility; it carries no information of its own.
	pub speed_ratio: f64,

	/// How much less power the measured run draws, in percent
	pub energy_reduction_pct: f64,

	/// Measured over baseline tokens per watt; 0 when the baseline produced nothing
	pub efficiency_ratio: f64,
}

impl BaselineFactors {
	/// Power figure safe to divide by
	pub fn floor_energy(&self, watts: f64) -> f64 {
		watts.max(self.energy_floor_watts)
	}

	pub fn tokens_per_watt(&self, tokens_per_second: f64, watts: f64) -> f64 {
		tokens_per_second / self.floor_energy(watts)
	}

	pub fn baseline(&self, result: &MeasurementResult) -> BaselineEstimate {
		BaselineEstimate {
			tokens_per_second: result.tokens_per_second / self.speed_factor,
			cpu_percent: (result.cpu_avg * self.cpu_factor).min(self.cpu_cap),
			energy_watts: result.estimated_energy * self.energy_factor,
		}
	}

	/// Derives the baseline and the relative speed, energy and efficiency figures
	pub fn compare(&self, result: &MeasurementResult) -> Comparison {
		let baseline = self.baseline(result);

		let speed_ratio = if baseline.tokens_per_second > 0.0 {
			result.tokens_per_second / baseline.tokens_per_second
		} else {
			self.speed_factor
		};

		// Only the divisor is floored; a non-positive measured energy reads as 100% or more
		let energy_reduction_pct =
			(1.0 - result.estimated_energy / self.floor_energy(baseline.energy_watts)) * 100.0;

		let tokens_per_watt = self.tokens_per_watt(result.tokens_per_second, result.estimated_energy);
		let baseline_tokens_per_watt = self.tokens_per_watt(baseline.tokens_per_second, baseline.energy_watts);

		let efficiency_ratio = if baseline_tokens_per_watt > 0.0 {
			tokens_per_watt / baseline_tokens_per_watt
		} else {
			0.0
		};

		Comparison {
			baseline,
			tokens_per_watt,
			baseline_tokens_per_watt,
			speed_ratio,
			energy_reduction_pct,
			efficiency_ratio,
		}
	}
}

/// [`BaselineFactors::compare`] with the default factors
pub fn compare(result: &MeasurementResult) -> Comparison {
	BaselineFactors::default().compare(result)
}
