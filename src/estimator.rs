use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{DEFAULT_FREQUENCY_MHZ, WATTS_PER_GHZ};
use crate::provider::MetricsProvider;

/// Linear CPU power approximation
///
/// `watts = (cpu% / 100) * (MHz / 1000) * watts_per_ghz`. This is a rough
/// estimate derived from utilization and clock speed, not a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyModel {
	/// Power drawn per GHz at 100% utilization
	pub watts_per_ghz: f64,

	/// Substituted when the frequency is unknown
	pub default_frequency_mhz: f64,
}

impl Default for EnergyModel {
	fn default() -> Self {
		Self {
			watts_per_ghz: WATTS_PER_GHZ,
			default_frequency_mhz: DEFAULT_FREQUENCY_MHZ,
		}
	}
}

/// A single instantaneous power estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyReading {
	pub cpu_percent: f64,
	pub frequency_mhz: f64,
	pub watts: f64,
}

impl EnergyModel {
	/// Estimated power draw in watts
	///
	/// A frequency that is zero, negative or not finite counts as unknown.
	pub fn estimate_watts(&self, cpu_percent: f64, frequency_mhz: f64) -> f64 {
		let frequency_mhz = if frequency_mhz.is_finite() && frequency_mhz > 0.0 {
			frequency_mhz
		} else {
			self.default_frequency_mhz
		};

		(cpu_percent / 100.0) * (frequency_mhz / 1000.0) * self.watts_per_ghz
	}

	/// Reads CPU load over `window` and the current frequency, then estimates power
	///
	/// Unreadable metrics degrade to 0% load or the default frequency.
	pub fn read(&self, provider: &mut dyn MetricsProvider, window: Duration) -> EnergyReading {
		let cpu_percent = provider.cpu_percent(window).unwrap_or_else(|e| {
			warn!("CPU load unavailable for energy estimate: {}", e);
			0.0
		});
		let frequency_mhz = provider.frequency_mhz().unwrap_or(0.0);

		EnergyReading {
			cpu_percent,
			frequency_mhz,
			watts: self.estimate_watts(cpu_percent, frequency_mhz),
		}
	}
}

/// [`EnergyModel::estimate_watts`] with the default calibration
pub fn estimate_watts(cpu_percent: f64, frequency_mhz: f64) -> f64 {
	EnergyModel::default().estimate_watts(cpu_percent, frequency_mhz)
}

/// Energy attributed to a run: post-run minus pre-run estimate
///
/// Short runs can produce a negative or near-zero delta. It is passed through
/// unclamped; consumers floor it where they divide by it.
pub fn energy_delta(before: &EnergyReading, after: &EnergyReading) -> f64 {
	after.watts - before.watts
}
