pub mod procfs;

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::time::Duration;
use std::{io, thread};

use tracing::debug;

use crate::snapshot::CpuSnapshot;
use crate::util::mean;

/// Sensor name -> readings in °C
pub type TemperatureMap = BTreeMap<String, Vec<f64>>;

/// Source of instantaneous CPU metrics
///
/// Utilization is stateful: each call reports activity since the previous call
/// on the same instance, so the sampler gets its own instance via `clone_box`.
pub trait MetricsProvider: Debug + Send {
	/// Utilization percentage per logical core since the previous call
	fn per_core_utilization(&mut self) -> io::Result<Vec<f64>>;

	/// Current CPU frequency in MHz
	fn frequency_mhz(&self) -> io::Result<f64>;

	/// Temperature readings grouped by sensor name
	fn temperatures(&self) -> io::Result<TemperatureMap>;

	/// Mean utilization across all cores over `window`, blocking for its duration
	fn cpu_percent(&mut self, window: Duration) -> io::Result<f64> {
		self.per_core_utilization()?;
		thread::sleep(window);
		let per_core = self.per_core_utilization()?;
		Ok(mean(&per_core).unwrap_or(0.0))
	}

	/// Fresh instance with its own utilization state
	fn clone_box(&self) -> Box<dyn MetricsProvider>;
}

/// Picks a single CPU temperature out of a sensor map
///
/// Intel `coretemp` exposes one reading per core and is averaged; the other
/// known CPU sensors are taken at their first reading.
pub fn select_cpu_temperature(temps: &TemperatureMap) -> Option<f64> {
	if let Some(readings) = temps.get("coretemp") {
		if let Some(avg) = mean(readings) {
			return Some(avg);
		}
	}

	["cpu_thermal", "k10temp", "zenpower"]
		.iter()
		.find_map(|name| temps.get(*name).and_then(|readings| readings.first().copied()))
}

/// Captures one snapshot, degrading frequency and temperature on read failure
pub fn capture_snapshot(provider: &mut dyn MetricsProvider) -> io::Result<CpuSnapshot> {
	let per_core = provider.per_core_utilization()?;

	let frequency_mhz = provider.frequency_mhz().unwrap_or_else(|e| {
		debug!("CPU frequency unavailable: {}", e);
		0.0
	});

	let temperature = match provider.temperatures() {
		Ok(temps) => select_cpu_temperature(&temps),
		Err(e) => {
			debug!("CPU temperature unavailable: {}", e);
			None
		},
	};

	Ok(CpuSnapshot::new(per_core, frequency_mhz, temperature))
}

/// Creates the metrics provider for the running platform
pub fn create_provider() -> Box<dyn MetricsProvider> {
	Box::new(procfs::LinuxProvider::new())
}
