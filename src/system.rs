use std::fs;

use serde::Serialize;
use tracing::debug;

use crate::constants::PROC_MEMINFO;
use crate::provider::MetricsProvider;
use crate::util::parse_meminfo_total;

/// Static description of the machine running the benchmark
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemInfo {
	pub logical_cores: usize,
	pub physical_cores: usize,
	pub total_memory_bytes: Option<u64>,
	pub frequency_mhz: Option<f64>,
}

impl SystemInfo {
	pub fn collect(provider: &dyn MetricsProvider) -> Self {
		let total_memory_bytes = match fs::read_to_string(PROC_MEMINFO) {
			Ok(content) => parse_meminfo_total(&content),
			Err(e) => {
				debug!("Memory size unavailable: {}", e);
				None
			},
		};

		Self {
			logical_cores: num_cpus::get(),
			physical_cores: num_cpus::get_physical(),
			total_memory_bytes,
			frequency_mhz: provider.frequency_mhz().ok(),
		}
	}

	pub fn total_memory_gib(&self) -> Option<f64> {
		self.total_memory_bytes
			.map(|bytes| bytes as f64 / (1024.0 * 1024.0 * 1024.0))
	}
}
