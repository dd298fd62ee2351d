use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::constants::{PROC_CPUINFO, PROC_STAT, SYSFS_CPU_DIR, SYSFS_HWMON_DIR, SYSFS_THERMAL_DIR};
use crate::provider::{MetricsProvider, TemperatureMap};
use crate::util::cpu::CpuUtilization;
use crate::util::{mean, parse_cpuinfo_mhz, read_value};

/// Filesystem locations the Linux provider reads from
#[derive(Debug, Clone)]
pub struct SystemPaths {
	pub proc_stat: PathBuf,
	pub proc_cpuinfo: PathBuf,
	pub cpu_dir: PathBuf,
	pub hwmon_dir: PathBuf,
	pub thermal_dir: PathBuf,
}

impl Default for SystemPaths {
	fn default() -> Self {
		Self {
			proc_stat: PathBuf::from(PROC_STAT),
			proc_cpuinfo: PathBuf::from(PROC_CPUINFO),
			cpu_dir: PathBuf::from(SYSFS_CPU_DIR),
			hwmon_dir: PathBuf::from(SYSFS_HWMON_DIR),
			thermal_dir: PathBuf::from(SYSFS_THERMAL_DIR),
		}
	}
}

/// Metrics provider backed by procfs and sysfs
#[derive(Debug, Clone)]
pub struct LinuxProvider {
	paths: SystemPaths,
	utilization: CpuUtilization,
}

impl LinuxProvider {
	pub fn new() -> Self {
		Self::with_paths(SystemPaths::default())
	}

	pub fn with_paths(paths: SystemPaths) -> Self {
		Self {
			paths,
			utilization: CpuUtilization::new(),
		}
	}

	/// Lists `cpuN` directories under the sysfs CPU directory
	fn cpu_dirs(&self) -> Vec<PathBuf> {
		let Ok(entries) = fs::read_dir(&self.paths.cpu_dir) else {
			return Vec::new();
		};

		entries
			.filter_map(Result::ok)
			.map(|entry| entry.path())
			.filter(|path| {
				path.file_name()
					.and_then(|name| name.to_str())
					.and_then(|name| name.strip_prefix("cpu"))
					.is_some_and(|id| id.parse::<usize>().is_ok())
			})
			.collect()
	}

	fn scaling_frequencies(&self) -> Vec<f64> {
		self.cpu_dirs()
			.iter()
			.filter_map(|dir| read_value::<f64>(dir.join("cpufreq/scaling_cur_freq")).ok())
			// kHz -> MHz
			.map(|khz| khz / 1000.0)
			.collect()
	}

	fn read_hwmon(&self, temps: &mut TemperatureMap) {
		for dir in sorted_entries(&self.paths.hwmon_dir) {
			let Ok(name) = fs::read_to_string(dir.join("name")) else {
				continue;
			};

			let mut inputs: Vec<PathBuf> = sorted_entries(&dir)
				.into_iter()
				.filter(|path| {
					path.file_name()
						.and_then(|f| f.to_str())
						.is_some_and(|f| f.starts_with("temp") && f.ends_with("_input"))
				})
				.collect();
			inputs.sort();

			let readings: Vec<f64> = inputs
				.iter()
				.filter_map(|input| read_value::<f64>(input).ok())
				.map(|millidegrees| millidegrees / 1000.0)
				.collect();

			if !readings.is_empty() {
				temps.entry(name.trim().to_string()).or_default().extend(readings);
			}
		}
	}

	fn read_thermal_zones(&self, temps: &mut TemperatureMap) {
		for dir in sorted_entries(&self.paths.thermal_dir) {
			let is_zone = dir
				.file_name()
				.and_then(|f| f.to_str())
				.is_some_and(|f| f.starts_with("thermal_zone"));
			if !is_zone {
				continue;
			}

			let (Ok(kind), Ok(millidegrees)) = (fs::read_to_string(dir.join("type")), read_value::<f64>(dir.join("temp")))
			else {
				continue;
			};

			temps
				.entry(kind.trim().to_string())
				.or_default()
				.push(millidegrees / 1000.0);
		}
	}
}

impl Default for LinuxProvider {
	fn default() -> Self {
		Self::new()
	}
}

impl MetricsProvider for LinuxProvider {
	fn per_core_utilization(&mut self) -> io::Result<Vec<f64>> {
		let content = fs::read_to_string(&self.paths.proc_stat)?;
		self.utilization.update_from(&content);
		Ok(self.utilization.percentages())
	}

	fn frequency_mhz(&self) -> io::Result<f64> {
		// Prefer cpufreq, which tracks the live clock; cpuinfo is a fallback
		if let Some(mhz) = mean(&self.scaling_frequencies()) {
			return Ok(mhz);
		}

		let cpuinfo = fs::read_to_string(&self.paths.proc_cpuinfo)?;
		mean(&parse_cpuinfo_mhz(&cpuinfo))
			.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no CPU frequency source available"))
	}

	fn temperatures(&self) -> io::Result<TemperatureMap> {
		let mut temps = TemperatureMap::new();
		self.read_hwmon(&mut temps);
		self.read_thermal_zones(&mut temps);

		if temps.is_empty() {
			return Err(io::Error::new(io::ErrorKind::NotFound, "no temperature sensors found"));
		}
		Ok(temps)
	}

	fn clone_box(&self) -> Box<dyn MetricsProvider> {
		Box::new(Self::with_paths(self.paths.clone()))
	}
}

fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
	let Ok(entries) = fs::read_dir(dir) else {
		return Vec::new();
	};
	let mut paths: Vec<PathBuf> = entries.filter_map(Result::ok).map(|e| e.path()).collect();
	paths.sort();
	paths
}
