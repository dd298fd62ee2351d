pub mod cpu;

use std::path::Path;
use std::str::FromStr;
use std::{fs, io};

/// Reads a single value from a sysfs/procfs attribute file
pub fn read_value<T: FromStr>(path: impl AsRef<Path>) -> io::Result<T> {
	let path = path.as_ref();
	let content = fs::read_to_string(path)?;
	content.trim().parse().map_err(|_| {
		io::Error::new(
			io::ErrorKind::InvalidData,
			format!("unparseable value in {}", path.display()),
		)
	})
}

/// Extracts every `cpu MHz` value from `/proc/cpuinfo` content
pub fn parse_cpuinfo_mhz(content: &str) -> Vec<f64> {
	content
		.lines()
		.filter(|line| line.starts_with("cpu MHz"))
		.filter_map(|line| line.split(':').nth(1))
		.filter_map(|value| value.trim().parse().ok())
		.collect()
}

/// Extracts `MemTotal` from `/proc/meminfo` content, in bytes
pub fn parse_meminfo_total(content: &str) -> Option<u64> {
	let line = content.lines().find(|line| line.starts_with("MemTotal:"))?;
	let kib: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
	Some(kib * 1024)
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
	if values.is_empty() {
		None
	} else {
		Some(values.iter().sum::<f64>() / values.len() as f64)
	}
}
