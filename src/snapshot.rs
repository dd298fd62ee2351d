use std::time::SystemTime;

/// One point-in-time capture of CPU metrics
#[derive(Debug, Clone, PartialEq)]
pub struct CpuSnapshot {
	/// Utilization percentage per logical core, ordered by core index
	pub per_core: Vec<f64>,

	/// Current frequency in MHz, 0 when it could not be read
	pub frequency_mhz: f64,

	/// CPU temperature in °C, absent when no sensor could be read
	pub temperature: Option<f64>,

	/// When the snapshot was captured
	pub captured_at: SystemTime,
}

impl CpuSnapshot {
	pub fn new(per_core: Vec<f64>, frequency_mhz: f64, temperature: Option<f64>) -> Self {
		Self {
			per_core,
			frequency_mhz,
			temperature,
			captured_at: SystemTime::now(),
		}
	}

	/// Mean utilization across cores, 0 for a snapshot without cores
	pub fn mean_utilization(&self) -> f64 {
		if self.per_core.is_empty() {
			return 0.0;
		}
		self.per_core.iter().sum::<f64>() / self.per_core.len() as f64
	}
}

/// Append-only sequence of snapshots collected during one sampler run
///
/// The sampler hands this over only after its thread has been joined, so a
/// buffer never sees concurrent writers.
#[derive(Debug, Default)]
pub struct SampleBuffer {
	snapshots: Vec<CpuSnapshot>,
}

impl SampleBuffer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.snapshots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.snapshots.is_empty()
	}

	/// Removes every snapshot, leaving the buffer empty
	pub fn drain(&mut self) -> impl Iterator<Item = CpuSnapshot> + '_ {
		self.snapshots.drain(..)
	}
}

impl FromIterator<CpuSnapshot> for SampleBuffer {
	fn from_iter<I: IntoIterator<Item = CpuSnapshot>>(iter: I) -> Self {
		Self {
			snapshots: iter.into_iter().collect(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mean_utilization_averages_cores() {
		let snapshot = CpuSnapshot::new(vec![10.0, 30.0, 50.0, 70.0], 2400.0, None);
		assert_eq!(snapshot.mean_utilization(), 40.0);
	}

	#[test]
	fn mean_utilization_without_cores_is_zero() {
		let snapshot = CpuSnapshot::new(Vec::new(), 0.0, None);
		assert_eq!(snapshot.mean_utilization(), 0.0);
	}

	#[test]
	fn drain_empties_buffer() {
		let mut buffer: SampleBuffer = (0..3)
			.map(|i| CpuSnapshot::new(vec![i as f64], 0.0, None))
			.collect();
		assert_eq!(buffer.len(), 3);

		let drained: Vec<_> = buffer.drain().collect();
		assert_eq!(drained.len(), 3);
		assert!(buffer.is_empty());
		assert_eq!(buffer.drain().count(), 0);
	}
}
