use serde::Serialize;

use crate::snapshot::SampleBuffer;
use crate::util::mean;

/// CPU utilization summary over one measurement run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AggregateCpuStats {
	/// Mean of the per-snapshot core averages
	pub average: f64,

	/// Highest per-snapshot core average
	pub peak: f64,

	/// Number of snapshots aggregated
	pub count: usize,

	/// Mean of the known snapshot temperatures, best effort
	pub average_temperature: Option<f64>,

	/// Mean of the known snapshot frequencies, 0 when none were read
	pub average_frequency_mhz: f64,
}

/// Drains `buffer` and reduces it to average and peak utilization
///
/// Each snapshot is first collapsed to the mean across its cores. The result
/// does not depend on snapshot order. An empty buffer yields all zeros.
pub fn aggregate(buffer: &mut SampleBuffer) -> AggregateCpuStats {
	let mut utilizations = Vec::with_capacity(buffer.len());
	let mut temperatures = Vec::new();
	let mut frequencies = Vec::new();

	for snapshot in buffer.drain() {
		utilizations.push(snapshot.mean_utilization());
		if let Some(temp) = snapshot.temperature {
			temperatures.push(temp);
		}
		if snapshot.frequency_mhz > 0.0 {
			frequencies.push(snapshot.frequency_mhz);
		}
	}

	let Some(average) = mean(&utilizations) else {
		return AggregateCpuStats::default();
	};

	AggregateCpuStats {
		average,
		peak: utilizations.iter().copied().fold(f64::MIN, f64::max),
		count: utilizations.len(),
		average_temperature: mean(&temperatures),
		average_frequency_mhz: mean(&frequencies).unwrap_or(0.0),
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;
	use crate::snapshot::CpuSnapshot;

	fn buffer_of(per_core: &[Vec<f64>]) -> SampleBuffer {
		per_core
			.iter()
			.map(|cores| CpuSnapshot::new(cores.clone(), 0.0, None))
			.collect()
	}

	#[test]
	fn empty_buffer_is_all_zero() {
		let stats = aggregate(&mut SampleBuffer::new());
		assert_eq!(stats.average, 0.0);
		assert_eq!(stats.peak, 0.0);
		assert_eq!(stats.count, 0);
		assert_eq!(stats.average_temperature, None);
	}

	#[test]
	fn three_snapshots() {
		let mut buffer = buffer_of(&[vec![5.0, 15.0], vec![20.0, 20.0], vec![0.0, 60.0]]);
		let stats = aggregate(&mut buffer);

		assert_eq!(stats.average, 20.0);
		assert_eq!(stats.peak, 30.0);
		assert_eq!(stats.count, 3);
		assert!(buffer.is_empty());
	}

	#[test]
	fn temperature_and_frequency_skip_unknowns() {
		let mut buffer: SampleBuffer = [
			CpuSnapshot::new(vec![10.0], 2000.0, Some(40.0)),
			CpuSnapshot::new(vec![10.0], 0.0, None),
			CpuSnapshot::new(vec![10.0], 3000.0, Some(60.0)),
		]
		.into_iter()
		.collect();

		let stats = aggregate(&mut buffer);
		assert_eq!(stats.average_temperature, Some(50.0));
		assert_eq!(stats.average_frequency_mhz, 2500.0);
	}

	#[test]
	fn drains_exactly_once() {
		let mut buffer = buffer_of(&[vec![50.0]]);
		assert_eq!(aggregate(&mut buffer).count, 1);
		assert_eq!(aggregate(&mut buffer), AggregateCpuStats::default());
	}

	fn arb_snapshots() -> impl Strategy<Value = Vec<Vec<f64>>> {
		prop::collection::vec(prop::collection::vec(0.0f64..=100.0, 1..16), 1..64)
	}

	proptest! {
		#[test]
		fn peak_never_below_average(snapshots in arb_snapshots()) {
			let stats = aggregate(&mut buffer_of(&snapshots));
			prop_assert!(stats.peak >= stats.average - 1e-9);
			prop_assert_eq!(stats.count, snapshots.len());
		}

		#[test]
		fn order_does_not_matter(snapshots in arb_snapshots()) {
			let forward = aggregate(&mut buffer_of(&snapshots));
			let reversed: Vec<_> = snapshots.iter().rev().cloned().collect();
			let backward = aggregate(&mut buffer_of(&reversed));

			prop_assert!((forward.average - backward.average).abs() < 1e-9);
			prop_assert_eq!(forward.peak, backward.peak);
		}
	}
}
