use std::collections::BTreeMap;

/// Jiffy counters for a single logical CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuStats {
	pub user: u64,
	pub nice: u64,
	pub system: u64,
	pub idle: u64,
	pub iowait: u64,
	pub irq: u64,
	pub softirq: u64,
	pub steal: u64,
	pub total: u64,
}

impl CpuStats {
	/// Parses the counter fields of a `cpuN` line, `parts[0]` being the label
	fn from_fields(parts: &[&str]) -> Self {
		let field = |i: usize| parts.get(i).and_then(|p| p.parse().ok()).unwrap_or(0);

		let stats = CpuStats {
			user: field(1),
			nice: field(2),
			system: field(3),
			idle: field(4),
			iowait: field(5),
			irq: field(6),
			softirq: field(7),
			steal: field(8),
			total: 0,
		};

		let total = stats.user
			+ stats.nice + stats.system
			+ stats.idle + stats.iowait
			+ stats.irq + stats.softirq
			+ stats.steal;

		CpuStats { total, ..stats }
	}
}

/// Parses the per-CPU lines of `/proc/stat`, skipping the aggregate `cpu` line
pub fn parse_proc_stat(content: &str) -> BTreeMap<usize, CpuStats> {
	let mut stats = BTreeMap::new();

	for line in content.lines() {
		if !line.starts_with("cpu") || line.starts_with("cpu ") {
			continue;
		}

		let parts: Vec<&str> = line.split_whitespace().collect();
		if parts.len() < 8 {
			continue;
		}

		if let Ok(cpu_id) = parts[0][3..].parse::<usize>() {
			stats.insert(cpu_id, CpuStats::from_fields(&parts));
		}
	}

	stats
}

/// Tracks utilization of every logical CPU between successive reads
#[derive(Debug, Clone, Default)]
pub struct CpuUtilization {
	prev_stats: BTreeMap<usize, CpuStats>,
	utilization: BTreeMap<usize, f64>,
}

impl CpuUtilization {
	pub fn new() -> Self {
		Self::default()
	}

	/// Updates utilization from already-read `/proc/stat` content
	pub fn update_from(&mut self, content: &str) {
		let new_stats = parse_proc_stat(content);

		// Hot-unplugged CPUs drop out of the ordering
		self.utilization.retain(|cpu_id, _| new_stats.contains_key(cpu_id));

		for (cpu_id, current) in &new_stats {
			match self.prev_stats.get(cpu_id) {
				Some(prev) => {
					let total_diff = current.total.saturating_sub(prev.total);
					if total_diff > 0 {
						let idle_diff =
							current.idle.saturating_sub(prev.idle) + current.iowait.saturating_sub(prev.iowait);

						let utilization = 1.0 - (idle_diff as f64 / total_diff as f64);
						self.utilization.insert(*cpu_id, utilization.clamp(0.0, 1.0));
					}
				},
				// First reading only primes the counters
				None => {
					self.utilization.insert(*cpu_id, 0.0);
				},
			}
		}

		self.prev_stats = new_stats;
	}

	/// Utilization percentage per logical CPU, ordered by CPU index
	pub fn percentages(&self) -> Vec<f64> {
		self.utilization.values().map(|u| u * 100.0).collect()
	}
}
