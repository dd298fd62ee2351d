use std::io::{self, Write};

use serde::Serialize;

use crate::compare::Comparison;
use crate::measure::MeasurementResult;
use crate::system::SystemInfo;

const RULE: &str = "==================================================";

/// One measurement together with its baseline comparison
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
	pub result: MeasurementResult,
	pub comparison: Comparison,
}

pub fn write_header(out: &mut impl Write, generated_at: &str) -> io::Result<()> {
	writeln!(out)?;
	writeln!(out, "Inference Energy Efficiency Report")?;
	writeln!(out, "{RULE}")?;
	writeln!(out, "Generated at: {generated_at}")
}

pub fn write_server_status(out: &mut impl Write, url: &str, reachable: bool) -> io::Result<()> {
	writeln!(out)?;
	if reachable {
		writeln!(out, "Server at {url} is running")
	} else {
		writeln!(out, "Server at {url} is not running!")?;
		writeln!(out, "Please start the server first.")
	}
}

pub fn write_system_info(out: &mut impl Write, info: &SystemInfo) -> io::Result<()> {
	writeln!(out)?;
	writeln!(out, "System Information:")?;
	writeln!(
		out,
		"  • CPU: {} cores ({} physical)",
		info.logical_cores, info.physical_cores
	)?;
	match info.total_memory_gib() {
		Some(gib) => writeln!(out, "  • Memory: {gib:.1} GB")?,
		None => writeln!(out, "  • Memory: N/A")?,
	}
	match info.frequency_mhz {
		Some(mhz) => writeln!(out, "  • CPU Frequency: {mhz:.0} MHz"),
		None => writeln!(out, "  • CPU Frequency: N/A"),
	}
}

/// Throughput, CPU usage and the server's own timing breakdown
pub fn write_results(out: &mut impl Write, result: &MeasurementResult) -> io::Result<()> {
	writeln!(out)?;
	writeln!(out, "Test Results:")?;
	writeln!(out, "  • Model: {}", result.model)?;
	writeln!(out, "  • Duration: {:.2}s", result.duration_secs)?;
	writeln!(out, "  • Tokens generated: {}", result.tokens_generated)?;
	writeln!(out, "  • Throughput: {:.2} tokens/s", result.tokens_per_second)?;
	writeln!(out, "  • Average CPU usage: {:.1}%", result.cpu_avg)?;
	writeln!(out, "  • Peak CPU usage: {:.1}%", result.cpu_peak)?;
	writeln!(out, "  • CPU samples: {}", result.sample_count)?;
	if let Some(temp) = result.average_temperature {
		writeln!(out, "  • Average CPU temperature: {temp:.1}°C")?;
	}
	if result.average_frequency_mhz > 0.0 {
		writeln!(out, "  • Average CPU frequency: {:.0} MHz", result.average_frequency_mhz)?;
	}

	if !result.timings.is_empty() {
		let timing = |name: &str| result.timings.get(name).copied().unwrap_or(0.0);

		writeln!(out)?;
		writeln!(out, "Timing Breakdown:")?;
		writeln!(out, "  • Prompt processing: {:.1}ms", timing("prompt_ms"))?;
		writeln!(out, "  • Token generation: {:.1}ms", timing("predicted_ms"))?;
		writeln!(out, "  • Prompt tokens/s: {:.1}", timing("prompt_per_second"))?;
		writeln!(out, "  • Generation tokens/s: {:.1}", timing("predicted_per_second"))?;
	}

	Ok(())
}

/// Side-by-side figures for the measured run and its synthetic baseline
pub fn write_comparison(out: &mut impl Write, result: &MeasurementResult, comparison: &Comparison) -> io::Result<()> {
	let baseline = &comparison.baseline;

	writeln!(out)?;
	writeln!(out, "Efficiency Comparison:")?;
	writeln!(out, "{RULE}")?;

	writeln!(out, "Measured Model:")?;
	writeln!(out, "  • Tokens/second: {:.2}", result.tokens_per_second)?;
	writeln!(out, "  • CPU usage: {:.1}%", result.cpu_avg)?;
	writeln!(out, "  • Est. power: {:.1}W", result.estimated_energy)?;
	writeln!(out, "  • Efficiency: {:.2} tokens/watt", comparison.tokens_per_watt)?;

	writeln!(out)?;
	writeln!(out, "Estimated FP16 Baseline:")?;
	writeln!(out, "  • Tokens/second: {:.2}", baseline.tokens_per_second)?;
	writeln!(out, "  • CPU usage: {:.1}%", baseline.cpu_percent)?;
	writeln!(out, "  • Est. power: {:.1}W", baseline.energy_watts)?;
	writeln!(out, "  • Efficiency: {:.2} tokens/watt", comparison.baseline_tokens_per_watt)?;

	writeln!(out)?;
	writeln!(out, "Improvements:")?;
	writeln!(out, "  • Speed: {:.1}x faster", comparison.speed_ratio)?;
	writeln!(out, "  • Energy: {:.0}% reduction", comparison.energy_reduction_pct)?;
	writeln!(out, "  • Efficiency: {:.1}x better", comparison.efficiency_ratio)
}

pub fn write_notes(out: &mut impl Write) -> io::Result<()> {
	writeln!(out)?;
	writeln!(out, "Key Insights:")?;
	writeln!(out, "  • Power is estimated from CPU load and clock speed, not metered")?;
	writeln!(out, "  • The baseline is derived from this run by fixed factors")?;
	writeln!(out, "  • The speed ratio therefore always equals the configured speed factor")
}

pub fn write_failure(out: &mut impl Write, reason: &str) -> io::Result<()> {
	writeln!(out)?;
	writeln!(out, "Failed to complete inference test: {reason}")
}

/// Full text report for one successful run
pub fn write_run(out: &mut impl Write, report: &RunReport) -> io::Result<()> {
	write_results(out, &report.result)?;
	write_comparison(out, &report.result, &report.comparison)?;
	write_notes(out)?;
	out.flush()
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use super::*;
	use crate::compare::compare;

	fn sample_result() -> MeasurementResult {
		MeasurementResult {
			duration_secs: 2.5,
			tokens_generated: 100,
			prompt_tokens: Some(9),
			tokens_per_second: 40.0,
			cpu_avg: 62.25,
			cpu_peak: 97.5,
			sample_count: 24,
			average_temperature: Some(58.0),
			average_frequency_mhz: 2875.4,
			estimated_energy: 8.0,
			timings: BTreeMap::from([("prompt_ms".to_string(), 31.25), ("predicted_ms".to_string(), 2400.0)]),
			model: "bitnet-b1.58".to_string(),
			response: "1-bit weights shrink memory traffic".to_string(),
		}
	}

	fn render(report: &RunReport) -> String {
		let mut out = Vec::new();
		write_run(&mut out, report).unwrap();
		String::from_utf8(out).unwrap()
	}

	#[test]
	fn run_report_contains_key_figures() {
		let result = sample_result();
		let comparison = compare(&result);
		let text = render(&RunReport { result, comparison });

		assert!(text.contains("Throughput: 40.00 tokens/s"));
		assert!(text.contains("Peak CPU usage: 97.5%"));
		assert!(text.contains("Average CPU temperature: 58.0°C"));
		assert!(text.contains("Average CPU frequency: 2875 MHz"));
		assert!(text.contains("Prompt processing: 31.2ms") || text.contains("Prompt processing: 31.3ms"));
		assert!(text.contains("Generation tokens/s: 0.0"));
		assert!(text.contains("Speed: 2.5x faster"));
		assert!(text.contains("Energy: 71% reduction"));
		assert!(text.contains("Efficiency: 5.00 tokens/watt"));
		assert!(text.contains("Efficiency: 8.8x better") || text.contains("Efficiency: 8.7x better"));
	}

	#[test]
	fn timing_section_is_skipped_when_empty() {
		let result = MeasurementResult {
			timings: BTreeMap::new(),
			average_frequency_mhz: 0.0,
			..sample_result()
		};
		let comparison = compare(&result);
		let text = render(&RunReport { result, comparison });
		assert!(!text.contains("Timing Breakdown"));
		assert!(!text.contains("Average CPU frequency"));
	}

	#[test]
	fn unreachable_server_message() {
		let mut out = Vec::new();
		write_server_status(&mut out, "http://localhost:8081", false).unwrap();
		let text = String::from_utf8(out).unwrap();
		assert!(text.contains("not running"));
	}

	#[test]
	fn system_info_without_memory() {
		let info = SystemInfo {
			logical_cores: 8,
			physical_cores: 4,
			total_memory_bytes: None,
			frequency_mhz: Some(3200.0),
		};
		let mut out = Vec::new();
		write_system_info(&mut out, &info).unwrap();
		let text = String::from_utf8(out).unwrap();
		assert!(text.contains("CPU: 8 cores (4 physical)"));
		assert!(text.contains("Memory: N/A"));
		assert!(text.contains("CPU Frequency: 3200 MHz"));
	}
}
