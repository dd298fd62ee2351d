mod common;

use std::time::Duration;

use common::{Script, ScriptedClient, ScriptedProvider, fast_config};
use inference_power::measure::MeasurementCoordinator;
use inference_power::sampler::SamplerState;
use inference_power::speed_test::{SPEED_TESTS, run_suite, write_summary};

fn coordinator(script: Script) -> MeasurementCoordinator {
	let client = ScriptedClient { script, healthy: true };
	let provider = ScriptedProvider::steady(vec![25.0, 75.0], 2400.0);
	MeasurementCoordinator::new(Box::new(client), Box::new(provider), &fast_config())
}

#[test]
fn failed_tests_are_recorded_and_skipped() {
	let mut coordinator = coordinator(Script::RejectAbove { limit: 50 });
	let mut out = Vec::new();

	let summary = run_suite(&mut coordinator, &SPEED_TESTS, &mut out).unwrap();
	assert_eq!(coordinator.sampler_state(), SamplerState::Idle);

	assert_eq!(summary.entries.len(), 2);
	assert_eq!(summary.failures.len(), 2);
	assert_eq!(summary.total_tokens(), 70);
	assert!(summary.failures[0].reason.contains("500"));
	assert!(summary.assessment().is_some());

	write_summary(&mut out, &summary).unwrap();
	let text = String::from_utf8(out).unwrap();
	assert!(text.contains("Test: Short Generation (20 tokens)"));
	assert!(text.contains("Test: Very Long Generation (200 tokens)"));

	let preview = format!("Response preview: \"{}...\"", "token ".repeat(10));
	assert!(text.contains(&preview), "missing preview in:\n{text}");
}

#[test]
fn all_failures_have_no_assessment() {
	let mut coordinator = coordinator(Script::TimeOut {
		delay: Duration::from_millis(1),
	});

	let summary = run_suite(&mut coordinator, &SPEED_TESTS, &mut Vec::new()).unwrap();
	assert!(summary.entries.is_empty());
	assert_eq!(summary.failures.len(), SPEED_TESTS.len());
	assert_eq!(summary.overall_tokens_per_second(), 0.0);
	assert!(summary.assessment().is_none());
}
