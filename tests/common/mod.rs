#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use inference_power::client::{ClientError, Completion, CompletionRequest, InferenceClient};
use inference_power::config::BenchConfig;
use inference_power::provider::{MetricsProvider, TemperatureMap};

/// Reports fixed utilization and frequency, counting utilization reads
#[derive(Debug, Clone)]
pub struct ScriptedProvider {
	pub per_core: Vec<f64>,
	pub frequency_mhz: f64,
	pub reads: Arc<AtomicUsize>,
	/// Windowed CPU percentages handed out in order, shared between clones
	pub windowed: Arc<Mutex<Vec<f64>>>,
}

impl ScriptedProvider {
	pub fn steady(per_core: Vec<f64>, frequency_mhz: f64) -> Self {
		Self {
			per_core,
			frequency_mhz,
			reads: Arc::new(AtomicUsize::new(0)),
			windowed: Arc::new(Mutex::new(Vec::new())),
		}
	}

	pub fn with_windowed(mut self, readings: Vec<f64>) -> Self {
		self.windowed = Arc::new(Mutex::new(readings));
		self
	}
}

impl MetricsProvider for ScriptedProvider {
	fn per_core_utilization(&mut self) -> io::Result<Vec<f64>> {
		self.reads.fetch_add(1, Ordering::SeqCst);
		Ok(self.per_core.clone())
	}

	fn frequency_mhz(&self) -> io::Result<f64> {
		Ok(self.frequency_mhz)
	}

	fn temperatures(&self) -> io::Result<TemperatureMap> {
		Ok(TemperatureMap::from([("coretemp".to_string(), vec![55.0, 65.0])]))
	}

	fn cpu_percent(&mut self, _window: Duration) -> io::Result<f64> {
		let mut windowed = self.windowed.lock().unwrap();
		if windowed.is_empty() {
			let n = self.per_core.len().max(1) as f64;
			Ok(self.per_core.iter().sum::<f64>() / n)
		} else {
			Ok(windowed.remove(0))
		}
	}

	fn clone_box(&self) -> Box<dyn MetricsProvider> {
		Box::new(self.clone())
	}
}

/// What a scripted client does when asked to complete
#[derive(Debug, Clone)]
pub enum Script {
	Complete { delay: Duration, tokens: u64 },
	TimeOut { delay: Duration },
	/// Completes small requests, rejects budgets above `limit` with a 500
	RejectAbove { limit: u32 },
}

#[derive(Debug, Clone)]
pub struct ScriptedClient {
	pub script: Script,
	pub healthy: bool,
}

impl InferenceClient for ScriptedClient {
	fn base_url(&self) -> &str {
		"http://scripted.invalid"
	}

	fn health(&self) -> Result<(), ClientError> {
		if self.healthy {
			Ok(())
		} else {
			Err(ClientError::Transport("connection refused".to_string()))
		}
	}

	fn complete(&self, request: &CompletionRequest) -> Result<Completion, ClientError> {
		match &self.script {
			Script::Complete { delay, tokens } => {
				thread::sleep(*delay);
				Ok(Completion {
					tokens_generated: (*tokens).min(u64::from(request.max_tokens)),
					prompt_tokens: Some(8),
					timings: BTreeMap::from([("predicted_ms".to_string(), delay.as_secs_f64() * 1000.0)]),
					model: "scripted-model".to_string(),
					content: "Scripted reply to: ".to_string() + &request.prompt,
				})
			},
			Script::TimeOut { delay } => {
				thread::sleep(*delay);
				Err(ClientError::Timeout("operation timed out".to_string()))
			},
			Script::RejectAbove { limit } => {
				if request.max_tokens > *limit {
					return Err(ClientError::Status {
						status: 500,
						url: "http://scripted.invalid/completion".to_string(),
						body: "context overflow".to_string(),
					});
				}
				thread::sleep(Duration::from_millis(10));
				Ok(Completion {
					tokens_generated: u64::from(request.max_tokens),
					model: "scripted-model".to_string(),
					content: "token ".repeat(request.max_tokens as usize),
					..Completion::default()
				})
			},
		}
	}
}

pub fn fast_config() -> BenchConfig {
	BenchConfig {
		sample_interval_ms: 10,
		energy_window_ms: 1,
		..BenchConfig::default()
	}
}

/// Serves one canned HTTP response and hands back the raw request
///
/// Same contract as the client module's unit-test server, which integration
/// tests cannot reach.
pub fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
	let listener = TcpListener::bind("127.0.0.1:0").unwrap();
	let url = format!("http://{}", listener.local_addr().unwrap());

	let handle = thread::spawn(move || {
		let (mut stream, _) = listener.accept().unwrap();
		let mut reader = BufReader::new(stream.try_clone().unwrap());

		let mut head = String::new();
		let mut content_length = 0usize;
		loop {
			let mut line = String::new();
			reader.read_line(&mut line).unwrap();
			if let Some(len) = line.to_ascii_lowercase().strip_prefix("content-length:") {
				content_length = len.trim().parse().unwrap();
			}
			head.push_str(&line);
			if line == "\r\n" || line.is_empty() {
				break;
			}
		}
		let mut request_body = vec![0u8; content_length];
		reader.read_exact(&mut request_body).unwrap();

		let response = format!(
			"{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
			status_line,
			body.len(),
			body
		);
		stream.write_all(response.as_bytes()).unwrap();

		head + &String::from_utf8_lossy(&request_body)
	});

	(url, handle)
}
