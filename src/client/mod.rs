pub mod llama;
pub mod openai;

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::config::BenchConfig;

/// A single generation request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
	pub prompt: String,
	pub max_tokens: u32,
	pub temperature: f32,
}

/// What a completed generation reports back
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
	/// Tokens produced by the server
	pub tokens_generated: u64,

	/// Prompt tokens evaluated, when the server reports them
	pub prompt_tokens: Option<u64>,

	/// Server timing breakdown, passed through as named numbers
	pub timings: BTreeMap<String, f64>,

	/// Model identifier as reported by the server
	pub model: String,

	/// Generated text
	pub content: String,
}

#[derive(Debug, Error)]
pub enum ClientError {
	#[error("request timed out: {0}")]
	Timeout(String),

	#[error("HTTP request failed: {0}")]
	Transport(String),

	#[error("HTTP {status} from {url}: {body}")]
	Status { status: u16, url: String, body: String },

	#[error("failed to decode response: {0}")]
	Decode(String),
}

impl From<reqwest::Error> for ClientError {
	fn from(e: reqwest::Error) -> Self {
		if e.is_timeout() {
			ClientError::Timeout(e.to_string())
		} else if e.is_decode() {
			ClientError::Decode(e.to_string())
		} else {
			ClientError::Transport(e.to_string())
		}
	}
}

/// Blocking access to an inference server
pub trait InferenceClient: Send + Sync {
	/// Base URL requests are sent to
	fn base_url(&self) -> &str;

	/// Probes the server's health endpoint
	fn health(&self) -> Result<(), ClientError>;

	/// Runs one generation to completion
	fn complete(&self, request: &CompletionRequest) -> Result<Completion, ClientError>;
}

/// Wire format spoken by the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ApiFlavor {
	/// llama.cpp native `/completion`
	#[default]
	#[value(name = "llamacpp")]
	LlamaCpp,
	/// OpenAI-compatible `/v1/chat/completions`
	#[value(name = "openai")]
	OpenAi,
}

/// Builds the client matching the configured API flavor
pub fn create_client(config: &BenchConfig) -> Result<Box<dyn InferenceClient>, ClientError> {
	let http = HttpTransport::new(
		&config.server_url,
		Duration::from_secs(config.health_timeout_secs),
		Duration::from_secs(config.request_timeout_secs),
	)?;

	Ok(match config.api {
		ApiFlavor::LlamaCpp => Box::new(llama::LlamaCppClient::new(http)),
		ApiFlavor::OpenAi => Box::new(openai::OpenAiChatClient::new(http)),
	})
}

/// Shared HTTP plumbing for the concrete clients
#[derive(Debug, Clone)]
pub struct HttpTransport {
	base_url: String,
	health_client: Client,
	request_client: Client,
}

impl HttpTransport {
	pub fn new(base_url: &str, health_timeout: Duration, request_timeout: Duration) -> Result<Self, ClientError> {
		Ok(Self {
			base_url: base_url.trim_end_matches('/').to_string(),
			health_client: Client::builder().timeout(health_timeout).build()?,
			request_client: Client::builder().timeout(request_timeout).build()?,
		})
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	/// GET `/health`; any success status counts as healthy
	pub fn health(&self) -> Result<(), ClientError> {
		let url = format!("{}/health", self.base_url);
		let response = self.health_client.get(&url).send()?;

		if !response.status().is_success() {
			let status = response.status().as_u16();
			let body = response.text().unwrap_or_default();
			return Err(ClientError::Status { status, url, body });
		}
		Ok(())
	}

	/// POSTs a JSON body to `path` and decodes the JSON response
	pub fn post_json<T: DeserializeOwned>(&self, path: &str, body: &serde_json::Value) -> Result<T, ClientError> {
		let url = format!("{}{}", self.base_url, path);
		debug!("POST {}", url);

		let response = self.request_client.post(&url).json(body).send()?;

		if !response.status().is_success() {
			let status = response.status().as_u16();
			let body = response.text().unwrap_or_default();
			return Err(ClientError::Status { status, url, body });
		}

		let text = response.text()?;
		serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))
	}
}

/// Keeps the numeric entries of a timing object
pub(crate) fn numeric_timings(raw: Option<BTreeMap<String, serde_json::Value>>) -> BTreeMap<String, f64> {
	raw.unwrap_or_default()
		.into_iter()
		.filter_map(|(name, value)| value.as_f64().map(|v| (name, v)))
		.collect()
}

#[cfg(test)]
pub(crate) mod test_server {
	use std::io::{BufRead, BufReader, Read, Write};
	use std::net::TcpListener;
	use std::thread::{self, JoinHandle};

	/// Serves one canned HTTP response and hands back the raw request
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

	/// A URL nothing is listening on
	pub fn closed_url() -> String {
		let listener = TcpListener::bind("127.0.0.1:0").unwrap();
		let addr = listener.local_addr().unwrap();
		drop(listener);
		format!("http://{}", addr)
	}
}
