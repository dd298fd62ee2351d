use std::collections::BTreeMap;

use serde::Deserialize;

use crate::client::{ClientError, Completion, CompletionRequest, HttpTransport, InferenceClient, numeric_timings};

/// llama.cpp native completion response
#[derive(Debug, Clone, Deserialize)]
struct LlamaCppResponse {
	#[serde(default)]
	content: String,
	#[serde(default)]
	model: Option<String>,
	#[serde(default)]
	tokens_predicted: u64,
	#[serde(default)]
	tokens_evaluated: Option<u64>,
	#[serde(default)]
	timings: Option<BTreeMap<String, serde_json::Value>>,
}

/// Client for the llama.cpp server's native `/completion` endpoint
#[derive(Debug, Clone)]
pub struct LlamaCppClient {
	http: HttpTransport,
}

impl LlamaCppClient {
	pub fn new(http: HttpTransport) -> Self {
		Self { http }
	}
}

impl InferenceClient for LlamaCppClient {
	fn base_url(&self) -> &str {
		self.http.base_url()
	}

	fn health(&self) -> Result<(), ClientError> {
		self.http.health()
	}

	fn complete(&self, request: &CompletionRequest) -> Result<Completion, ClientError> {
		// llama.cpp names the token budget `n_predict`
		let body = serde_json::json!({
			"prompt": request.prompt,
			"n_predict": request.max_tokens,
			"temperature": request.temperature,
			"stream": false
		});

		let response: LlamaCppResponse = self.http.post_json("/completion", &body)?;

		Ok(Completion {
			tokens_generated: response.tokens_predicted,
			prompt_tokens: response.tokens_evaluated,
			timings: numeric_timings(response.timings),
			model: response
				.model
				.filter(|m| !m.is_empty())
				.unwrap_or_else(|| "unknown".to_string()),
			content: response.content,
		})
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;
	use crate::client::test_server::serve_once;

	fn client(url: &str) -> LlamaCppClient {
		LlamaCppClient::new(HttpTransport::new(url, Duration::from_secs(2), Duration::from_secs(5)).unwrap())
	}

	fn request() -> CompletionRequest {
		CompletionRequest {
			prompt: "What is artificial intelligence?".to_string(),
			max_tokens: 50,
			temperature: 0.7,
		}
	}

	#[test]
	fn parses_native_completion() {
		let (url, server) = serve_once(
			"HTTP/1.1 200 OK",
			r#"{"content":"AI is...","model":"bitnet-b1.58-2B","tokens_predicted":48,"tokens_evaluated":7,
			"timings":{"prompt_ms":31.2,"predicted_ms":1650.0,"prompt_per_second":224.3,"predicted_per_second":29.1}}"#,
		);

		let completion = client(&url).complete(&request()).unwrap();
		assert_eq!(completion.tokens_generated, 48);
		assert_eq!(completion.prompt_tokens, Some(7));
		assert_eq!(completion.model, "bitnet-b1.58-2B");
		assert_eq!(completion.content, "AI is...");
		assert_eq!(completion.timings["predicted_per_second"], 29.1);

		let raw_request = server.join().unwrap();
		assert!(raw_request.starts_with("POST /completion"));
		assert!(raw_request.contains("\"n_predict\":50"));
		assert!(raw_request.contains("\"stream\":false"));
	}

	#[test]
	fn missing_fields_default() {
		let (url, server) = serve_once("HTTP/1.1 200 OK", r#"{"content":""}"#);

		let completion = client(&url).complete(&request()).unwrap();
		assert_eq!(completion.tokens_generated, 0);
		assert_eq!(completion.model, "unknown");
		assert!(completion.content.is_empty());
		assert!(completion.timings.is_empty());
		server.join().unwrap();
	}

	#[test]
	fn error_status_is_reported() {
		let (url, server) = serve_once("HTTP/1.1 500 Internal Server Error", r#"{"error":"oom"}"#);

		let err = client(&url).complete(&request()).unwrap_err();
		match err {
			ClientError::Status { status, body, .. } => {
				assert_eq!(status, 500);
				assert!(body.contains("oom"));
			},
			other => panic!("unexpected error: {other}"),
		}
		server.join().unwrap();
	}

	#[test]
	fn malformed_body_is_decode_error() {
		let (url, server) = serve_once("HTTP/1.1 200 OK", "not json");

		let err = client(&url).complete(&request()).unwrap_err();
		assert!(matches!(err, ClientError::Decode(_)));
		server.join().unwrap();
	}
}
