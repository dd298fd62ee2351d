use std::collections::BTreeMap;

use serde::Deserialize;

use crate::client::{ClientError, Completion, CompletionRequest, HttpTransport, InferenceClient};
use crate::constants::DEFAULT_TOP_P;

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
	#[serde(default)]
	model: Option<String>,
	#[serde(default)]
	usage: Option<Usage>,
	#[serde(default)]
	choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
	message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
struct Message {
	#[serde(default)]
	content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
	#[serde(default)]
	prompt_tokens: u64,
	#[serde(default)]
	completion_tokens: u64,
}

/// Client for OpenAI-compatible `/v1/chat/completions` servers
///
/// These servers report token usage but no timing breakdown.
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
	http: HttpTransport,
}

impl OpenAiChatClient {
	pub fn new(http: HttpTransport) -> Self {
		Self { http }
	}
}

impl InferenceClient for OpenAiChatClient {
	fn base_url(&self) -> &str {
		self.http.base_url()
	}

	fn health(&self) -> Result<(), ClientError> {
		self.http.health()
	}

	fn complete(&self, request: &CompletionRequest) -> Result<Completion, ClientError> {
		let body = serde_json::json!({
			"messages": [{ "role": "user", "content": request.prompt }],
			"max_tokens": request.max_tokens,
			"temperature": request.temperature,
			"top_p": DEFAULT_TOP_P,
			"stream": false
		});

		let response: ChatCompletionResponse = self.http.post_json("/v1/chat/completions", &body)?;
		let content = response
			.choices
			.into_iter()
			.next()
			.and_then(|choice| choice.message)
			.and_then(|message| message.content)
			.unwrap_or_default();
		let usage = response
			.usage
			.ok_or_else(|| ClientError::Decode("response carries no usage statistics".to_string()))?;

		Ok(Completion {
			tokens_generated: usage.completion_tokens,
			prompt_tokens: Some(usage.prompt_tokens),
			timings: BTreeMap::new(),
			model: response
				.model
				.filter(|m| !m.is_empty())
				.unwrap_or_else(|| "unknown".to_string()),
			content,
		})
	}
}
