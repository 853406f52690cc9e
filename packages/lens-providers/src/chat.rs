//! OpenAI-compatible chat completions constrained to JSON object output.

use serde_json::Value;

use crate::{Error, Result};

const MAX_ATTEMPTS: usize = 3;

pub async fn complete_json(cfg: &lens_config::LlmProviderConfig, messages: &[Value]) -> Result<Value> {
	let client = crate::http_client(cfg.timeout_ms)?;
	let url = crate::endpoint(&cfg.api_base, &cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"response_format": { "type": "json_object" },
		"messages": messages,
	});

	for attempt in 1..=MAX_ATTEMPTS {
		let res = client
			.post(&url)
			.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
			.json(&body)
			.send()
			.await?;
		let json: Value = res.error_for_status()?.json().await?;

		match parse_completion_json(json) {
			Ok(parsed) => return Ok(parsed),
			Err(err) => {
				tracing::warn!(
					error = %err,
					attempt,
					model = cfg.model.as_str(),
					"Completion content is not valid JSON."
				);
			},
		}
	}

	Err(Error::invalid_response("Completion response is not valid JSON."))
}

/// Builds a two-message transcript.
pub fn messages(system: &str, user: &str) -> Vec<Value> {
	vec![
		serde_json::json!({ "role": "system", "content": system }),
		serde_json::json!({ "role": "user", "content": user }),
	]
}

fn parse_completion_json(json: Value) -> Result<Value> {
	if let Some(content) = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
	{
		let parsed: Value = serde_json::from_str(strip_code_fence(content))
			.map_err(|_| Error::invalid_response("Completion content is not valid JSON."))?;

		if !parsed.is_object() {
			return Err(Error::invalid_response("Completion content must be a JSON object."));
		}

		return Ok(parsed);
	}

	Err(Error::invalid_response("Completion response is missing message content."))
}

fn strip_code_fence(content: &str) -> &str {
	let trimmed = content.trim();
	let Some(rest) = trimmed.strip_prefix("```") else {
		return trimmed;
	};
	let rest = rest.strip_prefix("json").unwrap_or(rest);

	rest.strip_suffix("```").unwrap_or(rest).trim()
}
