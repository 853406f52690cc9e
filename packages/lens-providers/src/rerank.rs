use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// One scored document from the rerank backend, addressed by its position in the request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RerankHit {
	pub index: usize,
	pub relevance_score: f32,
}

pub async fn rerank(
	cfg: &lens_config::ProviderConfig,
	query: &str,
	docs: &[String],
	top_n: usize,
) -> Result<Vec<RerankHit>> {
	if !cfg.has_api_key() {
		return Err(Error::MissingCredential { provider_id: cfg.provider_id.clone() });
	}

	let client = crate::http_client(cfg.timeout_ms)?;
	let body = serde_json::json!({
		"model": cfg.model,
		"query": query,
		"documents": docs,
		"top_n": top_n,
	});
	let res = client
		.post(crate::endpoint(&cfg.api_base, &cfg.path))
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let status = res.status();

	if !status.is_success() {
		let detail = res.text().await.unwrap_or_default();

		return Err(Error::invalid_response(format!("Rerank backend returned {status}: {detail}")));
	}

	let json: Value = res.json().await?;

	parse_rerank_response(json)
}

fn parse_rerank_response(json: Value) -> Result<Vec<RerankHit>> {
	let results = json
		.get("results")
		.or_else(|| json.get("data"))
		.and_then(|v| v.as_array())
		.ok_or_else(|| Error::invalid_response("Rerank response is missing results array."))?;
	let mut hits = Vec::with_capacity(results.len());

	for item in results {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.ok_or_else(|| Error::invalid_response("Rerank result missing index."))? as usize;
		let relevance_score = item
			.get("relevance_score")
			.or_else(|| item.get("score"))
			.and_then(|v| v.as_f64())
			.ok_or_else(|| Error::invalid_response("Rerank result missing score."))? as f32;

		hits.push(RerankHit { index, relevance_score });
	}

	Ok(hits)
}
