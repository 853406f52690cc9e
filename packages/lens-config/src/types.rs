use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub retrieval: Retrieval,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
	/// Column width of the `vector(N)` embedding columns.
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub rerank: ProviderConfig,
	/// Model used for relevance judging and intent extraction.
	pub llm_judge: LlmProviderConfig,
	/// Model used for advice drafting and ingestion descriptions.
	pub llm_writer: LlmProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	/// Blank disables the provider; callers degrade instead of calling it.
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}
impl ProviderConfig {
	pub fn has_api_key(&self) -> bool {
		!self.api_key.trim().is_empty()
	}
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Stage widths and toggles of the hybrid retrieval pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	/// Cosine similarity floor for the vector stage.
	pub match_threshold: f32,
	/// Width of the vector stage.
	pub candidate_count: u32,
	/// Width of the rerank stage.
	pub rerank_count: u32,
	/// Width of the final result.
	pub final_count: u32,
	pub use_reranking: bool,
	pub use_final_ranking: bool,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self {
			match_threshold: 0.1,
			candidate_count: 15,
			rerank_count: 5,
			final_count: 3,
			use_reranking: true,
			use_final_ranking: true,
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	#[serde(default = "default_min_scenario_chars")]
	pub min_scenario_chars: u32,
	pub api_auth_token: Option<String>,
	pub admin_auth_token: Option<String>,
}

fn default_min_scenario_chars() -> u32 {
	10
}
