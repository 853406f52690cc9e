pub mod advice;
pub mod ingest;
pub mod intent;
pub mod query;
pub mod retrieval;
pub mod store;

mod error;

pub use advice::{
	ActionItem, Analysis, Confidence, InsightContext, InsightMetadata, InsightResponse, Insights,
	ModelInsight, Priority,
};
pub use error::{Error, Result};
pub use ingest::{IngestRequest, IngestResponse};
pub use lens_providers::rerank::RerankHit;
pub use query::{QueryRequest, QueryResponse, RetrieveRequest, RetrieveResponse};
pub use retrieval::{
	PipelineTrace, Retrieval, RetrievalOverride, Stage, StageStatus, StageTrace,
	judge::RelevanceJudge, pipeline::Orchestrator, rerank::Reranker, vector::VectorRetriever,
};
pub use store::{EntryContent, KnowledgeStore};

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use serde_json::Value;

use lens_config::{Config, EmbeddingProviderConfig, LlmProviderConfig, ProviderConfig};
use lens_providers::{chat, embedding, rerank};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Cross-encoder scoring of `docs` against `query`. Hits address documents by input position.
pub trait RerankProvider
where
	Self: Send + Sync,
{
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
		top_n: usize,
	) -> BoxFuture<'a, Result<Vec<RerankHit>>>;
}

/// Chat completion whose message content is a JSON object.
pub trait CompletionProvider
where
	Self: Send + Sync,
{
	fn complete_json<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<Value>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub rerank: Arc<dyn RerankProvider>,
	/// Relevance judging and intent extraction.
	pub judge: Arc<dyn CompletionProvider>,
	/// Advice drafting and ingestion descriptions.
	pub writer: Arc<dyn CompletionProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		rerank: Arc<dyn RerankProvider>,
		judge: Arc<dyn CompletionProvider>,
		writer: Arc<dyn CompletionProvider>,
	) -> Self {
		Self { embedding, rerank, judge, writer }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self {
			embedding: provider.clone(),
			rerank: provider.clone(),
			judge: provider.clone(),
			writer: provider,
		}
	}
}

pub struct LensService {
	pub cfg: Config,
	pub store: Arc<dyn KnowledgeStore>,
	pub providers: Providers,
}
impl LensService {
	pub fn new(cfg: Config, store: Arc<dyn KnowledgeStore>) -> Self {
		Self { cfg, store, providers: Providers::default() }
	}

	pub fn with_providers(cfg: Config, store: Arc<dyn KnowledgeStore>, providers: Providers) -> Self {
		Self { cfg, store, providers }
	}

	pub fn orchestrator(&self) -> Orchestrator<'_> {
		Orchestrator::new(&self.cfg, &self.providers, self.store.as_ref())
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, texts).await?) })
	}
}
impl RerankProvider for DefaultProviders {
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
		top_n: usize,
	) -> BoxFuture<'a, Result<Vec<RerankHit>>> {
		Box::pin(async move { Ok(rerank::rerank(cfg, query, docs, top_n).await?) })
	}
}
impl CompletionProvider for DefaultProviders {
	fn complete_json<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<Value>> {
		Box::pin(async move { Ok(chat::complete_json(cfg, messages).await?) })
	}
}

/// `<provider_id>:<model>:<dimensions>`, stored next to every vector.
pub(crate) fn embedding_version(cfg: &EmbeddingProviderConfig) -> String {
	format!("{}:{}:{}", cfg.provider_id, cfg.model, cfg.dimensions)
}

pub(crate) fn vector_to_pg(vec: &[f32]) -> String {
	let mut out = String::with_capacity(vec.len() * 8);

	out.push('[');

	for (i, value) in vec.iter().enumerate() {
		if i > 0 {
			out.push(',');
		}

		out.push_str(&value.to_string());
	}

	out.push(']');

	out
}

/// Bounds one capability call. Elapsed calls surface as provider errors.
pub(crate) async fn with_timeout<T>(
	timeout_ms: u64,
	operation: &str,
	fut: impl Future<Output = Result<T>>,
) -> Result<T> {
	match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
		Ok(result) => result,
		Err(_) => Err(Error::provider(format!("{operation} timed out after {timeout_ms} ms."))),
	}
}
