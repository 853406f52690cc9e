use lens_config::EmbeddingProviderConfig;
use lens_domain::{
	candidate::{RetrievalCandidate, cmp_f32_desc},
	tags,
};

use crate::{EmbeddingProvider, Error, KnowledgeStore, Result, retrieval::StageStatus};

/// Candidates produced by the vector stage and how the stage finished.
#[derive(Debug, Clone)]
pub struct VectorOutcome {
	pub candidates: Vec<RetrievalCandidate>,
	pub status: StageStatus,
}

pub struct VectorRetriever<'a> {
	pub cfg: &'a EmbeddingProviderConfig,
	pub embedding: &'a dyn EmbeddingProvider,
	pub store: &'a dyn KnowledgeStore,
}
impl<'a> VectorRetriever<'a> {
	pub fn new(
		cfg: &'a EmbeddingProviderConfig,
		embedding: &'a dyn EmbeddingProvider,
		store: &'a dyn KnowledgeStore,
	) -> Self {
		Self { cfg, embedding, store }
	}

	/// Top `count` entries by application similarity, never failing.
	///
	/// Any error yields an empty list. Use [`Self::try_retrieve`] to tell store failures apart.
	pub async fn retrieve(
		&self,
		query: &str,
		threshold: f32,
		count: u32,
		tags: &[String],
	) -> Vec<RetrievalCandidate> {
		match self.try_retrieve(query, threshold, count, tags).await {
			Ok(outcome) => outcome.candidates,
			Err(err) => {
				tracing::warn!(error = %err, "Vector retrieval failed. Returning no candidates.");

				Vec::new()
			},
		}
	}

	/// Like [`Self::retrieve`], but store read failures are returned as errors.
	///
	/// Embedding failures, timeouts and width mismatches degrade to an empty candidate set.
	pub async fn try_retrieve(
		&self,
		query: &str,
		threshold: f32,
		count: u32,
		tags: &[String],
	) -> Result<VectorOutcome> {
		if count == 0 {
			return Ok(VectorOutcome { candidates: Vec::new(), status: StageStatus::Completed });
		}

		let embedding = match self.embed_query(query).await {
			Ok(embedding) => embedding,
			Err(err) => {
				tracing::warn!(
					error = %err,
					provider_id = self.cfg.provider_id.as_str(),
					"Query embedding failed. Vector stage returns no candidates."
				);

				return Ok(VectorOutcome {
					candidates: Vec::new(),
					status: StageStatus::degraded(err.to_string()),
				});
			},
		};
		let mut matches = self.store.match_by_application(&embedding, threshold, count).await?;

		matches.retain(|scored| scored.similarity >= threshold);
		matches.sort_by(|a, b| cmp_f32_desc(a.similarity, b.similarity));
		matches.truncate(count as usize);

		// Tags narrow the ranked list; they never reorder it.
		let candidates = matches
			.into_iter()
			.filter(|scored| tags::tags_overlap(&scored.entry.tags, tags))
			.map(RetrievalCandidate::from_vector)
			.collect();

		Ok(VectorOutcome { candidates, status: StageStatus::Completed })
	}

	async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
		let texts = [query.replace(['\r', '\n'], " ")];
		let vectors = crate::with_timeout(
			self.cfg.timeout_ms,
			"Query embedding",
			self.embedding.embed(self.cfg, &texts),
		)
		.await?;
		let Some(vector) = vectors.into_iter().next() else {
			return Err(Error::provider("Embedding provider returned no vectors."));
		};

		if vector.len() != self.cfg.dimensions as usize {
			return Err(Error::provider(format!(
				"Embedding vector dimension mismatch: expected {}, got {}.",
				self.cfg.dimensions,
				vector.len()
			)));
		}

		Ok(vector)
	}
}
