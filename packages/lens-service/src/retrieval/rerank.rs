use std::collections::HashSet;

use lens_config::ProviderConfig;
use lens_domain::{candidate::cmp_f32_desc, entry::KnowledgeEntry};

use crate::{RerankHit, RerankProvider, retrieval::StageStatus};

/// Score assigned to every document when the backend cannot be used.
pub const NEUTRAL_SCORE: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct RerankOutcome {
	/// Descending by score; indices address the input documents.
	pub hits: Vec<RerankHit>,
	pub status: StageStatus,
}

pub struct Reranker<'a> {
	pub cfg: &'a ProviderConfig,
	pub provider: &'a dyn RerankProvider,
}
impl<'a> Reranker<'a> {
	pub fn new(cfg: &'a ProviderConfig, provider: &'a dyn RerankProvider) -> Self {
		Self { cfg, provider }
	}

	pub fn is_configured(&self) -> bool {
		self.cfg.has_api_key()
	}

	/// At most `top_k` hits, best first. When the backend is unusable every document is passed
	/// through in input order with [`NEUTRAL_SCORE`].
	pub async fn rerank(&self, query: &str, documents: &[String], top_k: usize) -> RerankOutcome {
		if documents.is_empty() {
			return RerankOutcome { hits: Vec::new(), status: StageStatus::Completed };
		}
		if !self.is_configured() {
			tracing::warn!(
				provider_id = self.cfg.provider_id.as_str(),
				"Rerank credential is not configured. Passing documents through."
			);

			return RerankOutcome {
				hits: passthrough(documents.len()),
				status: StageStatus::degraded("Rerank credential is not configured."),
			};
		}

		let call = self.provider.rerank(self.cfg, query, documents, top_k);

		match crate::with_timeout(self.cfg.timeout_ms, "Rerank", call).await {
			Ok(hits) => RerankOutcome {
				hits: sanitize_hits(hits, documents.len(), top_k),
				status: StageStatus::Completed,
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					provider_id = self.cfg.provider_id.as_str(),
					documents = documents.len(),
					"Rerank failed. Passing documents through."
				);

				RerankOutcome {
					hits: passthrough(documents.len()),
					status: StageStatus::degraded(err.to_string()),
				}
			},
		}
	}
}

/// Rerank text for one entry: every description plus the body.
pub fn render_document(entry: &KnowledgeEntry) -> String {
	let tag_list = entry.tag_list();
	let helps_with = if tag_list.is_empty() {
		"general decision-making".to_string()
	} else {
		format!("{tag_list} situations")
	};

	format!(
		"Mental Framework: {name}\n\n\
		 Core Concept: {concept}\n\n\
		 When to Apply: {application}\n\n\
		 Categories: {tag_list}\n\n\
		 Detailed Framework:\n{body}\n\n\
		 This mental model helps with: {helps_with}",
		name = entry.name,
		concept = entry.concept_or_empty(),
		application = entry.application_or_empty(),
		body = entry.body_md,
	)
}

/// States what the user is looking for so the cross-encoder scores frameworks, not topic overlap.
pub fn reframe_query(scenario: &str) -> String {
	format!(
		"User scenario: \"{scenario}\"\n\n\
		 The user is facing this situation and is looking for a mental framework or \
		 decision-making model to help them think through and analyze their situation more \
		 effectively. They need practical guidance on how to approach this decision or challenge."
	)
}

pub fn passthrough(len: usize) -> Vec<RerankHit> {
	(0..len).map(|index| RerankHit { index, relevance_score: NEUTRAL_SCORE }).collect()
}

fn sanitize_hits(hits: Vec<RerankHit>, len: usize, top_k: usize) -> Vec<RerankHit> {
	let mut seen = HashSet::new();
	let mut kept: Vec<RerankHit> = hits
		.into_iter()
		.filter(|hit| hit.index < len && hit.relevance_score.is_finite())
		.filter(|hit| seen.insert(hit.index))
		.collect();

	kept.sort_by(|a, b| cmp_f32_desc(a.relevance_score, b.relevance_score));
	kept.truncate(top_k);

	kept
}
