use std::time::Instant;

use lens_config::{Config, Retrieval as RetrievalOptions};
use lens_domain::candidate::{RetrievalCandidate, sort_by_final_score};

use crate::{
	KnowledgeStore, Providers, Result,
	retrieval::{
		PipelineTrace, Retrieval, Stage, StageTrace,
		judge::RelevanceJudge,
		rerank::{self, Reranker},
		vector::VectorRetriever,
	},
};

/// Runs vector retrieval, reranking and judging in sequence.
///
/// Every stage boundary truncates to that stage's width. A stage that cannot reach its backend
/// degrades in place; only a store read failure aborts the pass.
pub struct Orchestrator<'a> {
	pub vector: VectorRetriever<'a>,
	pub reranker: Reranker<'a>,
	cfg: &'a Config,
	providers: &'a Providers,
}
impl<'a> Orchestrator<'a> {
	pub fn new(cfg: &'a Config, providers: &'a Providers, store: &'a dyn KnowledgeStore) -> Self {
		Self {
			vector: VectorRetriever::new(
				&cfg.providers.embedding,
				providers.embedding.as_ref(),
				store,
			),
			reranker: Reranker::new(&cfg.providers.rerank, providers.rerank.as_ref()),
			cfg,
			providers,
		}
	}

	/// `tags` are accepted for callers that already know them; they do not affect scoring.
	pub async fn find_relevant(
		&self,
		query: &str,
		tags: &[String],
		options: &RetrievalOptions,
	) -> Result<Retrieval> {
		let started = Instant::now();
		let mut trace = PipelineTrace::default();
		let final_count = options.final_count as usize;
		let rerank_count = options.rerank_count as usize;

		tracing::debug!(?tags, ?options, "Hybrid retrieval started.");

		let stage_started = Instant::now();
		let vector = self
			.vector
			.try_retrieve(query, options.match_threshold, options.candidate_count, &[])
			.await?;
		let candidates = vector.candidates;

		trace.stages.push(StageTrace {
			stage: Stage::Vector,
			status: vector.status,
			input_count: options.candidate_count as usize,
			output_count: candidates.len(),
			elapsed_ms: super::elapsed_ms(stage_started),
		});

		if candidates.is_empty() {
			trace.push_skipped(Stage::Rerank, "No vector candidates.", 0);
			trace.push_skipped(Stage::Judge, "No vector candidates.", 0);

			return Ok(finish(Vec::new(), trace, started));
		}

		let rerank_skip = if !options.use_reranking {
			Some("Reranking is disabled.")
		} else if !self.reranker.is_configured() {
			Some("Rerank credential is not configured.")
		} else {
			None
		};

		if let Some(reason) = rerank_skip {
			let mut list = candidates;

			trace.push_skipped(Stage::Rerank, reason, list.len());
			trace.push_skipped(Stage::Judge, "Reranking did not run.", 0);
			list.truncate(final_count);
			sort_by_final_score(&mut list);

			return Ok(finish(list, trace, started));
		}

		let stage_started = Instant::now();
		let documents: Vec<String> =
			candidates.iter().map(|candidate| rerank::render_document(&candidate.entry)).collect();
		let outcome =
			self.reranker.rerank(&rerank::reframe_query(query), &documents, rerank_count).await;
		let mut reranked = Vec::with_capacity(outcome.hits.len());

		for hit in &outcome.hits {
			if let Some(candidate) = candidates.get(hit.index) {
				reranked.push(candidate.clone().with_rerank(hit.relevance_score));
			}
		}

		sort_by_final_score(&mut reranked);
		reranked.truncate(rerank_count);
		trace.stages.push(StageTrace {
			stage: Stage::Rerank,
			status: outcome.status,
			input_count: candidates.len(),
			output_count: reranked.len(),
			elapsed_ms: super::elapsed_ms(stage_started),
		});

		let judge_skip = if !options.use_final_ranking {
			Some("Final ranking is disabled.")
		} else if reranked.is_empty() {
			Some("Rerank returned no candidates.")
		} else {
			None
		};

		if let Some(reason) = judge_skip {
			trace.push_skipped(Stage::Judge, reason, reranked.len());
			reranked.truncate(final_count);

			return Ok(finish(reranked, trace, started));
		}

		let stage_started = Instant::now();
		let judge = RelevanceJudge::new(
			&self.cfg.providers.llm_judge,
			self.providers.judge.as_ref(),
			final_count,
		);
		let outcome = judge.judge(query, &reranked).await;
		let mut judged = Vec::with_capacity(outcome.judgements.len());

		for judgement in outcome.judgements {
			if let Some(candidate) = reranked.get(judgement.index) {
				judged.push(candidate.clone().with_judgement(judgement));
			}
		}

		sort_by_final_score(&mut judged);
		trace.stages.push(StageTrace {
			stage: Stage::Judge,
			status: outcome.status,
			input_count: reranked.len(),
			output_count: judged.len(),
			elapsed_ms: super::elapsed_ms(stage_started),
		});

		Ok(finish(judged, trace, started))
	}
}

fn finish(
	candidates: Vec<RetrievalCandidate>,
	mut trace: PipelineTrace,
	started: Instant,
) -> Retrieval {
	trace.elapsed_ms = super::elapsed_ms(started);

	tracing::info!(
		considered = trace.candidates_considered(),
		selected = candidates.len(),
		elapsed_ms = trace.elapsed_ms,
		degraded = trace.stages.iter().any(|stage| stage.status.is_degraded()),
		"Hybrid retrieval finished."
	);

	Retrieval { candidates, trace }
}
