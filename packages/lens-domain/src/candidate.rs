use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::entry::{KnowledgeEntry, ScoredEntry};

pub const FALLBACK_REASONING: &str = "Fallback ranking";

/// A knowledge entry annotated with the scores of the stages it has passed.
///
/// Scores of stages that did not run stay `None`. `final_score` always holds the score of the
/// latest stage that ran: judge, then rerank, then vector similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalCandidate {
	pub entry: KnowledgeEntry,
	pub similarity: f32,
	pub rerank_score: Option<f32>,
	pub judge_score: Option<f32>,
	pub judge_reasoning: Option<String>,
	#[serde(default)]
	pub judge_fallback: bool,
	pub final_score: f32,
}
impl RetrievalCandidate {
	pub fn from_vector(scored: ScoredEntry) -> Self {
		Self {
			entry: scored.entry,
			similarity: scored.similarity,
			rerank_score: None,
			judge_score: None,
			judge_reasoning: None,
			judge_fallback: false,
			final_score: scored.similarity,
		}
	}

	pub fn with_rerank(mut self, score: f32) -> Self {
		self.rerank_score = Some(score);
		self.final_score = score;

		self
	}

	pub fn with_judgement(mut self, judgement: Judgement) -> Self {
		self.judge_score = Some(judgement.score);
		self.judge_reasoning = Some(judgement.reasoning);
		self.judge_fallback = judgement.fallback;
		self.final_score = judgement.score;

		self
	}

	pub fn final_reasoning(&self) -> Option<&str> {
		self.judge_reasoning.as_deref()
	}

	pub fn name(&self) -> &str {
		&self.entry.name
	}
}

/// One entry picked by the relevance judge.
#[derive(Debug, Clone, PartialEq)]
pub struct Judgement {
	/// Position in the judged input.
	pub index: usize,
	pub score: f32,
	pub reasoning: String,
	pub fallback: bool,
}
impl Judgement {
	pub fn fallback(index: usize) -> Self {
		Self { index, score: 0.5, reasoning: FALLBACK_REASONING.to_string(), fallback: true }
	}
}

/// Descending by `final_score`; ties keep their upstream order.
pub fn sort_by_final_score(candidates: &mut [RetrievalCandidate]) {
	candidates.sort_by(|a, b| cmp_f32_desc(a.final_score, b.final_score));
}

pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	b.total_cmp(&a)
}
