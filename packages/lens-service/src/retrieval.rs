//! The hybrid retrieval pipeline: vector candidates, cross-encoder rerank, LLM judge.
//!
//! Each stage reports how it finished through [`StageStatus`]. Degraded stages still produce
//! output, so a query only fails when the store itself cannot be read.

pub mod judge;
pub mod pipeline;
pub mod rerank;
pub mod vector;

use serde::{Deserialize, Serialize};

use lens_config::Retrieval as RetrievalOptions;
use lens_domain::candidate::RetrievalCandidate;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
	Vector,
	Rerank,
	Judge,
}
impl Stage {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Vector => "vector",
			Self::Rerank => "rerank",
			Self::Judge => "judge",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
	Completed,
	/// The stage substituted its fallback output.
	Degraded { reason: String },
	/// The stage did not run.
	Skipped { reason: String },
}
impl StageStatus {
	pub fn degraded(reason: impl Into<String>) -> Self {
		Self::Degraded { reason: reason.into() }
	}

	pub fn skipped(reason: impl Into<String>) -> Self {
		Self::Skipped { reason: reason.into() }
	}

	pub fn is_degraded(&self) -> bool {
		matches!(self, Self::Degraded { .. })
	}

	pub fn label(&self) -> &'static str {
		match self {
			Self::Completed => "completed",
			Self::Degraded { .. } => "degraded",
			Self::Skipped { .. } => "skipped",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTrace {
	pub stage: Stage,
	#[serde(flatten)]
	pub status: StageStatus,
	pub input_count: usize,
	pub output_count: usize,
	pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineTrace {
	pub stages: Vec<StageTrace>,
	pub elapsed_ms: u64,
}
impl PipelineTrace {
	pub fn stage(&self, stage: Stage) -> Option<&StageTrace> {
		self.stages.iter().find(|trace| trace.stage == stage)
	}

	/// Width of the vector stage, i.e. how many entries the query actually considered.
	pub fn candidates_considered(&self) -> usize {
		self.stage(Stage::Vector).map(|trace| trace.output_count).unwrap_or_default()
	}

	pub(crate) fn push_skipped(&mut self, stage: Stage, reason: &str, input_count: usize) {
		tracing::debug!(stage = stage.as_str(), reason, input_count, "Pipeline stage skipped.");

		self.stages.push(StageTrace {
			stage,
			status: StageStatus::skipped(reason),
			input_count,
			output_count: 0,
			elapsed_ms: 0,
		});
	}
}

/// Result of one pass through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retrieval {
	pub candidates: Vec<RetrievalCandidate>,
	pub trace: PipelineTrace,
}

/// Per-request adjustments of the configured retrieval options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalOverride {
	pub match_threshold: Option<f32>,
	pub candidate_count: Option<u32>,
	pub rerank_count: Option<u32>,
	pub final_count: Option<u32>,
	pub use_reranking: Option<bool>,
	pub use_final_ranking: Option<bool>,
}
impl RetrievalOverride {
	/// Layers the override on `base` and validates the combined widths.
	pub fn apply(&self, base: RetrievalOptions) -> Result<RetrievalOptions> {
		let merged = RetrievalOptions {
			match_threshold: self.match_threshold.unwrap_or(base.match_threshold),
			candidate_count: self.candidate_count.unwrap_or(base.candidate_count),
			rerank_count: self.rerank_count.unwrap_or(base.rerank_count),
			final_count: self.final_count.unwrap_or(base.final_count),
			use_reranking: self.use_reranking.unwrap_or(base.use_reranking),
			use_final_ranking: self.use_final_ranking.unwrap_or(base.use_final_ranking),
		};

		lens_config::validate_retrieval(&merged).map_err(|err| {
			let field = err.field().map(|field| field.replacen("retrieval.", "options.", 1));

			Error::InvalidRequest { message: err.to_string(), field }
		})?;

		Ok(merged)
	}
}

pub(crate) fn elapsed_ms(started: std::time::Instant) -> u64 {
	u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
