use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;

use lens_config::LlmProviderConfig;
use lens_domain::candidate::{Judgement, RetrievalCandidate};

use crate::{CompletionProvider, Error, Result, retrieval::StageStatus};

const SYSTEM_PROMPT: &str = "\
You are a wise advisor with deep knowledge of mental models and decision-making frameworks. \
Respond with a single JSON object and nothing else.";

#[derive(Debug, Clone)]
pub struct JudgeOutcome {
	/// Picked entries, best first as returned by the model; indices address the judged input.
	pub judgements: Vec<Judgement>,
	pub status: StageStatus,
}

#[derive(Debug, Deserialize)]
struct JudgeResponse {
	rankings: Vec<Ranking>,
}

#[derive(Debug, Deserialize)]
struct Ranking {
	name: String,
	relevance_score: f32,
	reasoning: String,
}

pub struct RelevanceJudge<'a> {
	pub cfg: &'a LlmProviderConfig,
	pub provider: &'a dyn CompletionProvider,
	/// How many entries the model is asked to pick.
	pub pick: usize,
}
impl<'a> RelevanceJudge<'a> {
	pub fn new(cfg: &'a LlmProviderConfig, provider: &'a dyn CompletionProvider, pick: usize) -> Self {
		Self { cfg, provider, pick }
	}

	/// Picks the most relevant candidates. Total: any model failure yields the first
	/// `min(pick, len)` candidates in upstream order as fallback judgements.
	pub async fn judge(&self, query: &str, candidates: &[RetrievalCandidate]) -> JudgeOutcome {
		let expected = self.pick.min(candidates.len());

		if expected == 0 {
			return JudgeOutcome { judgements: Vec::new(), status: StageStatus::Completed };
		}

		let messages = lens_providers::chat::messages(
			SYSTEM_PROMPT,
			&build_prompt(query, candidates, expected),
		);
		let call = self.provider.complete_json(self.cfg, &messages);
		let result = crate::with_timeout(self.cfg.timeout_ms, "Relevance judge", call)
			.await
			.and_then(|value| parse_rankings(value, candidates, expected));

		match result {
			Ok(judgements) => JudgeOutcome { judgements, status: StageStatus::Completed },
			Err(err) => {
				tracing::warn!(
					error = %err,
					model = self.cfg.model.as_str(),
					candidates = candidates.len(),
					"Relevance judge failed. Using fallback ranking."
				);

				JudgeOutcome {
					judgements: (0..expected).map(Judgement::fallback).collect(),
					status: StageStatus::degraded(err.to_string()),
				}
			},
		}
	}
}

pub fn build_prompt(query: &str, candidates: &[RetrievalCandidate], pick: usize) -> String {
	let models = candidates
		.iter()
		.enumerate()
		.map(|(i, candidate)| {
			let rerank = candidate
				.rerank_score
				.map(|score| format!("{score:.2}"))
				.unwrap_or_else(|| "N/A".to_string());

			format!(
				"{}. **{}**\nCore Concept: {}\nWhen to Apply: {}\nVector Score: {:.2}, Rerank Score: {}",
				i + 1,
				candidate.name(),
				candidate.entry.concept_or_empty(),
				candidate.entry.application_or_empty(),
				candidate.similarity,
				rerank,
			)
		})
		.collect::<Vec<_>>()
		.join("\n\n");
	let count = candidates.len();

	format!(
		"User's Scenario: \"{query}\"\n\n\
		 You have been given {count} mental models that were selected through semantic \
		 similarity. Your task is to pick the {pick} MOST CONCEPTUALLY RELEVANT ones for this \
		 person's specific scenario.\n\n\
		 Consider:\n\
		 - Which models provide the most actionable insights for THIS specific situation?\n\
		 - Which models would genuinely change how they think about or approach this decision?\n\
		 - Which models are most likely to lead to better outcomes for their scenario?\n\n\
		 Mental Models to Choose From:\n{models}\n\n\
		 Select the top {pick} most relevant models. Copy each name exactly as written above. \
		 Return JSON of the form \
		 {{\"rankings\": [{{\"name\": string, \"relevance_score\": number between 0 and 1, \
		 \"reasoning\": string}}]}} with exactly {pick} rankings, most relevant first."
	)
}

/// Validates the model output and maps names back to candidate positions.
///
/// The output must hold exactly `expected` rankings with scores in [0, 1]. Names are matched
/// exactly; unknown names are dropped and a repeated name is kept once.
pub fn parse_rankings(
	value: Value,
	candidates: &[RetrievalCandidate],
	expected: usize,
) -> Result<Vec<Judgement>> {
	let response: JudgeResponse = serde_json::from_value(value)
		.map_err(|err| Error::provider(format!("Judge output is malformed: {err}.")))?;

	if response.rankings.len() != expected {
		return Err(Error::provider(format!(
			"Judge returned {} rankings, expected {expected}.",
			response.rankings.len()
		)));
	}
	if let Some(bad) = response
		.rankings
		.iter()
		.find(|ranking| !(0.0..=1.0).contains(&ranking.relevance_score))
	{
		return Err(Error::provider(format!(
			"Judge score {} for {:?} is outside [0, 1].",
			bad.relevance_score, bad.name
		)));
	}

	let mut seen = HashSet::new();
	let mut judgements = Vec::with_capacity(expected);

	for ranking in response.rankings {
		let Some(index) = candidates.iter().position(|candidate| candidate.name() == ranking.name)
		else {
			tracing::debug!(name = ranking.name.as_str(), "Judge named an unknown model. Dropping.");

			continue;
		};

		if !seen.insert(index) {
			continue;
		}

		judgements.push(Judgement {
			index,
			score: ranking.relevance_score,
			reasoning: ranking.reasoning,
			fallback: false,
		});
	}

	Ok(judgements)
}
