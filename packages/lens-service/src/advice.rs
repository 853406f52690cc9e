//! Structured advice drafted by the writer model from the retrieved mental models.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use lens_domain::{
	candidate::RetrievalCandidate,
	intent::{Complexity, Intent},
};

use crate::{Error, LensService, Result, retrieval::Retrieval};

const SYSTEM_PROMPT: &str = "\
You are Lens, an advisor that helps people make better decisions by applying mental models to \
their specific scenarios. Respond with a single JSON object and nothing else.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightResponse {
	pub analysis: Analysis,
	#[serde(default)]
	pub mental_models: Vec<ModelInsight>,
	pub insights: Insights,
	#[serde(default)]
	pub action_items: Vec<ActionItem>,
	pub context: InsightContext,
	/// Always replaced with measured values after drafting.
	#[serde(default)]
	pub metadata: InsightMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
	pub scenario_title: String,
	pub what_we_heard: String,
	pub primary_domain: String,
	pub complexity_level: Complexity,
	#[serde(default)]
	pub key_concepts: Vec<String>,
	#[serde(default)]
	pub mental_models_applied: Vec<String>,
}

/// One mental model as applied to the scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInsight {
	#[serde(default)]
	pub id: String,
	pub name: String,
	#[serde(default)]
	pub concept_description: String,
	#[serde(default)]
	pub application_description: String,
	#[serde(default)]
	pub scenario_tie_in: String,
	#[serde(default)]
	pub do_items: Vec<String>,
	#[serde(default)]
	pub avoid_items: Vec<String>,
	#[serde(default)]
	pub reflection_question: String,
	#[serde(default)]
	pub similarity: f32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rerank_score: Option<f32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub judge_score: Option<f32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub judge_reasoning: Option<String>,
}
impl ModelInsight {
	fn apply_scores(&mut self, candidate: Option<&RetrievalCandidate>) {
		let Some(candidate) = candidate else {
			self.id.clear();
			self.similarity = 0.0;
			self.rerank_score = None;
			self.judge_score = None;
			self.judge_reasoning = None;

			return;
		};

		self.id = candidate.entry.entry_id.to_string();
		self.similarity = candidate.similarity;
		self.rerank_score = candidate.rerank_score;
		self.judge_score = candidate.judge_score;
		self.judge_reasoning = candidate.judge_reasoning.clone();

		if self.application_description.trim().is_empty() {
			self.application_description = candidate.entry.application_or_empty().to_string();
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insights {
	#[serde(default)]
	pub key_perspectives: Vec<String>,
	#[serde(default)]
	pub blind_spots: Vec<String>,
	#[serde(default)]
	pub reframes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
	High,
	Medium,
	Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
	pub title: String,
	pub description: String,
	pub priority: Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
	Low,
	Medium,
	High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightContext {
	pub confidence_level: Confidence,
	#[serde(default)]
	pub follow_up_questions: Vec<String>,
	#[serde(default)]
	pub related_concepts: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightMetadata {
	pub processing_time_ms: u64,
	pub models_considered: u32,
	pub models_selected: u32,
}

impl LensService {
	/// Asks the writer model for advice grounded in `retrieval`.
	///
	/// Drafting is not part of the retrieval degrade contract: any failure is returned as a
	/// provider error.
	pub async fn draft_advice(
		&self,
		scenario: &str,
		intent: &Intent,
		retrieval: &Retrieval,
		started: Instant,
	) -> Result<InsightResponse> {
		let cfg = &self.cfg.providers.llm_writer;
		let prompt = advice_prompt(scenario, intent, &retrieval.candidates);
		let messages = lens_providers::chat::messages(SYSTEM_PROMPT, &prompt);
		let call = self.providers.writer.complete_json(cfg, &messages);
		let value = crate::with_timeout(cfg.timeout_ms, "Advice drafting", call).await?;
		let mut insight: InsightResponse = serde_json::from_value(value)
			.map_err(|err| Error::provider(format!("Advice output is malformed: {err}.")))?;

		stamp_measured_values(&mut insight, retrieval, started);

		Ok(insight)
	}
}

/// Overwrites metadata and per-model scores with what the pipeline actually measured.
pub fn stamp_measured_values(
	insight: &mut InsightResponse,
	retrieval: &Retrieval,
	started: Instant,
) {
	for model in &mut insight.mental_models {
		let candidate =
			retrieval.candidates.iter().find(|candidate| candidate.name() == model.name);

		model.apply_scores(candidate);
	}

	insight.metadata = InsightMetadata {
		processing_time_ms: crate::retrieval::elapsed_ms(started),
		models_considered: to_u32(retrieval.trace.candidates_considered()),
		models_selected: to_u32(retrieval.candidates.len()),
	};
}

pub fn advice_prompt(
	scenario: &str,
	intent: &Intent,
	candidates: &[RetrievalCandidate],
) -> String {
	let models = candidates.iter().map(model_context).collect::<Vec<_>>().join("\n\n");
	let key_concepts = intent.key_concepts.join(", ");
	let domain = &intent.domain;
	let complexity = intent.complexity.as_str();

	format!(
		"SCENARIO: \"{scenario}\"\n\n\
		 INTENT ANALYSIS:\n\
		 - Domain: {domain}\n\
		 - Complexity: {complexity}\n\
		 - Key Concepts: {key_concepts}\n\n\
		 AVAILABLE MENTAL MODELS:\n{models}\n\n\
		 INSTRUCTIONS:\n\
		 1. Create a catchy, descriptive scenario title (3-6 words) that captures the essence of \
		 their situation.\n\
		 2. Summarize what you understood from their scenario in 1-2 sentences (what_we_heard).\n\
		 3. Analyze the scenario using only the mental models above, keeping their names exactly.\n\
		 4. For each mental model provide concept_description (1-2 direct, opinionated \
		 sentences), scenario_tie_in (1-2 sentences on how it applies here), do_items (exactly 1 \
		 concrete step), avoid_items (exactly 1 pitfall) and reflection_question (one question \
		 that deepens their thinking).\n\
		 5. Provide key perspectives, blind spots and reframes.\n\
		 6. Give 2-4 specific action items with priority high, medium or low.\n\
		 7. Include follow-up questions and related concepts, and state your confidence as low, \
		 medium or high.\n\n\
		 Return JSON with the keys analysis {{scenario_title, what_we_heard, primary_domain, \
		 complexity_level, key_concepts, mental_models_applied}}, mental_models [{{name, \
		 concept_description, application_description, scenario_tie_in, do_items, avoid_items, \
		 reflection_question}}], insights {{key_perspectives, blind_spots, reframes}}, \
		 action_items [{{title, description, priority}}] and context {{confidence_level, \
		 follow_up_questions, related_concepts}}."
	)
}

fn model_context(candidate: &RetrievalCandidate) -> String {
	let mut scores = format!("vector: {:.2}", candidate.similarity);

	if let Some(score) = candidate.rerank_score {
		scores.push_str(&format!(", rerank: {score:.2}"));
	}
	if let Some(score) = candidate.judge_score {
		scores.push_str(&format!(", judge: {score:.2}"));
	}

	let reasoning = candidate
		.final_reasoning()
		.map(|reasoning| format!("\nJudge reasoning: {reasoning}"))
		.unwrap_or_default();

	format!(
		"**{}** ({scores}){reasoning}\n\nConcept: {}\n\nWhen to use: {}\n\n\
		 Full description:\n{}\n---",
		candidate.name(),
		candidate.entry.concept_or_empty(),
		candidate.entry.application_or_empty(),
		candidate.entry.body_md,
	)
}

fn to_u32(value: usize) -> u32 {
	u32::try_from(value).unwrap_or(u32::MAX)
}
