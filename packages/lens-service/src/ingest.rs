use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lens_domain::{
	description::DescriptionDraft,
	entry::{EmbeddedDescriptions, KnowledgeEntry},
};

use crate::{EntryContent, Error, LensService, Result};

const SYSTEM_PROMPT: &str = "\
You describe mental models so they can be matched to the situations people write about. \
Respond with a single JSON object and nothing else.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestRequest {
	/// Existing id to regenerate; a new id is assigned when absent.
	#[serde(default)]
	pub entry_id: Option<Uuid>,
	pub name: String,
	pub body_md: String,
	#[serde(default)]
	pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestResponse {
	pub entry: KnowledgeEntry,
	pub embedding_version: String,
}

impl LensService {
	/// Generates both descriptions, embeds them in one batch and writes everything together.
	pub async fn ingest(&self, req: IngestRequest) -> Result<IngestResponse> {
		let content = EntryContent {
			name: req.name.trim().to_string(),
			body_md: req.body_md.trim().to_string(),
			tags: req
				.tags
				.iter()
				.map(|tag| tag.trim().to_string())
				.filter(|tag| !tag.is_empty())
				.collect(),
		};

		if content.name.is_empty() {
			return Err(Error::invalid_field("name", "Name must be non-empty."));
		}
		if content.body_md.is_empty() {
			return Err(Error::invalid_field("body_md", "Body must be non-empty."));
		}

		let draft = self.draft_descriptions(&content).await?;
		let descriptions = self.embed_descriptions(&draft).await?;
		let entry_id = req.entry_id.unwrap_or_else(Uuid::new_v4);
		let entry = self.store.upsert_entry(entry_id, &content, &descriptions).await?;

		tracing::info!(
			entry_id = %entry.entry_id,
			name = entry.name.as_str(),
			embedding_version = descriptions.embedding_version.as_str(),
			"Knowledge entry ingested."
		);

		Ok(IngestResponse { entry, embedding_version: descriptions.embedding_version })
	}

	pub async fn get_entry(&self, entry_id: Uuid) -> Result<KnowledgeEntry> {
		self.store
			.get_entry(entry_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: format!("Entry {entry_id} does not exist.") })
	}

	async fn draft_descriptions(&self, content: &EntryContent) -> Result<DescriptionDraft> {
		let cfg = &self.cfg.providers.llm_writer;
		let messages = lens_providers::chat::messages(SYSTEM_PROMPT, &description_prompt(content));
		let call = self.providers.writer.complete_json(cfg, &messages);
		let value = crate::with_timeout(cfg.timeout_ms, "Description drafting", call).await?;
		let draft: DescriptionDraft = serde_json::from_value(value)
			.map_err(|err| Error::provider(format!("Description output is malformed: {err}.")))?;

		if !draft.is_usable() {
			return Err(Error::provider(
				"Description output lacks a concept description or application scenarios.",
			));
		}

		Ok(draft)
	}

	async fn embed_descriptions(&self, draft: &DescriptionDraft) -> Result<EmbeddedDescriptions> {
		let cfg = &self.cfg.providers.embedding;
		let texts = [draft.concept_description.trim().to_string(), draft.application_description()];
		let call = self.providers.embedding.embed(cfg, &texts);
		let vectors = crate::with_timeout(cfg.timeout_ms, "Description embedding", call).await?;
		let [concept_embedding, application_embedding]: [Vec<f32>; 2] =
			vectors.try_into().map_err(|vectors: Vec<Vec<f32>>| {
				Error::provider(format!(
					"Embedding provider returned {} vectors for 2 inputs.",
					vectors.len()
				))
			})?;
		let [concept_description, application_description] = texts;
		let descriptions = EmbeddedDescriptions {
			concept_description,
			application_description,
			concept_embedding,
			application_embedding,
			embedding_version: crate::embedding_version(cfg),
		};

		if !descriptions.is_consistent(cfg.dimensions as usize) {
			return Err(Error::provider("Embedding vector dimension mismatch."));
		}

		Ok(descriptions)
	}
}

fn description_prompt(content: &EntryContent) -> String {
	format!(
		"For the mental model \"{name}\", create both a concept description and an application \
		 description.\n\n\
		 Mental Model Content:\n{body}\n\n\
		 Generate:\n\
		 1. A clear 2-sentence concept description (what it IS)\n\
		 2. Specific scenarios when it applies (when to USE it)\n\
		 3. Emotional triggers that indicate relevance\n\
		 4. Keywords that signal this model should be used\n\n\
		 Focus on practical application scenarios that users might describe. Return JSON of the \
		 form {{\"concept_description\": string, \"application_scenarios\": [string], \
		 \"emotional_triggers\": [string], \"keywords\": [string]}}.",
		name = content.name,
		body = content.body_md,
	)
}
