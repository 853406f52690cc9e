use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// One mental model in the knowledge base.
///
/// Vectors are not carried here; the store keeps them next to the descriptions they were
/// computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
	pub entry_id: Uuid,
	pub name: String,
	pub body_md: String,
	pub tags: Vec<String>,
	/// What the model is.
	pub concept_description: Option<String>,
	/// When to use the model.
	pub application_description: Option<String>,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}
impl KnowledgeEntry {
	pub fn tag_list(&self) -> String {
		self.tags
			.iter()
			.map(|tag| tag.trim())
			.filter(|tag| !tag.is_empty())
			.collect::<Vec<_>>()
			.join(", ")
	}

	pub fn concept_or_empty(&self) -> &str {
		self.concept_description.as_deref().unwrap_or_default()
	}

	pub fn application_or_empty(&self) -> &str {
		self.application_description.as_deref().unwrap_or_default()
	}
}

/// Descriptions and vectors written together by ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedDescriptions {
	pub concept_description: String,
	pub application_description: String,
	pub concept_embedding: Vec<f32>,
	pub application_embedding: Vec<f32>,
	pub embedding_version: String,
}
impl EmbeddedDescriptions {
	/// Both vectors must have the expected width and every description must be non-blank.
	pub fn is_consistent(&self, dimensions: usize) -> bool {
		!self.concept_description.trim().is_empty()
			&& !self.application_description.trim().is_empty()
			&& self.concept_embedding.len() == dimensions
			&& self.application_embedding.len() == dimensions
	}
}

/// A knowledge entry returned by a similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntry {
	pub entry: KnowledgeEntry,
	pub similarity: f32,
}
