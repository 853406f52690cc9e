use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use lens_domain::entry::{KnowledgeEntry, ScoredEntry};

#[derive(Debug, sqlx::FromRow)]
pub struct KnowledgeEntryRow {
	pub entry_id: Uuid,
	pub name: String,
	pub body_md: String,
	pub tags: Vec<String>,
	pub concept_description: Option<String>,
	pub application_description: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl From<KnowledgeEntryRow> for KnowledgeEntry {
	fn from(row: KnowledgeEntryRow) -> Self {
		Self {
			entry_id: row.entry_id,
			name: row.name,
			body_md: row.body_md,
			tags: row.tags,
			concept_description: row.concept_description,
			application_description: row.application_description,
			created_at: row.created_at,
			updated_at: row.updated_at,
		}
	}
}

#[derive(Debug, sqlx::FromRow)]
pub struct ScoredEntryRow {
	#[sqlx(flatten)]
	pub entry: KnowledgeEntryRow,
	pub similarity: f32,
}
impl From<ScoredEntryRow> for ScoredEntry {
	fn from(row: ScoredEntryRow) -> Self {
		Self { entry: row.entry.into(), similarity: row.similarity }
	}
}

/// Write model for ingestion. Vectors are pgvector text literals.
#[derive(Debug)]
pub struct EntryUpsert<'a> {
	pub entry_id: Uuid,
	pub name: &'a str,
	pub body_md: &'a str,
	pub tags: &'a [String],
	pub concept_description: &'a str,
	pub application_description: &'a str,
	pub concept_vec: &'a str,
	pub application_vec: &'a str,
	pub embedding_version: &'a str,
	pub now: OffsetDateTime,
}

/// One row of the append-only query log.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueryRecord {
	pub query_id: Uuid,
	pub scenario: String,
	pub intent: Value,
	pub processing_time_ms: i64,
	pub models_considered: i32,
	pub models_selected: i32,
	pub stages: Value,
	pub created_at: OffsetDateTime,
}
