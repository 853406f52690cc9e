//! Knowledge store seam and its Postgres implementation.

use time::OffsetDateTime;
use uuid::Uuid;

use lens_domain::entry::{EmbeddedDescriptions, KnowledgeEntry, ScoredEntry};
use lens_storage::{
	db::Db,
	models::{EntryUpsert, QueryRecord},
	queries,
};

use crate::{BoxFuture, Result};

/// Author-supplied part of an entry; descriptions and vectors are derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryContent {
	pub name: String,
	pub body_md: String,
	pub tags: Vec<String>,
}

pub trait KnowledgeStore
where
	Self: Send + Sync,
{
	/// Entries with an application embedding whose cosine similarity to `embedding` is at least
	/// `threshold`, closest first, at most `limit`.
	fn match_by_application<'a>(
		&'a self,
		embedding: &'a [f32],
		threshold: f32,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<ScoredEntry>>>;

	fn get_entry<'a>(&'a self, entry_id: Uuid) -> BoxFuture<'a, Result<Option<KnowledgeEntry>>>;

	/// Creates or replaces an entry together with both descriptions and their vectors.
	fn upsert_entry<'a>(
		&'a self,
		entry_id: Uuid,
		content: &'a EntryContent,
		descriptions: &'a EmbeddedDescriptions,
	) -> BoxFuture<'a, Result<KnowledgeEntry>>;

	fn log_query<'a>(&'a self, record: &'a QueryRecord) -> BoxFuture<'a, Result<()>>;
}

impl KnowledgeStore for Db {
	fn match_by_application<'a>(
		&'a self,
		embedding: &'a [f32],
		threshold: f32,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<ScoredEntry>>> {
		Box::pin(async move {
			let vec_text = crate::vector_to_pg(embedding);
			let rows = queries::match_by_application(self, &vec_text, threshold, limit).await?;

			Ok(rows.into_iter().map(ScoredEntry::from).collect())
		})
	}

	fn get_entry<'a>(&'a self, entry_id: Uuid) -> BoxFuture<'a, Result<Option<KnowledgeEntry>>> {
		Box::pin(async move {
			Ok(queries::get_entry(self, entry_id).await?.map(KnowledgeEntry::from))
		})
	}

	fn upsert_entry<'a>(
		&'a self,
		entry_id: Uuid,
		content: &'a EntryContent,
		descriptions: &'a EmbeddedDescriptions,
	) -> BoxFuture<'a, Result<KnowledgeEntry>> {
		Box::pin(async move {
			let concept_vec = crate::vector_to_pg(&descriptions.concept_embedding);
			let application_vec = crate::vector_to_pg(&descriptions.application_embedding);
			let row = queries::upsert_entry(
				self,
				&EntryUpsert {
					entry_id,
					name: &content.name,
					body_md: &content.body_md,
					tags: &content.tags,
					concept_description: &descriptions.concept_description,
					application_description: &descriptions.application_description,
					concept_vec: &concept_vec,
					application_vec: &application_vec,
					embedding_version: &descriptions.embedding_version,
					now: OffsetDateTime::now_utc(),
				},
			)
			.await?;

			Ok(row.into())
		})
	}

	fn log_query<'a>(&'a self, record: &'a QueryRecord) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(queries::insert_query_record(self, record).await?) })
	}
}
