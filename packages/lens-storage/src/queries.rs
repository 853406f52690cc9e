use uuid::Uuid;

use crate::{
	Error, Result,
	db::Db,
	models::{EntryUpsert, KnowledgeEntryRow, QueryRecord, ScoredEntryRow},
};

const ENTRY_COLUMNS: &str = "\
entry_id,
	name,
	body_md,
	tags,
	concept_description,
	application_description,
	created_at,
	updated_at";

/// Entries whose application embedding clears `threshold`, closest first.
///
/// Entries that only carry the legacy `embedding` column never match.
pub async fn match_by_application(
	db: &Db,
	vec_text: &str,
	threshold: f32,
	limit: u32,
) -> Result<Vec<ScoredEntryRow>> {
	if !threshold.is_finite() {
		return Err(Error::InvalidArgument("Similarity threshold must be finite.".to_string()));
	}

	let sql = format!(
		"\
SELECT
	{ENTRY_COLUMNS},
	(1 - (application_embedding <=> $1::text::vector))::real AS similarity
FROM knowledge_entries
WHERE application_embedding IS NOT NULL
	AND (1 - (application_embedding <=> $1::text::vector)) >= $2
ORDER BY application_embedding <=> $1::text::vector ASC, entry_id ASC
LIMIT $3"
	);
	let rows = sqlx::query_as::<_, ScoredEntryRow>(&sql)
		.bind(vec_text)
		.bind(f64::from(threshold))
		.bind(i64::from(limit))
		.fetch_all(&db.pool)
		.await?;

	Ok(rows)
}

pub async fn get_entry(db: &Db, entry_id: Uuid) -> Result<Option<KnowledgeEntryRow>> {
	let sql = format!("SELECT {ENTRY_COLUMNS} FROM knowledge_entries WHERE entry_id = $1");
	let row = sqlx::query_as::<_, KnowledgeEntryRow>(&sql)
		.bind(entry_id)
		.fetch_optional(&db.pool)
		.await?;

	Ok(row)
}

/// Writes both descriptions with their vectors in one statement so they never drift apart.
pub async fn upsert_entry(db: &Db, entry: &EntryUpsert<'_>) -> Result<KnowledgeEntryRow> {
	let sql = format!(
		"\
INSERT INTO knowledge_entries (
	entry_id,
	name,
	body_md,
	tags,
	concept_description,
	application_description,
	concept_embedding,
	application_embedding,
	embedding_version,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7::text::vector, $8::text::vector, $9, $10, $10)
ON CONFLICT (entry_id) DO UPDATE
SET
	name = EXCLUDED.name,
	body_md = EXCLUDED.body_md,
	tags = EXCLUDED.tags,
	concept_description = EXCLUDED.concept_description,
	application_description = EXCLUDED.application_description,
	concept_embedding = EXCLUDED.concept_embedding,
	application_embedding = EXCLUDED.application_embedding,
	embedding_version = EXCLUDED.embedding_version,
	updated_at = EXCLUDED.updated_at
RETURNING {ENTRY_COLUMNS}"
	);
	let row = sqlx::query_as::<_, KnowledgeEntryRow>(&sql)
		.bind(entry.entry_id)
		.bind(entry.name)
		.bind(entry.body_md)
		.bind(entry.tags)
		.bind(entry.concept_description)
		.bind(entry.application_description)
		.bind(entry.concept_vec)
		.bind(entry.application_vec)
		.bind(entry.embedding_version)
		.bind(entry.now)
		.fetch_one(&db.pool)
		.await
		.map_err(|err| Error::from_write(err, "An entry with this name"))?;

	Ok(row)
}

pub async fn insert_query_record(db: &Db, record: &QueryRecord) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO queries (
	query_id,
	scenario,
	intent,
	processing_time_ms,
	models_considered,
	models_selected,
	stages,
	created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
	)
	.bind(record.query_id)
	.bind(record.scenario.as_str())
	.bind(&record.intent)
	.bind(record.processing_time_ms)
	.bind(record.models_considered)
	.bind(record.models_selected)
	.bind(&record.stages)
	.bind(record.created_at)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn count_query_records(db: &Db) -> Result<i64> {
	let count = sqlx::query_scalar("SELECT count(*) FROM queries").fetch_one(&db.pool).await?;

	Ok(count)
}
