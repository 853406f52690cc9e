use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use lens_config::Retrieval as RetrievalOptions;
use lens_domain::{
	candidate::RetrievalCandidate,
	scenario::{Scenario, ScenarioInput},
};
use lens_storage::models::QueryRecord;

use crate::{
	Error, InsightResponse, LensService, Result,
	retrieval::{PipelineTrace, Retrieval, RetrievalOverride},
};

/// Upper bound for one background query-log write.
const QUERY_LOG_TIMEOUT_MS: u64 = 5_000;

/// A scenario in one of the accepted payload shapes plus optional retrieval overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
	pub input: ScenarioInput,
	pub options: RetrievalOverride,
}
impl QueryRequest {
	pub fn new(scenario: impl Into<String>) -> Self {
		Self {
			input: ScenarioInput::ScenarioText(scenario.into()),
			options: RetrievalOverride::default(),
		}
	}

	/// Accepts a bare string, `{"messages": [...]}` or `{"prompt": "..."}`. Objects may carry an
	/// `options` map of retrieval overrides.
	pub fn from_json(body: &Value) -> Result<Self> {
		let input = ScenarioInput::from_json(body)?;
		let options = match body.get("options") {
			None | Some(Value::Null) => RetrievalOverride::default(),
			Some(raw) => serde_json::from_value(raw.clone())
				.map_err(|err| Error::invalid_field("options", err.to_string()))?,
		};

		Ok(Self { input, options })
	}
}

pub type RetrieveRequest = QueryRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
	pub query_id: Uuid,
	pub insight: InsightResponse,
	pub models: Vec<RetrievalCandidate>,
	pub trace: PipelineTrace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveResponse {
	pub query_id: Uuid,
	pub candidates: Vec<RetrievalCandidate>,
	pub trace: PipelineTrace,
}

impl LensService {
	/// Full flow: validation, intent, retrieval, advice, query log.
	pub async fn query(&self, req: QueryRequest) -> Result<QueryResponse> {
		let started = Instant::now();
		let (scenario, options) = self.validate_request(req)?;
		let intent = self.extract_intent(scenario.as_str()).await;
		let retrieval =
			self.orchestrator().find_relevant(scenario.as_str(), &intent.tags, &options).await?;

		if retrieval.candidates.is_empty() {
			return Err(Error::NotFound {
				message: "No relevant mental models found for this scenario.".to_string(),
			});
		}

		let insight = self.draft_advice(scenario.as_str(), &intent, &retrieval, started).await?;
		let query_id = Uuid::new_v4();

		self.record_query(
			query_id,
			scenario.as_str(),
			serde_json::to_value(&intent).unwrap_or_default(),
			&retrieval,
			started,
		);

		let Retrieval { candidates, trace } = retrieval;

		Ok(QueryResponse { query_id, insight, models: candidates, trace })
	}

	/// Retrieval only: no intent extraction and no advice. A miss is an empty list.
	pub async fn retrieve(&self, req: RetrieveRequest) -> Result<RetrieveResponse> {
		let started = Instant::now();
		let (scenario, options) = self.validate_request(req)?;
		let retrieval = self.orchestrator().find_relevant(scenario.as_str(), &[], &options).await?;
		let query_id = Uuid::new_v4();

		self.record_query(query_id, scenario.as_str(), Value::Null, &retrieval, started);

		let Retrieval { candidates, trace } = retrieval;

		Ok(RetrieveResponse { query_id, candidates, trace })
	}

	fn validate_request(&self, req: QueryRequest) -> Result<(Scenario, RetrievalOptions)> {
		let scenario = req.input.resolve(self.cfg.security.min_scenario_chars as usize)?;
		let options = req.options.apply(self.cfg.retrieval)?;

		Ok((scenario, options))
	}

	/// Appends to the query log in the background. The caller never waits on the write and its
	/// failures are only logged.
	fn record_query(
		&self,
		query_id: Uuid,
		scenario: &str,
		intent: Value,
		retrieval: &Retrieval,
		started: Instant,
	) {
		let record = QueryRecord {
			query_id,
			scenario: scenario.to_string(),
			intent,
			processing_time_ms: i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX),
			models_considered: i32::try_from(retrieval.trace.candidates_considered())
				.unwrap_or(i32::MAX),
			models_selected: i32::try_from(retrieval.candidates.len()).unwrap_or(i32::MAX),
			stages: serde_json::to_value(&retrieval.trace.stages).unwrap_or_default(),
			created_at: OffsetDateTime::now_utc(),
		};
		let store = self.store.clone();

		tokio::spawn(async move {
			let write = store.log_query(&record);
			let result = crate::with_timeout(QUERY_LOG_TIMEOUT_MS, "Query log write", write).await;

			if let Err(err) = result {
				tracing::warn!(error = %err, %query_id, "Failed to log query.");
			}
		});
	}
}
