use std::{sync::Arc, time::Duration};

use serde_json::{Value, json};

use lens_service::{Error, QueryRequest, Stage};

use super::{
	Fakes, MemoryStore, SpyCompletion, advice_reply, judge_answering, rankings, sample_store,
};

const SCENARIO: &str = "I got a job offer from a startup but I love my current team.";

fn answering_fakes(store: MemoryStore) -> Fakes {
	let mut fakes = Fakes::new(store);

	fakes.judge = Arc::new(judge_answering(rankings(&[
		("Second-Order Thinking", 0.92),
		("Inversion", 0.85),
		("Opportunity Cost", 0.6),
	])));
	fakes.writer = Arc::new(SpyCompletion::replying(advice_reply(&[
		"Second-Order Thinking",
		"Invented Model",
	])));

	fakes
}

#[tokio::test]
async fn query_returns_advice_stamped_with_measured_values() {
	let fakes = answering_fakes(sample_store());
	let response = fakes.service().query(QueryRequest::new(SCENARIO)).await.expect("Query failed.");
	let insight = &response.insight;

	assert_eq!(
		response.models.iter().map(|model| model.name()).collect::<Vec<_>>(),
		vec!["Second-Order Thinking", "Inversion", "Opportunity Cost"]
	);
	assert_eq!(insight.metadata.models_selected, 3);
	assert_eq!(insight.metadata.models_considered, 3);

	let applied = &insight.mental_models[0];

	assert_eq!(applied.id, response.models[0].entry.entry_id.to_string());
	assert_eq!(applied.similarity, response.models[0].similarity);
	assert_eq!(applied.judge_score, Some(0.92));

	let invented = &insight.mental_models[1];

	assert!(invented.id.is_empty());
	assert_eq!(invented.similarity, 0.0);
	assert_eq!(invented.judge_score, None);
	assert_eq!(fakes.judge.count(), 2);
	assert_eq!(fakes.writer.count(), 1);
	assert!(fakes.writer.prompts()[0].starts_with(&format!("SCENARIO: \"{SCENARIO}\"")));
}

#[tokio::test]
async fn query_is_logged_with_intent_and_stage_trace() {
	let fakes = answering_fakes(sample_store());
	let response = fakes.service().query(QueryRequest::new(SCENARIO)).await.expect("Query failed.");
	let logs = fakes.store.wait_for_logs(1).await;

	assert_eq!(logs.len(), 1);

	let record = &logs[0];

	assert_eq!(record.query_id, response.query_id);
	assert_eq!(record.scenario, SCENARIO);
	assert_eq!(record.intent["domain"], "career");
	assert_eq!(record.models_considered, 3);
	assert_eq!(record.models_selected, 3);
	assert_eq!(record.stages.as_array().map(Vec::len), Some(3));
	assert_eq!(record.stages[0]["stage"], "vector");
	assert_eq!(record.stages[0]["status"], "completed");
}

#[tokio::test]
async fn models_considered_is_the_vector_stage_width() {
	let fakes = answering_fakes(sample_store());
	let request = QueryRequest::from_json(&json!({
		"prompt": SCENARIO,
		"options": { "final_count": 1, "rerank_count": 1, "use_final_ranking": false }
	}))
	.expect("Request should parse.");
	let response = fakes.service().query(request).await.expect("Query failed.");

	assert_eq!(response.models.len(), 1);
	assert_eq!(response.insight.metadata.models_selected, 1);
	assert_eq!(response.insight.metadata.models_considered, 3);
	assert_eq!(response.trace.candidates_considered(), 3);
}

#[tokio::test]
async fn intent_failure_falls_back_to_neutral_intent() {
	let mut fakes = answering_fakes(sample_store());

	fakes.judge = Arc::new(SpyCompletion::failing());

	let response = fakes.service().query(QueryRequest::new(SCENARIO)).await.expect("Query failed.");
	let logs = fakes.store.wait_for_logs(1).await;

	assert_eq!(logs[0].intent["domain"], "general");
	assert_eq!(logs[0].intent["complexity"], "moderate");
	assert!(response.models.iter().all(|model| model.judge_fallback));
	assert!(response.trace.stage(Stage::Judge).is_some_and(|trace| trace.status.is_degraded()));
}

#[tokio::test]
async fn total_miss_is_not_found_and_skips_advice_and_log() {
	let fakes = answering_fakes(MemoryStore::new());
	let err = fakes
		.service()
		.query(QueryRequest::new(SCENARIO))
		.await
		.expect_err("Expected a retrieval miss.");

	match err {
		Error::NotFound { message } =>
			assert_eq!(message, "No relevant mental models found for this scenario."),
		other => panic!("Unexpected error: {other:?}"),
	}

	assert_eq!(fakes.writer.count(), 0);
	assert!(fakes.store.logs().is_empty());
}

#[tokio::test]
async fn retrieve_miss_is_an_empty_list() {
	let fakes = answering_fakes(MemoryStore::new());
	let response =
		fakes.service().retrieve(QueryRequest::new(SCENARIO)).await.expect("Retrieve failed.");
	let logs = fakes.store.wait_for_logs(1).await;

	assert!(response.candidates.is_empty());
	assert_eq!(logs.len(), 1);
	assert_eq!(logs[0].intent, Value::Null);
	assert_eq!(logs[0].models_selected, 0);
}

#[tokio::test]
async fn retrieve_skips_intent_and_advice() {
	let fakes = answering_fakes(sample_store());
	let response =
		fakes.service().retrieve(QueryRequest::new(SCENARIO)).await.expect("Retrieve failed.");

	assert_eq!(response.candidates.len(), 3);
	assert_eq!(fakes.judge.count(), 1);
	assert!(
		fakes.judge.prompts().iter().all(|prompt| !prompt.starts_with("Analyze this scenario"))
	);
	assert_eq!(fakes.writer.count(), 0);
}

#[tokio::test]
async fn query_log_failure_does_not_change_the_result() {
	let logged = answering_fakes(sample_store());
	let unlogged = answering_fakes(sample_store().failing_logs());
	let expected =
		logged.service().query(QueryRequest::new(SCENARIO)).await.expect("Query failed.");
	let actual = unlogged
		.service()
		.query(QueryRequest::new(SCENARIO))
		.await
		.expect("Query log failures must not fail the query.");

	assert_eq!(
		actual.models.iter().map(|model| model.name()).collect::<Vec<_>>(),
		expected.models.iter().map(|model| model.name()).collect::<Vec<_>>()
	);
	assert_eq!(actual.insight.mental_models.len(), expected.insight.mental_models.len());
	assert!(unlogged.store.logs().is_empty());
}

#[tokio::test]
async fn stalled_query_log_does_not_hold_back_the_response() {
	let fakes = answering_fakes(sample_store().stalling_logs());
	let service = fakes.service();
	let bounded = Duration::from_secs(2);
	let retrieved = tokio::time::timeout(bounded, service.retrieve(QueryRequest::new(SCENARIO)))
		.await
		.expect("Retrieve waited on the query log.")
		.expect("Retrieve failed.");
	let queried = tokio::time::timeout(bounded, service.query(QueryRequest::new(SCENARIO)))
		.await
		.expect("Query waited on the query log.")
		.expect("Query failed.");

	assert_eq!(retrieved.candidates.len(), 3);
	assert_eq!(queried.models.len(), 3);
	assert!(fakes.store.logs().is_empty());
}

#[tokio::test]
async fn advice_failure_is_a_provider_error() {
	for writer in
		[SpyCompletion::failing(), SpyCompletion::replying(json!({ "advice": "Relax." }))]
	{
		let mut fakes = answering_fakes(sample_store());

		fakes.writer = Arc::new(writer);

		let err = fakes
			.service()
			.query(QueryRequest::new(SCENARIO))
			.await
			.expect_err("Expected advice failure.");

		assert!(matches!(err, Error::Provider { .. }), "Unexpected error: {err:?}");
	}
}

#[tokio::test]
async fn short_scenario_is_rejected_before_retrieval() {
	let fakes = answering_fakes(sample_store());
	let err = fakes
		.service()
		.query(QueryRequest::new("  too short  "))
		.await
		.expect_err("Expected validation failure.");

	match err {
		Error::InvalidRequest { field, .. } => assert_eq!(field.as_deref(), Some("scenario")),
		other => panic!("Unexpected error: {other:?}"),
	}

	assert_eq!(fakes.embedding.count(), 0);
	assert_eq!(fakes.judge.count(), 0);
}

#[tokio::test]
async fn chat_transcript_uses_the_last_user_message() {
	let fakes = answering_fakes(sample_store());
	let request = QueryRequest::from_json(&json!({
		"messages": [
			{ "role": "user", "content": "I am thinking about my career." },
			{ "role": "assistant", "content": "Tell me more about the decision." },
			{ "role": "user", "content": "Should I accept the startup offer?" }
		]
	}))
	.expect("Request should parse.");

	fakes.service().retrieve(request).await.expect("Retrieve failed.");

	let logs = fakes.store.wait_for_logs(1).await;

	assert_eq!(fakes.embedding.texts(), vec!["Should I accept the startup offer?".to_string()]);
	assert_eq!(logs[0].scenario, "Should I accept the startup offer?");
}

#[tokio::test]
async fn invalid_overrides_are_rejected_with_their_field() {
	let fakes = answering_fakes(sample_store());
	let request = QueryRequest::from_json(&json!({
		"prompt": SCENARIO,
		"options": { "final_count": 0 }
	}))
	.expect("Request should parse.");
	let err = fakes.service().retrieve(request).await.expect_err("Expected invalid override.");

	match err {
		Error::InvalidRequest { field, .. } =>
			assert_eq!(field.as_deref(), Some("options.final_count")),
		other => panic!("Unexpected error: {other:?}"),
	}

	let err = QueryRequest::from_json(&json!({ "prompt": SCENARIO, "options": { "top_k": 3 } }))
		.expect_err("Expected unknown option.");

	match err {
		Error::InvalidRequest { field, .. } => assert_eq!(field.as_deref(), Some("options")),
		other => panic!("Unexpected error: {other:?}"),
	}

	assert_eq!(fakes.embedding.count(), 0);
}

#[tokio::test]
async fn unsupported_payload_shape_is_rejected() {
	for body in [json!(42), json!({ "scenario": SCENARIO }), json!({ "messages": [] })] {
		let result = match QueryRequest::from_json(&body) {
			Ok(request) => {
				let fakes = answering_fakes(sample_store());

				fakes.service().query(request).await.map(|_| ())
			},
			Err(err) => Err(err),
		};

		assert!(
			matches!(result, Err(Error::InvalidRequest { .. })),
			"Body {body} should be rejected."
		);
	}
}

#[tokio::test]
async fn store_failure_surfaces_as_a_storage_error() {
	let fakes = answering_fakes(MemoryStore::new().failing_reads());
	let err = fakes
		.service()
		.query(QueryRequest::new(SCENARIO))
		.await
		.expect_err("Expected store failure.");

	assert!(matches!(err, Error::Storage { .. }));
	assert_eq!(fakes.writer.count(), 0);
}
