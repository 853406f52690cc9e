use std::sync::Arc;

use lens_config::Retrieval;
use lens_service::{Error, Retrieval as Outcome, Stage, StageStatus};

use super::{
	Fakes, MemoryStore, SpyCompletion, SpyRerank, entry, names, options, rankings, sample_store,
	test_config,
};

const QUERY: &str = "I keep putting more money into a failing side project.";

async fn run(fakes: &Fakes, options: &Retrieval) -> Outcome {
	fakes
		.service()
		.orchestrator()
		.find_relevant(QUERY, &[], options)
		.await
		.expect("Retrieval failed.")
}

fn status(outcome: &Outcome, stage: Stage) -> &StageStatus {
	&outcome.trace.stage(stage).expect("Stage missing from trace.").status
}

#[tokio::test]
async fn empty_vector_stage_short_circuits() {
	let fakes = Fakes::new(MemoryStore::new());
	let outcome = run(&fakes, &Retrieval::default()).await;

	assert!(outcome.candidates.is_empty());
	assert_eq!(fakes.rerank.count(), 0);
	assert_eq!(fakes.judge.count(), 0);
	assert_eq!(status(&outcome, Stage::Rerank).label(), "skipped");
	assert_eq!(status(&outcome, Stage::Judge).label(), "skipped");
	assert_eq!(outcome.trace.candidates_considered(), 0);
}

#[tokio::test]
async fn reranking_disabled_keeps_similarity_as_final_score() {
	let fakes = Fakes::new(sample_store());
	let outcome = run(&fakes, &Retrieval { use_reranking: false, ..options(15, 5, 2) }).await;

	assert_eq!(names(&outcome.candidates), vec!["Inversion", "Second-Order Thinking"]);
	assert!(
		outcome.candidates.iter().all(|candidate| candidate.final_score == candidate.similarity)
	);
	assert!(outcome.candidates.iter().all(|candidate| candidate.rerank_score.is_none()));
	assert_eq!(fakes.rerank.count(), 0);
	assert_eq!(fakes.judge.count(), 0);
	assert_eq!(status(&outcome, Stage::Judge).label(), "skipped");
}

#[tokio::test]
async fn judging_disabled_keeps_rerank_score_as_final_score() {
	let mut fakes = Fakes::new(sample_store());

	fakes.rerank = Arc::new(SpyRerank::scoring(vec![0.3, 0.95, 0.6]));

	let outcome = run(&fakes, &Retrieval { use_final_ranking: false, ..options(15, 5, 3) }).await;

	assert_eq!(
		names(&outcome.candidates),
		vec!["Second-Order Thinking", "Opportunity Cost", "Inversion"]
	);

	for candidate in &outcome.candidates {
		assert_eq!(Some(candidate.final_score), candidate.rerank_score);
		assert!(candidate.judge_score.is_none());
	}

	assert_eq!(fakes.judge.count(), 0);
}

#[tokio::test]
async fn blank_rerank_credential_skips_rerank_and_judge() {
	let fakes = Fakes::new(sample_store());
	let mut cfg = test_config();

	cfg.providers.rerank.api_key = String::new();

	let outcome = fakes
		.service_with(cfg)
		.orchestrator()
		.find_relevant(QUERY, &[], &Retrieval::default())
		.await
		.expect("Retrieval failed.");

	assert_eq!(outcome.candidates.len(), 3);
	assert!(
		outcome.candidates.iter().all(|candidate| candidate.final_score == candidate.similarity)
	);
	assert_eq!(fakes.rerank.count(), 0);
	assert_eq!(fakes.judge.count(), 0);

	match status(&outcome, Stage::Rerank) {
		StageStatus::Skipped { reason } => assert!(reason.contains("credential")),
		other => panic!("Unexpected status: {other:?}"),
	}
}

#[tokio::test]
async fn closest_entries_win_when_later_stages_are_off() {
	let store = MemoryStore::with_entries(vec![
		(entry("Entry One", &[]), Some(vec![0.0, 1.0, 0.0])),
		(entry("Entry Two", &[]), Some(vec![1.0, 0.0, 0.0])),
		(entry("Entry Three", &[]), Some(vec![0.8, 0.6, 0.0])),
	]);
	let fakes = Fakes::new(store);
	let outcome = run(
		&fakes,
		&Retrieval { use_reranking: false, use_final_ranking: false, ..options(3, 3, 2) },
	)
	.await;

	assert_eq!(names(&outcome.candidates), vec!["Entry Two", "Entry Three"]);
}

#[tokio::test]
async fn rerank_order_replaces_vector_order() {
	let mut fakes = Fakes::new(sample_store());

	fakes.rerank = Arc::new(SpyRerank::scoring(vec![0.1, 0.5, 0.9]));

	let outcome = run(&fakes, &Retrieval { use_final_ranking: false, ..options(3, 3, 3) }).await;

	assert_eq!(
		names(&outcome.candidates),
		vec!["Opportunity Cost", "Second-Order Thinking", "Inversion"]
	);
	assert_eq!(status(&outcome, Stage::Rerank), &StageStatus::Completed);
}

#[tokio::test]
async fn rerank_sees_the_reframed_query() {
	let fakes = Fakes::new(sample_store());

	run(&fakes, &Retrieval { use_final_ranking: false, ..options(15, 5, 3) }).await;

	let queries = fakes.rerank.queries();

	assert_eq!(queries.len(), 1);
	assert!(queries[0].starts_with(&format!("User scenario: \"{QUERY}\"\n\n")));
}

#[tokio::test]
async fn unknown_judge_name_shrinks_the_result() {
	let mut fakes = Fakes::new(sample_store());

	fakes.judge = Arc::new(SpyCompletion::replying(rankings(&[
		("Opportunity Cost", 0.7),
		("Made-Up Model", 0.95),
		("Inversion", 0.9),
	])));

	let outcome = run(&fakes, &options(15, 5, 3)).await;

	assert_eq!(names(&outcome.candidates), vec!["Inversion", "Opportunity Cost"]);
	assert_eq!(outcome.candidates[0].final_score, 0.9);
	assert_eq!(outcome.candidates[0].final_reasoning(), Some("Fits."));
	assert_eq!(status(&outcome, Stage::Judge), &StageStatus::Completed);
}

#[tokio::test]
async fn rerank_failure_degrades_and_judging_continues() {
	let mut fakes = Fakes::new(sample_store());

	fakes.rerank = Arc::new(SpyRerank::failing());

	let outcome = run(&fakes, &options(15, 2, 2)).await;

	assert!(status(&outcome, Stage::Rerank).is_degraded());
	assert!(status(&outcome, Stage::Judge).is_degraded());
	assert_eq!(fakes.judge.count(), 1);
	assert_eq!(names(&outcome.candidates), vec!["Inversion", "Second-Order Thinking"]);
	assert!(outcome.candidates.iter().all(|candidate| candidate.rerank_score == Some(0.5)));
	assert!(outcome.candidates.iter().all(|candidate| candidate.judge_fallback));
}

#[tokio::test]
async fn judge_timeout_takes_the_fallback() {
	let mut fakes = Fakes::new(sample_store());
	let mut cfg = test_config();

	cfg.providers.llm_judge.timeout_ms = 20;
	fakes.judge = Arc::new(
		SpyCompletion::replying(rankings(&[
			("Inversion", 0.9),
			("Second-Order Thinking", 0.8),
			("Opportunity Cost", 0.7),
		]))
		.delayed(500),
	);

	let outcome = fakes
		.service_with(cfg)
		.orchestrator()
		.find_relevant(QUERY, &[], &options(15, 5, 3))
		.await
		.expect("Retrieval failed.");

	assert_eq!(outcome.candidates.len(), 3);
	assert!(outcome.candidates.iter().all(|candidate| candidate.judge_fallback));
	assert!(outcome.candidates.iter().all(|candidate| candidate.final_score == 0.5));
	assert!(status(&outcome, Stage::Judge).is_degraded());
}

#[tokio::test]
async fn every_stage_boundary_truncates() {
	let store = MemoryStore::with_entries(
		(0..8)
			.map(|i| (entry(&format!("Model {i}"), &[]), Some(vec![1.0, i as f32 * 0.1, 0.0])))
			.collect(),
	);
	let fakes = Fakes::new(store);
	let outcome = run(&fakes, &options(6, 4, 2)).await;
	let width = |stage| outcome.trace.stage(stage).map(|trace| trace.output_count);

	assert_eq!(width(Stage::Vector), Some(6));
	assert_eq!(width(Stage::Rerank), Some(4));
	assert_eq!(width(Stage::Judge), Some(2));
	assert_eq!(outcome.candidates.len(), 2);
	assert_eq!(outcome.trace.candidates_considered(), 6);
}

#[tokio::test]
async fn store_failure_propagates() {
	let fakes = Fakes::new(MemoryStore::new().failing_reads());
	let err = fakes
		.service()
		.orchestrator()
		.find_relevant(QUERY, &[], &Retrieval::default())
		.await
		.expect_err("Expected store failure.");

	assert!(matches!(err, Error::Storage { .. }));
	assert_eq!(fakes.rerank.count(), 0);
}
