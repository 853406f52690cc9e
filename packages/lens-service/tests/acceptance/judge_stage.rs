use lens_domain::candidate::{FALLBACK_REASONING, RetrievalCandidate};
use lens_service::{RelevanceJudge, StageStatus};

use super::{SpyCompletion, candidate, dummy_llm_provider, rankings};

fn five() -> Vec<RetrievalCandidate> {
	["Inversion", "Sunk Cost", "Opportunity Cost", "Second-Order Thinking", "Regret Minimization"]
		.iter()
		.enumerate()
		.map(|(i, name)| candidate(name, 0.9 - i as f32 * 0.1).with_rerank(0.8 - i as f32 * 0.1))
		.collect()
}

fn assert_fallback(judgements: &[lens_domain::candidate::Judgement], expected: usize) {
	let indices: Vec<usize> = judgements.iter().map(|judgement| judgement.index).collect();

	assert_eq!(indices, (0..expected).collect::<Vec<_>>());

	for judgement in judgements {
		assert!(judgement.fallback);
		assert_eq!(judgement.score, 0.5);
		assert_eq!(judgement.reasoning, FALLBACK_REASONING);
	}
}

#[tokio::test]
async fn failure_returns_leading_candidates_flagged_as_fallback() {
	let cfg = dummy_llm_provider();
	let provider = SpyCompletion::failing();
	let outcome = RelevanceJudge::new(&cfg, &provider, 3).judge("query", &five()).await;

	assert!(outcome.status.is_degraded());
	assert_fallback(&outcome.judgements, 3);
}

#[tokio::test]
async fn fallback_width_is_capped_by_candidate_count() {
	let cfg = dummy_llm_provider();
	let provider = SpyCompletion::failing();
	let candidates = &five()[..2];
	let outcome = RelevanceJudge::new(&cfg, &provider, 3).judge("query", candidates).await;

	assert_fallback(&outcome.judgements, 2);
}

#[tokio::test]
async fn malformed_outputs_are_failures() {
	let cfg = dummy_llm_provider();
	let candidates = five();

	for reply in [
		rankings(&[("Inversion", 0.9), ("Sunk Cost", 0.8)]),
		rankings(&[("Inversion", 0.9), ("Sunk Cost", 1.5), ("Opportunity Cost", 0.7)]),
		serde_json::json!({ "picks": ["Inversion"] }),
	] {
		let provider = SpyCompletion::replying(reply);
		let outcome = RelevanceJudge::new(&cfg, &provider, 3).judge("query", &candidates).await;

		assert!(outcome.status.is_degraded());
		assert_fallback(&outcome.judgements, 3);
	}
}

#[tokio::test]
async fn timeout_falls_back() {
	let mut cfg = dummy_llm_provider();

	cfg.timeout_ms = 20;

	let provider = SpyCompletion::replying(rankings(&[
		("Inversion", 0.9),
		("Sunk Cost", 0.8),
		("Opportunity Cost", 0.7),
	]))
	.delayed(500);
	let outcome = RelevanceJudge::new(&cfg, &provider, 3).judge("query", &five()).await;

	match &outcome.status {
		StageStatus::Degraded { reason } => assert!(reason.contains("timed out")),
		other => panic!("Unexpected status: {other:?}"),
	}

	assert_fallback(&outcome.judgements, 3);
}

#[tokio::test]
async fn names_match_exactly_and_unknown_names_are_dropped() {
	let cfg = dummy_llm_provider();
	let provider = SpyCompletion::replying(rankings(&[
		("Opportunity Cost", 0.95),
		("inversion", 0.9),
		("Regret Minimization", 0.6),
	]));
	let outcome = RelevanceJudge::new(&cfg, &provider, 3).judge("query", &five()).await;
	let picked: Vec<(usize, f32)> =
		outcome.judgements.iter().map(|judgement| (judgement.index, judgement.score)).collect();

	assert_eq!(outcome.status, StageStatus::Completed);
	assert_eq!(picked, vec![(2, 0.95), (4, 0.6)]);
	assert!(outcome.judgements.iter().all(|judgement| !judgement.fallback));
}

#[tokio::test]
async fn prompt_presents_every_candidate_with_scores() {
	let cfg = dummy_llm_provider();
	let provider = SpyCompletion::failing();
	let mut candidates = five();

	candidates[4].rerank_score = None;

	RelevanceJudge::new(&cfg, &provider, 3).judge("Should I move abroad?", &candidates).await;

	let prompts = provider.prompts();
	let prompt = prompts.first().expect("Judge was not called.");

	assert!(prompt.starts_with("User's Scenario: \"Should I move abroad?\""));
	assert!(prompt.contains("1. **Inversion**\nCore Concept: Inversion concept."));
	assert!(prompt.contains("Vector Score: 0.90, Rerank Score: 0.80"));
	assert!(prompt.contains("5. **Regret Minimization**"));
	assert!(prompt.contains("Rerank Score: N/A"));
	assert!(prompt.contains("pick the 3 MOST CONCEPTUALLY RELEVANT"));
}
