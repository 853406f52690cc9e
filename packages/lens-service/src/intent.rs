use lens_domain::intent::Intent;

use crate::{Error, LensService, Result};

const SYSTEM_PROMPT: &str = "\
You analyze decision scenarios so relevant mental models can be found. Respond with a single \
JSON object and nothing else.";

impl LensService {
	/// Reads tags, domain, complexity and key concepts from the scenario. Never fails; extraction
	/// errors degrade to [`Intent::neutral`].
	pub async fn extract_intent(&self, scenario: &str) -> Intent {
		match self.try_extract_intent(scenario).await {
			Ok(intent) => intent,
			Err(err) => {
				tracing::warn!(error = %err, "Intent extraction failed. Using neutral intent.");

				Intent::neutral()
			},
		}
	}

	async fn try_extract_intent(&self, scenario: &str) -> Result<Intent> {
		let cfg = &self.cfg.providers.llm_judge;
		let messages = lens_providers::chat::messages(SYSTEM_PROMPT, &intent_prompt(scenario));
		let call = self.providers.judge.complete_json(cfg, &messages);
		let value = crate::with_timeout(cfg.timeout_ms, "Intent extraction", call).await?;

		serde_json::from_value(value)
			.map_err(|err| Error::provider(format!("Intent output is malformed: {err}.")))
	}
}

fn intent_prompt(scenario: &str) -> String {
	format!(
		"Analyze this scenario and extract the intent for finding relevant mental models:\n\n\
		 \"{scenario}\"\n\n\
		 Focus on:\n\
		 - What mental model tags would be most relevant (e.g., decision-making, cognitive-bias, \
		 systems-thinking)\n\
		 - The primary domain this relates to\n\
		 - How complex this scenario is\n\
		 - Key concepts that should guide the search\n\n\
		 Be specific and practical. Return JSON of the form {{\"tags\": [string], \"domain\": \
		 string, \"complexity\": \"simple\" | \"moderate\" | \"complex\", \"key_concepts\": \
		 [string]}}."
	)
}
