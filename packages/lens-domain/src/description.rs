use serde::{Deserialize, Serialize};

/// Writer output used to synthesize an entry's two descriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionDraft {
	pub concept_description: String,
	#[serde(default)]
	pub application_scenarios: Vec<String>,
	#[serde(default)]
	pub emotional_triggers: Vec<String>,
	#[serde(default)]
	pub keywords: Vec<String>,
}
impl DescriptionDraft {
	/// Renders the "when to use this" text that is embedded for application search.
	pub fn application_description(&self) -> String {
		[
			format!("Use when: {}.", join_clean(&self.application_scenarios)),
			format!("Emotional indicators: {}.", join_clean(&self.emotional_triggers)),
			format!("Keywords: {}.", join_clean(&self.keywords)),
		]
		.join(" ")
	}

	pub fn is_usable(&self) -> bool {
		!self.concept_description.trim().is_empty() && !self.application_scenarios.is_empty()
	}
}

fn join_clean(items: &[String]) -> String {
	items
		.iter()
		.map(|item| item.trim().trim_end_matches('.'))
		.filter(|item| !item.is_empty())
		.collect::<Vec<_>>()
		.join(", ")
}
