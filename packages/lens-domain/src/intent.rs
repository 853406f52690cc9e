use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
	Simple,
	Moderate,
	Complex,
}
impl Complexity {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Simple => "simple",
			Self::Moderate => "moderate",
			Self::Complex => "complex",
		}
	}
}

/// What a scenario is about, as read by the judge model before retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
	#[serde(default)]
	pub tags: Vec<String>,
	pub domain: String,
	pub complexity: Complexity,
	#[serde(default)]
	pub key_concepts: Vec<String>,
}
impl Intent {
	/// Used when intent extraction fails.
	pub fn neutral() -> Self {
		Self {
			tags: Vec::new(),
			domain: "general".to_string(),
			complexity: Complexity::Moderate,
			key_concepts: Vec::new(),
		}
	}
}
