/// True when any entry tag contains any filter tag, ignoring case.
///
/// Only an empty filter lets every entry through. Blank filter tags never match, so a filter of
/// nothing but blank tags matches no entry. An entry without tags never matches a non-empty
/// filter.
pub fn tags_overlap(entry_tags: &[String], filter: &[String]) -> bool {
	if filter.is_empty() {
		return true;
	}

	let filter = normalize_filter(filter);

	entry_tags.iter().any(|tag| {
		let tag = tag.to_lowercase();

		filter.iter().any(|wanted| tag.contains(wanted.as_str()))
	})
}

/// Lowercased, trimmed, non-blank filter tags.
pub fn normalize_filter(filter: &[String]) -> Vec<String> {
	filter
		.iter()
		.map(|tag| tag.trim().to_lowercase())
		.filter(|tag| !tag.is_empty())
		.collect()
}
