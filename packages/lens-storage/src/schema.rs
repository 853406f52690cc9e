pub fn render_schema(vector_dim: u32) -> String {
	let init = include_str!("../../../sql/init.sql");

	expand_includes(init).replace("<VECTOR_DIM>", &vector_dim.to_string())
}

/// Non-empty statements of a rendered schema, in file order.
pub fn statements(sql: &str) -> impl Iterator<Item = &str> {
	sql.split(';').map(str::trim).filter(|statement| !statement.is_empty())
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		match line.trim().strip_prefix("\\ir ").map(str::trim) {
			Some("00_extensions.sql") => out.push_str(include_str!("../../../sql/00_extensions.sql")),
			Some("tables/001_knowledge_entries.sql") =>
				out.push_str(include_str!("../../../sql/tables/001_knowledge_entries.sql")),
			Some("tables/002_queries.sql") =>
				out.push_str(include_str!("../../../sql/tables/002_queries.sql")),
			_ => out.push_str(line),
		}

		out.push('\n');
	}

	out
}
