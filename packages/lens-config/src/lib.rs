mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, LlmProviderConfig, Postgres, ProviderConfig, Providers,
	Retrieval, Security, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw =
		fs::read_to_string(path).map_err(|err| Error::Read { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config =
		toml::from_str(&raw).map_err(|err| Error::Parse { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);
	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (field, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("service.admin_bind", &cfg.service.admin_bind),
		("storage.postgres.dsn", &cfg.storage.postgres.dsn),
	] {
		if value.trim().is_empty() {
			return Err(Error::invalid(field, "must be non-empty."));
		}
	}

	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::invalid("storage.postgres.pool_max_conns", "must be greater than zero."));
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::invalid(
			"providers.embedding.dimensions",
			"must be greater than zero.",
		));
	}
	if cfg.providers.embedding.dimensions != cfg.storage.postgres.vector_dim {
		return Err(Error::invalid(
			"providers.embedding.dimensions",
			"must match storage.postgres.vector_dim.",
		));
	}

	for (field, key) in [
		("providers.embedding.api_key", &cfg.providers.embedding.api_key),
		("providers.llm_judge.api_key", &cfg.providers.llm_judge.api_key),
		("providers.llm_writer.api_key", &cfg.providers.llm_writer.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::invalid(field, "must be non-empty."));
		}
	}

	for (field, timeout_ms) in [
		("providers.embedding.timeout_ms", cfg.providers.embedding.timeout_ms),
		("providers.rerank.timeout_ms", cfg.providers.rerank.timeout_ms),
		("providers.llm_judge.timeout_ms", cfg.providers.llm_judge.timeout_ms),
		("providers.llm_writer.timeout_ms", cfg.providers.llm_writer.timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::invalid(field, "must be greater than zero."));
		}
	}

	for (field, temperature) in [
		("providers.llm_judge.temperature", cfg.providers.llm_judge.temperature),
		("providers.llm_writer.temperature", cfg.providers.llm_writer.temperature),
	] {
		if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
			return Err(Error::invalid(field, "must be in the range 0.0-2.0."));
		}
	}

	validate_retrieval(&cfg.retrieval)?;

	if cfg.security.min_scenario_chars == 0 {
		return Err(Error::invalid("security.min_scenario_chars", "must be greater than zero."));
	}

	Ok(())
}

/// Checks stage widths and the similarity floor. Also applied to per-request overrides.
pub fn validate_retrieval(retrieval: &Retrieval) -> Result<()> {
	if !retrieval.match_threshold.is_finite() {
		return Err(Error::invalid("retrieval.match_threshold", "must be a finite number."));
	}
	if !(-1.0..=1.0).contains(&retrieval.match_threshold) {
		return Err(Error::invalid("retrieval.match_threshold", "must be in the range -1.0-1.0."));
	}
	if retrieval.final_count == 0 {
		return Err(Error::invalid("retrieval.final_count", "must be greater than zero."));
	}
	if retrieval.rerank_count < retrieval.final_count {
		return Err(Error::invalid(
			"retrieval.rerank_count",
			"must be at least retrieval.final_count.",
		));
	}
	if retrieval.candidate_count < retrieval.rerank_count {
		return Err(Error::invalid(
			"retrieval.candidate_count",
			"must be at least retrieval.rerank_count.",
		));
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.security.api_auth_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false)
	{
		cfg.security.api_auth_token = None;
	}
	if cfg
		.security
		.admin_auth_token
		.as_deref()
		.map(|token| token.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.security.admin_auth_token = None;
	}

	cfg.providers.rerank.api_key = cfg.providers.rerank.api_key.trim().to_string();
}
