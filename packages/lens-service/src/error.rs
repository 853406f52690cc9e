use lens_domain::scenario::ScenarioError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String, field: Option<String> },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl Error {
	pub fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into(), field: None }
	}

	pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into(), field: Some(field.into()) }
	}

	pub fn provider(message: impl Into<String>) -> Self {
		Self::Provider { message: message.into() }
	}
}

impl From<lens_providers::Error> for Error {
	fn from(err: lens_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<lens_storage::Error> for Error {
	fn from(err: lens_storage::Error) -> Self {
		match err {
			lens_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			lens_storage::Error::InvalidArgument(message) => Self::invalid(message),
			lens_storage::Error::Conflict(message) => Self::Conflict { message },
		}
	}
}

impl From<ScenarioError> for Error {
	fn from(err: ScenarioError) -> Self {
		Self::invalid_field("scenario", err.to_string())
	}
}
