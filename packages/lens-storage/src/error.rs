#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Conflict: {0}")]
	Conflict(String),
}
impl Error {
	/// Unique violations become [`Error::Conflict`] so callers can report them as client errors.
	pub(crate) fn from_write(err: sqlx::Error, what: &str) -> Self {
		let unique_violation = err
			.as_database_error()
			.and_then(|db_err| db_err.code())
			.is_some_and(|code| code == "23505");

		if unique_violation {
			Self::Conflict(format!("{what} already exists."))
		} else {
			Self::Sqlx(err)
		}
	}
}
