pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// Merge invariants broken upstream. Never retried or swallowed.
	#[error("Internal consistency violation: {message}")]
	Internal { message: String },
	#[error("Engine error: {message}")]
	Engine { message: String },
	#[error("Cache error: {message}")]
	Cache { message: String },
	#[error("Invalid engine response: {message}")]
	InvalidResponse { message: String },
}

impl From<plaza_domain::Error> for Error {
	fn from(err: plaza_domain::Error) -> Self {
		match err {
			plaza_domain::Error::Internal { message } => Self::Internal { message },
		}
	}
}
