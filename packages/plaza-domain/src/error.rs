pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// A pre-merged record was expected but absent. The merge invariant was
	/// broken upstream; callers must not retry or swallow this.
	#[error("Internal consistency violation: {message}")]
	Internal { message: String },
}
