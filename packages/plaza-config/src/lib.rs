mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Cache, Config, Engine, Media};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.engine.base_url.trim().is_empty() {
		return Err(Error::Validation {
			message: "engine.base_url must be non-empty.".to_string(),
		});
	}
	if cfg.engine.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "engine.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.default_ttl_secs == 0 {
		return Err(Error::Validation {
			message: "cache.default_ttl_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.media.source_path.trim().is_empty() {
		return Err(Error::Validation {
			message: "media.source_path must be non-empty.".to_string(),
		});
	}

	Ok(())
}
