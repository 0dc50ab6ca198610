use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub engine: Engine,
	pub cache: Cache,
	pub media: Media,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Engine {
	pub base_url: String,
	pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cache {
	pub enabled: bool,
	/// Applied to every query that does not override its TTL.
	#[serde(default = "default_cache_ttl_secs")]
	pub default_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Media {
	/// Prefix prepended to every stored photo path.
	pub source_path: String,
}

fn default_cache_ttl_secs() -> u64 {
	300
}
