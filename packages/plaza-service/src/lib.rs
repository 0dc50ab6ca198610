//! Query construction and result shaping between the marketplace and its
//! faceted search engine. The engine itself, the HTTP transport, and the
//! cache store are collaborators behind traits; everything here is pure
//! computation over their replies.

pub mod error;
pub mod extra_fields;
pub mod filter;
pub mod listing;
pub mod params;
pub mod query;
pub mod results;

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use serde_json::Value;

pub use error::{Error, Result};
pub use extra_fields::{
	DirectKeySource, ExtraField, ExtraFieldDefinition, ExtraFieldSource, PLACEHOLDER_VALUE,
	RawBatchSource, RawRecordSource, resolve_extra_fields,
};
pub use filter::{FilterClause, resolve_filter_clauses};
pub use listing::{ListingPhoto, ListingRecord};
pub use params::ParamBag;
pub use query::{DEFAULT_Q_PARAM, QueryParams, SearchQuery};
pub use results::{FilterOptions, SearchResultPage};

use plaza_domain::FieldCatalog;

use crate::query::SearchQueryArgs;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Produces a raw engine reply for one rendered parameter set. Retry,
/// timeout, and connection pooling live behind this boundary, not in the
/// core.
pub trait EngineClient
where
	Self: Send + Sync,
{
	fn select<'a>(&'a self, params: &'a [(String, String)]) -> BoxFuture<'a, Result<Value>>;
}

pub type CacheCompute<'a> = Box<dyn FnOnce() -> BoxFuture<'a, Result<Value>> + Send + 'a>;

/// Read-through response cache. Concurrent identical misses may both compute
/// and both store; last writer wins.
pub trait ResponseCache
where
	Self: Send + Sync,
{
	fn fetch<'a>(
		&'a self,
		key: &'a str,
		ttl: Duration,
		compute: CacheCompute<'a>,
	) -> BoxFuture<'a, Result<Value>>;
}

pub struct PlazaService {
	pub cfg: plaza_config::Config,
	pub catalog: FieldCatalog,
	pub engine: Arc<dyn EngineClient>,
	pub cache: Arc<dyn ResponseCache>,
}

impl PlazaService {
	pub fn new(
		cfg: plaza_config::Config,
		catalog: FieldCatalog,
		engine: Arc<dyn EngineClient>,
		cache: Arc<dyn ResponseCache>,
	) -> Self {
		Self { cfg, catalog, engine, cache }
	}

	/// The single caller-facing entry point: pre-built opaque filter
	/// conditions plus the raw request parameter map.
	pub fn query(&self, search_conditions: Vec<String>, params: &Value) -> SearchQuery {
		let mut bag = ParamBag::from_value(params);

		bag.flatten_filters();

		let categories = bag.get_str_list("category");
		let scoped_fields =
			self.catalog.scoped(&categories).into_iter().cloned().collect();

		SearchQuery::new(SearchQueryArgs {
			cfg: self.cfg.clone(),
			engine: self.engine.clone(),
			cache: self.cache.clone(),
			search_conditions,
			params: bag,
			scoped_fields,
		})
	}
}
