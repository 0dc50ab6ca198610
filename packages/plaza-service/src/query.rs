//! Assembles the full engine request from marketplace parameters and field
//! metadata, and owns response caching keyed by the resolved query.

use std::{sync::Arc, time::Duration};

use serde_json::Value;
use time::{OffsetDateTime, macros::format_description};
use tracing::debug;

use plaza_domain::{FacetableField, FieldValueType};

use crate::{
	EngineClient, ResponseCache,
	error::Result,
	filter::{FilterClause, resolve_filter_clauses},
	params::ParamBag,
	results::SearchResultPage,
};

pub const DEFAULT_Q_PARAM: &str = "*:*";
pub const DEFAULT_ROW_LIMIT: u64 = 30;

const CACHE_NAMESPACE: &str = "plaza-engine-search-results";
const BUILDER_IDENTITY: &str = "SearchQuery";

const HIGHLIGHTED_FILTER: &str = "highlighted_until_d:[NOW TO *]";

/// Facets present on every request: the two marketplace toggles plus the two
/// structural taxonomy facets, each excluded by its own tag.
const DEFAULT_FACETS: [&str; 4] = [
	"{!ex=offering key=offering}offering_s",
	"{!ex=has_photos key=has_photos}has_photos_b",
	"{!ex=category key=category}category_as_json_sm",
	"{!ex=area key=area}area_as_json_sm",
];

const DEFAULT_STATS_FIELDS: [&str; 2] = ["price_start_f", "price_end_f"];

const CATEGORY_FACET_FIELD: &str = "category_as_json_sm";
const AREA_FACET_FIELD: &str = "area_as_json_sm";

/// Baseline `fl` list; category-specific extra fields are appended per
/// request.
const DEFAULT_FIELDS: [&str; 31] = [
	"score",
	"photos_main_url_s",
	"photos_count_i",
	"title_s",
	"id",
	"lister_id_i",
	"listing_id_i",
	"offering_s",
	"area_city_s",
	"area_country_s",
	"price_start_f",
	"price_end_f",
	"sale_price_start_f",
	"rent_price_start_f",
	"sale_price_unit_label_s",
	"rent_price_unit_label_s",
	"is_sale_b",
	"is_rent_b",
	"price_unit_s",
	"category_config_show_category_tree_b",
	"category_config_show_only_category_b",
	"category_config_show_price_b",
	"extra_fields_metadata_sm",
	"category_slug_s",
	"category_slug_sm",
	"category_label_s",
	"category_label_sm",
	"area_slug_s",
	"area_slug_sm",
	"highlighted_until_d",
	"youtube_id_s",
];

/// The fully resolved engine request. A pure function of the inputs and the
/// field catalog; `to_pairs` renders every parameter in a fixed order so the
/// cache key derived from it is stable.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
	pub q: String,
	pub filter_clauses: Vec<String>,
	pub row_limit: u64,
	pub offset: u64,
	pub sort: String,
	pub selected_fields: String,
	pub stats_fields: Vec<String>,
	pub facet_fields: Vec<String>,
	pub facet_tuning: Vec<(String, String)>,
}

impl QueryParams {
	pub fn to_pairs(&self) -> Vec<(String, String)> {
		let mut pairs: Vec<(String, String)> = vec![("q".to_string(), self.q.clone())];

		for clause in &self.filter_clauses {
			pairs.push(("fq".to_string(), clause.clone()));
		}

		pairs.push(("rows".to_string(), self.row_limit.to_string()));
		pairs.push(("start".to_string(), self.offset.to_string()));

		if !self.sort.is_empty() {
			pairs.push(("sort".to_string(), self.sort.clone()));
		}
		if !self.stats_fields.is_empty() {
			pairs.push(("stats".to_string(), "true".to_string()));
			for field in &self.stats_fields {
				pairs.push(("stats.field".to_string(), field.clone()));
			}
		}
		if !self.facet_fields.is_empty() {
			pairs.push(("fl".to_string(), self.selected_fields.clone()));
			pairs.push(("facet".to_string(), "true".to_string()));
			pairs.push(("facet.mincount".to_string(), "1".to_string()));
			pairs.push(("facet.method".to_string(), "fc".to_string()));
			for field in &self.facet_fields {
				pairs.push(("facet.field".to_string(), field.clone()));
			}
			for (key, value) in &self.facet_tuning {
				pairs.push((key.clone(), value.clone()));
			}
		}

		pairs
	}
}

/// A single search, from raw marketplace parameters to a shaped result page.
///
/// Construction resolves everything deterministic up front; only
/// [`SearchQuery::response`] touches the engine (and the cache, when
/// enabled).
pub struct SearchQuery {
	cfg: plaza_config::Config,
	engine: Arc<dyn EngineClient>,
	cache: Arc<dyn ResponseCache>,
	search_conditions: Vec<String>,
	params: ParamBag,
	selected_fields: String,
	scoped_fields: Vec<FacetableField>,
	cache_ttl: Duration,
}

pub(crate) struct SearchQueryArgs {
	pub(crate) cfg: plaza_config::Config,
	pub(crate) engine: Arc<dyn EngineClient>,
	pub(crate) cache: Arc<dyn ResponseCache>,
	pub(crate) search_conditions: Vec<String>,
	pub(crate) params: ParamBag,
	pub(crate) scoped_fields: Vec<FacetableField>,
}

impl SearchQuery {
	pub(crate) fn new(args: SearchQueryArgs) -> Self {
		let SearchQueryArgs { cfg, engine, cache, search_conditions, mut params, scoped_fields } =
			args;
		let mut selected: Vec<String> = match params.remove("fields") {
			Some(Value::Array(fields)) =>
				fields.iter().filter_map(|f| f.as_str().map(str::to_string)).collect(),
			Some(Value::String(field)) => vec![field],
			_ => DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
		};

		match params.remove("extra_fields") {
			Some(Value::Array(extra)) =>
				selected.extend(extra.iter().filter_map(|f| f.as_str().map(str::to_string))),
			Some(Value::String(field)) => selected.push(field),
			_ => {},
		}

		let cache_ttl = Duration::from_secs(cfg.cache.default_ttl_secs);

		Self {
			cfg,
			engine,
			cache,
			search_conditions,
			params,
			selected_fields: selected.join(","),
			scoped_fields,
			cache_ttl,
		}
	}

	pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
		self.cache_ttl = ttl;
		self
	}

	pub fn selected_fields(&self) -> &str {
		&self.selected_fields
	}

	pub(crate) fn params(&self) -> &ParamBag {
		&self.params
	}

	pub(crate) fn media(&self) -> &plaza_config::Media {
		&self.cfg.media
	}

	pub(crate) fn category_slugs(&self) -> Vec<String> {
		self.params.get_str_list("category")
	}

	pub(crate) fn area_slugs(&self) -> Vec<String> {
		self.params.get_str_list("area")
	}

	fn highlighted_only(&self) -> bool {
		self.params.get_bool("highlighted").unwrap_or(false)
	}

	pub fn row_limit(&self) -> u64 {
		self.params.get_i64("limit").map(|n| n.max(0) as u64).unwrap_or(DEFAULT_ROW_LIMIT)
	}

	pub fn offset(&self) -> u64 {
		self.params.get_i64("offset").map(|n| n.max(0) as u64).unwrap_or(0)
	}

	fn sort(&self) -> String {
		self.params.get_str("sort").unwrap_or_default().to_string()
	}

	pub fn filter_clauses(&self) -> Vec<FilterClause> {
		let scoped: Vec<&FacetableField> = self.scoped_fields.iter().collect();

		resolve_filter_clauses(&scoped, &self.params)
	}

	pub fn query_params(&self) -> QueryParams {
		let mut filter_clauses = vec![active_listings_filter(OffsetDateTime::now_utc())];

		filter_clauses.extend(self.search_conditions.iter().cloned());

		if self.highlighted_only() {
			filter_clauses.push(HIGHLIGHTED_FILTER.to_string());
		}

		filter_clauses.extend(self.filter_clauses().into_iter().map(|clause| clause.clause));

		QueryParams {
			q: DEFAULT_Q_PARAM.to_string(),
			filter_clauses,
			row_limit: self.row_limit(),
			offset: self.offset(),
			sort: self.sort(),
			selected_fields: self.selected_fields.clone(),
			stats_fields: self.stats_fields(),
			facet_fields: self.facet_fields(),
			facet_tuning: self.facet_tuning(),
		}
	}

	fn facet_fields(&self) -> Vec<String> {
		let mut fields: Vec<String> = DEFAULT_FACETS.iter().map(|f| f.to_string()).collect();

		for field in &self.scoped_fields {
			if !field.value_type.is_listable() && !field.is_facetable {
				continue;
			}

			let id = &field.field_id;
			let spec = match field.value_type {
				FieldValueType::Option => format!("{{!ex={id} key={id}}}{id}_json_s"),
				FieldValueType::OptionList => format!("{{!ex={id} key={id}}}{id}_json_sm"),
				_ => format!("{{!ex={id} key={id}}}{}", field.indexed_name()),
			};

			fields.push(spec);
		}

		fields
	}

	fn facet_tuning(&self) -> Vec<(String, String)> {
		let mut tuning = Vec::new();

		// Taxonomy facets: every bucket, lexically ordered, no missing bucket.
		for taxonomy_field in [CATEGORY_FACET_FIELD, AREA_FACET_FIELD] {
			tuning.push((format!("f.{taxonomy_field}.facet.limit"), "-1".to_string()));
			tuning.push((format!("f.{taxonomy_field}.facet.mincount"), "1".to_string()));
			tuning.push((format!("f.{taxonomy_field}.facet.sort"), "lex".to_string()));
			tuning.push((format!("f.{taxonomy_field}.facet.missing"), "off".to_string()));
		}
		tuning.push((format!("f.{AREA_FACET_FIELD}.facet.offset"), "0".to_string()));

		for field in &self.scoped_fields {
			if !matches!(field.value_type, FieldValueType::Integer | FieldValueType::Range) {
				continue;
			}

			let indexed = field.indexed_name();

			tuning.push((format!("f.{indexed}.facet.limit"), "-1".to_string()));
			tuning.push((format!("f.{indexed}.facet.mincount"), "1".to_string()));
			tuning.push((format!("f.{indexed}.facet.offset"), "0".to_string()));
			tuning.push((format!("f.{indexed}.facet.sort"), "count".to_string()));
			tuning.push((format!("f.{indexed}.facet.missing"), "off".to_string()));
		}

		tuning
	}

	fn stats_fields(&self) -> Vec<String> {
		let mut fields: Vec<String> = self
			.scoped_fields
			.iter()
			.filter(|field| field.value_type.is_numeric())
			.map(FacetableField::indexed_name)
			.collect();

		fields.extend(DEFAULT_STATS_FIELDS.iter().map(|f| f.to_string()));

		fields
	}

	pub fn total_pages(&self, total: u64) -> u64 {
		let limit = self.row_limit();

		if limit == 0 {
			return 0;
		}

		total.div_ceil(limit)
	}

	pub fn current_page(&self) -> u64 {
		let limit = self.row_limit();

		if limit == 0 {
			return 1;
		}

		(self.offset().div_ceil(limit) + 1).max(1)
	}

	/// Stable hash of a fixed namespace, the builder identity, and the full
	/// rendered parameter set.
	pub fn cache_key(&self) -> Result<String> {
		hash_cache_key(&serde_json::json!({
			"namespace": CACHE_NAMESPACE,
			"builder": BUILDER_IDENTITY,
			"params": self.query_params().to_pairs(),
		}))
	}

	/// Executes the query (through the read-through cache when caching is
	/// enabled) and shapes the raw reply into a result page.
	pub async fn response(&self) -> Result<SearchResultPage> {
		let pairs = self.query_params().to_pairs();
		let raw = if self.cfg.cache.enabled {
			let key = self.cache_key()?;

			debug!(key = %key, "fetching search results through cache");

			let engine = self.engine.clone();
			let compute_pairs = pairs.clone();

			self.cache
				.fetch(
					&key,
					self.cache_ttl,
					Box::new(move || {
						Box::pin(async move { engine.select(&compute_pairs).await })
					}),
				)
				.await?
		} else {
			self.engine.select(&pairs).await?
		};

		SearchResultPage::build(&raw, self)
	}
}

/// Only items whose expiry is at-or-after "now" are searchable. The bound is
/// the current date, not the current instant: all requests issued the same
/// day share one filter string, which keeps the cache key stable across the
/// day.
fn active_listings_filter(now: OffsetDateTime) -> String {
	let format = format_description!("[year]-[month]-[day]T00:00:00Z");
	let today = now.date().format(&format).unwrap_or_else(|_| now.date().to_string());

	format!("{{!tag=active}}( ( expires_on_d: {{ {today} TO * }} ) )")
}

pub(crate) fn hash_cache_key(payload: &Value) -> Result<String> {
	let raw = serde_json::to_vec(payload).map_err(|err| crate::Error::Cache {
		message: format!("Failed to encode cache key payload: {err}"),
	})?;

	Ok(blake3::hash(&raw).to_hex().to_string())
}
