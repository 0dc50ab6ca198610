//! Reshapes the engine's raw reply into a paginated result page with
//! per-field "available vs. selected" option sets and rooted taxonomy trees.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use tracing::warn;

use plaza_domain::{slug, tree};

use crate::{
	error::{Error, Result},
	listing::ListingRecord,
	query::SearchQuery,
};

const CATEGORY_KEY: &str = "category";
const AREA_KEY: &str = "area";

/// Option sets for one filterable field: everything the engine counted, and
/// the subset the caller currently has selected.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct FilterOptions {
	pub available: Vec<Value>,
	pub selected: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct SearchResultPage {
	pub total: u64,
	pub items: Vec<ListingRecord>,
	pub filters: BTreeMap<String, FilterOptions>,
	pub stats: BTreeMap<String, Value>,
	pub total_pages: u64,
	pub current_page: u64,
}

impl SearchResultPage {
	pub(crate) fn build(raw: &Value, query: &SearchQuery) -> Result<Self> {
		let response = raw.get("response").ok_or_else(|| Error::InvalidResponse {
			message: "Reply is missing the response block.".to_string(),
		})?;
		let total =
			response.get("numFound").and_then(Value::as_u64).ok_or_else(|| {
				Error::InvalidResponse { message: "Reply is missing numFound.".to_string() }
			})?;
		let docs = response.get("docs").and_then(Value::as_array).cloned().unwrap_or_default();
		let items = docs
			.iter()
			.map(|doc| ListingRecord::from_document(doc, query.media(), &[]))
			.collect();
		let filters = build_filters(raw, query)?;
		let stats = build_stats(raw);

		Ok(Self {
			total,
			items,
			filters,
			stats,
			total_pages: query.total_pages(total),
			current_page: query.current_page(),
		})
	}

	pub fn to_value(&self) -> Value {
		serde_json::json!({
			"total": self.total,
			"items": self.items.iter().map(ListingRecord::to_value).collect::<Vec<_>>(),
			"filters": self.filters,
			"stats": self.stats,
			"total_pages": self.total_pages,
			"current_page": self.current_page,
		})
	}
}

fn build_filters(raw: &Value, query: &SearchQuery) -> Result<BTreeMap<String, FilterOptions>> {
	let mut filters = BTreeMap::new();
	let Some(facet_fields) =
		raw.pointer("/facet_counts/facet_fields").and_then(Value::as_object)
	else {
		return Ok(filters);
	};

	for (key, buckets) in facet_fields {
		let buckets = decode_buckets(buckets);
		let options = match key.as_str() {
			CATEGORY_KEY => taxonomy_options(&buckets, &query.category_slugs())?,
			AREA_KEY => taxonomy_options(&buckets, &query.area_slugs())?,
			field_id => option_list(&buckets, &query.params().get_str_list(field_id)),
		};

		filters.insert(key.clone(), options);
	}

	Ok(filters)
}

fn build_stats(raw: &Value) -> BTreeMap<String, Value> {
	raw.pointer("/stats/stats_fields")
		.and_then(Value::as_object)
		.map(|fields| fields.iter().map(|(key, value)| (key.clone(), value.clone())).collect())
		.unwrap_or_default()
}

/// Facet buckets arrive as a flat alternating `[value, count, value, count]`
/// array.
fn decode_buckets(raw: &Value) -> Vec<(String, i64)> {
	let Some(entries) = raw.as_array() else {
		return Vec::new();
	};

	entries
		.chunks_exact(2)
		.filter_map(|pair| {
			let value = pair[0].as_str()?.to_string();
			let count = pair[1].as_i64()?;

			Some((value, count))
		})
		.collect()
}

/// Taxonomy buckets are JSON-encoded records; duplicates across sibling
/// queries merge in the tree builder. `available` is the rooted forest,
/// `selected` the merged records whose slug the caller picked.
fn taxonomy_options(buckets: &[(String, i64)], selected_slugs: &[String]) -> Result<FilterOptions> {
	let mut records = Vec::with_capacity(buckets.len());

	for (encoded, count) in buckets {
		match serde_json::from_str::<tree::TaxonomyRecord>(encoded) {
			Ok(mut record) => {
				record.count = *count;
				records.push(record);
			},
			Err(err) => warn!(%err, "skipping unreadable taxonomy bucket"),
		}
	}

	let selected_set: BTreeSet<String> = selected_slugs.iter().cloned().collect();
	let forest = tree::build_tree(records, &selected_set)?;
	let selected = forest
		.records
		.iter()
		.filter(|record| selected_set.contains(&record.slug))
		.map(|record| serde_json::to_value(record).unwrap_or(Value::Null))
		.collect();
	let available = forest
		.roots
		.iter()
		.map(|record| serde_json::to_value(record).unwrap_or(Value::Null))
		.collect();

	Ok(FilterOptions { available, selected })
}

/// Plain option buckets: JSON-object buckets are decoded, scalar buckets are
/// wrapped with a derived slug and label.
fn option_list(buckets: &[(String, i64)], selected_values: &[String]) -> FilterOptions {
	let mut available = Vec::with_capacity(buckets.len());

	for (encoded, count) in buckets {
		let option = match serde_json::from_str::<Value>(encoded) {
			Ok(Value::Object(mut decoded)) => {
				decoded.insert("count".to_string(), Value::from(*count));
				Value::Object(decoded)
			},
			_ => scalar_option(encoded, *count),
		};

		available.push(option);
	}

	let selected = available
		.iter()
		.filter(|option| selected_values.iter().any(|value| option_matches(option, value)))
		.cloned()
		.collect();

	FilterOptions { available, selected }
}

fn scalar_option(value: &str, count: i64) -> Value {
	let mut option = Map::new();

	option.insert("value".to_string(), Value::String(value.to_string()));
	option.insert("label".to_string(), Value::String(value.to_string()));
	option.insert("slug".to_string(), Value::String(slug::parameterize(value)));
	option.insert("count".to_string(), Value::from(count));

	Value::Object(option)
}

fn option_matches(option: &Value, value: &str) -> bool {
	["slug", "value", "id"].iter().any(|key| {
		option.get(key).is_some_and(|candidate| match candidate {
			Value::String(raw) => raw == value,
			Value::Number(number) => number.to_string() == value,
			_ => false,
		})
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn decodes_alternating_bucket_arrays() {
		let buckets =
			decode_buckets(&serde_json::json!(["sale", 3, "rent", 1]));

		assert_eq!(buckets, vec![("sale".to_string(), 3), ("rent".to_string(), 1)]);
	}

	#[test]
	fn scalar_options_get_derived_slugs() {
		let options = option_list(&[("For Sale".to_string(), 2)], &["for-sale".to_string()]);

		assert_eq!(options.available.len(), 1);
		assert_eq!(options.available[0]["slug"], Value::String("for-sale".to_string()));
		assert_eq!(options.selected.len(), 1);
	}

	#[test]
	fn object_options_match_on_slug() {
		let encoded = serde_json::json!({ "id": 4, "slug": "nissan", "label": "Nissan" });
		let options =
			option_list(&[(encoded.to_string(), 5)], &["nissan".to_string()]);

		assert_eq!(options.available[0]["count"], Value::from(5));
		assert_eq!(options.selected.len(), 1);
	}

	#[test]
	fn unselected_options_stay_available_only() {
		let options = option_list(&[("sale".to_string(), 2)], &[]);

		assert_eq!(options.available.len(), 1);
		assert!(options.selected.is_empty());
	}

	#[test]
	fn taxonomy_buckets_merge_and_select() {
		let node = |id: i64, s: &str, parent: Option<i64>, level: i64| {
			serde_json::json!({ "id": id, "slug": s, "parent_id": parent, "level": level })
				.to_string()
		};
		let buckets = vec![
			(node(1, "vehicles", None, 1), 3),
			(node(1, "vehicles", None, 1), 4),
			(node(2, "sedan", Some(1), 2), 2),
		];
		let options =
			taxonomy_options(&buckets, &["sedan".to_string()]).expect("tree build failed");

		assert_eq!(options.available.len(), 1);
		assert_eq!(options.available[0]["count"], Value::from(7));
		assert_eq!(options.selected.len(), 1);
		assert_eq!(options.selected[0]["slug"], Value::String("sedan".to_string()));
	}
}
