//! Turns raw request filter values into engine filter clauses.
//!
//! Only fields scoped to the active categories are considered; a value that
//! does not validate against its field's declared type is skipped, never an
//! error. Each clause is tagged with its field id so the facet for that same
//! field can exclude it (multi-select faceting).

use plaza_domain::{FacetableField, FieldValueType};

use crate::params::ParamBag;

/// An engine-syntax filter fragment plus the field it came from. Downstream
/// code treats `clause` as opaque.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
	pub field_id: String,
	pub clause: String,
}

pub fn resolve_filter_clauses(
	fields: &[&FacetableField],
	params: &ParamBag,
) -> Vec<FilterClause> {
	fields
		.iter()
		.filter_map(|field| {
			let values = params.get_str_list(&field.field_id);

			if values.is_empty() {
				return None;
			}

			clause_for(field, &values).map(|clause| FilterClause {
				field_id: field.field_id.clone(),
				clause,
			})
		})
		.collect()
}

fn clause_for(field: &FacetableField, values: &[String]) -> Option<String> {
	let indexed = field.indexed_name();
	let body = match field.value_type {
		FieldValueType::Option | FieldValueType::OptionList | FieldValueType::String =>
			Some(term_body(values)),
		FieldValueType::Boolean => parse_all(values, parse_bool).map(or_join),
		FieldValueType::Integer =>
			parse_all(values, |raw| raw.parse::<i64>().ok().map(|n| n.to_string())).map(or_join),
		FieldValueType::Float =>
			parse_all(values, |raw| raw.parse::<f64>().ok().map(|n| n.to_string())).map(or_join),
		FieldValueType::Range => parse_all(values, range_body).map(or_join),
	}?;

	Some(format!("{{!tag={}}}{indexed}:{body}", field.field_id))
}

fn term_body(values: &[String]) -> String {
	let quoted: Vec<String> = values.iter().map(|value| format!("\"{}\"", escape(value))).collect();

	match quoted.as_slice() {
		[single] => single.clone(),
		many => format!("({})", many.join(" OR ")),
	}
}

fn or_join(values: Vec<String>) -> String {
	match values.as_slice() {
		[single] => single.clone(),
		many => format!("({})", many.join(" OR ")),
	}
}

fn parse_all(values: &[String], parse: impl Fn(&str) -> Option<String>) -> Option<Vec<String>> {
	values.iter().map(|raw| parse(raw.trim())).collect()
}

fn parse_bool(raw: &str) -> Option<String> {
	match raw {
		"true" | "1" => Some("true".to_string()),
		"false" | "0" => Some("false".to_string()),
		_ => None,
	}
}

/// `min-max` with either bound optional; open ends become `*`.
fn range_body(raw: &str) -> Option<String> {
	let (min, max) = raw.trim().split_once('-')?;
	let min = range_bound(min)?;
	let max = range_bound(max)?;

	if min == "*" && max == "*" {
		return None;
	}

	Some(format!("[{min} TO {max}]"))
}

fn range_bound(raw: &str) -> Option<String> {
	let trimmed = raw.trim();

	if trimmed.is_empty() {
		return Some("*".to_string());
	}

	trimmed.parse::<f64>().ok().map(|n| n.to_string())
}

fn escape(value: &str) -> String {
	value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeSet;

	use super::*;

	fn field(id: &str, value_type: FieldValueType) -> FacetableField {
		FacetableField {
			field_id: id.to_string(),
			value_type,
			category_slugs: BTreeSet::new(),
			is_facetable: false,
		}
	}

	fn resolve(field: &FacetableField, params: serde_json::Value) -> Vec<FilterClause> {
		resolve_filter_clauses(&[field], &ParamBag::from_value(&params))
	}

	#[test]
	fn option_values_are_tagged_and_quoted() {
		let make = field("car_make", FieldValueType::Option);
		let clauses = resolve(&make, serde_json::json!({ "car_make": "nissan" }));

		assert_eq!(clauses.len(), 1);
		assert_eq!(clauses[0].clause, "{!tag=car_make}car_make_s:\"nissan\"");
	}

	#[test]
	fn multiple_values_are_or_joined() {
		let make = field("car_make", FieldValueType::Option);
		let clauses = resolve(&make, serde_json::json!({ "car_make": ["nissan", "toyota"] }));

		assert_eq!(clauses[0].clause, "{!tag=car_make}car_make_s:(\"nissan\" OR \"toyota\")");
	}

	#[test]
	fn range_values_become_bounded_intervals() {
		let price = field("price", FieldValueType::Range);

		assert_eq!(
			resolve(&price, serde_json::json!({ "price": "100-500" }))[0].clause,
			"{!tag=price}price_f:[100 TO 500]"
		);
		assert_eq!(
			resolve(&price, serde_json::json!({ "price": "100-" }))[0].clause,
			"{!tag=price}price_f:[100 TO *]"
		);
	}

	#[test]
	fn multiple_ranges_are_or_joined() {
		let price = field("price", FieldValueType::Range);
		let clauses = resolve(&price, serde_json::json!({ "price": ["100-200", "300-"] }));

		assert_eq!(
			clauses[0].clause,
			"{!tag=price}price_f:([100 TO 200] OR [300 TO *])"
		);
	}

	#[test]
	fn invalid_typed_values_are_skipped() {
		let doors = field("car_doors", FieldValueType::Integer);
		let pool = field("has_pool", FieldValueType::Boolean);

		assert!(resolve(&doors, serde_json::json!({ "car_doors": "lots" })).is_empty());
		assert!(resolve(&pool, serde_json::json!({ "has_pool": "maybe" })).is_empty());
		assert_eq!(
			resolve(&doors, serde_json::json!({ "car_doors": 4 }))[0].clause,
			"{!tag=car_doors}car_doors_i:4"
		);
	}

	#[test]
	fn unknown_keys_are_ignored() {
		let make = field("car_make", FieldValueType::Option);
		let clauses = resolve(&make, serde_json::json!({ "unknown": "x" }));

		assert!(clauses.is_empty());
	}

	#[test]
	fn quotes_are_escaped() {
		let make = field("car_make", FieldValueType::Option);
		let clauses = resolve(&make, serde_json::json!({ "car_make": "12\" rims" }));

		assert_eq!(clauses[0].clause, "{!tag=car_make}car_make_s:\"12\\\" rims\"");
	}
}
