//! Reconciles a listing's dynamically-typed custom attributes against
//! per-category metadata definitions.
//!
//! Incoming data has lived through several storage shapes: refs may be bare
//! ids or partially-populated descriptors, and the ref list itself may sit
//! on the attribute bag, on an associated raw record, or inside a raw batch
//! keyed by listing id. Every shape must remain readable, so the ref list is
//! located through a prioritized list of named sources and the first
//! non-empty result wins.

use serde_json::Value;
use tracing::warn;

use plaza_domain::{naming, slug};

use crate::params::ParamBag;

/// Substituted whenever no source yields a displayable value.
pub const PLACEHOLDER_VALUE: &str = "not available";

const EXTRA_FIELDS_KEY: &str = "extra_fields";
const METADATA_KEY: &str = "extra_fields_metadata";

/// A resolved, displayable custom attribute. `value` is always present and
/// non-empty; missing data is the placeholder constant.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExtraField {
	pub id: String,
	pub label: String,
	#[serde(rename = "type")]
	pub value_type: String,
	pub primary: bool,
	pub value: Value,
	pub slug: String,
}

/// Per-category metadata definition; arrives JSON-string-encoded on the
/// document and is decoded before use.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ExtraFieldDefinition {
	#[serde(default)]
	pub id: String,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default, rename = "type")]
	pub value_type: Option<String>,
	#[serde(default)]
	pub value: Option<Value>,
}

/// One place the raw ref list may live. Sources are tried in declared order;
/// the first non-empty result wins.
pub trait ExtraFieldSource {
	fn name(&self) -> &'static str;
	fn lookup(&self, listing_id: Option<i64>) -> Option<Vec<Value>>;
}

/// The `extra_fields` key directly on the listing's attribute bag.
pub struct DirectKeySource<'a> {
	pub bag: &'a ParamBag,
}

impl ExtraFieldSource for DirectKeySource<'_> {
	fn name(&self) -> &'static str {
		"direct_key"
	}

	fn lookup(&self, _listing_id: Option<i64>) -> Option<Vec<Value>> {
		non_empty_refs(self.bag.get(EXTRA_FIELDS_KEY))
	}
}

/// An associated raw source record carrying its own `extra_fields`.
pub struct RawRecordSource<'a> {
	pub record: &'a Value,
}

impl ExtraFieldSource for RawRecordSource<'_> {
	fn name(&self) -> &'static str {
		"raw_record"
	}

	fn lookup(&self, _listing_id: Option<i64>) -> Option<Vec<Value>> {
		non_empty_refs(self.record.get(EXTRA_FIELDS_KEY))
	}
}

/// A batch of raw source records, matched by `listing_id`.
pub struct RawBatchSource<'a> {
	pub records: &'a [Value],
}

impl ExtraFieldSource for RawBatchSource<'_> {
	fn name(&self) -> &'static str {
		"raw_batch"
	}

	fn lookup(&self, listing_id: Option<i64>) -> Option<Vec<Value>> {
		let listing_id = listing_id?;
		let record = self
			.records
			.iter()
			.find(|record| record.get("listing_id").and_then(Value::as_i64) == Some(listing_id))?;

		non_empty_refs(record.get(EXTRA_FIELDS_KEY))
	}
}

fn non_empty_refs(value: Option<&Value>) -> Option<Vec<Value>> {
	let refs = value?.as_array()?;

	if refs.is_empty() { None } else { Some(refs.clone()) }
}

/// Decodes the document's metadata records, skipping any that fail to parse.
pub fn decode_metadata(bag: &ParamBag) -> Vec<ExtraFieldDefinition> {
	let Some(Value::Array(raw)) = bag.get(METADATA_KEY) else {
		return Vec::new();
	};

	raw.iter()
		.filter_map(|record| {
			let decoded = match record {
				Value::String(encoded) => serde_json::from_str(encoded),
				other => serde_json::from_value(other.clone()),
			};

			match decoded {
				Ok(definition) => Some(definition),
				Err(err) => {
					warn!(%err, "skipping unreadable extra-field metadata record");
					None
				},
			}
		})
		.collect()
}

/// Resolves the listing's extra fields, preserving ref order.
pub fn resolve_extra_fields(
	sources: &[&dyn ExtraFieldSource],
	metadata: &[ExtraFieldDefinition],
	bag: &ParamBag,
) -> Vec<ExtraField> {
	let listing_id = listing_id_of(bag);
	let refs = sources.iter().find_map(|source| source.lookup(listing_id));
	let refs = match refs {
		Some(refs) => refs,
		// No legacy shape carries data for this listing: build the list from
		// the metadata definitions alone.
		None => metadata.iter().map(|definition| Value::String(definition.id.clone())).collect(),
	};

	refs.iter().map(|reference| resolve_one(reference, metadata, bag)).collect()
}

fn resolve_one(reference: &Value, metadata: &[ExtraFieldDefinition], bag: &ParamBag) -> ExtraField {
	let id = match reference {
		Value::Object(descriptor) => descriptor
			.get("id")
			.map(value_display)
			.unwrap_or_default(),
		other => value_display(other),
	};
	let definition = metadata.iter().find(|definition| definition.id == id);
	let descriptor = reference.as_object();

	let value_type = definition
		.and_then(|definition| definition.value_type.clone())
		.or_else(|| descriptor.and_then(|d| d.get("type")).and_then(Value::as_str).map(String::from))
		.unwrap_or_else(|| "string".to_string());

	let metadata_value = definition.and_then(|definition| definition.value.clone());
	let resolved = if value_type == "optionlist" {
		// The listing-level value wins over the category default when present.
		match bag.get(&id) {
			Some(raw) if !is_empty_value(raw) => Some(raw.clone()),
			_ => metadata_value,
		}
	} else {
		metadata_value
	};
	let value = match resolved {
		Some(value) if !is_empty_value(&value) => value,
		_ => Value::String(PLACEHOLDER_VALUE.to_string()),
	};

	let label = definition
		.and_then(|definition| definition.label.clone())
		.or_else(|| {
			descriptor.and_then(|d| d.get("label")).and_then(Value::as_str).map(String::from)
		})
		.unwrap_or_else(|| naming::humanize(&id));
	let primary = descriptor
		.and_then(|d| d.get("primary"))
		.and_then(Value::as_bool)
		.unwrap_or(false);
	let slug = descriptor
		.and_then(|d| d.get("slug"))
		.and_then(Value::as_str)
		.map(String::from)
		.unwrap_or_else(|| slug::parameterize(&value_display(&value)));

	ExtraField { id, label, value_type, primary, value, slug }
}

/// The numeric part of the listing id; document ids may carry a trailing
/// source marker (`1200601s`).
fn listing_id_of(bag: &ParamBag) -> Option<i64> {
	match bag.get("id")? {
		Value::Number(number) => number.as_i64(),
		Value::String(raw) => {
			let digits: String = raw.chars().take_while(char::is_ascii_digit).collect();

			digits.parse().ok()
		},
		_ => None,
	}
}

fn is_empty_value(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::String(raw) => raw.is_empty(),
		_ => false,
	}
}

fn value_display(value: &Value) -> String {
	match value {
		Value::String(raw) => raw.clone(),
		other => other.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn metadata(records: &[Value]) -> Vec<ExtraFieldDefinition> {
		let encoded: Vec<Value> =
			records.iter().map(|record| Value::String(record.to_string())).collect();
		let bag = ParamBag::from_value(&serde_json::json!({ METADATA_KEY: encoded }));

		decode_metadata(&bag)
	}

	#[test]
	fn metadata_default_wins_without_override() {
		let defs = metadata(&[
			serde_json::json!({ "id": "car_doors", "type": "integer", "value": 4 }),
		]);
		let bag = ParamBag::from_value(&serde_json::json!({ "id": "1200601s" }));
		let fields = resolve_extra_fields(&[], &defs, &bag);

		assert_eq!(fields.len(), 1);
		assert_eq!(fields[0].id, "car_doors");
		assert_eq!(fields[0].value_type, "integer");
		assert_eq!(fields[0].value, serde_json::json!(4));
		assert_eq!(fields[0].label, "Car doors");
		assert_eq!(fields[0].slug, "4");
		assert!(!fields[0].primary);
	}

	#[test]
	fn optionlist_override_wins_over_default() {
		let defs = metadata(&[
			serde_json::json!({ "id": "amenities", "type": "optionlist", "value": "pool" }),
		]);
		let bag = ParamBag::from_value(&serde_json::json!({
			"id": 7,
			"amenities": ["gym", "sauna"],
			EXTRA_FIELDS_KEY: ["amenities"]
		}));
		let source = DirectKeySource { bag: &bag };
		let fields = resolve_extra_fields(&[&source], &defs, &bag);

		assert_eq!(fields[0].value, serde_json::json!(["gym", "sauna"]));
	}

	#[test]
	fn missing_value_becomes_placeholder() {
		let defs = metadata(&[serde_json::json!({ "id": "car_vin", "type": "string" })]);
		let bag = ParamBag::new();
		let fields = resolve_extra_fields(&[], &defs, &bag);

		assert_eq!(fields[0].value, Value::String(PLACEHOLDER_VALUE.to_string()));
		assert!(!fields[0].slug.is_empty());
	}

	#[test]
	fn descriptor_refs_keep_their_own_fields() {
		let defs = metadata(&[serde_json::json!({ "id": "car_make", "value": "Nissan" })]);
		let bag = ParamBag::from_value(&serde_json::json!({
			EXTRA_FIELDS_KEY: [
				{ "id": "car_make", "primary": true, "slug": "make-nissan" }
			]
		}));
		let source = DirectKeySource { bag: &bag };
		let fields = resolve_extra_fields(&[&source], &defs, &bag);

		assert!(fields[0].primary);
		assert_eq!(fields[0].slug, "make-nissan");
		assert_eq!(fields[0].value, Value::String("Nissan".to_string()));
	}

	#[test]
	fn batch_source_matches_by_listing_id() {
		let records = vec![
			serde_json::json!({ "listing_id": 8, "extra_fields": ["other"] }),
			serde_json::json!({ "listing_id": 7, "extra_fields": ["car_year"] }),
		];
		let defs = metadata(&[serde_json::json!({ "id": "car_year", "value": 2015 })]);
		let bag = ParamBag::from_value(&serde_json::json!({ "id": "7s" }));
		let batch = RawBatchSource { records: &records };
		let fields = resolve_extra_fields(&[&batch], &defs, &bag);

		assert_eq!(fields.len(), 1);
		assert_eq!(fields[0].id, "car_year");
		assert_eq!(fields[0].value, serde_json::json!(2015));
	}

	#[test]
	fn source_order_is_respected() {
		let record = serde_json::json!({ "extra_fields": ["from_record"] });
		let bag = ParamBag::from_value(&serde_json::json!({ EXTRA_FIELDS_KEY: ["from_bag"] }));
		let direct = DirectKeySource { bag: &bag };
		let raw = RawRecordSource { record: &record };
		let fields = resolve_extra_fields(&[&direct, &raw], &[], &bag);

		assert_eq!(fields[0].id, "from_bag");
	}
}
