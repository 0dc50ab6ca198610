//! Canonical attribute names inferred from engine-indexed field names.
//!
//! The engine stores marketplace attributes under dynamic fields whose final
//! `_`-separated token encodes the value type (`title_s`, `car_doors_i`,
//! `photos_url_sm`). Normalization strips that token. Numeric-index markers
//! additionally recover relation names: an `_i` field whose base also exists
//! as a sibling `_s` field is an identifier (`lister_id`), and `_im` fields
//! are multi-valued identifier lists. Client code depends on the derived
//! names, so the heuristic is contract, not convenience.

use std::collections::BTreeSet;

const SINGLE_ID_MARKER: &str = "i";
const MULTI_ID_MARKER: &str = "im";

/// Normalizes one indexed field name against the set of raw field names
/// present on the same document.
///
/// Returns an empty string for names without an `_` separator; callers drop
/// those keys (the document `id` is restored separately).
pub fn normalize_field_name(raw: &str, known: &BTreeSet<String>) -> String {
	let parts: Vec<&str> = raw.split('_').collect();
	let base = parts[..parts.len() - 1].join("_");
	let suffix = infer_suffix(&parts, &base, known);

	format!("{base}{suffix}")
}

fn infer_suffix(parts: &[&str], base: &str, known: &BTreeSet<String>) -> &'static str {
	let Some(last) = parts.last() else {
		return "";
	};

	if *last == SINGLE_ID_MARKER
		&& parts.len() >= 2
		&& parts[parts.len() - 2] != "id"
		&& known.contains(&format!("{base}_s"))
	{
		"_id"
	} else if *last == MULTI_ID_MARKER {
		"_ids"
	} else {
		""
	}
}

/// `car_doors` -> `Car doors`.
pub fn humanize(id: &str) -> String {
	let spaced = id.replace(['_', '-'], " ");
	let mut chars = spaced.chars();

	match chars.next() {
		Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
		None => String::new(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn known(names: &[&str]) -> BTreeSet<String> {
		names.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn strips_type_suffix() {
		assert_eq!(normalize_field_name("title_s", &known(&["title_s"])), "title");
		assert_eq!(normalize_field_name("expires_on_d", &known(&["expires_on_d"])), "expires_on");
	}

	#[test]
	fn numeric_field_with_string_sibling_becomes_id() {
		let names = known(&["brand_i", "brand_s"]);

		assert_eq!(normalize_field_name("brand_i", &names), "brand_id");
	}

	#[test]
	fn numeric_field_without_sibling_is_unsuffixed() {
		let names = known(&["brand_i"]);

		assert_eq!(normalize_field_name("brand_i", &names), "brand");
	}

	#[test]
	fn id_base_is_not_doubled() {
		// `lister_id_i` already ends in the relation name.
		let names = known(&["lister_id_i", "lister_id_s"]);

		assert_eq!(normalize_field_name("lister_id_i", &names), "lister_id");
	}

	#[test]
	fn multi_valued_marker_becomes_ids() {
		assert_eq!(normalize_field_name("photo_id_im", &known(&["photo_id_im"])), "photo_id_ids");
		assert_eq!(normalize_field_name("category_im", &known(&["category_im"])), "category_ids");
	}

	#[test]
	fn bare_name_collapses_to_empty() {
		assert_eq!(normalize_field_name("score", &known(&["score"])), "");
	}

	#[test]
	fn humanizes_identifiers() {
		assert_eq!(humanize("car_doors"), "Car doors");
		assert_eq!(humanize("new-or-used"), "New or used");
		assert_eq!(humanize(""), "");
	}
}
