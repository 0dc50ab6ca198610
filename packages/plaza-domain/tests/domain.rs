use std::collections::BTreeSet;

use plaza_domain::{naming, slug, tree};

fn known(names: &[&str]) -> BTreeSet<String> {
	names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn identifier_fields_keep_their_relation_names() {
	let names = known(&["lister_id_i", "lister_id_s", "photo_id_im"]);

	assert!(naming::normalize_field_name("lister_id_i", &names).ends_with("_id"));
	assert!(naming::normalize_field_name("photo_id_im", &names).ends_with("_ids"));
}

#[test]
fn plain_numeric_fields_stay_plain() {
	let names = known(&["car_doors_i"]);

	assert_eq!(naming::normalize_field_name("car_doors_i", &names), "car_doors");
}

#[test]
fn resolved_values_slug_cleanly() {
	assert_eq!(slug::parameterize("Nuevo"), "nuevo");
	assert_eq!(naming::humanize("car_doors"), "Car doors");
}

#[test]
fn duplicate_taxonomy_buckets_merge_once() {
	let raw: Vec<tree::TaxonomyRecord> = serde_json::from_value(serde_json::json!([
		{ "id": 9, "slug": "sedan", "parent_id": 2, "level": 3, "count": 3 },
		{ "id": 9, "slug": "sedan", "parent_id": 2, "level": 3, "count": 4 },
		{ "id": 2, "slug": "cars", "parent_id": 1, "level": 2, "count": 7 },
		{ "id": 1, "slug": "vehicles", "level": 1, "count": 7 }
	]))
	.expect("decode failed");
	let forest =
		tree::build_tree(raw, &known(&["sedan"])).expect("build failed");

	let sedan = forest.records.iter().find(|record| record.slug == "sedan").expect("sedan missing");

	assert_eq!(sedan.count, 7);
	assert_eq!(forest.selected().len(), 3);
	assert_eq!(forest.roots.len(), 1);
}
