//! Merges flat taxonomy facet buckets into a rooted category/area tree.
//!
//! The engine returns one bucket per sibling query, so the same logical node
//! may arrive several times; duplicates merge by id with counts summed and
//! later fields overlaid on earlier ones. Selecting a slug marks its whole
//! ancestor chain.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A node in the category or area hierarchy. `level` is 1-indexed and comes
/// from the source data; the builder never computes depth itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyRecord {
	pub id: i64,
	pub slug: String,
	#[serde(default)]
	pub label: String,
	#[serde(default)]
	pub parent_id: Option<i64>,
	pub level: i64,
	#[serde(default)]
	pub count: i64,
	#[serde(default)]
	pub selected: bool,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub children: Vec<TaxonomyRecord>,
	/// Source keys this builder does not interpret, carried through.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl TaxonomyRecord {
	fn overlay(&mut self, later: TaxonomyRecord) {
		self.slug = later.slug;
		self.label = later.label;
		self.parent_id = later.parent_id;
		self.level = later.level;
		self.count += later.count;
		self.selected = later.selected;
		self.extra.extend(later.extra);
	}
}

/// Output of [`build_tree`]: the rooted forest plus the merged flat record
/// set (the result page reads its `selected` entries from the flat form).
#[derive(Debug, Clone)]
pub struct TaxonomyForest {
	pub roots: Vec<TaxonomyRecord>,
	pub records: Vec<TaxonomyRecord>,
}

impl TaxonomyForest {
	pub fn selected(&self) -> Vec<&TaxonomyRecord> {
		self.records.iter().filter(|record| record.selected).collect()
	}
}

pub fn build_tree(
	records: Vec<TaxonomyRecord>,
	selected_slugs: &BTreeSet<String>,
) -> Result<TaxonomyForest> {
	let mut sorted = records;

	// Deterministic merge order: later buckets overlay earlier ones.
	sorted.sort_by(|a, b| a.slug.cmp(&b.slug));

	let mut order: Vec<i64> = Vec::with_capacity(sorted.len());
	let mut merged: HashMap<i64, TaxonomyRecord> = HashMap::with_capacity(sorted.len());

	for record in sorted {
		match merged.get_mut(&record.id) {
			Some(existing) => existing.overlay(record),
			None => {
				order.push(record.id);
				merged.insert(record.id, record);
			},
		}
	}

	let mut working: Vec<TaxonomyRecord> = Vec::with_capacity(order.len());

	for id in &order {
		let mut record = merged.remove(id).ok_or_else(|| Error::Internal {
			message: format!("Taxonomy record {id} missing from merge map."),
		})?;

		record.selected = selected_slugs.contains(&record.slug);
		record.children.clear();
		working.push(record);
	}

	mark_selected_parents(&mut working);

	let roots = organize_tree(&working);

	Ok(TaxonomyForest { roots, records: working })
}

/// Walks `parent_id` links upward from every selected record, marking each
/// ancestor. Iterative with a visited set: the taxonomy is assumed to be a
/// forest, but a cyclic input must still terminate.
fn mark_selected_parents(records: &mut [TaxonomyRecord]) {
	let index_by_id: HashMap<i64, usize> =
		records.iter().enumerate().map(|(idx, record)| (record.id, idx)).collect();
	let selected_ids: Vec<i64> =
		records.iter().filter(|record| record.selected).map(|record| record.id).collect();

	for start in selected_ids {
		let mut visited: HashSet<i64> = HashSet::new();
		let mut current = start;

		while visited.insert(current) {
			let Some(parent_id) =
				index_by_id.get(&current).and_then(|idx| records[*idx].parent_id)
			else {
				break;
			};
			let Some(parent_idx) = index_by_id.get(&parent_id) else {
				break;
			};

			records[*parent_idx].selected = true;
			current = parent_id;
		}
	}
}

fn organize_tree(records: &[TaxonomyRecord]) -> Vec<TaxonomyRecord> {
	records
		.iter()
		.filter(|record| record.level == 1)
		.map(|root| attach_children(root, records, &mut HashSet::new()))
		.collect()
}

fn attach_children(
	node: &TaxonomyRecord,
	records: &[TaxonomyRecord],
	visited: &mut HashSet<i64>,
) -> TaxonomyRecord {
	let mut out = node.clone();

	if !visited.insert(node.id) {
		return out;
	}

	out.children = records
		.iter()
		.filter(|candidate| candidate.parent_id == Some(node.id))
		.map(|child| attach_children(child, records, visited))
		.collect();

	out
}
