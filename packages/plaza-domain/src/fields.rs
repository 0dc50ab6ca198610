use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Declared type of a marketplace custom attribute, as configured per
/// category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldValueType {
	Option,
	OptionList,
	Boolean,
	Range,
	Integer,
	Float,
	String,
}

impl FieldValueType {
	/// Types whose distinct values are enumerable as filter options.
	pub fn is_listable(self) -> bool {
		matches!(self, Self::Option | Self::OptionList | Self::Boolean | Self::Range)
	}

	pub fn is_numeric(self) -> bool {
		matches!(self, Self::Integer | Self::Float | Self::Range)
	}

	/// Dynamic-field suffix under which the engine indexes values of this
	/// type.
	pub fn engine_suffix(self) -> &'static str {
		match self {
			Self::Integer => "_i",
			Self::Float | Self::Range => "_f",
			Self::Boolean => "_b",
			Self::OptionList => "_sm",
			Self::Option | Self::String => "_s",
		}
	}
}

/// A custom attribute configured as usable in faceted filtering. Loaded from
/// the field-metadata registry; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetableField {
	pub field_id: String,
	pub value_type: FieldValueType,
	pub category_slugs: BTreeSet<String>,
	#[serde(default)]
	pub is_facetable: bool,
}

impl FacetableField {
	pub fn indexed_name(&self) -> String {
		format!("{}{}", self.field_id, self.value_type.engine_suffix())
	}

	pub fn applies_to(&self, categories: &[String]) -> bool {
		categories.iter().any(|slug| self.category_slugs.contains(slug))
	}
}

/// The full catalog of facetable fields for the marketplace. Order is
/// significant: scoped views preserve it so downstream query parameters stay
/// deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldCatalog(Vec<FacetableField>);

impl FieldCatalog {
	pub fn new(fields: Vec<FacetableField>) -> Self {
		Self(fields)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Fields scoped to the given category slugs, in catalog order.
	pub fn scoped(&self, categories: &[String]) -> Vec<&FacetableField> {
		self.0.iter().filter(|field| field.applies_to(categories)).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn field(id: &str, value_type: FieldValueType, slugs: &[&str]) -> FacetableField {
		FacetableField {
			field_id: id.to_string(),
			value_type,
			category_slugs: slugs.iter().map(|s| s.to_string()).collect(),
			is_facetable: false,
		}
	}

	#[test]
	fn indexed_name_uses_type_suffix() {
		assert_eq!(field("car_doors", FieldValueType::Integer, &[]).indexed_name(), "car_doors_i");
		assert_eq!(field("car_make", FieldValueType::Option, &[]).indexed_name(), "car_make_s");
		assert_eq!(
			field("amenities", FieldValueType::OptionList, &[]).indexed_name(),
			"amenities_sm"
		);
	}

	#[test]
	fn scoped_preserves_catalog_order() {
		let catalog = FieldCatalog::new(vec![
			field("car_make", FieldValueType::Option, &["cars"]),
			field("bedrooms", FieldValueType::Integer, &["real-estate"]),
			field("car_year", FieldValueType::Integer, &["cars", "trucks"]),
		]);
		let scoped = catalog.scoped(&["cars".to_string()]);

		assert_eq!(
			scoped.iter().map(|f| f.field_id.as_str()).collect::<Vec<_>>(),
			["car_make", "car_year"]
		);
	}

	#[test]
	fn value_type_predicates() {
		assert!(FieldValueType::Range.is_listable());
		assert!(FieldValueType::Range.is_numeric());
		assert!(!FieldValueType::Integer.is_listable());
		assert!(!FieldValueType::String.is_numeric());
	}
}
