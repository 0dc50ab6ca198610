//! Request parameters and listing attributes arrive as loosely-shaped JSON
//! maps. `ParamBag` gives them one canonical key form so every lookup,
//! regardless of origin, reads and writes the same entry.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

const FILTERS_KEY: &str = "filters";

#[derive(Debug, Clone, Default)]
pub struct ParamBag(BTreeMap<String, Value>);

impl ParamBag {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_value(value: &Value) -> Self {
		match value.as_object() {
			Some(map) => Self::from_map(map),
			None => Self::default(),
		}
	}

	pub fn from_map(map: &Map<String, Value>) -> Self {
		let mut bag = Self::default();

		for (key, value) in map {
			bag.insert(key, value.clone());
		}

		bag
	}

	fn canonical(key: &str) -> String {
		key.trim().to_string()
	}

	pub fn insert(&mut self, key: &str, value: Value) {
		self.0.insert(Self::canonical(key), value);
	}

	pub fn remove(&mut self, key: &str) -> Option<Value> {
		self.0.remove(&Self::canonical(key))
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(&Self::canonical(key))
	}

	pub fn contains(&self, key: &str) -> bool {
		self.get(key).is_some()
	}

	pub fn get_str(&self, key: &str) -> Option<&str> {
		self.get(key).and_then(Value::as_str)
	}

	pub fn get_i64(&self, key: &str) -> Option<i64> {
		match self.get(key)? {
			Value::Number(number) => number.as_i64(),
			Value::String(raw) => raw.trim().parse().ok(),
			_ => None,
		}
	}

	pub fn get_bool(&self, key: &str) -> Option<bool> {
		match self.get(key)? {
			Value::Bool(flag) => Some(*flag),
			Value::String(raw) => match raw.trim() {
				"true" | "1" => Some(true),
				"false" | "0" => Some(false),
				_ => None,
			},
			Value::Number(number) => number.as_i64().map(|n| n != 0),
			_ => None,
		}
	}

	/// The value under `key` as a list of display strings: a scalar becomes a
	/// one-element list, an array keeps its element order. Null and empty
	/// strings yield an empty list.
	pub fn get_str_list(&self, key: &str) -> Vec<String> {
		match self.get(key) {
			Some(Value::Array(values)) => values.iter().filter_map(scalar_string).collect(),
			Some(value) => scalar_string(value).into_iter().collect(),
			None => Vec::new(),
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
		self.0.iter()
	}

	/// Merges a nested `filters` map into the top level, as the original
	/// request shape allows filter values both inline and grouped.
	pub fn flatten_filters(&mut self) {
		let Some(Value::Object(filters)) = self.remove(FILTERS_KEY) else {
			return;
		};

		for (key, value) in filters {
			self.insert(&key, value);
		}
	}
}

fn scalar_string(value: &Value) -> Option<String> {
	match value {
		Value::String(raw) if !raw.trim().is_empty() => Some(raw.clone()),
		Value::Number(number) => Some(number.to_string()),
		Value::Bool(flag) => Some(flag.to_string()),
		_ => None,
	}
}
