//! One search hit, reshaped for rendering: normalized attribute names, the
//! highlight flag, the nested business, resolved photo URLs, and the
//! resolved extra fields. Created fresh per response, discarded after
//! serialization.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use plaza_domain::naming;

use crate::{
	extra_fields::{self, DirectKeySource, ExtraField, ExtraFieldSource},
	params::ParamBag,
};

const BUSINESS_PREFIX: &str = "business_";

/// Raw photo keys superseded by the resolved `image`/`images` pair; kept on
/// the bag for lookups but never rendered.
const IGNORED_RENDER_FIELDS: [&str; 3] = ["photos_id_ids", "photos_url", "photos_description"];

const YOUTUBE_EMBED_BASE: &str = "https://www.youtube.com/embed/";
const YOUTUBE_ID_LEN: usize = 11;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ListingPhoto {
	pub url: String,
}

#[derive(Debug, Clone)]
pub struct ListingRecord {
	attrs: ParamBag,
	pub highlighted: bool,
	pub business: Option<Map<String, Value>>,
	pub image: Option<ListingPhoto>,
	pub images: Vec<ListingPhoto>,
	pub extra_fields: Vec<ExtraField>,
}

impl ListingRecord {
	/// Builds a record from one raw engine document. `extra_sources` lists
	/// additional legacy places the extra-field refs may live, tried after
	/// the document's own `extra_fields` key.
	pub fn from_document(
		doc: &Value,
		media: &plaza_config::Media,
		extra_sources: &[&dyn ExtraFieldSource],
	) -> Self {
		let mut attrs = normalize_document(doc);

		let embed_url = attrs.get_str("youtube_id").and_then(youtube_embed_url);

		if let Some(embed_url) = embed_url {
			attrs.insert("youtube_id", Value::String(embed_url));
		}

		let highlighted = attrs
			.get_str("highlighted_until")
			.and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok())
			.is_some_and(|until| until > OffsetDateTime::now_utc());
		let business = build_business(&attrs);
		let image = attrs
			.get_str("photos_main_url")
			.filter(|url| !url.is_empty())
			.map(|url| photo(media, url));
		let images = match attrs.get("photos_url") {
			Some(Value::Array(urls)) => urls
				.iter()
				.filter_map(Value::as_str)
				.filter(|url| !url.is_empty())
				.map(|url| photo(media, url))
				.collect(),
			_ => Vec::new(),
		};

		let metadata = extra_fields::decode_metadata(&attrs);
		let direct = DirectKeySource { bag: &attrs };
		let mut sources: Vec<&dyn ExtraFieldSource> = vec![&direct];

		sources.extend(extra_sources.iter().copied());

		let extra_fields = extra_fields::resolve_extra_fields(&sources, &metadata, &attrs);

		Self { attrs, highlighted, business, image, images, extra_fields }
	}

	/// Generic accessor over the normalized attribute bag, for genuinely
	/// dynamic per-category fields.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.attrs.get(name)
	}

	pub fn get_str(&self, name: &str) -> Option<&str> {
		self.attrs.get_str(name)
	}

	pub fn id(&self) -> Option<&Value> {
		self.attrs.get("id")
	}

	/// Renders the record: the normalized bag plus every enrichment. Raw
	/// photo keys are superseded by `image`/`images` and dropped.
	pub fn to_value(&self) -> Value {
		let mut out = Map::new();

		for (key, value) in self.attrs.iter() {
			if IGNORED_RENDER_FIELDS.contains(&key.as_str()) {
				continue;
			}

			out.insert(key.clone(), value.clone());
		}

		out.insert("highlighted".to_string(), Value::Bool(self.highlighted));

		if let Some(business) = &self.business {
			out.insert("business".to_string(), Value::Object(business.clone()));
		}

		out.insert(
			"image".to_string(),
			self.image
				.as_ref()
				.map(|photo| serde_json::json!({ "url": photo.url }))
				.unwrap_or(Value::Null),
		);
		out.insert(
			"images".to_string(),
			Value::Array(
				self.images
					.iter()
					.map(|photo| serde_json::json!({ "url": photo.url }))
					.collect(),
			),
		);
		out.insert(
			"extra_fields".to_string(),
			serde_json::to_value(&self.extra_fields).unwrap_or(Value::Array(Vec::new())),
		);

		Value::Object(out)
	}
}

/// Renames every document key to its canonical form. Keys that normalize to
/// the empty string are dropped; the document `id` is restored afterwards.
fn normalize_document(doc: &Value) -> ParamBag {
	let mut bag = ParamBag::new();
	let Some(object) = doc.as_object() else {
		return bag;
	};
	let known: BTreeSet<String> = object.keys().cloned().collect();

	for (key, value) in object {
		let name = naming::normalize_field_name(key, &known);

		if name.is_empty() {
			continue;
		}

		bag.insert(&name, value.clone());
	}

	if let Some(id) = object.get("id") {
		bag.insert("id", id.clone());
	}

	bag
}

fn build_business(attrs: &ParamBag) -> Option<Map<String, Value>> {
	let name = attrs.get_str("business_name").filter(|name| !name.is_empty())?;
	let mut business = Map::new();

	business.insert("name".to_string(), Value::String(name.to_string()));

	for (key, value) in attrs.iter() {
		if let Some(stripped) = key.strip_prefix(BUSINESS_PREFIX)
			&& stripped != "name"
		{
			business.insert(stripped.to_string(), value.clone());
		}
	}

	Some(business)
}

fn photo(media: &plaza_config::Media, url: &str) -> ListingPhoto {
	ListingPhoto { url: format!("{}{url}", media.source_path) }
}

/// The embed URL for a well-formed video id; malformed ids pass through
/// unchanged.
fn youtube_embed_url(id: &str) -> Option<String> {
	let well_formed = id.len() == YOUTUBE_ID_LEN
		&& id.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');

	well_formed.then(|| format!("{YOUTUBE_EMBED_BASE}{id}"))
}
