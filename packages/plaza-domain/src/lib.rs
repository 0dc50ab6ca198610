pub mod error;
pub mod fields;
pub mod naming;
pub mod slug;
pub mod tree;

pub use error::{Error, Result};
pub use fields::{FacetableField, FieldCatalog, FieldValueType};
pub use tree::{TaxonomyForest, TaxonomyRecord};
