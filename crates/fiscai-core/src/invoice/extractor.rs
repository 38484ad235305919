//! Deep-search field extraction over the canonical tree.

use crate::models::canonical::{CanonicalValue, Field};
use crate::models::nfe::{keys, ExtractedFields, FieldValue};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// Find the first field named `key`. The field may be empty.
    fn find<'a>(&self, tree: &'a CanonicalValue, key: &str) -> Option<&'a Field>;

    /// Extract the first field named `key` as text; an empty field is `NotFound`.
    fn extract(&self, tree: &CanonicalValue, key: &str) -> FieldValue {
        self.find(tree, key)
            .filter(|field| !field.is_absent())
            .map(Field::to_text)
            .into()
    }
}

/// Depth-first search in field insertion order.
///
/// Each field's name is compared before its value is descended into, and the
/// elements of a repeated field are searched in document order. The first
/// match wins, at whatever depth it sits, so the same key works across
/// layout differences between schema versions.
///
/// An empty field with a matching name ends the search of the node that
/// holds it. Seen from an enclosing node it counts as no match, so the
/// search carries on with that node's later fields. At the top level it
/// is returned as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeepSearch;

impl FieldExtractor for DeepSearch {
    fn find<'a>(&self, tree: &'a CanonicalValue, key: &str) -> Option<&'a Field> {
        search(tree, key)
    }
}

fn search<'a>(value: &'a CanonicalValue, key: &str) -> Option<&'a Field> {
    for (name, field) in value.fields() {
        if name == key {
            return Some(field);
        }
        for child in field.values() {
            if let Some(found) = search(child, key).filter(|f| !f.is_absent()) {
                return Some(found);
            }
        }
    }
    None
}

/// Find the first field named `key` anywhere in the tree.
pub fn find<'a>(tree: &'a CanonicalValue, key: &str) -> Option<&'a Field> {
    DeepSearch.find(tree, key)
}

/// Extract the first value named `key`, or [`FieldValue::NotFound`].
pub fn extract(tree: &CanonicalValue, key: &str) -> FieldValue {
    DeepSearch.extract(tree, key)
}

impl ExtractedFields {
    /// Pull the six business fields with the default deep search.
    pub fn from_tree(tree: &CanonicalValue) -> Self {
        Self::extract_with(&DeepSearch, tree)
    }

    pub fn extract_with<E: FieldExtractor>(extractor: &E, tree: &CanonicalValue) -> Self {
        Self {
            id: extractor.extract(tree, keys::ID),
            cnpj: extractor.extract(tree, keys::CNPJ),
            number: extractor.extract(tree, keys::NUMBER),
            series: extractor.extract(tree, keys::SERIES),
            cfop: extractor.extract(tree, keys::CFOP),
            ind_pres: extractor.extract(tree, keys::PRESENCE),
        }
    }
}
