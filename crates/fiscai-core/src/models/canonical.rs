//! Canonical tree produced from an NF-e XML document.
//!
//! The tree is an owned, immutable value built bottom-up by the
//! canonicalizer. Field order is the order in which child elements were
//! encountered, followed by `@attributes` and then `#text`.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Reserved field holding an element's attribute map.
pub const ATTRIBUTES_KEY: &str = "@attributes";

/// Reserved field holding an element's text when it also has structure.
pub const TEXT_KEY: &str = "#text";

/// Canonical representation of one XML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalValue {
    /// Trimmed text of an element with no children and no attributes.
    Leaf(String),
    /// Element with children, attributes, or text alongside structure.
    Node(Vec<(String, Field)>),
    /// Empty element.
    Absent,
}

/// Value stored under one field of a [`CanonicalValue::Node`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// The local name occurred once.
    Single(CanonicalValue),
    /// The local name occurred more than once; values in document order.
    Repeated(Vec<CanonicalValue>),
}

impl Field {
    /// Add another occurrence, promoting to [`Field::Repeated`] on the second one.
    pub fn push(&mut self, value: CanonicalValue) {
        match self {
            Field::Single(first) => {
                let first = std::mem::replace(first, CanonicalValue::Absent);
                *self = Field::Repeated(vec![first, value]);
            }
            Field::Repeated(values) => values.push(value),
        }
    }

    /// All values held by the field, in encounter order.
    pub fn values(&self) -> &[CanonicalValue] {
        match self {
            Field::Single(value) => std::slice::from_ref(value),
            Field::Repeated(values) => values,
        }
    }

    /// The field's value when it occurred exactly once.
    pub fn single(&self) -> Option<&CanonicalValue> {
        match self {
            Field::Single(value) => Some(value),
            Field::Repeated(_) => None,
        }
    }

    /// Whether the field holds no value at all.
    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Single(CanonicalValue::Absent))
    }

    /// Render the field as text: leaf text verbatim, anything structured as compact JSON.
    pub fn to_text(&self) -> String {
        match self {
            Field::Single(CanonicalValue::Leaf(text)) => text.clone(),
            // Keys are always strings and no value errors, so serialization cannot fail.
            other => serde_json::to_string(other).unwrap_or_default(),
        }
    }
}

impl CanonicalValue {
    /// Leaf text, if this is a leaf.
    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            CanonicalValue::Leaf(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, CanonicalValue::Absent)
    }

    /// Ordered fields of a node; empty for leaves and absent values.
    pub fn fields(&self) -> &[(String, Field)] {
        match self {
            CanonicalValue::Node(fields) => fields,
            _ => &[],
        }
    }

    /// Direct child field by name (no deep search).
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields()
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, field)| field)
    }

    /// Serialize as compact JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Serialize as indented JSON, the export format.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// Serialized by hand so that field order survives; serde_json::Value maps do not keep it.
impl Serialize for CanonicalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CanonicalValue::Leaf(text) => serializer.serialize_str(text),
            CanonicalValue::Absent => serializer.serialize_none(),
            CanonicalValue::Node(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, field) in fields {
                    map.serialize_entry(key, field)?;
                }
                map.end()
            }
        }
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Single(value) => value.serialize(serializer),
            Field::Repeated(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn leaf(text: &str) -> CanonicalValue {
        CanonicalValue::Leaf(text.to_string())
    }

    #[test]
    fn test_field_push_promotes_to_list() {
        let mut field = Field::Single(leaf("a"));
        field.push(leaf("b"));
        assert_eq!(field, Field::Repeated(vec![leaf("a"), leaf("b")]));

        field.push(leaf("c"));
        assert_eq!(field.values().len(), 3);
        assert_eq!(field.values()[2], leaf("c"));
    }

    #[test]
    fn test_json_preserves_field_order() {
        let tree = CanonicalValue::Node(vec![
            ("zeta".to_string(), Field::Single(leaf("1"))),
            ("alpha".to_string(), Field::Repeated(vec![leaf("2"), CanonicalValue::Absent])),
            (
                ATTRIBUTES_KEY.to_string(),
                Field::Single(CanonicalValue::Node(vec![(
                    "versao".to_string(),
                    Field::Single(leaf("4.00")),
                )])),
            ),
        ]);

        assert_eq!(
            tree.to_json().unwrap(),
            r#"{"zeta":"1","alpha":["2",null],"@attributes":{"versao":"4.00"}}"#
        );
    }

    #[test]
    fn test_field_to_text() {
        assert_eq!(Field::Single(leaf("6101")).to_text(), "6101");
        assert_eq!(
            Field::Repeated(vec![leaf("1"), leaf("2")]).to_text(),
            r#"["1","2"]"#
        );
    }

    #[test]
    fn test_get_direct_field() {
        let tree = CanonicalValue::Node(vec![("ide".to_string(), Field::Single(leaf("x")))]);
        assert!(tree.get("ide").is_some());
        assert!(tree.get("emit").is_none());
        assert!(leaf("x").get("ide").is_none());
    }
}
