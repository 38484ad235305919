//! Error types for the fiscai-core library.

use thiserror::Error;

/// Main error type for the fiscai library.
#[derive(Error, Debug)]
pub enum FiscaiError {
    /// XML parsing error for a single document.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while canonicalizing a document's XML.
///
/// Scoped to one document: a batch records the failure and moves on.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The XML reader rejected the input (malformed markup, mismatched end tag, bad escape).
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An attribute could not be read.
    #[error("malformed attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    /// The input contains no element at all.
    #[error("document has no root element")]
    NoRootElement,

    /// The input ended while an element was still open.
    #[error("unclosed element <{0}>")]
    UnclosedElement(String),

    /// A second top-level element follows the root.
    #[error("document has more than one root element")]
    MultipleRoots,

    /// Non-whitespace character data outside the root element.
    #[error("text outside the root element")]
    TextOutsideRoot,
}

/// Result type for the fiscai library.
pub type Result<T> = std::result::Result<T, FiscaiError>;
