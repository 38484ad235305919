//! NF-e field extraction and classification module.

mod analyzer;
pub mod classifier;
pub mod extractor;

pub use analyzer::{Analysis, DocumentAnalyzer, DocumentReport, NfeAnalyzer};
pub use classifier::{render_report, Classifier};
pub use extractor::{DeepSearch, FieldExtractor};

use crate::error::ParseError;

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, ParseError>;
