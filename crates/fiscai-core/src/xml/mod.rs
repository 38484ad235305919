//! XML canonicalization module.

mod canonicalizer;

pub use canonicalizer::{canonicalize, strip_namespace};

use crate::error::ParseError;

/// Result type for XML operations.
pub type Result<T> = std::result::Result<T, ParseError>;
