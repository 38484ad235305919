//! Core library for NF-e (Brazilian electronic invoice) analysis.
//!
//! This crate provides:
//! - XML canonicalization into an order-preserving tree
//! - Deep-search extraction of the NF-e business fields
//! - Presence-indicator classification against the transaction-type code
//! - Batch aggregation of CFOP and classification counts

pub mod batch;
pub mod error;
pub mod invoice;
pub mod models;
pub mod xml;

pub use batch::{BatchFailure, BatchReport, ReviewFilter};
pub use error::{FiscaiError, ParseError, Result};
pub use invoice::{Analysis, Classifier, DocumentAnalyzer, DocumentReport, NfeAnalyzer};
pub use models::canonical::{CanonicalValue, Field};
pub use models::config::FiscaiConfig;
pub use models::nfe::{ClassificationResult, ExtractedFields, FieldValue, PresenceClass, ReviewStatus, StatusColor};
pub use xml::canonicalize;
