//! Per-document pipeline: canonicalize, extract, classify.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::models::canonical::CanonicalValue;
use crate::models::config::FiscaiConfig;
use crate::models::nfe::{ClassificationResult, ExtractedFields};
use crate::xml::canonicalize;

use super::classifier::Classifier;
use super::extractor::{DeepSearch, FieldExtractor};
use super::Result;

/// Result of analyzing one document.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Display name of the source document.
    pub name: String,
    /// Canonical tree of the document.
    pub tree: CanonicalValue,
    /// Extracted business fields.
    pub fields: ExtractedFields,
    /// Classification outcome.
    pub classification: ClassificationResult,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// What remains of an [`Analysis`] once its canonical tree is released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    pub name: String,
    pub fields: ExtractedFields,
    pub classification: ClassificationResult,
    pub processing_time_ms: u64,
}

impl Analysis {
    /// Canonical tree as JSON, the per-document export format.
    pub fn export_json(&self, pretty: bool) -> crate::Result<String> {
        let json = if pretty {
            self.tree.to_json_pretty()?
        } else {
            self.tree.to_json()?
        };
        Ok(json)
    }

    /// Drop the canonical tree, keeping the extracted data.
    pub fn into_document(self) -> DocumentReport {
        DocumentReport {
            name: self.name,
            fields: self.fields,
            classification: self.classification,
            processing_time_ms: self.processing_time_ms,
        }
    }
}

/// Trait for document analysis.
pub trait DocumentAnalyzer {
    /// Analyze one XML document; `name` is used only for reporting.
    fn analyze(&self, name: &str, xml: &str) -> Result<Analysis>;
}

/// NF-e analyzer combining deep-search extraction and the presence classifier.
#[derive(Debug, Clone, Default)]
pub struct NfeAnalyzer<E = DeepSearch> {
    extractor: E,
    classifier: Classifier,
}

impl NfeAnalyzer {
    /// Create an analyzer with default rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an analyzer from configuration.
    pub fn from_config(config: &FiscaiConfig) -> Self {
        Self::new().with_classifier(Classifier::from_config(&config.classification))
    }
}

impl<E: FieldExtractor> NfeAnalyzer<E> {
    /// Use a different field extractor.
    pub fn with_extractor<F: FieldExtractor>(self, extractor: F) -> NfeAnalyzer<F> {
        NfeAnalyzer {
            extractor,
            classifier: self.classifier,
        }
    }

    /// Use a different classifier.
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }
}

impl<E: FieldExtractor> DocumentAnalyzer for NfeAnalyzer<E> {
    fn analyze(&self, name: &str, xml: &str) -> Result<Analysis> {
        let start = Instant::now();
        info!("Analyzing {}", name);

        let tree = canonicalize(xml)?;
        debug!("Canonical tree built for {}", name);

        let fields = ExtractedFields::extract_with(&self.extractor, &tree);
        let missing = fields.missing_fields();
        if !missing.is_empty() {
            debug!("{}: fields not found: {}", name, missing.join(", "));
        }

        let classification = self.classifier.classify(&fields);

        Ok(Analysis {
            name: name.to_string(),
            tree,
            fields,
            classification,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}
