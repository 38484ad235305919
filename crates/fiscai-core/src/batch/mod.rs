//! Batch aggregation over many analyzed documents.
//!
//! A batch tallies documents by CFOP and by presence classification. Parse
//! failures are kept aside with their error text and never counted.

mod page;

pub use page::{paginate, Page, ReviewFilter};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ParseError;
use crate::invoice::{Analysis, Classifier, DocumentAnalyzer, DocumentReport};
use crate::models::nfe::{FieldValue, StatusColor, NOT_FOUND};

/// A document that could not be analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub name: String,
    pub error: String,
}

/// Aggregated results of one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Successfully analyzed documents, in processing order.
    pub documents: Vec<DocumentReport>,
    /// Documents that failed to parse.
    pub failures: Vec<BatchFailure>,
    /// Document count per CFOP.
    pub cfop_counts: BTreeMap<String, usize>,
    /// Document count per presence classification label.
    pub classification_counts: BTreeMap<String, usize>,
    /// Presence indicators seen under each CFOP.
    pub presence_by_cfop: BTreeMap<String, Vec<FieldValue>>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            documents: Vec::new(),
            failures: Vec::new(),
            cfop_counts: BTreeMap::new(),
            classification_counts: BTreeMap::new(),
            presence_by_cfop: BTreeMap::new(),
        }
    }

    /// Analyze every `(name, xml)` pair; a failing document never stops the run.
    pub fn run<A, I, N, X>(analyzer: &A, documents: I) -> Self
    where
        A: DocumentAnalyzer,
        I: IntoIterator<Item = (N, X)>,
        N: AsRef<str>,
        X: AsRef<str>,
    {
        let mut report = Self::new();
        for (name, xml) in documents {
            let name = name.as_ref();
            report.record(name, analyzer.analyze(name, xml.as_ref()));
        }
        report
    }

    /// Record the outcome of analyzing one document.
    pub fn record(&mut self, name: &str, result: Result<Analysis, ParseError>) {
        match result {
            Ok(analysis) => self.record_analysis(analysis),
            Err(e) => self.record_failure(name, e),
        }
    }

    /// Count a successful analysis; its canonical tree is released here.
    pub fn record_analysis(&mut self, analysis: Analysis) {
        let document = analysis.into_document();
        let cfop = document.classification.cfop.to_string();

        *self.cfop_counts.entry(cfop.clone()).or_insert(0) += 1;
        *self
            .classification_counts
            .entry(document.classification.presence.label().to_string())
            .or_insert(0) += 1;
        self.presence_by_cfop
            .entry(cfop)
            .or_default()
            .push(document.fields.ind_pres.clone());

        debug!("Recorded {}", document.name);
        self.documents.push(document);
    }

    /// Keep a failed document aside; it is not counted anywhere.
    pub fn record_failure(&mut self, name: &str, error: impl std::fmt::Display) {
        warn!("Failed to analyze {}: {}", name, error);
        self.failures.push(BatchFailure {
            name: name.to_string(),
            error: error.to_string(),
        });
    }

    /// Number of documents counted in the tallies.
    pub fn processed(&self) -> usize {
        self.documents.len()
    }

    /// Number of documents seen, including failures.
    pub fn total(&self) -> usize {
        self.documents.len() + self.failures.len()
    }

    /// CFOP counts regrouped by the first `prefix_len` characters of each code.
    pub fn grouped_cfop_counts(&self, prefix_len: usize) -> BTreeMap<String, usize> {
        let mut grouped = BTreeMap::new();
        for (cfop, count) in &self.cfop_counts {
            *grouped.entry(group_key(cfop, prefix_len)).or_insert(0) += count;
        }
        grouped
    }

    /// Color for a row of [`grouped_cfop_counts`](Self::grouped_cfop_counts).
    ///
    /// Red when any document whose CFOP falls in `group` is sensitive and
    /// non-compliant.
    pub fn cfop_highlight(
        &self,
        group: &str,
        prefix_len: usize,
        classifier: &Classifier,
    ) -> StatusColor {
        let compliant = self
            .presence_by_cfop
            .iter()
            .filter(|(cfop, _)| group_key(cfop, prefix_len) == group)
            .all(|(cfop, seen)| {
                let code = FieldValue::Found(cfop.clone());
                seen.iter().all(|ind_pres| classifier.is_consistent(&code, ind_pres))
            });

        if compliant { StatusColor::Green } else { StatusColor::Red }
    }

    /// Documents matching a review filter, in processing order.
    pub fn filter(&self, filter: ReviewFilter) -> Vec<&DocumentReport> {
        self.documents.iter().filter(|d| filter.matches(d)).collect()
    }

    /// Count of documents that must be reviewed.
    pub fn incorrect_count(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| !d.classification.is_correct)
            .count()
    }
}

/// Leading `prefix_len` characters of a CFOP; the "not found" key is kept whole.
fn group_key(cfop: &str, prefix_len: usize) -> String {
    if cfop == NOT_FOUND {
        cfop.to_string()
    } else {
        cfop.chars().take(prefix_len).collect()
    }
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::NfeAnalyzer;
    use pretty_assertions::assert_eq;

    fn nfe(cfop: &str, ind_pres: Option<&str>) -> String {
        let ind_pres = ind_pres
            .map(|code| format!("<indPres>{code}</indPres>"))
            .unwrap_or_default();
        format!(
            r#"<NFe><infNFe Id="NFe1"><ide><serie>1</serie><nNF>1</nNF>{ind_pres}</ide>
               <det nItem="1"><prod><CFOP>{cfop}</CFOP></prod></det></infNFe></NFe>"#
        )
    }

    fn sample_batch() -> BatchReport {
        let documents = vec![
            ("a.xml".to_string(), nfe("6101", Some("1"))),
            ("b.xml".to_string(), nfe("6101", Some("2"))),
            ("c.xml".to_string(), "<NFe><broken></NFe>".to_string()),
            ("d.xml".to_string(), nfe("5102", Some("2"))),
            ("e.xml".to_string(), nfe("6108", Some("1"))),
            ("f.xml".to_string(), nfe("5405", None)),
        ];
        BatchReport::run(&NfeAnalyzer::new(), documents)
    }

    #[test]
    fn test_counts_exclude_failures() {
        let batch = sample_batch();

        assert_eq!(batch.processed(), 5);
        assert_eq!(batch.total(), 6);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].name, "c.xml");
        assert_eq!(batch.cfop_counts.values().sum::<usize>(), batch.processed());
        assert_eq!(batch.classification_counts.values().sum::<usize>(), batch.processed());
    }

    #[test]
    fn test_cfop_and_classification_counts() {
        let batch = sample_batch();

        let expected: BTreeMap<String, usize> = [("5102", 1), ("5405", 1), ("6101", 2), ("6108", 1)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(batch.cfop_counts, expected);

        assert_eq!(batch.classification_counts["in-person operation"], 2);
        assert_eq!(batch.classification_counts["non-presential operation, internet"], 2);
        assert_eq!(batch.classification_counts["unclassified"], 1);
    }

    #[test]
    fn test_cfop_highlight() {
        let batch = sample_batch();
        let classifier = Classifier::new();

        assert_eq!(batch.cfop_highlight("6101", 4, &classifier), StatusColor::Red);
        assert_eq!(batch.cfop_highlight("6108", 4, &classifier), StatusColor::Green);
        assert_eq!(batch.cfop_highlight("5102", 4, &classifier), StatusColor::Green);
        assert_eq!(batch.cfop_highlight("6116", 4, &classifier), StatusColor::Green);
    }

    #[test]
    fn test_cfop_highlight_uses_grouped_key() {
        let classifier = Classifier::new().with_sensitive_cfops(["61010"]);
        let analyzer = NfeAnalyzer::new().with_classifier(classifier.clone());
        let batch = BatchReport::run(
            &analyzer,
            [
                ("a.xml", nfe("61010", Some("2"))),
                ("b.xml", nfe("61019", Some("1"))),
            ],
        );

        let grouped = batch.grouped_cfop_counts(4);
        assert_eq!(grouped.keys().collect::<Vec<_>>(), vec!["6101"]);
        assert_eq!(batch.cfop_highlight("6101", 4, &classifier), StatusColor::Red);
        assert_eq!(batch.cfop_highlight("61019", 5, &classifier), StatusColor::Green);
        assert_eq!(batch.cfop_highlight("61", 2, &classifier), StatusColor::Red);
    }

    #[test]
    fn test_filter() {
        let batch = sample_batch();

        assert_eq!(batch.filter(ReviewFilter::All).len(), 5);
        let incorrect: Vec<&str> = batch
            .filter(ReviewFilter::Incorrect)
            .into_iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(incorrect, vec!["b.xml"]);
        assert_eq!(batch.filter(ReviewFilter::Correct).len(), 4);
        assert_eq!(batch.incorrect_count(), 1);
    }

    #[test]
    fn test_grouped_cfop_counts() {
        let mut batch = BatchReport::new();
        batch.cfop_counts.insert("61010".to_string(), 2);
        batch.cfop_counts.insert("6101".to_string(), 1);
        batch.cfop_counts.insert(NOT_FOUND.to_string(), 3);

        let grouped = batch.grouped_cfop_counts(4);
        assert_eq!(grouped["6101"], 3);
        assert_eq!(grouped[NOT_FOUND], 3);
        assert_eq!(grouped.len(), 2);
    }

    #[test]
    fn test_missing_cfop_counted_under_sentinel() {
        let batch = BatchReport::run(
            &NfeAnalyzer::new(),
            [("x.xml", "<NFe><ide><indPres>1</indPres></ide></NFe>")],
        );
        assert_eq!(batch.cfop_counts[NOT_FOUND], 1);
    }
}
