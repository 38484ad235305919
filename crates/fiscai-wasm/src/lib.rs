//! WASM bindings for NF-e presence-indicator analysis.
//!
//! This crate provides WebAssembly bindings for use in browsers and Node.js.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use fiscai_core::batch::{paginate, BatchReport, ReviewFilter};
use fiscai_core::invoice::{Classifier, DocumentAnalyzer, DocumentReport, NfeAnalyzer};
use fiscai_core::models::nfe::{ExtractedFields, FieldValue, PresenceClass};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Convert NF-e XML into its canonical JSON text.
#[wasm_bindgen]
pub fn canonicalize_xml(xml: &str) -> Result<String, JsValue> {
    let tree = fiscai_core::canonicalize(xml).map_err(|e| JsValue::from_str(&e.to_string()))?;
    tree.to_json_pretty()
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[derive(Serialize)]
struct AnalyzeResult {
    document: DocumentReport,
    canonical_json: String,
}

/// Analyze one NF-e document.
///
/// Returns the extracted fields, the classification, and the canonical JSON export.
#[wasm_bindgen]
pub fn analyze_xml(name: &str, xml: &str) -> Result<JsValue, JsValue> {
    let analysis = NfeAnalyzer::new()
        .analyze(name, xml)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let canonical_json = analysis
        .export_json(true)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    to_js(&AnalyzeResult {
        document: analysis.into_document(),
        canonical_json,
    })
}

/// Classify a CFOP / indPres pair directly.
#[wasm_bindgen]
pub fn classify_fields(cfop: Option<String>, ind_pres: Option<String>) -> Result<JsValue, JsValue> {
    let fields = ExtractedFields {
        id: FieldValue::NotFound,
        cnpj: FieldValue::NotFound,
        number: FieldValue::NotFound,
        series: FieldValue::NotFound,
        cfop: cfop.into(),
        ind_pres: ind_pres.into(),
    };

    to_js(&Classifier::new().classify(&fields))
}

/// Label for an `indPres` code.
#[wasm_bindgen]
pub fn presence_label(code: &str) -> String {
    PresenceClass::from_code(code).label().to_string()
}

fn parse_filter(filter: &str) -> ReviewFilter {
    match filter {
        "correct" => ReviewFilter::Correct,
        "incorrect" => ReviewFilter::Incorrect,
        _ => ReviewFilter::All,
    }
}

#[derive(Serialize)]
struct PageJs<'a> {
    documents: Vec<&'a DocumentReport>,
    page: usize,
    total_pages: usize,
    start: usize,
    end: usize,
    total: usize,
}

/// Analysis session for a set of uploaded documents.
#[wasm_bindgen]
pub struct NfeBatch {
    analyzer: NfeAnalyzer,
    report: BatchReport,
}

#[wasm_bindgen]
impl NfeBatch {
    /// Start an empty batch.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            analyzer: NfeAnalyzer::new(),
            report: BatchReport::new(),
        }
    }

    /// Add a document. Returns false if it could not be parsed; the batch keeps going.
    #[wasm_bindgen]
    pub fn add(&mut self, name: &str, xml: &str) -> bool {
        let result = self.analyzer.analyze(name, xml);
        let ok = result.is_ok();
        self.report.record(name, result);
        ok
    }

    /// Full batch report: documents, failures, and counts.
    #[wasm_bindgen]
    pub fn report(&self) -> Result<JsValue, JsValue> {
        to_js(&self.report)
    }

    /// CFOP counts grouped by code prefix.
    #[wasm_bindgen]
    pub fn cfop_counts(&self, prefix_len: usize) -> Result<JsValue, JsValue> {
        to_js(&self.report.grouped_cfop_counts(prefix_len))
    }

    /// Whether a row of `cfop_counts(prefix_len)` should be shown as compliant.
    #[wasm_bindgen]
    pub fn cfop_is_compliant(&self, cfop: &str, prefix_len: usize) -> bool {
        self.report
            .cfop_highlight(cfop, prefix_len, self.analyzer.classifier())
            .is_affirmative()
    }

    /// One page of documents; `filter` is "all", "correct" or "incorrect".
    #[wasm_bindgen]
    pub fn page(&self, filter: &str, page: usize, per_page: usize) -> Result<JsValue, JsValue> {
        let documents = self.report.filter(parse_filter(filter));
        let page = paginate(&documents, page, per_page);

        to_js(&PageJs {
            documents: page.items.to_vec(),
            page: page.number,
            total_pages: page.total_pages,
            start: page.start(),
            end: page.end(),
            total: page.total,
        })
    }

    /// Discard all results.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.report = BatchReport::new();
    }
}

impl Default for NfeBatch {
    fn default() -> Self {
        Self::new()
    }
}
