//! Presence-of-buyer classification for NF-e documents.

use tracing::debug;

use crate::models::config::{ClassificationConfig, DEFAULT_SENSITIVE_CFOPS};
use crate::models::nfe::{
    ClassificationResult, ExtractedFields, FieldValue, PresenceClass, ReviewStatus, StatusColor,
};

/// Rule-based classifier.
///
/// Every document gets an informational [`PresenceClass`]. The verdict is
/// only constrained for sensitive CFOPs, whose `indPres` must equal the
/// in-person code; any other CFOP, including a missing one, passes.
#[derive(Debug, Clone)]
pub struct Classifier {
    /// CFOP codes that require an in-person operation.
    sensitive_cfops: Vec<String>,
    /// `indPres` value those codes require.
    in_person_code: String,
}

impl Classifier {
    /// Create a classifier with the standard sensitive CFOP set.
    pub fn new() -> Self {
        Self {
            sensitive_cfops: DEFAULT_SENSITIVE_CFOPS.iter().map(|c| c.to_string()).collect(),
            in_person_code: "1".to_string(),
        }
    }

    /// Build a classifier from configuration.
    pub fn from_config(config: &ClassificationConfig) -> Self {
        Self::new()
            .with_sensitive_cfops(config.sensitive_cfops.iter().cloned())
            .with_in_person_code(config.in_person_code.clone())
    }

    /// Replace the sensitive CFOP set.
    pub fn with_sensitive_cfops<I, S>(mut self, cfops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sensitive_cfops = cfops.into_iter().map(Into::into).collect();
        self
    }

    /// Set the required presence code.
    pub fn with_in_person_code(mut self, code: impl Into<String>) -> Self {
        self.in_person_code = code.into();
        self
    }

    pub fn sensitive_cfops(&self) -> &[String] {
        &self.sensitive_cfops
    }

    /// Whether `cfop` is subject to the presence rule.
    pub fn is_sensitive(&self, cfop: &FieldValue) -> bool {
        cfop.as_str()
            .is_some_and(|code| self.sensitive_cfops.iter().any(|c| c == code))
    }

    /// Whether `ind_pres` satisfies the rule for `cfop`.
    pub fn is_consistent(&self, cfop: &FieldValue, ind_pres: &FieldValue) -> bool {
        !self.is_sensitive(cfop) || ind_pres.is(&self.in_person_code)
    }

    /// Classify a document's extracted fields.
    pub fn classify(&self, fields: &ExtractedFields) -> ClassificationResult {
        let presence = PresenceClass::from(&fields.ind_pres);
        let is_correct = self.is_consistent(&fields.cfop, &fields.ind_pres);

        let (status, color) = if is_correct {
            (ReviewStatus::Correct, StatusColor::Green)
        } else {
            (ReviewStatus::MustBeReviewed, StatusColor::Red)
        };

        debug!(
            "Classified CFOP {} / indPres {}: {} ({})",
            fields.cfop, fields.ind_pres, presence, status
        );

        ClassificationResult {
            report: render_report(fields, presence),
            cfop: fields.cfop.clone(),
            presence,
            is_correct,
            status,
            color,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Render the per-document report text.
pub fn render_report(fields: &ExtractedFields, presence: PresenceClass) -> String {
    let mut output = String::new();

    output.push_str(&format!("NF-e ID: {}\n", fields.id));
    output.push_str(&format!("CNPJ: {}\n", fields.cnpj));
    output.push_str(&format!("Number (nNF): {}\n", fields.number));
    output.push_str(&format!("Series: {}\n", fields.series));
    output.push_str(&format!("CFOP: {}\n", fields.cfop));
    output.push('\n');
    output.push_str(&format!("Presence indicator (indPres): {}\n", fields.ind_pres));
    output.push('\n');
    output.push_str(&format!("Operation classification: {}\n", presence));

    output
}
