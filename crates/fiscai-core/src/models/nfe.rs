//! NF-e analysis data models: extracted fields and classification results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Text shown in place of a field that does not occur in the document.
pub const NOT_FOUND: &str = "not found";

/// Tag names of the six business fields read from every document.
pub mod keys {
    /// Access key of the NF-e, an attribute of `infNFe`.
    pub const ID: &str = "Id";
    /// Company tax identification number.
    pub const CNPJ: &str = "CNPJ";
    /// Document number.
    pub const NUMBER: &str = "nNF";
    /// Document series.
    pub const SERIES: &str = "serie";
    /// Transaction-type code.
    pub const CFOP: &str = "CFOP";
    /// Buyer presence indicator.
    pub const PRESENCE: &str = "indPres";
}

/// A value read from the canonical tree, or the "not found" sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Found(String),
    NotFound,
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Found(value) => Some(value),
            FieldValue::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, FieldValue::Found(_))
    }

    /// Exact comparison against a code; never true for `NotFound`.
    pub fn is(&self, code: &str) -> bool {
        self.as_str() == Some(code)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Found(value) => f.write_str(value),
            FieldValue::NotFound => f.write_str(NOT_FOUND),
        }
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(FieldValue::NotFound, FieldValue::Found)
    }
}

/// Business fields pulled from one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    /// NF-e access key (`Id`).
    pub id: FieldValue,
    /// Tax ID (`CNPJ`), first occurrence in document order.
    pub cnpj: FieldValue,
    /// Document number (`nNF`).
    pub number: FieldValue,
    /// Series (`serie`).
    pub series: FieldValue,
    /// Transaction-type code (`CFOP`).
    pub cfop: FieldValue,
    /// Presence indicator (`indPres`).
    pub ind_pres: FieldValue,
}

impl ExtractedFields {
    /// Tag names of the fields that were not found.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            (keys::ID, &self.id),
            (keys::CNPJ, &self.cnpj),
            (keys::NUMBER, &self.number),
            (keys::SERIES, &self.series),
            (keys::CFOP, &self.cfop),
            (keys::PRESENCE, &self.ind_pres),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_found())
        .map(|(key, _)| key)
        .collect()
    }
}

/// Buyer presence classification, keyed by the `indPres` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceClass {
    /// 0 - complementary or adjustment invoices.
    NotApplicable,
    /// 1 - buyer present.
    InPerson,
    /// 2 - remote, over the internet.
    Internet,
    /// 3 - remote, by telephone.
    Telemarketing,
    /// 4 - NFC-e with home delivery.
    HomeDelivery,
    /// 5 - in person, outside the establishment.
    InPersonOutside,
    /// 9 - remote, other channels.
    OtherNonPresential,
    /// Any other code, or no indicator at all.
    Unclassified,
}

impl PresenceClass {
    pub const ALL: [PresenceClass; 8] = [
        PresenceClass::NotApplicable,
        PresenceClass::InPerson,
        PresenceClass::Internet,
        PresenceClass::Telemarketing,
        PresenceClass::HomeDelivery,
        PresenceClass::InPersonOutside,
        PresenceClass::OtherNonPresential,
        PresenceClass::Unclassified,
    ];

    /// Look up an `indPres` code.
    pub fn from_code(code: &str) -> Self {
        match code {
            "0" => Self::NotApplicable,
            "1" => Self::InPerson,
            "2" => Self::Internet,
            "3" => Self::Telemarketing,
            "4" => Self::HomeDelivery,
            "5" => Self::InPersonOutside,
            "9" => Self::OtherNonPresential,
            _ => Self::Unclassified,
        }
    }

    /// The `indPres` code for this class.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::NotApplicable => Some("0"),
            Self::InPerson => Some("1"),
            Self::Internet => Some("2"),
            Self::Telemarketing => Some("3"),
            Self::HomeDelivery => Some("4"),
            Self::InPersonOutside => Some("5"),
            Self::OtherNonPresential => Some("9"),
            Self::Unclassified => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NotApplicable => "not applicable (complementary or adjustment invoice)",
            Self::InPerson => "in-person operation",
            Self::Internet => "non-presential operation, internet",
            Self::Telemarketing => "non-presential operation, telemarketing",
            Self::HomeDelivery => "NFC-e operation with home delivery",
            Self::InPersonOutside => "in-person operation, outside the establishment",
            Self::OtherNonPresential => "non-presential operation, other",
            Self::Unclassified => "unclassified",
        }
    }
}

impl From<&FieldValue> for PresenceClass {
    fn from(value: &FieldValue) -> Self {
        value.as_str().map_or(Self::Unclassified, Self::from_code)
    }
}

impl fmt::Display for PresenceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Review status of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Correct,
    MustBeReviewed,
}

impl ReviewStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::MustBeReviewed => "must be reviewed",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Display color tag: green is affirmative, red is negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusColor {
    Green,
    Red,
}

impl StatusColor {
    pub fn is_affirmative(&self) -> bool {
        matches!(self, Self::Green)
    }
}

/// Outcome of classifying one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Human-readable report of the extracted fields.
    pub report: String,
    /// Transaction-type code the verdict was based on.
    pub cfop: FieldValue,
    /// Presence classification.
    pub presence: PresenceClass,
    /// Whether the presence indicator is consistent with the CFOP.
    pub is_correct: bool,
    pub status: ReviewStatus,
    pub color: StatusColor,
}
