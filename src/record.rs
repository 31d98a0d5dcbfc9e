//! The structured record produced for every page of a registration form.
//!
//! A [`ChildRecord`] is always fully shaped: every field is present and
//! defaults to an empty value when the extractor found nothing. The wire
//! format (camelCase JSON) is what the backend stores and exports.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One extracted registration record (one per PDF page).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildRecord {
    pub name: String,
    pub child_number: String,
    pub gender: Gender,
    pub date_of_birth: String,
    pub class_of_study: String,
    pub center: String,
    pub year_of_admission: String,
    /// The normalised page text the fields were extracted from.
    pub raw_text: String,
    /// Originating file name. Empty until the batch layer attaches it.
    #[serde(default)]
    pub pdf_name: String,
    /// How `raw_text` was obtained.
    #[serde(default)]
    pub text_source: TextSource,
    /// Fields filled by a low-confidence fallback rather than a labelled match.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub low_confidence: Vec<Field>,
}

impl ChildRecord {
    /// Expected fields that came out empty.
    pub fn missing_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| self.value(*f).is_empty())
            .collect()
    }

    /// A record with at least one empty expected field.
    pub fn is_partial(&self) -> bool {
        Field::ALL.iter().any(|f| self.value(*f).is_empty())
    }

    /// Every expected field is empty (typically an unreadable page).
    pub fn is_blank(&self) -> bool {
        Field::ALL.iter().all(|f| self.value(*f).is_empty())
    }

    /// String view of a single field.
    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::ChildNumber => &self.child_number,
            Field::Gender => self.gender.as_str(),
            Field::DateOfBirth => &self.date_of_birth,
            Field::ClassOfStudy => &self.class_of_study,
            Field::Center => &self.center,
            Field::YearOfAdmission => &self.year_of_admission,
        }
    }

    /// Name used in operator-facing outcome entries.
    pub fn display_name(&self) -> Option<&str> {
        if self.name.is_empty() {
            None
        } else {
            Some(&self.name)
        }
    }
}

/// The extracted fields of a [`ChildRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Name,
    ChildNumber,
    Gender,
    DateOfBirth,
    ClassOfStudy,
    Center,
    YearOfAdmission,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Name,
        Field::ChildNumber,
        Field::Gender,
        Field::DateOfBirth,
        Field::ClassOfStudy,
        Field::Center,
        Field::YearOfAdmission,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::ChildNumber => "child number",
            Field::Gender => "gender",
            Field::DateOfBirth => "date of birth",
            Field::ClassOfStudy => "class of study",
            Field::Center => "center",
            Field::YearOfAdmission => "year of admission",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Normalised gender. Anything unrecognised is [`Gender::Unknown`], which
/// serialises as an empty string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    #[default]
    #[serde(rename = "")]
    Unknown,
}

impl Gender {
    /// Normalise free text. Only unambiguous spellings are accepted:
    /// `female…`, `male…`, or a bare `m` / `f` (any case).
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        if lower.starts_with("female") || lower == "f" {
            Gender::Female
        } else if lower.starts_with("male") || lower == "m" {
            Gender::Male
        } else {
            Gender::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Unknown => "",
        }
    }
}

/// How the text of a page was obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextSource {
    /// Embedded PDF text layer.
    TextLayer,
    /// Optical character recognition of the rendered page.
    Ocr,
    /// Neither path produced text (render or recognition failed).
    #[default]
    Unavailable,
}
