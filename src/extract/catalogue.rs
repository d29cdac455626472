//! Built-in rule catalogues, one per known form layout

use super::{Decomposition, Rule, Section};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Form layouts with a built-in rule catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormTemplate {
    /// Labelled personal fields, education table, certification, family
    /// and reference blocks
    #[default]
    ApplicationForm,
    /// Single "Name (Block Letters ...)" field and a serial-numbered
    /// education table; no list blocks
    BlockLetters,
}

impl FormTemplate {
    pub const ALL: [FormTemplate; 2] = [FormTemplate::ApplicationForm, FormTemplate::BlockLetters];

    pub fn as_str(self) -> &'static str {
        match self {
            FormTemplate::ApplicationForm => "application-form",
            FormTemplate::BlockLetters => "block-letters",
        }
    }

    /// Ordered rule catalogue for this layout
    pub fn rules(self) -> Vec<Rule> {
        match self {
            FormTemplate::ApplicationForm => application_form(),
            FormTemplate::BlockLetters => block_letters(),
        }
    }
}

impl fmt::Display for FormTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormTemplate::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = FormTemplate::ALL.iter().map(|t| t.as_str()).collect();
                format!("unknown template {:?} (expected one of {})", s, names.join(", "))
            })
    }
}

/// Address value runs over line breaks until a blank line, the next line
/// carrying an address label, or the end of the text.
fn address(key: &str, label: &str) -> Rule {
    let pattern = format!(
        r"\b{}[ \t]*[:\-]?\s*((?s:.+?))(?:\n[ \t]*\n|\n[^\n]*\bAddress\b|\z)",
        label
    );
    Rule::single(Section::Addresses, key, &pattern)
}

fn personal(key: &str, pattern: &str) -> Rule {
    Rule::single(Section::PersonalInfo, key, pattern)
}

fn application_form() -> Vec<Rule> {
    vec![
        personal("first_name", r"\bFirst Name[ \t]*[:\-]?\s*([A-Za-z]+)"),
        personal("middle_name", r"\bMiddle Name[ \t]*[:\-]?\s*([A-Za-z]+)"),
        personal("last_name", r"\bLast Name[ \t]*[:\-]?\s*([A-Za-z]+)"),
        personal("dob", r"\bDate of Birth[ \t]*[:\-]?\s*([\d/]+)"),
        personal("age", r"\bAge[ \t]*[:\-]?\s*(\d+)"),
        personal("gender", r"\bGender[ \t]*[:\-]?\s*(\w+)"),
        personal(
            "passport",
            r"\bPassport(?:[ \t]*No\.?)?[ \t]*[:\-]?\s*(\w+)",
        ),
        personal(
            "email",
            r"\bEmail(?:[ \t]*ID)?[ \t]*[:\-]?\s*([\w.\-]+@[\w.\-]+\.\w+)",
        ),
        personal("mobile", r"\bMobile(?:[ \t]*No\.?)?[ \t]*[:\-]?\s*(\d+)"),
        address("permanent_address", "Permanent Address"),
        address("current_address", "Current Address"),
        Rule::repeating(
            "education",
            r"\b\d+\s+([A-Za-z\s]+)\s+([A-Za-z]+)\s+(\d{1,3})\s+(\d{4})",
            Decomposition::POSITIONAL,
        ),
        Rule::block(
            Section::Certifications,
            "certification",
            r"(?s)\bCertification\b.+?\bOrganizer\b.+?\bDuration\b[^\n]*",
        ),
        Rule::block(
            Section::FamilyInfo,
            "family_member",
            r"(?s)\bRelation\b.+?\bOccupation\b.+?\bLocation\b[^\n]*",
        ),
        Rule::block(
            Section::References,
            "reference",
            r"(?s)\bName\b.+?\bDesignation\b.+?\bContact\b[^\n]*",
        ),
    ]
}

fn block_letters() -> Vec<Rule> {
    vec![
        personal("name", r"\bName[ \t]*\(Block Letters[^:\n]*:\s*([^\n]+)"),
        personal("dob", r"\bDate of Birth[ \t]*:\s*(\d{2}/\d{2}/\d{4})"),
        personal("mobile", r"\bMobile[ \t]*:\s*(\d+)"),
        personal("email", r"\bEmail ID[ \t]*:\s*(\S+@\S+)"),
        address("permanent_address", "Permanent Address"),
        address("current_address", "Current Address"),
        // Rows are "serial  text  score[%]  year"; the serial column lands in
        // `qualification` for this layout
        Rule::repeating(
            "education",
            r"\b(\d+)\s+(.+?)\s+(\d+)%?\s+(\d{4})",
            Decomposition {
                qualification: 1,
                institution: 2,
                score: 3,
                year: 4,
            },
        ),
    ]
}
