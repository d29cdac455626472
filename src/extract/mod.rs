//! Pattern-based field extraction
//!
//! A [`FieldExtractor`] runs an ordered catalogue of declarative [`Rule`]s
//! over the full recognized text. Every rule sees the same, unmodified text;
//! a rule that does not match leaves its field at the sentinel (scalars) or
//! adds nothing (lists). Overlapping patterns of different fields are not
//! reconciled.

mod catalogue;

pub use catalogue::FormTemplate;

use crate::error::{Error, Result};
use crate::record::{EducationEntry, ExtractedFields, FieldMap, NOT_FOUND};
use regex::{Captures, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Record section a rule writes into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    PersonalInfo,
    Addresses,
    Education,
    Certifications,
    FamilyInfo,
    References,
}

impl Section {
    pub fn as_str(self) -> &'static str {
        match self {
            Section::PersonalInfo => "personal_info",
            Section::Addresses => "addresses",
            Section::Education => "education",
            Section::Certifications => "certifications",
            Section::FamilyInfo => "family_info",
            Section::References => "references",
        }
    }
}

/// Capture group numbers for the columns of a repeating record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decomposition {
    pub institution: usize,
    pub qualification: usize,
    pub score: usize,
    pub year: usize,
}

impl Decomposition {
    /// Groups 1..=4 in column order
    pub const POSITIONAL: Decomposition = Decomposition {
        institution: 1,
        qualification: 2,
        score: 3,
        year: 4,
    };

    fn highest_group(&self) -> usize {
        self.institution
            .max(self.qualification)
            .max(self.score)
            .max(self.year)
    }

    fn entry(&self, caps: &Captures<'_>) -> EducationEntry {
        let column = |group: usize| {
            caps.get(group)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default()
        };
        EducationEntry {
            institution: column(self.institution),
            qualification: column(self.qualification),
            score: column(self.score),
            year: column(self.year),
        }
    }
}

/// How many values a rule produces and how they are shaped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Cardinality {
    /// First match, capture group 1
    Single,
    /// Every non-overlapping match, split into columns
    Repeating(Decomposition),
    /// Every non-overlapping match, whole span kept as text
    Block,
}

/// One declarative extraction rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    pub section: Section,
    /// Field name within the section (scalar rules) or a label for list rules
    pub key: String,
    /// Regular expression, matched case-insensitively
    pub pattern: String,
    pub cardinality: Cardinality,
}

impl Rule {
    pub fn single(section: Section, key: &str, pattern: &str) -> Self {
        Self {
            section,
            key: key.to_string(),
            pattern: pattern.to_string(),
            cardinality: Cardinality::Single,
        }
    }

    pub fn repeating(key: &str, pattern: &str, decomposition: Decomposition) -> Self {
        Self {
            section: Section::Education,
            key: key.to_string(),
            pattern: pattern.to_string(),
            cardinality: Cardinality::Repeating(decomposition),
        }
    }

    pub fn block(section: Section, key: &str, pattern: &str) -> Self {
        Self {
            section,
            key: key.to_string(),
            pattern: pattern.to_string(),
            cardinality: Cardinality::Block,
        }
    }

    /// Dotted path of the field this rule fills, e.g. `personal_info.email`
    pub fn field_path(&self) -> String {
        match self.cardinality {
            Cardinality::Single => format!("{}.{}", self.section.as_str(), self.key),
            _ => self.section.as_str().to_string(),
        }
    }

    fn check_section(&self) -> Result<()> {
        let fits = match self.cardinality {
            Cardinality::Single => {
                matches!(self.section, Section::PersonalInfo | Section::Addresses)
            }
            Cardinality::Repeating(_) => self.section == Section::Education,
            Cardinality::Block => matches!(
                self.section,
                Section::Certifications | Section::FamilyInfo | Section::References
            ),
        };

        if fits {
            Ok(())
        } else {
            Err(Error::InvalidRule {
                field: self.field_path(),
                reason: format!(
                    "section {} cannot hold {:?} values",
                    self.section.as_str(),
                    self.cardinality
                ),
            })
        }
    }
}

#[derive(Debug)]
struct CompiledRule {
    rule: Rule,
    regex: Regex,
}

impl CompiledRule {
    fn compile(rule: Rule) -> Result<Self> {
        rule.check_section()?;

        let regex = RegexBuilder::new(&rule.pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::InvalidRule {
                field: rule.field_path(),
                reason: e.to_string(),
            })?;

        let required_groups = match rule.cardinality {
            Cardinality::Single => 1,
            Cardinality::Repeating(decomposition) => decomposition.highest_group(),
            Cardinality::Block => 0,
        };
        // captures_len counts the implicit whole-match group
        if regex.captures_len() <= required_groups {
            return Err(Error::InvalidRule {
                field: rule.field_path(),
                reason: format!(
                    "pattern needs at least {} capture group(s)",
                    required_groups
                ),
            });
        }

        Ok(Self { rule, regex })
    }

    fn apply(&self, text: &str, fields: &mut ExtractedFields) {
        let rule = &self.rule;
        match rule.cardinality {
            Cardinality::Single => {
                let Some(map) = scalar_section(fields, rule.section) else {
                    return;
                };
                // An earlier rule for the same key wins
                if !map.is_unmatched(&rule.key) {
                    return;
                }
                if let Some(value) = self
                    .regex
                    .captures(text)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().trim().to_string())
                {
                    map.set(&rule.key, value);
                }
            }
            Cardinality::Repeating(decomposition) => {
                fields.education.extend(
                    self.regex
                        .captures_iter(text)
                        .map(|caps| decomposition.entry(&caps)),
                );
            }
            Cardinality::Block => {
                let Some(list) = block_section(fields, rule.section) else {
                    return;
                };
                list.extend(
                    self.regex
                        .find_iter(text)
                        .map(|m| m.as_str().trim().to_string()),
                );
            }
        }
    }
}

fn scalar_section(fields: &mut ExtractedFields, section: Section) -> Option<&mut FieldMap> {
    match section {
        Section::PersonalInfo => Some(&mut fields.personal_info),
        Section::Addresses => Some(&mut fields.addresses),
        _ => None,
    }
}

fn block_section(fields: &mut ExtractedFields, section: Section) -> Option<&mut Vec<String>> {
    match section {
        Section::Certifications => Some(&mut fields.certifications),
        Section::FamilyInfo => Some(&mut fields.family_info),
        Section::References => Some(&mut fields.references),
        _ => None,
    }
}

/// Applies a compiled rule catalogue to recognized document text
#[derive(Debug)]
pub struct FieldExtractor {
    rules: Vec<CompiledRule>,
}

impl FieldExtractor {
    /// Compile `rules`, keeping their order
    pub fn new(rules: Vec<Rule>) -> Result<Self> {
        let rules = rules
            .into_iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Extractor for one of the built-in templates
    pub fn for_template(template: FormTemplate) -> Result<Self> {
        Self::new(template.rules())
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(|compiled| &compiled.rule)
    }

    /// Run every rule over `text`.
    ///
    /// Each scalar key of the catalogue is present in the result, holding
    /// [`NOT_FOUND`] when unmatched.
    pub fn extract(&self, text: &str) -> ExtractedFields {
        let mut fields = ExtractedFields::default();

        for compiled in &self.rules {
            let rule = &compiled.rule;
            if rule.cardinality == Cardinality::Single {
                if let Some(map) = scalar_section(&mut fields, rule.section) {
                    map.set(&rule.key, NOT_FOUND);
                }
            }
        }

        for compiled in &self.rules {
            compiled.apply(text, &mut fields);
        }

        tracing::debug!(
            education = fields.education.len(),
            certifications = fields.certifications.len(),
            family_info = fields.family_info.len(),
            references = fields.references.len(),
            "fields extracted"
        );

        fields
    }
}
