//! Structured candidate record

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use std::path::PathBuf;

/// Value stored for a scalar field whose pattern did not match
pub const NOT_FOUND: &str = "N/A";

/// Ordered scalar fields of one record section.
///
/// Keys keep catalogue order and serialize as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap(Vec<(String, String)>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key`, if the catalogue defines it
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or replace `key`, keeping its original position
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key.to_string(), value)),
        }
    }

    /// True when `key` is absent or still holds the sentinel
    pub fn is_unmatched(&self, key: &str) -> bool {
        self.get(key).map_or(true, |v| v == NOT_FOUND)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// One row of the education table, captured verbatim
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, Deserialize)]
pub struct EducationEntry {
    pub institution: String,
    pub qualification: String,
    pub score: String,
    pub year: String,
}

/// Text-derived part of a record, produced by the field extractor
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ExtractedFields {
    pub personal_info: FieldMap,
    pub addresses: FieldMap,
    pub education: Vec<EducationEntry>,
    pub certifications: Vec<String>,
    pub family_info: Vec<String>,
    pub references: Vec<String>,
}

/// Reference to a stored image: a local path inside the core, a URL once
/// published at the boundary
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum AssetRef {
    Path(PathBuf),
    Url(String),
}

impl AssetRef {
    pub fn as_path(&self) -> Option<&PathBuf> {
        match self {
            AssetRef::Path(path) => Some(path),
            AssetRef::Url(_) => None,
        }
    }
}

/// Photo and signature chosen among a document's embedded images
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetAssignment {
    pub photo: Option<PathBuf>,
    pub signature: Option<PathBuf>,
}

/// Final normalized record for one document
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct StructuredRecord {
    pub personal_info: FieldMap,
    pub addresses: FieldMap,
    pub education: Vec<EducationEntry>,
    pub certifications: Vec<String>,
    pub family_info: Vec<String>,
    pub references: Vec<String>,
    pub photo: Option<AssetRef>,
    pub signature: Option<AssetRef>,
}

/// Merge extracted fields with the classified images
pub fn assemble(fields: ExtractedFields, assets: AssetAssignment) -> StructuredRecord {
    let ExtractedFields {
        personal_info,
        addresses,
        education,
        certifications,
        family_info,
        references,
    } = fields;

    StructuredRecord {
        personal_info,
        addresses,
        education,
        certifications,
        family_info,
        references,
        photo: assets.photo.map(AssetRef::Path),
        signature: assets.signature.map(AssetRef::Path),
    }
}
