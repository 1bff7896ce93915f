//! Core domain model for the De Valk yacht migration pipeline.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

mod fields;
mod filter;

pub use fields::{
    field_index, field_name, local_field_names, mappings_for, FieldMapping, CORE_FIELDS,
    FIELD_COUNT, FIELD_MAPPINGS, FORM_ONLY_FIELDS,
};
pub use filter::{filter_listings, sort_listings, SortOrder, YachtFilters, YachtListing};

pub const CRATE_NAME: &str = "yacht-core";

/// Named group of related fields in the extractor output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    KeyDetails,
    GeneralInfo,
    Accommodation,
    Machinery,
    Navigation,
    Equipment,
    Rigging,
    IndicationRatios,
}

impl Section {
    pub const ALL: [Section; 8] = [
        Section::KeyDetails,
        Section::GeneralInfo,
        Section::Accommodation,
        Section::Machinery,
        Section::Navigation,
        Section::Equipment,
        Section::Rigging,
        Section::IndicationRatios,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Section::KeyDetails => "keyDetails",
            Section::GeneralInfo => "generalInfo",
            Section::Accommodation => "accommodation",
            Section::Machinery => "machinery",
            Section::Navigation => "navigation",
            Section::Equipment => "equipment",
            Section::Rigging => "rigging",
            Section::IndicationRatios => "indicationRatios",
        }
    }

    /// Heading used for the section on the listing page.
    pub fn heading(self) -> &'static str {
        match self {
            Section::KeyDetails => "Key Details",
            Section::GeneralInfo => "General Information",
            Section::Accommodation => "Accommodation",
            Section::Machinery => "Machinery",
            Section::Navigation => "Navigation",
            Section::Equipment => "Equipment",
            Section::Rigging => "Rigging",
            Section::IndicationRatios => "Indication Ratios",
        }
    }

    pub fn from_heading(text: &str) -> Option<Section> {
        let text = text.trim();
        Section::ALL
            .into_iter()
            .find(|s| text.eq_ignore_ascii_case(s.heading()) || text.eq_ignore_ascii_case(s.key()))
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Raw field values of one extractor section.
///
/// Keeps the distinction between an absent key, an explicit `null` and an
/// empty string; the mapper collapses all three to `""`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionFields(BTreeMap<String, JsonValue>);

impl SectionFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scalar value of `field`. Strings pass through untouched, numbers and
    /// booleans are rendered as their JSON text, anything else is absent.
    pub fn get(&self, field: &str) -> Option<Cow<'_, str>> {
        match self.0.get(field)? {
            JsonValue::String(s) => Some(Cow::Borrowed(s.as_str())),
            JsonValue::Number(n) => Some(Cow::Owned(n.to_string())),
            JsonValue::Bool(b) => Some(Cow::Owned(b.to_string())),
            JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), JsonValue::String(value.into()));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SectionFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut out = SectionFields::new();
        for (k, v) in iter {
            out.insert(k, v);
        }
        out
    }
}

/// Nested document returned by the extractor service.
///
/// Older extractor builds emit snake_case section keys; both spellings are
/// accepted. Unknown sections are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractorDoc {
    #[serde(default, alias = "key_details", skip_serializing_if = "Option::is_none")]
    pub key_details: Option<SectionFields>,
    #[serde(default, alias = "general_info", alias = "general", skip_serializing_if = "Option::is_none")]
    pub general_info: Option<SectionFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accommodation: Option<SectionFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machinery: Option<SectionFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation: Option<SectionFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<SectionFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rigging: Option<SectionFields>,
    #[serde(default, alias = "indication_ratios", skip_serializing_if = "Option::is_none")]
    pub indication_ratios: Option<SectionFields>,
}

impl ExtractorDoc {
    pub fn section(&self, section: Section) -> Option<&SectionFields> {
        match section {
            Section::KeyDetails => self.key_details.as_ref(),
            Section::GeneralInfo => self.general_info.as_ref(),
            Section::Accommodation => self.accommodation.as_ref(),
            Section::Machinery => self.machinery.as_ref(),
            Section::Navigation => self.navigation.as_ref(),
            Section::Equipment => self.equipment.as_ref(),
            Section::Rigging => self.rigging.as_ref(),
            Section::IndicationRatios => self.indication_ratios.as_ref(),
        }
    }

    fn slot_mut(&mut self, section: Section) -> &mut Option<SectionFields> {
        match section {
            Section::KeyDetails => &mut self.key_details,
            Section::GeneralInfo => &mut self.general_info,
            Section::Accommodation => &mut self.accommodation,
            Section::Machinery => &mut self.machinery,
            Section::Navigation => &mut self.navigation,
            Section::Equipment => &mut self.equipment,
            Section::Rigging => &mut self.rigging,
            Section::IndicationRatios => &mut self.indication_ratios,
        }
    }

    /// Section for writing, created empty when absent.
    pub fn section_mut(&mut self, section: Section) -> &mut SectionFields {
        self.slot_mut(section).get_or_insert_with(SectionFields::new)
    }

    pub fn set(&mut self, section: Section, field: &str, value: impl Into<String>) {
        self.section_mut(section).insert(field, value);
    }

    pub fn present_sections(&self) -> impl Iterator<Item = Section> + '_ {
        Section::ALL
            .into_iter()
            .filter(|s| self.section(*s).is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown local field `{0}`")]
pub struct UnknownField(pub String);

/// Flat record understood by the listing form and the database.
///
/// Always carries every local field; values default to `""`. Serialises as a
/// JSON object in field-table order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalRecord {
    values: Vec<String>,
}

impl Default for LocalRecord {
    fn default() -> Self {
        Self {
            values: vec![String::new(); FIELD_COUNT],
        }
    }
}

impl LocalRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        field_index(field).map(|i| self.values[i].as_str())
    }

    /// Value of `field`, `""` for unknown names.
    pub fn value(&self, field: &str) -> &str {
        self.get(field).unwrap_or_default()
    }

    pub fn set(&mut self, field: &str, value: impl Into<String>) -> Result<(), UnknownField> {
        let index = field_index(field).ok_or_else(|| UnknownField(field.to_string()))?;
        self.values[index] = value.into();
        Ok(())
    }

    /// Write the value at a field-table index; out-of-range indices are ignored.
    pub fn set_at(&mut self, index: usize, value: impl Into<String>) -> bool {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    /// True when `field` holds something other than whitespace.
    pub fn is_filled(&self, field: &str) -> bool {
        !self.value(field).trim().is_empty()
    }

    pub fn filled_count(&self) -> usize {
        self.values.iter().filter(|v| !v.trim().is_empty()).count()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filled_count() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        local_field_names().zip(self.values.iter().map(String::as_str))
    }

    /// Build a record from loosely typed JSON, e.g. a request body.
    /// `null` becomes `""`, numbers and booleans keep their JSON text,
    /// unknown keys and nested values are dropped.
    pub fn from_json_map<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, JsonValue)>,
    {
        let mut record = LocalRecord::new();
        for (key, value) in entries {
            let Some(index) = field_index(&key) else {
                continue;
            };
            let text = match value {
                JsonValue::String(s) => s,
                JsonValue::Number(n) => n.to_string(),
                JsonValue::Bool(b) => b.to_string(),
                JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => String::new(),
            };
            record.values[index] = text;
        }
        record
    }
}

impl Serialize for LocalRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LocalRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, JsonValue>::deserialize(deserializer)?;
        Ok(LocalRecord::from_json_map(raw))
    }
}

/// Scoring metadata computed once per migration attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationMetadata {
    pub source_url: String,
    pub scraped_at: DateTime<Utc>,
    pub confidence: u8,
    pub data_completeness: u8,
    #[serde(default)]
    pub missing_core_fields: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Projection returned by the yacht listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YachtSummary {
    pub id: Uuid,
    pub model: String,
    pub yacht_type: Option<String>,
    pub year_built: Option<String>,
    pub builder: Option<String>,
    pub asking_price: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedYacht {
    pub id: Uuid,
    pub model: String,
    pub created_at: DateTime<Utc>,
}
