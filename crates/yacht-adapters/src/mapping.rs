//! Copies extractor sections into the flat local record.

use tracing::{debug, info};
use yacht_core::{mappings_for, ExtractorDoc, LocalRecord, Section, CORE_FIELDS};

/// What the mapper saw for one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionObservation {
    pub section: Section,
    pub present: bool,
    /// Mapped fields that received a non-blank value.
    pub filled: usize,
    /// Mapped fields of the section.
    pub fields: usize,
}

pub trait MappingObserver: Send + Sync {
    fn observe(&self, observation: &SectionObservation);
}

/// Logs each section through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl MappingObserver for TracingObserver {
    fn observe(&self, o: &SectionObservation) {
        if o.present {
            info!(section = %o.section, filled = o.filled, fields = o.fields, "section mapped");
        } else {
            debug!(section = %o.section, "section absent");
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl MappingObserver for NoopObserver {
    fn observe(&self, _observation: &SectionObservation) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedRecord {
    pub record: LocalRecord,
    /// Core fields left blank after mapping, in core-field order.
    pub missing_core_fields: Vec<String>,
}

pub fn map(doc: &ExtractorDoc) -> MappedRecord {
    map_with(doc, &TracingObserver)
}

pub fn map_with(doc: &ExtractorDoc, observer: &dyn MappingObserver) -> MappedRecord {
    map_onto_with(LocalRecord::new(), doc, observer)
}

/// Map `doc` over an existing record. Fields of present sections are
/// overwritten, absent or null values included; everything else is kept.
pub fn map_onto(base: LocalRecord, doc: &ExtractorDoc) -> MappedRecord {
    map_onto_with(base, doc, &TracingObserver)
}

pub fn map_onto_with(
    mut record: LocalRecord,
    doc: &ExtractorDoc,
    observer: &dyn MappingObserver,
) -> MappedRecord {
    for section in Section::ALL {
        let mut observation = SectionObservation {
            section,
            present: false,
            filled: 0,
            fields: 0,
        };

        if let Some(fields) = doc.section(section) {
            observation.present = true;
            for (index, mapping) in mappings_for(section) {
                let value = fields
                    .get(mapping.source)
                    .map(|v| v.into_owned())
                    .unwrap_or_default();
                if !value.trim().is_empty() {
                    observation.filled += 1;
                }
                observation.fields += 1;
                record.set_at(index, value);
            }
        }

        observer.observe(&observation);
    }

    let missing_core_fields = CORE_FIELDS
        .iter()
        .filter(|f| !record.is_filled(f))
        .map(|f| f.to_string())
        .collect();

    MappedRecord {
        record,
        missing_core_fields,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use yacht_core::FIELD_COUNT;

    #[derive(Default)]
    struct Recording(Mutex<Vec<SectionObservation>>);

    impl MappingObserver for Recording {
        fn observe(&self, observation: &SectionObservation) {
            self.0.lock().unwrap().push(*observation);
        }
    }

    fn najad_doc() -> ExtractorDoc {
        let mut doc = ExtractorDoc::default();
        doc.set(Section::GeneralInfo, "model", "Najad 460");
        doc.set(Section::GeneralInfo, "type", "Sailing yacht");
        doc.set(Section::GeneralInfo, "builder", "Najad");
        doc.set(Section::Machinery, "type", "D2-75");
        doc.set(Section::Machinery, "make", "Volvo Penta");
        doc
    }

    #[test]
    fn every_local_field_is_present_after_mapping() {
        let mapped = map_with(&ExtractorDoc::default(), &NoopObserver);
        assert_eq!(mapped.record.len(), FIELD_COUNT);
        assert_eq!(mapped.record.filled_count(), 0);
        assert_eq!(mapped.missing_core_fields, vec!["model", "builder", "yearBuilt", "loaM"]);
    }

    #[test]
    fn renamed_sources_reach_their_destinations() {
        let mapped = map_with(&najad_doc(), &NoopObserver);
        assert_eq!(mapped.record.value("yachtType"), "Sailing yacht");
        assert_eq!(mapped.record.value("type"), "D2-75");
        assert_eq!(mapped.record.value("make"), "Volvo Penta");
        assert_eq!(mapped.missing_core_fields, vec!["yearBuilt", "loaM"]);
    }

    #[test]
    fn mapping_is_idempotent() {
        let doc = najad_doc();
        let once = map_with(&doc, &NoopObserver);
        let twice = map_onto_with(once.record.clone(), &doc, &NoopObserver);
        assert_eq!(once, twice);
    }

    #[test]
    fn map_onto_keeps_fields_of_absent_sections() {
        let mut base = LocalRecord::new();
        base.set("anchor", "Delta 25kg").unwrap();
        base.set("builder", "Old builder").unwrap();
        base.set("notes", "keep me").unwrap();

        let mapped = map_onto_with(base, &najad_doc(), &NoopObserver);
        assert_eq!(mapped.record.value("anchor"), "Delta 25kg");
        assert_eq!(mapped.record.value("builder"), "Najad");
        assert_eq!(mapped.record.value("notes"), "keep me");
        // present section, field missing from the document
        assert_eq!(mapped.record.value("designer"), "");
    }

    #[test]
    fn observer_sees_every_section_once() {
        let recording = Recording::default();
        map_with(&najad_doc(), &recording);
        let seen = recording.0.into_inner().unwrap();
        assert_eq!(seen.len(), Section::ALL.len());

        let general = seen.iter().find(|o| o.section == Section::GeneralInfo).unwrap();
        assert!(general.present);
        assert_eq!(general.filled, 3);
        assert_eq!(general.fields, 23);
        assert!(!seen.iter().find(|o| o.section == Section::Rigging).unwrap().present);
    }

    #[test]
    fn null_and_numeric_values() {
        let doc: ExtractorDoc = serde_json::from_value(serde_json::json!({
            "generalInfo": { "model": null, "yearBuilt": 2004, "loaM": 14.12 }
        }))
        .unwrap();
        let mapped = map_with(&doc, &NoopObserver);
        assert_eq!(mapped.record.value("model"), "");
        assert_eq!(mapped.record.value("yearBuilt"), "2004");
        assert_eq!(mapped.record.value("loaM"), "14.12");
    }
}
