use std::path::{Path, PathBuf};

use yacht_adapters::{
    extract_equipment, extract_features, load_fixture_doc, map_with, score_at, Extractor,
    FixtureExtractor, NoopObserver,
};
use yacht_core::Section;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures/devalk")
        .join(name)
}

#[test]
fn service_envelope_fixture_maps_and_scores() {
    let doc = load_fixture_doc(fixture("najad-460.json")).expect("fixture loads");
    assert_eq!(doc.present_sections().count(), Section::ALL.len());

    let mapped = map_with(&doc, &NoopObserver);
    assert!(mapped.missing_core_fields.is_empty());
    assert_eq!(mapped.record.value("yachtType"), "Sailing yacht");
    assert_eq!(mapped.record.value("type"), "D2-75");
    assert_eq!(mapped.record.value("freezer"), "");

    let score = score_at(&mapped.record, 2026);
    assert_eq!(score.confidence, 100);
    assert_eq!(score.completeness, 38);
    assert!(score.warnings.is_empty(), "{:?}", score.warnings);

    assert_eq!(
        extract_equipment(&mapped.record),
        vec![
            "Anchor: Delta 25kg",
            "Windlass: Lofrans Tigres",
            "Dinghy: Zodiac 2.9m",
            "Outboard: Mercury 5hp",
        ]
    );
    assert_eq!(
        extract_features(&mapped.record),
        vec![
            "Heating: Webasto diesel heater",
            "Galley: L-shaped",
            "Fridge: Isotherm",
        ]
    );
}

#[tokio::test]
async fn html_fixture_agrees_with_service_document_on_shared_fields() {
    let extractor = FixtureExtractor::new(fixture("najad-460.html"));
    let from_html = extractor
        .extract("https://www.devalk.nl/en/yachtdetails/najad-460")
        .await
        .expect("html fixture parses");
    let from_service = load_fixture_doc(fixture("najad-460.json")).unwrap();

    let html = map_with(&from_html, &NoopObserver).record;
    let service = map_with(&from_service, &NoopObserver).record;

    for field in [
        "dimensions", "hpKw", "askingPrice", "model", "yachtType", "loaM", "yearBuilt", "builder",
        "hullMaterial", "cabins", "heating", "make", "type", "anchor", "windlass", "comfortRatio",
    ] {
        assert_eq!(html.value(field), service.value(field), "field {field}");
    }
    assert_eq!(html.value("hullSpeed"), "8.3 kn");
    assert!(from_html.section(Section::Rigging).is_none());
}
