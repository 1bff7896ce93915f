//! Extractor adapters plus the mapping, scoring and export stages that turn
//! an extractor document into a flat listing record.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::info;
use yacht_core::{mappings_for, ExtractorDoc, FieldMapping, Section};
use yacht_storage::{parse_extractor_response, ExtractError, ExtractorClient, FetchError, HttpFetcher};

mod export;
mod mapping;
mod scoring;

pub use export::{export_csv, export_file_name, export_json, render_export, ExportFormat};
pub use mapping::{
    map, map_onto, map_onto_with, map_with, MappedRecord, MappingObserver, NoopObserver,
    SectionObservation, TracingObserver,
};
pub use scoring::{
    completeness, confidence, extract_equipment, extract_features, score, score_at,
    shape_warnings, Score, CONFIDENCE_WEIGHTS,
};

pub const CRATE_NAME: &str = "yacht-adapters";

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Turns a listing URL into the nested extractor document.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn extract(&self, url: &str) -> Result<ExtractorDoc, AdapterError>;
}

/// Delegates to the external extraction service.
#[derive(Debug, Clone)]
pub struct ServiceExtractor {
    client: ExtractorClient,
}

impl ServiceExtractor {
    pub fn new(client: ExtractorClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Extractor for ServiceExtractor {
    fn name(&self) -> &'static str {
        "service"
    }

    async fn extract(&self, url: &str) -> Result<ExtractorDoc, AdapterError> {
        Ok(self.client.extract(url).await?)
    }
}

/// Fetches the listing page directly and reads the labelled detail
/// rows out of the markup.
#[derive(Debug, Clone)]
pub struct HtmlPageExtractor {
    http: HttpFetcher,
}

impl HtmlPageExtractor {
    pub fn new(http: HttpFetcher) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Extractor for HtmlPageExtractor {
    fn name(&self) -> &'static str {
        "html"
    }

    async fn extract(&self, url: &str) -> Result<ExtractorDoc, AdapterError> {
        let page = self.http.fetch_bytes(url).await?;
        let html = String::from_utf8_lossy(&page.body);
        let doc = parse_listing_html(&html)?;
        info!(url, final_url = %page.final_url, sections = doc.present_sections().count(), "listing page parsed");
        Ok(doc)
    }
}

/// Serves a document from disk regardless of the requested URL.
#[derive(Debug, Clone)]
pub struct FixtureExtractor {
    path: PathBuf,
}

impl FixtureExtractor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Extractor for FixtureExtractor {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn extract(&self, _url: &str) -> Result<ExtractorDoc, AdapterError> {
        Ok(load_fixture_doc(&self.path)?)
    }
}

/// Load an extractor document from a file. `.html`/`.htm` files are parsed as
/// listing pages; anything else is JSON, either the service envelope or a
/// bare document.
pub fn load_fixture_doc(path: impl AsRef<Path>) -> Result<ExtractorDoc> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    let is_html = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"));
    if is_html {
        return parse_listing_html(&text).with_context(|| format!("parsing {}", path.display()));
    }

    let value: JsonValue =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    if value.get("status").is_some() {
        parse_extractor_response(text.as_bytes())
            .with_context(|| format!("decoding extractor envelope {}", path.display()))
    } else {
        serde_json::from_value(value).with_context(|| format!("decoding document {}", path.display()))
    }
}

fn selector(css: &str) -> Result<Selector, AdapterError> {
    Selector::parse(css).map_err(|e| AdapterError::Message(e.to_string()))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// Comparison key for row labels: case and whitespace insensitive, trailing
/// colon dropped.
fn label_key(label: &str) -> String {
    label
        .trim()
        .trim_end_matches(':')
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn mapping_for_label(section: Section, label: &str) -> Option<&'static FieldMapping> {
    let key = label_key(label);
    mappings_for(section)
        .map(|(_, m)| m)
        .find(|m| label_key(m.label) == key)
}

/// Reads one `<strong>Label</strong> value` row into `doc`. First value wins.
fn collect_labelled_row(
    doc: &mut ExtractorDoc,
    section: Section,
    row: ElementRef<'_>,
    strong: &Selector,
) -> bool {
    let Some(label_el) = row.select(strong).next() else {
        return false;
    };
    let label = element_text(label_el);
    let Some(mapping) = mapping_for_label(section, &label) else {
        return false;
    };

    let full = element_text(row);
    let value = full
        .strip_prefix(label.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| full.replacen(label.as_str(), "", 1));
    let value = value.trim().trim_start_matches(':').trim();
    if value.is_empty() {
        return false;
    }

    let fields = doc.section_mut(section);
    if fields.contains(mapping.source) {
        return false;
    }
    fields.insert(mapping.source, value);
    true
}

/// Parse a De Valk listing page.
///
/// The summary box feeds `keyDetails`, the details box feeds
/// `generalInfo`, and each accordion panel feeds the section named by its
/// button. Rows whose label has no mapping are skipped.
pub fn parse_listing_html(html: &str) -> Result<ExtractorDoc, AdapterError> {
    let document = Html::parse_document(html);
    let strong = selector("strong")?;
    let mut doc = ExtractorDoc::default();

    for item in document.select(&selector("div.tableBox div.item")?) {
        collect_labelled_row(&mut doc, Section::KeyDetails, item, &strong);
    }

    for row in document.select(&selector("div.modeBox li")?) {
        collect_labelled_row(&mut doc, Section::GeneralInfo, row, &strong);
    }

    let button = selector("button.accordion-button")?;
    let body_rows = selector("div.accordion-body li")?;
    for panel in document.select(&selector("div.accordion-item")?) {
        let Some(section) = panel
            .select(&button)
            .next()
            .and_then(|b| Section::from_heading(&element_text(b)))
        else {
            continue;
        };
        for row in panel.select(&body_rows) {
            collect_labelled_row(&mut doc, section, row, &strong);
        }
    }

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="tableBox">
            <div class="item"><ul><li><strong>Dimensions</strong></li><li>14.12 x 4.20 x 2.00 (m)</li></ul></div>
            <div class="item"><ul><li><strong>HP/ KW</strong></li><li>100/74</li></ul></div>
            <div class="item"><ul><li><strong>Asking price</strong></li><li>€ 275.000</li></ul></div>
            <div class="item"><ul><li><strong>Viewings</strong></li><li>By appointment</li></ul></div>
          </div>
          <div class="modeBox">
            <ul class="list-1">
              <li><strong>Model</strong> Najad 460</li>
              <li><strong>Type</strong> Sailing yacht</li>
              <li><strong>Year built</strong> 2004</li>
              <li><strong>Builder:</strong> Najad Varvet</li>
            </ul>
          </div>
          <div class="accordion-item">
            <h2><button class="accordion-button">Machinery</button></h2>
            <div class="accordion-body"><ul class="list-1">
              <li><strong>Make</strong> Volvo Penta</li>
              <li><strong>Type</strong> D2-75</li>
            </ul></div>
          </div>
          <div class="accordion-item">
            <h2><button class="accordion-button">Photos</button></h2>
            <div class="accordion-body"><ul><li><strong>Model</strong> ignored</li></ul></div>
          </div>
        </body></html>
    "#;

    #[test]
    fn label_matching_ignores_case_spacing_and_colons() {
        assert_eq!(
            mapping_for_label(Section::KeyDetails, "hp/ kw").map(|m| m.dest),
            Some("hpKw")
        );
        assert_eq!(
            mapping_for_label(Section::GeneralInfo, "Type:").map(|m| m.dest),
            Some("yachtType")
        );
        assert_eq!(
            mapping_for_label(Section::Machinery, "Type").map(|m| m.dest),
            Some("type")
        );
        assert!(mapping_for_label(Section::KeyDetails, "Viewings").is_none());
    }

    #[test]
    fn html_rows_land_in_their_sections() {
        let doc = parse_listing_html(PAGE).unwrap();
        let key = doc.section(Section::KeyDetails).unwrap();
        assert_eq!(key.get("dimensions").as_deref(), Some("14.12 x 4.20 x 2.00 (m)"));
        assert_eq!(key.get("hpKw").as_deref(), Some("100/74"));
        assert_eq!(key.len(), 3);

        let general = doc.section(Section::GeneralInfo).unwrap();
        assert_eq!(general.get("model").as_deref(), Some("Najad 460"));
        assert_eq!(general.get("type").as_deref(), Some("Sailing yacht"));
        assert_eq!(general.get("builder").as_deref(), Some("Najad Varvet"));

        let machinery = doc.section(Section::Machinery).unwrap();
        assert_eq!(machinery.get("make").as_deref(), Some("Volvo Penta"));
        assert_eq!(machinery.get("type").as_deref(), Some("D2-75"));

        assert!(doc.section(Section::Rigging).is_none());
    }

    #[test]
    fn empty_page_yields_empty_document() {
        let doc = parse_listing_html("<html></html>").unwrap();
        assert_eq!(doc.present_sections().count(), 0);
    }
}
