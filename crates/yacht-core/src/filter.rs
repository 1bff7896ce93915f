//! Browse listings and the filter predicate applied to them.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A yacht as shown on the browse page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YachtListing {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub year: i32,
    /// Length overall in metres.
    pub length: f64,
    pub location: String,
    pub make: String,
    pub model: String,
    pub listing_type: String,
    pub boat_type: String,
    pub condition: String,
    #[serde(default)]
    pub fuel_type: Option<String>,
    #[serde(default)]
    pub hull_material: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub deck: Vec<String>,
    #[serde(default)]
    pub cabin: Vec<String>,
    #[serde(default)]
    pub usage_styles: Vec<String>,
}

/// Filter state of the browse page.
///
/// Range bounds are inclusive and optional. Set filters match
/// case-insensitively and pass when empty. Tag filters require every
/// selected tag to be present on the listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct YachtFilters {
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub length_min: Option<f64>,
    pub length_max: Option<f64>,
    pub conditions: Vec<String>,
    pub listing_types: Vec<String>,
    pub boat_types: Vec<String>,
    /// Matched against the listing's `make`.
    pub builders: Vec<String>,
    pub hull_materials: Vec<String>,
    pub fuel_types: Vec<String>,
    pub locations: Vec<String>,
    pub features: Vec<String>,
    pub deck: Vec<String>,
    pub cabin: Vec<String>,
    pub usage_styles: Vec<String>,
}

fn in_range<T: PartialOrd>(value: T, min: Option<T>, max: Option<T>) -> bool {
    min.map_or(true, |min| value >= min) && max.map_or(true, |max| value <= max)
}

fn one_of(selected: &[String], value: &str) -> bool {
    selected.is_empty() || selected.iter().any(|s| s.eq_ignore_ascii_case(value))
}

fn optional_one_of(selected: &[String], value: Option<&str>) -> bool {
    selected.is_empty() || value.is_some_and(|v| one_of(selected, v))
}

fn has_all(selected: &[String], tags: &[String]) -> bool {
    selected
        .iter()
        .all(|wanted| tags.iter().any(|t| t.eq_ignore_ascii_case(wanted)))
}

impl YachtFilters {
    pub fn matches(&self, listing: &YachtListing) -> bool {
        in_range(listing.price, self.price_min, self.price_max)
            && in_range(listing.year, self.year_min, self.year_max)
            && in_range(listing.length, self.length_min, self.length_max)
            && one_of(&self.conditions, &listing.condition)
            && one_of(&self.listing_types, &listing.listing_type)
            && one_of(&self.boat_types, &listing.boat_type)
            && one_of(&self.builders, &listing.make)
            && optional_one_of(&self.hull_materials, listing.hull_material.as_deref())
            && optional_one_of(&self.fuel_types, listing.fuel_type.as_deref())
            && one_of(&self.locations, &listing.location)
            && has_all(&self.features, &listing.features)
            && has_all(&self.deck, &listing.deck)
            && has_all(&self.cabin, &listing.cabin)
            && has_all(&self.usage_styles, &listing.usage_styles)
    }

    pub fn is_empty(&self) -> bool {
        self == &YachtFilters::default()
    }
}

pub fn filter_listings<'a>(
    filters: &YachtFilters,
    listings: impl IntoIterator<Item = &'a YachtListing>,
) -> Vec<YachtListing> {
    listings
        .into_iter()
        .filter(|l| filters.matches(l))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    Recommended,
    PriceAsc,
    PriceDesc,
    YearDesc,
    YearAsc,
}

/// Stable sort; `Recommended` keeps the input order.
pub fn sort_listings(listings: &mut [YachtListing], order: SortOrder) {
    let cmp: fn(&YachtListing, &YachtListing) -> Ordering = match order {
        SortOrder::Recommended => return,
        SortOrder::PriceAsc => |a, b| a.price.total_cmp(&b.price),
        SortOrder::PriceDesc => |a, b| b.price.total_cmp(&a.price),
        SortOrder::YearDesc => |a, b| b.year.cmp(&a.year),
        SortOrder::YearAsc => |a, b| a.year.cmp(&b.year),
    };
    listings.sort_by(cmp);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: &str, price: f64, year: i32) -> YachtListing {
        YachtListing {
            id: id.to_string(),
            name: format!("Yacht {id}"),
            price,
            year,
            length: 14.0,
            location: "Netherlands".to_string(),
            make: "Najad".to_string(),
            model: "460".to_string(),
            listing_type: "sale".to_string(),
            boat_type: "Sailing Yacht".to_string(),
            condition: "Used".to_string(),
            fuel_type: Some("Diesel".to_string()),
            hull_material: Some("GRP".to_string()),
            features: vec!["Air Conditioning".to_string(), "Generator".to_string()],
            deck: vec!["Teak Deck".to_string()],
            cabin: vec![],
            usage_styles: vec!["Cruising".to_string()],
        }
    }

    #[test]
    fn price_max_keeps_only_cheaper_listings() {
        let listings = vec![listing("a", 450_000.0, 2010), listing("b", 620_000.0, 2015)];
        let filters = YachtFilters {
            price_max: Some(500_000.0),
            ..YachtFilters::default()
        };
        let out = filter_listings(&filters, &listings);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "a");
    }

    #[test]
    fn bounds_are_inclusive() {
        let l = listing("a", 500_000.0, 2010);
        let filters = YachtFilters {
            price_min: Some(500_000.0),
            price_max: Some(500_000.0),
            year_min: Some(2010),
            year_max: Some(2010),
            ..YachtFilters::default()
        };
        assert!(filters.matches(&l));
    }

    #[test]
    fn set_filters_are_case_insensitive_and_empty_passes() {
        let l = listing("a", 1.0, 2000);
        let mut filters = YachtFilters::default();
        assert!(filters.is_empty());
        assert!(filters.matches(&l));

        filters.builders = vec!["najad".to_string(), "Hallberg-Rassy".to_string()];
        assert!(filters.matches(&l));
        filters.hull_materials = vec!["Steel".to_string()];
        assert!(!filters.matches(&l));
    }

    #[test]
    fn missing_optional_attribute_fails_a_non_empty_set() {
        let mut l = listing("a", 1.0, 2000);
        l.fuel_type = None;
        let filters = YachtFilters {
            fuel_types: vec!["Diesel".to_string()],
            ..YachtFilters::default()
        };
        assert!(!filters.matches(&l));
    }

    #[test]
    fn every_selected_tag_must_be_present() {
        let l = listing("a", 1.0, 2000);
        let mut filters = YachtFilters {
            features: vec!["generator".to_string()],
            ..YachtFilters::default()
        };
        assert!(filters.matches(&l));
        filters.features.push("Watermaker".to_string());
        assert!(!filters.matches(&l));
    }

    #[test]
    fn filters_deserialize_from_partial_camel_case_json() {
        let filters: YachtFilters = serde_json::from_value(serde_json::json!({
            "priceMax": 500000,
            "usageStyles": ["Cruising"]
        }))
        .unwrap();
        assert_eq!(filters.price_max, Some(500_000.0));
        assert_eq!(filters.usage_styles, vec!["Cruising".to_string()]);
        assert!(filters.conditions.is_empty());
    }

    #[test]
    fn sort_orders() {
        let mut l = vec![
            listing("a", 300.0, 2012),
            listing("b", 100.0, 2001),
            listing("c", 200.0, 2020),
        ];
        sort_listings(&mut l, SortOrder::Recommended);
        assert_eq!(ids(&l), ["a", "b", "c"]);
        sort_listings(&mut l, SortOrder::PriceAsc);
        assert_eq!(ids(&l), ["b", "c", "a"]);
        sort_listings(&mut l, SortOrder::YearDesc);
        assert_eq!(ids(&l), ["c", "a", "b"]);
        assert_eq!(
            serde_json::from_str::<SortOrder>("\"price-desc\"").unwrap(),
            SortOrder::PriceDesc
        );
    }

    fn ids(listings: &[YachtListing]) -> Vec<&str> {
        listings.iter().map(|l| l.id.as_str()).collect()
    }
}
