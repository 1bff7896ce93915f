//! Completeness and confidence metrics, plus the summary lists shown next to
//! a migrated record.

use chrono::{Datelike, Utc};
use yacht_core::LocalRecord;

/// Confidence contribution of each core field when filled.
pub const CONFIDENCE_WEIGHTS: &[(&str, u8)] = &[
    ("builder", 25),
    ("model", 25),
    ("loaM", 20),
    ("make", 15),
    ("askingPrice", 15),
    ("yearBuilt", 10),
    ("hullMaterial", 10),
    ("cabins", 5),
    ("berths", 5),
];

const KNOWN_HULL_MATERIALS: &[&str] = &["grp", "fiberglass", "steel", "aluminum", "wood", "composite"];

const EQUIPMENT_LABELS: &[(&str, &str)] = &[
    ("anchor", "Anchor"),
    ("windlass", "Windlass"),
    ("dinghy", "Dinghy"),
    ("outboard", "Outboard"),
];

const FEATURE_LABELS: &[(&str, &str)] = &[
    ("heating", "Heating"),
    ("galley", "Galley"),
    ("fridge", "Fridge"),
    ("freezer", "Freezer"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    pub confidence: u8,
    pub completeness: u8,
    /// Shape problems in filled core fields. Informational only.
    pub warnings: Vec<String>,
}

/// Percentage of local fields holding a non-blank value, rounded half up.
pub fn completeness(record: &LocalRecord) -> u8 {
    let total = record.len();
    if total == 0 {
        return 0;
    }
    let filled = record.filled_count();
    ((200 * filled + total) / (2 * total)) as u8
}

/// Sum of the weights of filled core fields, capped at 100.
pub fn confidence(record: &LocalRecord) -> u8 {
    let sum: u32 = CONFIDENCE_WEIGHTS
        .iter()
        .filter(|(field, _)| record.is_filled(field))
        .map(|(_, weight)| u32::from(*weight))
        .sum();
    sum.min(100) as u8
}

/// Leading numeric prefix of `text`, the way a lenient form parser reads it.
fn leading_number(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let mut end = 0;
    let mut seen_dot = false;
    for (i, ch) in text.char_indices() {
        match ch {
            '0'..='9' => end = i + 1,
            '-' | '+' if i == 0 => {}
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
    }
    text[..end].parse().ok()
}

fn leading_integer(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let digits = text
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+')))
        .map(|(_, c)| c)
        .collect::<String>();
    digits.parse().ok()
}

fn brand_ok(value: &str) -> bool {
    (2..=50).contains(&value.chars().count())
        && value
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c.is_whitespace() || c == '-')
}

fn model_ok(value: &str) -> bool {
    (1..=30).contains(&value.chars().count())
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || c == '-' || c == '.')
}

fn length_ok(value: &str) -> bool {
    leading_number(value).is_some_and(|n| n > 0.0 && n < 1000.0)
}

fn engine_ok(value: &str) -> bool {
    (3..=100).contains(&value.chars().count())
}

fn price_ok(value: &str) -> bool {
    let digits = value.chars().filter(char::is_ascii_digit).collect::<String>();
    digits
        .parse::<u64>()
        .is_ok_and(|n| n > 0 && n < 100_000_000)
}

fn hull_material_ok(value: &str) -> bool {
    let lower = value.to_lowercase();
    KNOWN_HULL_MATERIALS.iter().any(|m| lower.contains(m))
}

fn count_ok(value: &str) -> bool {
    leading_integer(value).is_some_and(|n| n > 0 && n < 100)
}

/// Shape checks over filled core fields. Blank fields produce no warning.
pub fn shape_warnings(record: &LocalRecord, current_year: i32) -> Vec<String> {
    let year_ok = |value: &str| {
        leading_integer(value)
            .is_some_and(|y| y >= 1900 && y <= i64::from(current_year) + 1)
    };
    let checks: [(&str, &str, &dyn Fn(&str) -> bool); 9] = [
        ("builder", "Brand", &brand_ok),
        ("model", "Model", &model_ok),
        ("loaM", "Length", &length_ok),
        ("make", "Engine", &engine_ok),
        ("askingPrice", "Price", &price_ok),
        ("yearBuilt", "Year", &year_ok),
        ("hullMaterial", "Hull material", &hull_material_ok),
        ("cabins", "Cabins", &count_ok),
        ("berths", "Berths", &count_ok),
    ];

    checks
        .iter()
        .filter(|(field, _, _)| record.is_filled(field))
        .filter(|(field, _, ok)| !ok(record.value(field).trim()))
        .map(|(_, label, _)| format!("{label} format may be incorrect"))
        .collect()
}

pub fn score_at(record: &LocalRecord, current_year: i32) -> Score {
    Score {
        confidence: confidence(record),
        completeness: completeness(record),
        warnings: shape_warnings(record, current_year),
    }
}

pub fn score(record: &LocalRecord) -> Score {
    score_at(record, Utc::now().year())
}

fn labelled_values(record: &LocalRecord, labels: &[(&str, &str)]) -> Vec<String> {
    labels
        .iter()
        .filter(|(field, _)| record.is_filled(field))
        .map(|(field, label)| format!("{label}: {}", record.value(field)))
        .collect()
}

/// `"Label: value"` for anchor, windlass, dinghy and outboard, in that order.
pub fn extract_equipment(record: &LocalRecord) -> Vec<String> {
    labelled_values(record, EQUIPMENT_LABELS)
}

/// `"Label: value"` for heating, galley, fridge and freezer, in that order.
pub fn extract_features(record: &LocalRecord) -> Vec<String> {
    labelled_values(record, FEATURE_LABELS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use yacht_core::FIELD_COUNT;

    fn record(pairs: &[(&str, &str)]) -> LocalRecord {
        let mut r = LocalRecord::new();
        for (k, v) in pairs {
            r.set(k, *v).unwrap();
        }
        r
    }

    #[test]
    fn empty_record_scores_zero() {
        let s = score_at(&LocalRecord::new(), 2026);
        assert_eq!(s.confidence, 0);
        assert_eq!(s.completeness, 0);
        assert!(s.warnings.is_empty());
    }

    #[test]
    fn completeness_rounds_over_all_fields() {
        let r = record(&[("model", "Najad 460")]);
        assert_eq!(completeness(&r), ((100.0 / FIELD_COUNT as f64).round()) as u8);

        let mut full = LocalRecord::new();
        for (i, _) in yacht_core::local_field_names().enumerate() {
            full.set_at(i, "x");
        }
        assert_eq!(completeness(&full), 100);
    }

    #[test]
    fn completeness_is_monotonic() {
        let mut r = LocalRecord::new();
        let mut last = completeness(&r);
        for (i, _) in yacht_core::local_field_names().enumerate() {
            r.set_at(i, "filled");
            let now = completeness(&r);
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn clearing_a_field_never_raises_completeness() {
        let mut r = LocalRecord::new();
        for (i, _) in yacht_core::local_field_names().enumerate() {
            if i % 3 != 1 {
                r.set_at(i, "filled");
            }
        }

        let mut last = completeness(&r);
        for i in (0..yacht_core::local_field_names().count()).rev() {
            r.set_at(i, "");
            let now = completeness(&r);
            assert!(now <= last);
            last = now;
        }
        assert_eq!(last, 0);
    }

    #[test]
    fn confidence_sums_present_weights_and_caps() {
        let r = record(&[("builder", "Najad"), ("model", "460"), ("loaM", "14.12")]);
        assert_eq!(confidence(&r), 70);

        let all = record(&[
            ("builder", "Najad"),
            ("model", "460"),
            ("loaM", "14.12"),
            ("make", "Volvo Penta"),
            ("askingPrice", "€ 275.000"),
            ("yearBuilt", "2004"),
            ("hullMaterial", "GRP"),
            ("cabins", "3"),
            ("berths", "6"),
        ]);
        assert_eq!(confidence(&all), 100);
        assert!(shape_warnings(&all, 2026).is_empty());
    }

    #[test]
    fn whitespace_does_not_count_as_present() {
        let r = record(&[("builder", "   ")]);
        assert_eq!(confidence(&r), 0);
        assert_eq!(completeness(&r), 0);
    }

    #[test]
    fn shape_warnings_do_not_change_confidence() {
        let r = record(&[
            ("builder", "Najad 2000"),
            ("yearBuilt", "1850"),
            ("hullMaterial", "Ferro cement"),
            ("cabins", "0"),
        ]);
        let s = score_at(&r, 2026);
        assert_eq!(s.confidence, 25 + 10 + 10 + 5);
        assert_eq!(
            s.warnings,
            vec![
                "Brand format may be incorrect",
                "Year format may be incorrect",
                "Hull material format may be incorrect",
                "Cabins format may be incorrect",
            ]
        );
    }

    #[test]
    fn year_bound_follows_current_year() {
        let r = record(&[("yearBuilt", "2027")]);
        assert!(shape_warnings(&r, 2026).is_empty());
        assert_eq!(shape_warnings(&r, 2025).len(), 1);
    }

    #[test]
    fn lenient_number_prefixes() {
        assert_eq!(leading_number("14.12 m"), Some(14.12));
        assert_eq!(leading_number("abc"), None);
        assert_eq!(leading_integer("3 (2 double)"), Some(3));
        assert!(price_ok("€ 275.000,-"));
        assert!(!price_ok("on request"));
    }

    #[test]
    fn equipment_and_features_follow_fixed_order() {
        let r = record(&[
            ("outboard", "Mercury 5hp"),
            ("anchor", "Delta 25kg"),
            ("freezer", "Yes"),
            ("heating", "Webasto"),
            ("galley", "  "),
        ]);
        assert_eq!(
            extract_equipment(&r),
            vec!["Anchor: Delta 25kg", "Outboard: Mercury 5hp"]
        );
        assert_eq!(extract_features(&r), vec!["Heating: Webasto", "Freezer: Yes"]);
    }
}
