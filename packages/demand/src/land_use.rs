//! Land-use weights for the demand index.
//!
//! Numeric codes are scored by their leading digit. Descriptive labels are
//! scored by case-insensitive keyword detection, since extracts spell the
//! same category many ways.

/// Weight for a code or label outside every known category.
pub const DEFAULT_WEIGHT: f64 = 0.5;

/// Scores a land-use code.
#[must_use]
pub fn land_use_score(land_use: Option<&str>) -> f64 {
    let Some(code) = land_use.map(str::trim) else {
        return DEFAULT_WEIGHT;
    };

    if !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit()) {
        return match code.as_bytes()[0] {
            b'1' => 1.0,
            b'2' => 0.85,
            b'3' => 0.6,
            b'4' => 0.7,
            _ => DEFAULT_WEIGHT,
        };
    }

    let lower = code.to_lowercase();
    if lower.contains("resid") {
        return 1.0;
    }
    if lower.contains("mix") {
        return 0.85;
    }
    if contains_any(&lower, &["comm", "office"]) {
        return 0.6;
    }
    if lower.contains("ind") {
        return 0.7;
    }
    DEFAULT_WEIGHT
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
