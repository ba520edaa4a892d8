//! UK postcode helpers shared by the loader, geocoder and aggregations
//!
//! A UK postcode is an outward code (`SW1A`, `N2`, `NW10`) followed by a
//! three-character inward code (`1AA`, `9QL`). Input data is inconsistent
//! about spacing and case, so every helper accepts either form.
//!
//! # Examples
//!
//! ```
//! use house_price_heatmap::postcode::{district, outward_code};
//!
//! assert_eq!(outward_code("sw1a 1aa").unwrap(), "SW1A");
//! assert_eq!(outward_code("N29QL").unwrap(), "N2");
//! assert_eq!(district("NW3 2AB").unwrap(), "NW3");
//! ```
use regex::Regex;
use std::sync::OnceLock;

fn district_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^([A-Z]{1,2}\d{1,2}[A-Z]?)").ok())
        .as_ref()
}

/// Uppercase with all whitespace removed. `None` for blank input.
pub fn normalize(postcode: &str) -> Option<String> {
    let compact: String = postcode
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if compact.is_empty() {
        None
    } else {
        Some(compact)
    }
}

fn looks_like_inward(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 3
        && bytes[0].is_ascii_digit()
        && bytes[1].is_ascii_alphabetic()
        && bytes[2].is_ascii_alphabetic()
}

/// Split a compact postcode into outward and inward codes when the tail is
/// a valid inward code.
fn split_compact(compact: &str) -> Option<(&str, &str)> {
    if !(5..=7).contains(&compact.len()) || !compact.is_ascii() {
        return None;
    }
    let (outward, inward) = compact.split_at(compact.len() - 3);
    looks_like_inward(inward).then_some((outward, inward))
}

/// The part of the postcode before the space.
pub fn outward_code(postcode: &str) -> Option<String> {
    let upper = postcode.trim().to_ascii_uppercase();
    let first = upper.split_whitespace().next()?;

    if upper.split_whitespace().count() > 1 {
        return Some(first.to_string());
    }

    match split_compact(first) {
        Some((outward, _)) => Some(outward.to_string()),
        None => Some(first.to_string()),
    }
}

/// Postcode district used for aggregation (e.g. `NW3`, `SW1A`).
pub fn district(postcode: &str) -> Option<String> {
    let outward = outward_code(postcode)?;
    district_pattern()?
        .captures(&outward)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Leading letters of the outward code (`NW3` -> `NW`).
pub fn area_letters(postcode: &str) -> Option<String> {
    let outward = outward_code(postcode)?;
    let letters: String = outward
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();

    if letters.is_empty() {
        None
    } else {
        Some(letters)
    }
}

/// Prefixes to try for coarse location estimation, most specific first.
///
/// ```
/// use house_price_heatmap::postcode::prefix_candidates;
///
/// assert_eq!(prefix_candidates("SW1A 1AA"), vec!["SW1A", "SW1", "SW", "S"]);
/// assert_eq!(prefix_candidates("N10 3AB"), vec!["N10", "N"]);
/// ```
pub fn prefix_candidates(postcode: &str) -> Vec<String> {
    let Some(outward) = outward_code(postcode) else {
        return Vec::new();
    };

    let letters: String = outward
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    let digits: String = outward
        .chars()
        .skip(letters.len())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    let mut candidates = vec![outward.clone()];
    if !letters.is_empty() && !digits.is_empty() {
        candidates.push(format!("{letters}{digits}"));
    }
    if !letters.is_empty() {
        candidates.push(letters.clone());
    }
    if let Some(first) = outward.chars().next() {
        candidates.push(first.to_string());
    }

    let mut seen = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !seen.contains(&candidate) {
            seen.push(candidate);
        }
    }
    seen
}

/// Canonical `"OUT IN"` form, or the compact form when it cannot be split.
pub fn display_form(postcode: &str) -> Option<String> {
    let compact = normalize(postcode)?;
    match split_compact(&compact) {
        Some((outward, inward)) => Some(format!("{outward} {inward}")),
        None => Some(compact),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_spaces_and_uppercases() {
        assert_eq!(normalize(" sw1a 1aa ").unwrap(), "SW1A1AA");
    }

    #[test]
    fn test_normalize_blank() {
        assert!(normalize("   ").is_none());
        assert!(normalize("").is_none());
    }

    #[test]
    fn test_outward_code_spaced() {
        assert_eq!(outward_code("NW10 5AB").unwrap(), "NW10");
    }

    #[test]
    fn test_outward_code_compact() {
        assert_eq!(outward_code("SW1A1AA").unwrap(), "SW1A");
        assert_eq!(outward_code("n29ql").unwrap(), "N2");
    }

    #[test]
    fn test_outward_code_partial_postcode() {
        // Too short to carry an inward code
        assert_eq!(outward_code("E14").unwrap(), "E14");
    }

    #[test]
    fn test_district_keeps_trailing_letter() {
        assert_eq!(district("EC1A 1BB").unwrap(), "EC1A");
        assert_eq!(district("W1A 0AX").unwrap(), "W1A");
    }

    #[test]
    fn test_district_two_digit() {
        assert_eq!(district("SE18 6XY").unwrap(), "SE18");
    }

    #[test]
    fn test_district_compact_input() {
        // Regex over the raw compact string would give "N29Q"
        assert_eq!(district("N29QL").unwrap(), "N2");
    }

    #[test]
    fn test_district_rejects_garbage() {
        assert!(district("12345").is_none());
        assert!(district("").is_none());
    }

    #[test]
    fn test_area_letters() {
        assert_eq!(area_letters("NW3 2AB").unwrap(), "NW");
        assert_eq!(area_letters("E1 6AN").unwrap(), "E");
        assert!(area_letters("123").is_none());
    }

    #[test]
    fn test_prefix_candidates_simple_district() {
        assert_eq!(prefix_candidates("N2 9QL"), vec!["N2", "N"]);
    }

    #[test]
    fn test_prefix_candidates_two_letter_area() {
        assert_eq!(prefix_candidates("NW7 1AA"), vec!["NW7", "NW", "N"]);
    }

    #[test]
    fn test_prefix_candidates_empty() {
        assert!(prefix_candidates("  ").is_empty());
    }

    #[test]
    fn test_display_form() {
        assert_eq!(display_form("n29ql").unwrap(), "N2 9QL");
        assert_eq!(display_form("SW1A 1AA").unwrap(), "SW1A 1AA");
        assert_eq!(display_form("e14").unwrap(), "E14");
    }
}
