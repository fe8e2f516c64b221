//! Region codes and unique id derivation.

use crate::error::{Result, TrancheError};
use crate::types::ActiveBundle;

/// Two-letter code for a region slug. Unknown regions map to `XX`.
pub fn region_code(region: &str) -> &'static str {
    match region.trim().to_lowercase().as_str() {
        "chhatrapati-sambhajinagar" => "CS",
        "ahilyanagar" => "AH",
        _ => "XX",
    }
}

fn known_sub_region_code(normalized: &str) -> Option<&'static str> {
    match normalized {
        "paithan" => Some("PA"),
        "phulambri" => Some("PH"),
        "kannad" => Some("KN"),
        "soegaon" => Some("SO"),
        "sillod" => Some("SI"),
        "chhatrapati sambhajinagar" => Some("CS"),
        _ => None,
    }
}

/// Canonical spelling of a sub-region name: trimmed, inner whitespace
/// collapsed, each word capitalised. Counters, active bundles and processed
/// records are keyed by this form, so `paithan` and `Paithan` share one
/// bundle sequence.
pub fn canonical_sub_region(sub_region: &str) -> String {
    sub_region
        .split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Two-letter code for a sub-region (taluka) name. Unknown names use their
/// first two characters, uppercased.
pub fn sub_region_code(sub_region: &str) -> String {
    let normalized = canonical_sub_region(sub_region).to_lowercase();
    match known_sub_region_code(&normalized) {
        Some(code) => code.to_string(),
        None => normalized.chars().take(2).collect::<String>().to_uppercase(),
    }
}

/// Refuse a sub-region whose fallback code is already taken by a known one.
///
/// `Pachod` would otherwise share `PA` with `Paithan` and the two would issue
/// identical unique ids. Returns the code on success.
pub fn check_sub_region_code(sub_region: &str) -> Result<String> {
    let normalized = canonical_sub_region(sub_region).to_lowercase();
    if normalized.is_empty() {
        return Err(TrancheError::InvalidInput("sub-region must not be empty".into()));
    }
    if let Some(code) = known_sub_region_code(&normalized) {
        return Ok(code.to_string());
    }
    let code = sub_region_code(&normalized);
    let clashes = KNOWN_SUB_REGIONS
        .iter()
        .any(|known| known_sub_region_code(known) == Some(code.as_str()));
    if clashes {
        return Err(TrancheError::InvalidInput(format!(
            "sub-region '{}' would reuse the id code {} of a known sub-region",
            sub_region.trim(),
            code
        )));
    }
    Ok(code)
}

const KNOWN_SUB_REGIONS: &[&str] = &[
    "paithan",
    "phulambri",
    "kannad",
    "soegaon",
    "sillod",
    "chhatrapati sambhajinagar",
];

/// Unique id for the record that will consume the next slot of `bundle`.
///
/// The numeric suffix is `(bundle_number - 1) * 250 + count` where `count` is
/// taken before the increment that the same commit performs.
pub fn unique_id(region: &str, bundle: &ActiveBundle) -> String {
    format!(
        "{}{}{}",
        region_code(region),
        sub_region_code(&bundle.sub_region),
        bundle.next_sequence()
    )
}
