//! Name and position normalization used for matching
//!
//! Position families are a small symmetric relation. Each code maps to the
//! set of family labels it belongs to; two codes are related when their
//! label sets intersect.

/// Grouping of position codes treated as interchangeable for matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionFamily {
    Safety,
    DefensiveBack,
    Kicker,
    Punter,
    DefensiveLine,
    Linebacker,
    OffensiveLine,
}

/// How two position codes relate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionMatch {
    Exact,
    Family,
    None,
}

/// Lowercase, strip punctuation, collapse whitespace
pub fn normalize_name(name: &str) -> String {
    let stripped: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// "Josh Allen" -> "Allen, Josh"; single-token names are returned as-is
pub fn last_first(name: &str) -> String {
    let name = name.trim();
    match name.split_once(char::is_whitespace) {
        Some((first, rest)) if !rest.trim().is_empty() => format!("{}, {}", rest.trim(), first),
        _ => name.to_string(),
    }
}

/// Upper-case, trimmed position code
pub fn canonical_position(position: &str) -> String {
    position.trim().to_uppercase()
}

/// Family labels for a canonical position code
pub fn position_families(code: &str) -> &'static [PositionFamily] {
    match code {
        "S" | "SS" | "FS" | "DB" => &[PositionFamily::Safety, PositionFamily::DefensiveBack],
        "CB" => &[PositionFamily::DefensiveBack],
        "PK" | "K" => &[PositionFamily::Kicker],
        "PN" | "P" => &[PositionFamily::Punter],
        "DL" | "DE" | "DT" | "NT" => &[PositionFamily::DefensiveLine],
        "LB" | "OLB" | "ILB" => &[PositionFamily::Linebacker],
        "OL" | "G" | "OT" | "C" | "OG" | "T" => &[PositionFamily::OffensiveLine],
        _ => &[],
    }
}

/// Compare two position codes (both canonicalized first)
pub fn compare_positions(left: &str, right: &str) -> PositionMatch {
    let left = canonical_position(left);
    let right = canonical_position(right);

    if left.is_empty() || right.is_empty() {
        return PositionMatch::None;
    }
    if left == right {
        return PositionMatch::Exact;
    }

    let right_families = position_families(&right);
    if position_families(&left).iter().any(|family| right_families.contains(family)) {
        PositionMatch::Family
    } else {
        PositionMatch::None
    }
}
