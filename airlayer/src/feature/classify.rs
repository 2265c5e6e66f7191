//! Heuristic zone-kind classification from free-text identifiers.
//!
//! The remote layers carry zone names like "LED-P15 MADRID PALACIO" or
//! "CTR CUATRO VIENTOS" whose authoritative type field is unreliable, so
//! the kind is inferred by string matching. The result is best-effort and
//! feeds display styling only; callers must never filter on it.

use std::sync::OnceLock;

use regex::Regex;

use super::ZoneKind;

struct KindPatterns {
    prohibited: Regex,
    restricted: Regex,
    danger: Regex,
    ctr: Regex,
    atz: Regex,
    tma: Regex,
}

fn patterns() -> &'static KindPatterns {
    static PATTERNS: OnceLock<KindPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| KindPatterns {
        // Spanish AIP identifiers: LED-P / LED-R / LED-D followed by digits.
        prohibited: Regex::new(r"(?i)\bLE[DPR]?-?P\d|prohib").unwrap(),
        restricted: Regex::new(r"(?i)\bLE[DPR]?-?R\d|restring|restrict").unwrap(),
        danger: Regex::new(r"(?i)\bLE[DPR]?-?D\d|danger|peligro").unwrap(),
        ctr: Regex::new(r"(?i)\bCTR\b").unwrap(),
        atz: Regex::new(r"(?i)\bATZ\b").unwrap(),
        tma: Regex::new(r"(?i)\bTMA\b").unwrap(),
    })
}

/// Guesses a zone kind from a free-text zone title.
///
/// Match order mirrors operational severity: prohibited, then restricted,
/// then danger, then controlled-airspace designators. Unmatched titles
/// fall through to `Other`.
pub fn classify_zone(title: &str) -> ZoneKind {
    let p = patterns();
    if p.prohibited.is_match(title) {
        ZoneKind::Prohibited
    } else if p.restricted.is_match(title) {
        ZoneKind::Restricted
    } else if p.danger.is_match(title) {
        ZoneKind::Danger
    } else if p.ctr.is_match(title) {
        ZoneKind::Ctr
    } else if p.atz.is_match(title) {
        ZoneKind::Atz
    } else if p.tma.is_match(title) {
        ZoneKind::Tma
    } else {
        ZoneKind::Other
    }
}
