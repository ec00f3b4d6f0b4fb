//! Identifier formats accepted by PingOne.

use regex::Regex;
use std::sync::LazyLock;

/// Pattern (unanchored) of a PingOne resource identifier.
pub const P1_RESOURCE_ID: &str = r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}";

/// Pattern (unanchored) of a DaVinci resource identifier.
pub const P1_DV_RESOURCE_ID: &str = r"[a-f0-9]{32}";

static P1_RESOURCE_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{}$", P1_RESOURCE_ID)).expect("P1_RESOURCE_ID is a valid regex pattern")
});

static P1_DV_RESOURCE_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{}$", P1_DV_RESOURCE_ID))
        .expect("P1_DV_RESOURCE_ID is a valid regex pattern")
});

/// Whether `value` is a PingOne resource identifier.
pub fn is_resource_id(value: &str) -> bool {
    P1_RESOURCE_ID_REGEX.is_match(value)
}

/// Whether `value` is a DaVinci resource identifier.
pub fn is_davinci_id(value: &str) -> bool {
    P1_DV_RESOURCE_ID_REGEX.is_match(value)
}
