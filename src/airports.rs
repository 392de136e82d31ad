// src/airports.rs
//! Airport code → display name lookup, used only for human-readable text.
//!
//! The table ships as `assets/airports.json` and is parsed once on first use.

use once_cell::sync::Lazy;
use std::collections::HashMap;

static AIRPORTS_JSON: &str = include_str!("../assets/airports.json");

static AIRPORTS: Lazy<HashMap<String, String>> = Lazy::new(|| {
    serde_json::from_str(AIRPORTS_JSON).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "airport table unreadable, codes shown as-is");
        HashMap::new()
    })
});

/// Display name for `code`; unknown codes pass through unchanged.
pub fn display_name(code: &str) -> &str {
    let key = code.trim().to_ascii_uppercase();
    match AIRPORTS.get(&key) {
        Some(name) => name.as_str(),
        None => code,
    }
}

/// `上海(虹桥国际机场)(SHA)` style label.
pub fn label(code: &str) -> String {
    format!("{}({})", display_name(code), code)
}

pub fn len() -> usize {
    AIRPORTS.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_resolve() {
        assert_eq!(display_name("SHA"), "上海(虹桥国际机场)");
        assert_eq!(display_name("jiq"), "黔江");
        assert!(len() > 200);
    }

    #[test]
    fn unknown_code_passes_through() {
        assert_eq!(display_name("ZZZ"), "ZZZ");
        assert_eq!(label("ZZZ"), "ZZZ(ZZZ)");
    }
}
