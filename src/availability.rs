//! Heuristic "is this domain unregistered" check on WHOIS text.
//!
//! Only registries that answer with "No match for ..." (Verisign and a few
//! others) are recognised. Other registries word their not-found replies
//! differently ("NOT FOUND", "No Data Found", "Status: free", ...) and will be
//! reported as registered. Treat a `false` as "not known to be available".

/// Upper-cased marker for "no such domain".
pub const NO_MATCH_MARKER: &str = "NO MATCH FOR";

/// True when `text` carries the not-found marker, case-insensitively.
///
/// `domain` is accepted for call-site symmetry with the lookup API and is not
/// inspected.
pub fn is_available_from_text(_domain: &str, text: &str) -> bool {
    text.to_uppercase().contains(NO_MATCH_MARKER)
}
