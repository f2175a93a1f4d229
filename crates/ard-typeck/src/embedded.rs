//! Embedded standard-library sources.
//!
//! Some `ard/...` modules ship as `.ard` source compiled by the checker
//! itself on first import, rather than as hard-coded symbol tables. The
//! asset map is fixed at compile time; hard-coded packages win over embedded
//! sources for the same path.

/// The embedded source for a module path, if one ships with the compiler.
pub fn source(path: &str) -> Option<&'static str> {
    match path {
        "ard/string" => Some(include_str!("../assets/string.ard")),
        "ard/list" => Some(include_str!("../assets/list.ard")),
        _ => None,
    }
}
