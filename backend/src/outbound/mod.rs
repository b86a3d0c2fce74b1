//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **firestore**: document store REST API (reports, profiles, UIN index)
//! - **identity**: password sign-in and credential claims
//! - **local_store**: JSON file fallback for report writes
//! - **memory**: in-process store for development and tests
//! - **uin_http**: client-side lookup against a running server
//!
//! Adapters translate between domain types and wire representations. They
//! contain no business logic.

pub mod firestore;
pub mod identity;
pub mod local_store;
pub mod memory;
pub mod uin_http;

/// Collapse whitespace and cap an upstream error body for messages and logs.
pub(crate) fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
