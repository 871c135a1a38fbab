// ABOUTME: Selector-driven extraction: compiled-query cache, typed accessors and field descriptors.
// ABOUTME: Page-specific parsers build every record field on top of these three pieces.

//! Extraction module.
//!
//! Submodules:
//! - `compiled`: selector syntax, compiled queries and the query cache.
//! - `select`: the typed [`Accessor`](select::Accessor) layer.
//! - `fields`: declarative required/optional field descriptors.

pub mod compiled;
pub mod fields;
pub mod select;
