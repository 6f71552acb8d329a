//! Search module - title / tag / keyword matching over content items / 搜索模块
//!
//! Two primitives, both returning item ids in ascending order:
//! - `search_ids`: case-insensitive substring match on title OR any tag OR any keyword
//! - `find_ids_by_term`: case-insensitive exact match on one taxonomy set (optionally per language)
//!
//! Loading the items themselves is left to the content stores.

pub mod engine;
pub mod query;

pub use engine::{find_ids_by_term, search_ids};
pub use query::SearchQuery;
