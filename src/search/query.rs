//! SQL for the search primitives / 搜索语句构建

use crate::models::{ContentKind, TaxonomyKind};

/// Normalized search input.
///
/// Lowercasing happens here with Unicode rules; stored names and titles are
/// lowercased the same way at write time, so SQLite only compares bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    needle: String,
}

impl SearchQuery {
    pub fn new(text: &str) -> Self {
        Self { needle: text.trim().to_lowercase() }
    }

    pub fn needle(&self) -> &str {
        &self.needle
    }

    /// The empty string is a substring of every title; blank input counts as empty
    pub fn matches_all(&self) -> bool {
        self.needle.is_empty()
    }
}

/// Distinct ids of `kind` whose title, tag or keyword contains the bound needle.
///
/// Tags and keywords are outer-joined so items without any still match on title.
/// Returns the statement and how many times the needle must be bound.
pub fn substring_search_sql(kind: ContentKind) -> (String, usize) {
    let table = kind.table();
    let item_kind = kind.as_str();
    let tag = TaxonomyKind::Tag;
    let keyword = TaxonomyKind::Keyword;

    let mut clauses: Vec<String> = kind
        .title_columns()
        .iter()
        .map(|column| format!("instr(i.{column}, ?) > 0"))
        .collect();
    clauses.push("instr(t.name_lower, ?) > 0".to_string());
    clauses.push("instr(k.name_lower, ?) > 0".to_string());
    let binds = clauses.len();

    let sql = format!(
        "SELECT DISTINCT i.id FROM {table} i \
         LEFT JOIN {tag_link} it ON it.item_kind = '{item_kind}' AND it.item_id = i.id \
         LEFT JOIN {tag_table} t ON t.id = it.term_id \
         LEFT JOIN {kw_link} ik ON ik.item_kind = '{item_kind}' AND ik.item_id = i.id \
         LEFT JOIN {kw_table} k ON k.id = ik.term_id \
         WHERE {predicate} \
         ORDER BY i.id",
        tag_link = tag.link_table(),
        tag_table = tag.table(),
        kw_link = keyword.link_table(),
        kw_table = keyword.table(),
        predicate = clauses.join(" OR "),
    );

    (sql, binds)
}

/// Every id of `kind`, used when the needle is empty
pub fn all_ids_sql(kind: ContentKind) -> String {
    format!("SELECT id FROM {} ORDER BY id", kind.table())
}

/// Distinct ids of `kind` linked to a term whose lowercased name equals the bound value.
///
/// Binds: language code ('' for language-neutral links), then the lowercased term.
pub fn exact_term_sql(kind: ContentKind, taxonomy: TaxonomyKind) -> String {
    format!(
        "SELECT DISTINCT l.item_id FROM {link} l \
         JOIN {terms} t ON t.id = l.term_id \
         JOIN {items} i ON i.id = l.item_id \
         WHERE l.item_kind = '{item_kind}' AND l.language = ? AND t.name_lower = ? \
         ORDER BY l.item_id",
        link = taxonomy.link_table(),
        terms = taxonomy.table(),
        items = kind.table(),
        item_kind = kind.as_str(),
    )
}
