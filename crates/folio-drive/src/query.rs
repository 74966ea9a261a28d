//! Builders for the Drive `q` search language
//!
//! Drive queries are boolean expressions over item fields, for example
//! `'abc' in parents and trashed = false`. Every query built here excludes
//! trashed items. String literals are single-quoted; `'` and `\` inside a
//! literal must be backslash-escaped.
//!
//! `name contains` is case-sensitive on the provider side, so name filters
//! are expanded into one OR-ed clause per case variant and then filtered
//! again locally by the caller.

use folio_core::domain::RemoteParent;
use folio_core::ports::{case_variants, ListOrder};

/// Media type Drive uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Escapes a value for use inside a single-quoted query literal
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Query for the folders under `parent`, optionally filtered by name
///
/// `RemoteParent::Any` drops the parent clause entirely.
pub fn folders_query(parent: &RemoteParent, name_filter: Option<&str>) -> String {
    let mut clauses = vec![
        format!("mimeType = '{FOLDER_MIME_TYPE}'"),
        "trashed = false".to_string(),
    ];

    match parent {
        RemoteParent::Root => clauses.push("'root' in parents".to_string()),
        RemoteParent::Id(id) => clauses.push(format!("'{}' in parents", escape_literal(id.as_str()))),
        RemoteParent::Any => {}
    }

    if let Some(filter) = name_filter {
        clauses.push(name_contains_clause(filter));
    }

    clauses.join(" and ")
}

/// Query for the non-folder files directly under `parent`
pub fn files_query(parent: &str, mime_filter: Option<&str>) -> String {
    let mut clauses = vec![
        format!("'{}' in parents", escape_literal(parent)),
        "trashed = false".to_string(),
    ];

    match mime_filter {
        Some(mime) => clauses.push(format!("mimeType = '{}'", escape_literal(mime))),
        None => clauses.push(format!("mimeType != '{FOLDER_MIME_TYPE}'")),
    }

    clauses.join(" and ")
}

/// `(name contains 'a' or name contains 'A' ...)` over the case variants
fn name_contains_clause(filter: &str) -> String {
    let alternatives: Vec<String> = case_variants(filter)
        .iter()
        .map(|variant| format!("name contains '{}'", escape_literal(variant)))
        .collect();
    format!("({})", alternatives.join(" or "))
}

/// Value for the `orderBy` parameter
pub fn order_by(order: ListOrder) -> &'static str {
    match order {
        ListOrder::ModifiedDesc => "modifiedTime desc",
        ListOrder::ModifiedAsc => "modifiedTime",
        ListOrder::Name => "name",
    }
}
