//! `sqlc.embed(t)` support.
//!
//! sqlc expands an embed into `t.a, t.b, t.c` in the query text. Some D1 runtimes
//! drop duplicated column names, so every embedded column is given a unique alias:
//! `t.a AS t_a, t.b AS t_b, t.c AS t_c`. The whole list is replaced in one go so
//! that a short column name can never match inside a longer one.

use std::collections::BTreeSet;

use anyhow::Result;

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::ir::{Column, Identifier, Query, Table};
use crate::naming;
use crate::schema_index::SchemaIndex;

/// The catalog table an embed column stands for.
pub fn embedded_table<'a>(
    index: &SchemaIndex<'a>,
    query: &Query,
    table: &Identifier,
) -> Result<&'a Table> {
    index.find_table(table).ok_or_else(|| {
        Diagnostic::error(
            DiagnosticCode::TSD0200EmbedTableMissing,
            format!(
                "query {:?} embeds table {:?}, which is not in the catalog",
                query.name, table.name
            ),
        )
        .into()
    })
}

/// Query text with every embedded column list aliased.
pub fn rewrite_embeds(index: &SchemaIndex<'_>, query: &Query) -> Result<String> {
    let mut text = query.text.clone();
    let mut done: BTreeSet<&str> = BTreeSet::new();

    for embed in query.columns.iter().filter_map(Column::embed) {
        if !done.insert(embed.name.as_str()) {
            continue;
        }
        let table = embedded_table(index, query, embed)?;
        if table.columns.is_empty() {
            continue;
        }

        let mut olds = Vec::with_capacity(table.columns.len());
        let mut news = Vec::with_capacity(table.columns.len());
        for c in &table.columns {
            let from = format!("{}.{}", embed.name, c.name);
            let to = format!("{from} AS {}", naming::embed_column_name(embed, c));
            olds.push(from);
            news.push(to);
        }
        let old = olds.join(", ");
        let Some(at) = text.find(&old) else {
            return Err(Diagnostic::error(
                DiagnosticCode::TSD0201EmbedColumnsNotFound,
                format!(
                    "query {:?}: expected column list {old:?} for embedded table {:?}",
                    query.name, embed.name
                ),
            )
            .into());
        };
        text.replace_range(at..at + old.len(), &news.join(", "));
        log::debug!("query {}: aliased embedded table {}", query.name, embed.name);
    }

    Ok(text)
}
