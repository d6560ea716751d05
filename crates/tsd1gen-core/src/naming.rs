//! Naming policy for generated TypeScript identifiers.
//!
//! Every function here is pure. Database names are snake_case; generated type
//! names are UpperCamel and properties, functions and constants are lowerCamel.

use crate::ir::{Column, Identifier, Query};

/// `foo_bar_baz` -> `FooBarBaz`. Empty segments are skipped; the rest of each
/// segment keeps its original casing.
pub fn upper_camel(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    for segment in snake.split('_') {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// `foo_bar_baz` -> `fooBarBaz`.
pub fn lower_camel(snake: &str) -> String {
    let upper = upper_camel(snake);
    let mut chars = upper.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn model_type_name(table: &Identifier) -> String {
    upper_camel(&table.name)
}

pub fn property_name(column: &Column) -> String {
    lower_camel(&column.name)
}

pub fn const_query_name(query: &Query) -> String {
    lower_camel(&query.name) + "Query"
}

pub fn params_type_name(query: &Query) -> String {
    format!("{}Params", query.name)
}

pub fn row_type_name(query: &Query) -> String {
    format!("{}Row", query.name)
}

pub fn raw_row_type_name(query: &Query) -> String {
    format!("Raw{}Row", query.name)
}

pub fn function_name(query: &Query) -> String {
    lower_camel(&query.name)
}

/// Alias of an embedded column in the rewritten SQL and in the raw row type.
pub fn embed_column_name(table: &Identifier, column: &Column) -> String {
    format!("{}_{}", table.name, column.name)
}
