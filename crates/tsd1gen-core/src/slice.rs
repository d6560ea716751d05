//! `sqlc.slice(x)` support.
//!
//! SQLite cannot bind an array, so sqlc writes the slice as a single marker
//! placeholder `(/*SLICE:x*/?)` and numbers it as if it were one parameter. The
//! generated function rewrites the marker at call time: the first element keeps the
//! ordinal sqlc reserved and the remaining elements get fresh ordinals past the end
//! of the bound-value list, so no other parameter is renumbered.
//!
//! ```text
//! compiled:  SELECT id FROM foo WHERE a = ?1 AND id IN (/*SLICE:ids*/?) AND b = ?3
//! runtime:   SELECT id FROM foo WHERE a = ?1 AND id IN (?2, ?4, ?5) AND b = ?3   (ids.len() == 3)
//! ```

use crate::ir::Query;
use crate::naming;

/// Runtime helper emitted once at the end of the querier when any query has a slice.
pub const EXPANDED_PARAM_HELPER: &str = r#"function expandedParam(n: number, len: number, last: number): string {
  const params: number[] = [n];
  for (let i = 1; i < len; i++) {
    params.push(last + i);
  }
  return "(" + params.map((x: number) => "?" + x).join(", ") + ")";
}
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceExpansion {
    /// Marker text sqlc left in the query.
    pub marker: String,
    /// Ordinal reserved for the first element.
    pub number: u32,
    /// Property of the params object holding the list.
    pub prop: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlicePlan {
    /// Initial bound values, one per declared parameter.
    pub seed_args: Vec<String>,
    /// In declared-parameter order.
    pub expansions: Vec<SliceExpansion>,
}

pub fn slice_marker(column_name: &str) -> String {
    format!("(/*SLICE:{column_name}*/?)")
}

/// Bound-value expressions in parameter order; a slice contributes its first element.
pub fn bind_args(query: &Query) -> Vec<String> {
    query
        .params
        .iter()
        .map(|p| {
            let prop = naming::property_name(&p.column);
            if p.column.is_slice {
                format!("args.{prop}[0]")
            } else {
                format!("args.{prop}")
            }
        })
        .collect()
}

/// The expansion plan, or `None` when the query has no slice parameter.
pub fn plan(query: &Query) -> Option<SlicePlan> {
    if !query.has_slice_param() {
        return None;
    }
    let expansions = query
        .params
        .iter()
        .filter(|p| p.column.is_slice)
        .map(|p| SliceExpansion {
            marker: slice_marker(&p.column.name),
            number: p.number,
            prop: naming::property_name(&p.column),
        })
        .collect();
    Some(SlicePlan {
        seed_args: bind_args(query),
        expansions,
    })
}
