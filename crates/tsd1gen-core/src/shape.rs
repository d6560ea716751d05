//! Per-query shape decisions.
//!
//! | cmd     | params type | row type | raw row type                  | returns              | primitive result      |
//! |---------|-------------|----------|-------------------------------|----------------------|-----------------------|
//! | `:exec` | >= 1 param  | never    | never                         | `D1Result`           | -                     |
//! | `:one`  | >= 1 param  | always   | renamed column or embed       | `Row \| null`        | `(Raw)Row \| null`    |
//! | `:many` | >= 1 param  | always   | renamed column or embed       | `D1Result<Row>`      | `(Raw)Row`            |
//!
//! Both the declaration and the function-body renderers read from [`QueryPlan`];
//! nothing downstream branches on the command kind to pick types.

use std::collections::BTreeSet;

use anyhow::{Context, Result};

use crate::embed;
use crate::ir::{Command, Query};
use crate::naming;
use crate::schema_index::SchemaIndex;
use crate::slice::{self, SlicePlan};
use crate::typemap::TypeMap;

pub const EXEC_RESULT_TYPE: &str = "D1Result";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ts_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    pub exported: bool,
    pub fields: Vec<Field>,
}

/// How one public row property is built from the raw row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMapping {
    Scalar {
        prop: String,
        raw: String,
    },
    /// A nested model object; pairs are `(property, raw field)`.
    Embed {
        prop: String,
        fields: Vec<(String, String)>,
    },
}

/// The D1 prepared-statement call that runs the query, with its row type argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Primitive {
    First { result: String },
    All { result: String },
    Run,
}

impl Primitive {
    pub fn result_type(&self) -> Option<&str> {
        match self {
            Primitive::First { result } | Primitive::All { result } => Some(result.as_str()),
            Primitive::Run => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryShape {
    pub params: Option<TypeDecl>,
    pub row: Option<TypeDecl>,
    pub raw_row: Option<TypeDecl>,
    /// Value type of the generated `Query<T>`.
    pub return_type: String,
    pub primitive: Primitive,
    /// Empty unless `raw_row` is set.
    pub mapping: Vec<FieldMapping>,
    /// Model types referenced by embeds.
    pub models: BTreeSet<String>,
}

impl QueryShape {
    pub fn needs_raw(&self) -> bool {
        self.raw_row.is_some()
    }
}

/// Everything the emitter needs for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan<'q> {
    pub query: &'q Query,
    /// Query text after embed aliasing.
    pub text: String,
    pub const_name: String,
    pub function_name: String,
    pub shape: QueryShape,
    pub bind_args: Vec<String>,
    pub slices: Option<SlicePlan>,
}

pub struct Resolver<'a> {
    type_map: &'a TypeMap,
    index: &'a SchemaIndex<'a>,
}

impl<'a> Resolver<'a> {
    pub fn new(type_map: &'a TypeMap, index: &'a SchemaIndex<'a>) -> Self {
        Resolver { type_map, index }
    }

    pub fn plan<'q>(&self, query: &'q Query) -> Result<QueryPlan<'q>> {
        let text = embed::rewrite_embeds(self.index, query)
            .with_context(|| format!("rewrite query {}", query.name))?;
        let shape = self
            .shape(query)
            .with_context(|| format!("resolve query {}", query.name))?;
        let slices = slice::plan(query);
        log::debug!(
            "query {} {}: params={} raw={} slices={}",
            query.name,
            query.cmd.as_str(),
            shape.params.is_some(),
            shape.needs_raw(),
            slices.as_ref().map_or(0, |s| s.expansions.len()),
        );
        Ok(QueryPlan {
            query,
            text,
            const_name: naming::const_query_name(query),
            function_name: naming::function_name(query),
            shape,
            bind_args: slice::bind_args(query),
            slices,
        })
    }

    pub fn shape(&self, query: &Query) -> Result<QueryShape> {
        let params = self.params_decl(query);

        let mut models = BTreeSet::new();
        let (row, raw_row, mapping) = match query.cmd {
            Command::Exec => (None, None, Vec::new()),
            Command::One | Command::Many => {
                let (row, needs_raw) = self.row_decl(query, &mut models);
                if needs_raw {
                    let (raw, mapping) = self.raw_row_decl(query)?;
                    (Some(row), Some(raw), mapping)
                } else {
                    (Some(row), None, Vec::new())
                }
            }
        };

        let row_name = naming::row_type_name(query);
        let result_row = raw_row
            .as_ref()
            .map_or_else(|| row_name.clone(), |raw| raw.name.clone());
        let (return_type, primitive) = match query.cmd {
            Command::Exec => (EXEC_RESULT_TYPE.to_string(), Primitive::Run),
            Command::One => (
                format!("{row_name} | null"),
                Primitive::First {
                    result: format!("{result_row} | null"),
                },
            ),
            Command::Many => (
                format!("D1Result<{row_name}>"),
                Primitive::All { result: result_row },
            ),
        };

        Ok(QueryShape {
            params,
            row,
            raw_row,
            return_type,
            primitive,
            mapping,
            models,
        })
    }

    fn params_decl(&self, query: &Query) -> Option<TypeDecl> {
        if query.params.is_empty() {
            return None;
        }
        let fields = query
            .params
            .iter()
            .map(|p| {
                let c = &p.column;
                let mut ts_type = self.type_map.resolve(c);
                // sqlc.narg makes a param nullable; otherwise follow the schema column.
                if self.index.widens_to_nullable(c) {
                    ts_type.push_str(" | null");
                }
                Field {
                    name: naming::property_name(c),
                    ts_type,
                }
            })
            .collect();
        Some(TypeDecl {
            name: naming::params_type_name(query),
            exported: true,
            fields,
        })
    }

    /// Public row type, and whether a raw row type is needed to build it.
    fn row_decl(&self, query: &Query, models: &mut BTreeSet<String>) -> (TypeDecl, bool) {
        let mut needs_raw = false;
        let mut fields = Vec::with_capacity(query.columns.len());
        for c in &query.columns {
            let name = naming::property_name(c);
            if name != c.name {
                needs_raw = true;
            }
            let ts_type = match c.embed() {
                Some(table) => {
                    needs_raw = true;
                    let model = naming::model_type_name(table);
                    models.insert(model.clone());
                    model
                }
                None => self.type_map.resolve(c),
            };
            fields.push(Field { name, ts_type });
        }
        let decl = TypeDecl {
            name: naming::row_type_name(query),
            exported: true,
            fields,
        };
        (decl, needs_raw)
    }

    fn raw_row_decl(&self, query: &Query) -> Result<(TypeDecl, Vec<FieldMapping>)> {
        let mut fields = Vec::new();
        let mut mapping = Vec::with_capacity(query.columns.len());
        for c in &query.columns {
            let prop = naming::property_name(c);
            match c.embed() {
                Some(embed) => {
                    let table = embed::embedded_table(self.index, query, embed)?;
                    let mut nested = Vec::with_capacity(table.columns.len());
                    for ec in &table.columns {
                        let raw = naming::embed_column_name(embed, ec);
                        fields.push(Field {
                            name: raw.clone(),
                            ts_type: self.type_map.resolve(ec),
                        });
                        nested.push((naming::property_name(ec), raw));
                    }
                    mapping.push(FieldMapping::Embed {
                        prop,
                        fields: nested,
                    });
                }
                None => {
                    fields.push(Field {
                        name: c.name.clone(),
                        ts_type: self.type_map.resolve(c),
                    });
                    mapping.push(FieldMapping::Scalar {
                        prop,
                        raw: c.name.clone(),
                    });
                }
            }
        }
        let decl = TypeDecl {
            name: naming::raw_row_type_name(query),
            exported: false,
            fields,
        };
        Ok((decl, mapping))
    }
}
