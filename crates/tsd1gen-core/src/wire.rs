//! The subset of sqlc's `plugin/codegen.proto` this generator reads and writes.
//!
//! Field tags follow the upstream protocol; unknown fields are skipped by prost.

use anyhow::{Context, Result};
use prost::Message;

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::ir;
use crate::options::Options;

#[derive(Clone, PartialEq, Message)]
pub struct File {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(bytes = "vec", tag = "2")]
    pub contents: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Override {
    #[prost(string, tag = "1")]
    pub code_type: String,
    #[prost(string, tag = "3")]
    pub db_type: String,
    #[prost(bool, tag = "5")]
    pub nullable: bool,
    #[prost(string, tag = "6")]
    pub column: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct Wasm {
    #[prost(string, tag = "1")]
    pub url: String,
    #[prost(string, tag = "2")]
    pub sha256: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct Codegen {
    #[prost(string, tag = "1")]
    pub out: String,
    #[prost(string, tag = "2")]
    pub plugin: String,
    #[prost(bytes = "vec", tag = "3")]
    pub options: Vec<u8>,
    #[prost(message, optional, tag = "6")]
    pub wasm: Option<Wasm>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Settings {
    #[prost(string, tag = "1")]
    pub version: String,
    #[prost(string, tag = "2")]
    pub engine: String,
    #[prost(message, repeated, tag = "6")]
    pub overrides: Vec<Override>,
    #[prost(message, optional, tag = "12")]
    pub codegen: Option<Codegen>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Identifier {
    #[prost(string, tag = "1")]
    pub catalog: String,
    #[prost(string, tag = "2")]
    pub schema: String,
    #[prost(string, tag = "3")]
    pub name: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct Column {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(bool, tag = "3")]
    pub not_null: bool,
    #[prost(bool, tag = "4")]
    pub is_array: bool,
    #[prost(message, optional, tag = "10")]
    pub table: Option<Identifier>,
    #[prost(message, optional, tag = "12")]
    pub r#type: Option<Identifier>,
    #[prost(bool, tag = "13")]
    pub is_sqlc_slice: bool,
    #[prost(message, optional, tag = "14")]
    pub embed_table: Option<Identifier>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Table {
    #[prost(message, optional, tag = "1")]
    pub rel: Option<Identifier>,
    #[prost(message, repeated, tag = "2")]
    pub columns: Vec<Column>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Schema {
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(message, repeated, tag = "3")]
    pub tables: Vec<Table>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Catalog {
    #[prost(string, tag = "2")]
    pub default_schema: String,
    #[prost(message, repeated, tag = "4")]
    pub schemas: Vec<Schema>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Parameter {
    #[prost(int32, tag = "1")]
    pub number: i32,
    #[prost(message, optional, tag = "2")]
    pub column: Option<Column>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Query {
    #[prost(string, tag = "1")]
    pub text: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub cmd: String,
    #[prost(message, repeated, tag = "4")]
    pub columns: Vec<Column>,
    #[prost(message, repeated, tag = "5")]
    pub params: Vec<Parameter>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CodeGenRequest {
    #[prost(message, optional, tag = "1")]
    pub settings: Option<Settings>,
    #[prost(message, optional, tag = "2")]
    pub catalog: Option<Catalog>,
    #[prost(message, repeated, tag = "3")]
    pub queries: Vec<Query>,
    #[prost(string, tag = "4")]
    pub sqlc_version: String,
    #[prost(bytes = "vec", tag = "5")]
    pub plugin_options: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CodeGenResponse {
    #[prost(message, repeated, tag = "1")]
    pub files: Vec<File>,
}

/// Decodes a `CodeGenRequest` and converts it into the generator IR, parsing
/// plugin options on the way.
pub fn decode_request(bytes: &[u8]) -> Result<ir::Request> {
    let req = CodeGenRequest::decode(bytes).map_err(|e| {
        Diagnostic::error(
            DiagnosticCode::TSD0001RequestDecode,
            format!("CodeGenRequest: {e}"),
        )
    })?;
    to_ir(req)
}

pub fn encode_response(files: &[ir::GeneratedFile]) -> Vec<u8> {
    CodeGenResponse {
        files: files
            .iter()
            .map(|f| File {
                name: f.name.clone(),
                contents: f.contents.clone().into_bytes(),
            })
            .collect(),
    }
    .encode_to_vec()
}

pub fn to_ir(req: CodeGenRequest) -> Result<ir::Request> {
    let settings = req.settings.unwrap_or_default();
    let codegen = settings.codegen.unwrap_or_default();

    // Older sqlc releases only fill `plugin_options`; newer ones also mirror it in codegen.
    let raw_options = if req.plugin_options.is_empty() {
        codegen.options.as_slice()
    } else {
        req.plugin_options.as_slice()
    };
    let options = Options::parse(raw_options).context("parse plugin options")?;

    let overrides = settings
        .overrides
        .into_iter()
        .map(|o| ir::TypeOverride {
            db_type: o.db_type,
            code_type: o.code_type,
        })
        .collect();

    let catalog = req.catalog.unwrap_or_default();
    let schemas = catalog
        .schemas
        .into_iter()
        .map(|s| ir::Schema {
            name: s.name,
            tables: s
                .tables
                .into_iter()
                .map(|t| ir::Table {
                    rel: identifier(t.rel).unwrap_or_default(),
                    columns: t.columns.into_iter().map(column).collect(),
                })
                .collect(),
        })
        .collect();

    let queries = req
        .queries
        .into_iter()
        .map(query)
        .collect::<Result<Vec<_>>>()?;

    Ok(ir::Request {
        sqlc_version: req.sqlc_version,
        plugin_sha256: codegen.wasm.map(|w| w.sha256).unwrap_or_default(),
        options,
        overrides,
        catalog: ir::Catalog { schemas },
        queries,
    })
}

fn identifier(id: Option<Identifier>) -> Option<ir::Identifier> {
    id.filter(|i| !i.name.is_empty())
        .map(|i| ir::Identifier::new(i.name))
}

fn column(c: Column) -> ir::Column {
    ir::Column {
        name: c.name,
        db_type: c.r#type.map(|t| t.name).unwrap_or_default(),
        not_null: c.not_null,
        is_slice: c.is_sqlc_slice,
        table: identifier(c.table),
        embed_table: identifier(c.embed_table),
    }
}

fn query(q: Query) -> Result<ir::Query> {
    let cmd = ir::Command::parse(&q.cmd).ok_or_else(|| {
        Diagnostic::error(
            DiagnosticCode::TSD0002UnknownCommand,
            format!("query {:?} has command {:?}", q.name, q.cmd),
        )
    })?;
    let params = q
        .params
        .into_iter()
        .map(|p| -> Result<ir::Param> {
            let number = u32::try_from(p.number).map_err(|_| {
                Diagnostic::error(
                    DiagnosticCode::TSD0001RequestDecode,
                    format!("query {:?} has parameter number {}", q.name, p.number),
                )
            })?;
            Ok(ir::Param {
                number,
                column: p.column.map(column).unwrap_or_default(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(ir::Query {
        name: q.name,
        cmd,
        text: q.text,
        params,
        columns: q.columns.into_iter().map(column).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::find_diagnostic;

    fn id(name: &str) -> Option<Identifier> {
        Some(Identifier {
            name: name.to_string(),
            ..Identifier::default()
        })
    }

    fn request() -> CodeGenRequest {
        CodeGenRequest {
            settings: Some(Settings {
                engine: "sqlite".to_string(),
                overrides: vec![Override {
                    code_type: "bigint".to_string(),
                    db_type: "integer".to_string(),
                    ..Override::default()
                }],
                codegen: Some(Codegen {
                    wasm: Some(Wasm {
                        sha256: "feed".to_string(),
                        ..Wasm::default()
                    }),
                    ..Codegen::default()
                }),
                ..Settings::default()
            }),
            catalog: Some(Catalog {
                schemas: vec![Schema {
                    name: "main".to_string(),
                    tables: vec![Table {
                        rel: id("users"),
                        columns: vec![Column {
                            name: "id".to_string(),
                            not_null: true,
                            r#type: id("INTEGER"),
                            ..Column::default()
                        }],
                    }],
                }],
                ..Catalog::default()
            }),
            queries: vec![Query {
                text: "SELECT id FROM users WHERE id IN (/*SLICE:ids*/?)".to_string(),
                name: "ListUsers".to_string(),
                cmd: ":many".to_string(),
                columns: vec![Column {
                    name: "id".to_string(),
                    not_null: true,
                    r#type: id("INTEGER"),
                    table: id("users"),
                    ..Column::default()
                }],
                params: vec![Parameter {
                    number: 1,
                    column: Some(Column {
                        name: "ids".to_string(),
                        not_null: true,
                        is_sqlc_slice: true,
                        r#type: id("INTEGER"),
                        ..Column::default()
                    }),
                }],
            }],
            sqlc_version: "v1.25.0".to_string(),
            plugin_options: br#"{"workers-types":"2023-07-01"}"#.to_vec(),
        }
    }

    #[test]
    fn decodes_into_ir() {
        let bytes = request().encode_to_vec();
        let req = decode_request(&bytes).unwrap();
        assert_eq!(req.sqlc_version, "v1.25.0");
        assert_eq!(req.plugin_sha256, "feed");
        assert_eq!(req.options.workers_types, "2023-07-01");
        assert_eq!(req.overrides[0].db_type, "integer");
        let table = &req.catalog.schemas[0].tables[0];
        assert_eq!(table.rel, ir::Identifier::new("users"));
        assert_eq!(table.columns[0].db_type, "INTEGER");

        let q = &req.queries[0];
        assert_eq!(q.cmd, ir::Command::Many);
        assert_eq!(q.params[0].number, 1);
        assert!(q.params[0].column.is_slice);
        assert_eq!(q.columns[0].table, Some(ir::Identifier::new("users")));
        assert_eq!(q.columns[0].embed_table, None);
    }

    #[test]
    fn codegen_options_are_a_fallback() {
        let mut r = request();
        r.plugin_options.clear();
        if let Some(codegen) = r.settings.as_mut().and_then(|s| s.codegen.as_mut()) {
            codegen.options = br#"{"workers-types-v3":"1"}"#.to_vec();
        }
        let req = decode_request(&r.encode_to_vec()).unwrap();
        assert!(req.options.workers_types_v3);
    }

    #[test]
    fn unknown_command_is_rejected() {
        let mut r = request();
        r.queries[0].cmd = ":copyfrom".to_string();
        let err = decode_request(&r.encode_to_vec()).unwrap_err();
        let d = find_diagnostic(&err).expect("diagnostic");
        assert_eq!(d.code, DiagnosticCode::TSD0002UnknownCommand);
        assert!(d.message.contains("ListUsers"));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode_request(&[0xff, 0xff, 0xff]).unwrap_err();
        let d = find_diagnostic(&err).expect("diagnostic");
        assert_eq!(d.code, DiagnosticCode::TSD0001RequestDecode);
    }

    #[test]
    fn response_round_trips_file_names() {
        let files = vec![ir::GeneratedFile {
            name: "models.ts".to_string(),
            contents: "export {};\n".to_string(),
        }];
        let resp = CodeGenResponse::decode(encode_response(&files).as_slice()).unwrap();
        assert_eq!(resp.files.len(), 1);
        assert_eq!(resp.files[0].name, "models.ts");
        assert_eq!(resp.files[0].contents, b"export {};\n");
    }
}
