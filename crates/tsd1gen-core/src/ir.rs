use serde::{Deserialize, Serialize};

use crate::options::Options;

/// A table or schema name. Two identifiers are the same object when their names match.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
}

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Identifier { name: name.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(default)]
    pub db_type: String,
    #[serde(default)]
    pub not_null: bool,
    /// Bound to a `sqlc.slice(...)` list parameter.
    #[serde(default)]
    pub is_slice: bool,
    /// Owning table, when the upstream compiler resolved one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<Identifier>,
    /// Set when this entry stands for every column of another table (`sqlc.embed`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_table: Option<Identifier>,
}

impl Column {
    /// The embedded table, ignoring identifiers with an empty name.
    pub fn embed(&self) -> Option<&Identifier> {
        self.embed_table.as_ref().filter(|t| !t.name.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub rel: Identifier,
    #[serde(default)]
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub schemas: Vec<Schema>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    #[serde(rename = ":exec")]
    Exec,
    #[serde(rename = ":one")]
    One,
    #[serde(rename = ":many")]
    Many,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Exec => ":exec",
            Command::One => ":one",
            Command::Many => ":many",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            ":exec" => Some(Command::Exec),
            ":one" => Some(Command::One),
            ":many" => Some(Command::Many),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// 1-based ordinal of the `?N` placeholder this parameter binds to.
    pub number: u32,
    pub column: Column,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub name: String,
    pub cmd: Command,
    pub text: String,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl Query {
    pub fn has_slice_param(&self) -> bool {
        self.params.iter().any(|p| p.column.is_slice)
    }
}

/// A user-supplied `db_type -> code_type` mapping from the sqlc settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeOverride {
    pub db_type: String,
    pub code_type: String,
}

/// Everything one generation run consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub sqlc_version: String,
    /// sha256 of the plugin WASM module, when sqlc runs the generator as WASM.
    #[serde(default)]
    pub plugin_sha256: String,
    #[serde(default)]
    pub options: Options,
    #[serde(default)]
    pub overrides: Vec<TypeOverride>,
    #[serde(default)]
    pub catalog: Catalog,
    #[serde(default)]
    pub queries: Vec<Query>,
}

/// A named output artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub name: String,
    pub contents: String,
}

impl GeneratedFile {
    pub fn sha256_hex(&self) -> String {
        crate::util::sha256_hex(self.contents.as_bytes())
    }
}
