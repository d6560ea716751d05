//! Code generation engine for `sqlc-gen-ts-d1`.
//!
//! Turns a resolved sqlc request (catalog + queries) into `models.ts` and
//! `querier.ts` for the Cloudflare D1 client. Generation is a pure function of the
//! request: no I/O, and identical input yields byte-identical output.

use std::collections::BTreeSet;

use anyhow::Result;
use tsd1_contracts::{MODELS_FILE_NAME, QUERIER_FILE_NAME};

pub mod diagnostics;
pub mod embed;
pub mod ir;
pub mod meta;
pub mod naming;
pub mod options;
pub mod schema_index;
pub mod shape;
pub mod slice;
pub mod ts_emit;
pub mod typemap;
pub mod wire;

mod util;

pub use ir::{GeneratedFile, Request};
pub use util::sha256_hex;

use schema_index::SchemaIndex;
use shape::Resolver;
use typemap::TypeMap;

/// Generates `models.ts` and `querier.ts`. Fails as a whole; never returns partial output.
pub fn generate(req: &Request) -> Result<Vec<GeneratedFile>> {
    let type_map = TypeMap::new(&req.overrides);
    warn_unknown_types(req, &type_map);
    let index = SchemaIndex::build(&req.catalog);
    let resolver = Resolver::new(&type_map, &index);

    let plans = req
        .queries
        .iter()
        .map(|q| resolver.plan(q))
        .collect::<Result<Vec<_>>>()?;

    let banner = meta::banner(&req.sqlc_version, &req.plugin_sha256);
    let files = vec![
        GeneratedFile {
            name: MODELS_FILE_NAME.to_string(),
            contents: ts_emit::emit_models(&req.catalog, &type_map, &banner),
        },
        GeneratedFile {
            name: QUERIER_FILE_NAME.to_string(),
            contents: ts_emit::emit_querier(&plans, &req.options, &banner),
        },
    ];
    for f in &files {
        log::info!(
            "generated {} ({} bytes, sha256 {})",
            f.name,
            f.contents.len(),
            f.sha256_hex()
        );
    }
    Ok(files)
}

/// Logs each database type that falls back to the permissive type, once.
fn warn_unknown_types(req: &Request, type_map: &TypeMap) {
    let catalog_columns = req
        .catalog
        .schemas
        .iter()
        .flat_map(|s| &s.tables)
        .flat_map(|t| &t.columns);
    let query_columns = req.queries.iter().flat_map(|q| {
        q.params
            .iter()
            .map(|p| &p.column)
            .chain(q.columns.iter().filter(|c| c.embed().is_none()))
    });

    let unknown: BTreeSet<&str> = catalog_columns
        .chain(query_columns)
        .map(|c| c.db_type.as_str())
        .filter(|t| !type_map.is_known(t))
        .collect();
    for t in unknown {
        log::warn!(
            "no TypeScript type for database type {t:?}; using {:?}",
            typemap::FALLBACK_TS_TYPE
        );
    }
}
