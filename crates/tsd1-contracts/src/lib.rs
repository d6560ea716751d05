//! Shared, version-pinned identifiers.
//!
//! These constants are the single source of truth for names that appear in the
//! generated artifacts and in the plugin protocol.

pub const GENERATOR_NAME: &str = "sqlc-gen-ts-d1";

pub const MODELS_FILE_NAME: &str = "models.ts";
pub const QUERIER_FILE_NAME: &str = "querier.ts";

pub const WORKERS_TYPES_PACKAGE: &str = "@cloudflare/workers-types";
pub const DEFAULT_WORKERS_TYPES_VERSION: &str = "2022-11-30";

pub const PLUGIN_GENERATE_METHOD: &str = "/plugin.CodegenService/Generate";
