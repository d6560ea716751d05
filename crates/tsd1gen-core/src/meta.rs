use tsd1_contracts::GENERATOR_NAME;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Source revision baked in at build time.
pub fn revision() -> &'static str {
    option_env!("TSD1_REVISION").unwrap_or("HEAD")
}

/// Provenance comment placed at the top of every generated file.
pub fn banner(sqlc_version: &str, plugin_sha256: &str) -> String {
    let rev = if plugin_sha256.is_empty() {
        revision()
    } else {
        plugin_sha256
    };
    format!(
        "// Code generated by {GENERATOR_NAME}. DO NOT EDIT.\n\
         // versions:\n\
         //   sqlc {sqlc_version}\n\
         //   {GENERATOR_NAME} {VERSION}@{rev}\n"
    )
}
