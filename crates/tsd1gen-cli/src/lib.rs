use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tsd1_contracts::PLUGIN_GENERATE_METHOD;
use tsd1gen_core::diagnostics::{Diagnostic, DiagnosticCode};
use tsd1gen_core::{sha256_hex, wire, GeneratedFile, Request};

/// sqlc passes the RPC method as the only argument to process plugins.
pub fn check_method(method: Option<&str>) -> Result<()> {
    match method {
        None => Ok(()),
        Some(m) if m == PLUGIN_GENERATE_METHOD => Ok(()),
        Some(m) => anyhow::bail!("unknown method {m:?} (expected {PLUGIN_GENERATE_METHOD:?})"),
    }
}

/// Decodes a request: protobuf by default, the IR's JSON form when `json` is set.
pub fn load_request(bytes: &[u8], json: bool) -> Result<Request> {
    if json {
        return serde_json::from_slice(bytes).map_err(|e| {
            Diagnostic::error(DiagnosticCode::TSD0001RequestDecode, format!("request JSON: {e}"))
                .into()
        });
    }
    wire::decode_request(bytes)
}

/// The process-plugin exchange: one request in, one encoded response out.
pub fn run_plugin(input: &mut impl Read, output: &mut impl Write) -> Result<()> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes).context("read request")?;
    log::debug!("request: {} bytes", bytes.len());

    let req = wire::decode_request(&bytes)?;
    let files = tsd1gen_core::generate(&req)?;

    output
        .write_all(&wire::encode_response(&files))
        .context("write response")?;
    output.flush().context("flush response")?;
    Ok(())
}

/// Writes each file under `dir`, or with `check` verifies the existing files match.
pub fn write_outputs(dir: &Path, files: &[GeneratedFile], check: bool) -> Result<()> {
    for f in files {
        let out_path = output_path(dir, &f.name)?;

        if check {
            let cur = std::fs::read(&out_path)
                .with_context(|| format!("read existing output: {}", out_path.display()))?;
            if cur != f.contents.as_bytes() {
                anyhow::bail!(
                    "generated output differs: {} (existing sha256 {}, generated sha256 {})",
                    out_path.display(),
                    sha256_hex(&cur),
                    f.sha256_hex()
                );
            }
            log::info!("{} is up to date", out_path.display());
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir: {}", parent.display()))?;
        }
        std::fs::write(&out_path, f.contents.as_bytes())
            .with_context(|| format!("write output: {}", out_path.display()))?;
    }
    Ok(())
}

fn output_path(dir: &Path, name: &str) -> Result<PathBuf> {
    let rel = Path::new(name);
    let plain = rel.components().count() == 1
        && matches!(rel.components().next(), Some(std::path::Component::Normal(_)));
    if !plain {
        return Err(Diagnostic::error(
            DiagnosticCode::TSD0901InternalBug,
            format!("generated file name {name:?} is not a plain file name"),
        )
        .into());
    }
    Ok(dir.join(rel))
}
