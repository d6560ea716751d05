use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "sqlc-gen-ts-d1")]
#[command(about = "sqlc plugin: TypeScript for Cloudflare D1 (models.ts + querier.ts).", long_about = None)]
struct Cli {
    /// RPC method passed by sqlc to process plugins.
    method: Option<String>,
    /// Read the request from a file instead of stdin.
    #[arg(long)]
    request: Option<PathBuf>,
    /// The request is the generator IR as JSON, not a protobuf CodeGenRequest.
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Write the generated files into this directory instead of emitting a response.
    #[arg(long)]
    out: Option<PathBuf>,
    /// If set, fail if output differs; do not write.
    #[arg(long, default_value_t = false, requires = "out")]
    check: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();
    try_main().map_err(|err| {
        eprintln!("{err:#}");
        err
    })
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    tsd1gen_cli::check_method(cli.method.as_deref())?;

    if cli.out.is_none() && cli.request.is_none() && !cli.json {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        return tsd1gen_cli::run_plugin(&mut stdin.lock(), &mut stdout.lock());
    }

    let bytes = match &cli.request {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("read request: {}", path.display()))?
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("read request from stdin")?;
            buf
        }
    };
    let req = tsd1gen_cli::load_request(&bytes, cli.json)?;
    let files = tsd1gen_core::generate(&req)?;
    match &cli.out {
        Some(out) => tsd1gen_cli::write_outputs(out, &files, cli.check),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&tsd1gen_core::wire::encode_response(&files))
                .context("write response")?;
            stdout.flush().context("flush response")
        }
    }
}
