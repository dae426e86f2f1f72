// Command-line converter: WARC/CDX inputs in, static site tree out.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use warcmirror::utils::DEFAULT_FETCH_TIMEOUT_SECS;
use warcmirror::{ConvertConfig, Converter, RedirectResolution, UrlFilter};

#[derive(Debug, Parser)]
#[command(
    name = "warcmirror",
    version,
    about = "Convert WARC/CDX archives into a browsable static file tree"
)]
struct Cli {
    /// WARC, ARC or CDX files, or directories of them
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, value_name = "DIR", default_value = "output")]
    output: PathBuf,

    /// Directory or http(s):// prefix that CDX container names are relative to
    #[arg(short = 'b', long = "base", value_name = "BASE")]
    archive_base: Option<String>,

    /// Extra `content-type extension` table, overriding the built-in one
    #[arg(long, value_name = "FILE")]
    forced_extensions: Option<PathBuf>,

    /// JSON file with `startswith`/`contains` URL exclusion lists
    #[arg(long, value_name = "FILE")]
    exclude: Option<PathBuf>,

    /// Keep redirect entries pointing at their own placeholder pages
    #[arg(long, default_value_t = false)]
    no_resolve_redirects: bool,

    /// Follow redirect chains to their final target instead of one hop
    #[arg(long, default_value_t = false)]
    collapse_redirect_chains: bool,

    /// Timeout in seconds for remote range requests
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    fetch_timeout: u64,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let mut builder = ConvertConfig::builder()
        .output_dir(&cli.output)
        .resolve_redirects(!cli.no_resolve_redirects)
        .fetch_timeout_secs(cli.fetch_timeout);

    if let Some(base) = cli.archive_base {
        builder = builder.archive_base(base);
    }
    if let Some(path) = &cli.forced_extensions {
        builder = builder.forced_extensions_file(path);
    }
    if let Some(path) = &cli.exclude {
        let filter = UrlFilter::load(path)
            .with_context(|| format!("Failed to load exclusion filter {}", path.display()))?;
        builder = builder.url_filter(filter);
    }
    if cli.collapse_redirect_chains {
        builder = builder.redirect_resolution(RedirectResolution::fixed_point());
    }

    let config = builder.build().context("Invalid configuration")?;
    let converter = Converter::new(config).context("Failed to initialize converter")?;
    let summary = converter
        .run(&cli.inputs)
        .await
        .context("Conversion failed")?;

    if summary.failed > 0 || summary.failed_inputs > 0 {
        log::warn!(
            "{} resources and {} input files could not be converted; see log above",
            summary.failed,
            summary.failed_inputs
        );
    }
    Ok(())
}
