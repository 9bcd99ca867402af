//! pdfium-bindgen: regenerate the PDFium bindings from a release of the
//! prebuilt binaries.
//!
//! ```text
//! pdfium-bindgen [RELEASE] [REGENERATE] [MINOR]
//! pdfium-bindgen latest true 0
//! ```

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use pdfium_bindgen::assets::github::GithubReleases;
use pdfium_bindgen::config::Config;
use pdfium_bindgen::emit::rust::RustFfiEmitter;
use pdfium_bindgen::parser::libclang::ClangParser;
use pdfium_bindgen::RunOptions;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "pdfium-bindgen",
    version,
    about = "Generate Rust FFI bindings and runtime packages from PDFium releases"
)]
struct Cli {
    /// Release id to build from, or `latest`
    #[arg(default_value = "latest")]
    release: String,

    /// Parse the headers and rewrite the bindings (false only restages binaries)
    #[arg(default_value_t = true, action = ArgAction::Set)]
    regenerate: bool,

    /// Minor build number of the package version
    #[arg(default_value_t = 0)]
    minor: u32,
}

fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pdfium_bindgen=info"));

    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = Config::load().context("failed to load configuration")?;
    let options = RunOptions {
        release: cli.release,
        regenerate: cli.regenerate,
        minor: cli.minor,
    };
    let provider = GithubReleases::new(&config.release_api, &config.user_agent);

    let summary = pdfium_bindgen::run(&options, &config, &provider, &ClangParser, &RustFfiEmitter)
        .with_context(|| format!("failed to generate bindings for release `{}`", options.release))?;

    println!(
        "{} {} -> {}",
        config.product, summary.release.tag_name, summary.version
    );
    Ok(())
}
