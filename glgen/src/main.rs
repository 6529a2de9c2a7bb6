//! Generates C OpenGL loaders from the Khronos XML registry, and estimates what an installed
//! OpenGL library supports.

#[macro_use]
extern crate log;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use gl_loader_gen::{parse_api, Platform, Registry, Request, Version, API_LIST};

mod symbols;

#[derive(Parser, Debug)]
#[command(name = "glgen", version, about = "OpenGL loader generator")]
struct Cli {
    /// Path of the XML registry
    #[arg(long, value_name = "PATH", env = "GLGEN_REGISTRY", default_value = "gl.xml", global = true)]
    reg_path: PathBuf,

    /// API and profile to select from the registry
    #[arg(long, default_value = "gl:core", value_parser = API_LIST, global = true)]
    api: String,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write gl_loader.h, gl_loader.c and the headers they include
    Emit {
        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        out: PathBuf,

        /// windows, osx or linux, defaults to the host
        #[arg(long)]
        platform: Option<Platform>,

        /// Include extensions that do not support the platform
        #[arg(long)]
        allow_unsupported_platform: bool,

        /// Highest version to include, e.g. 3.3
        max_version: Version,

        /// Extensions to include, e.g. GL_ARB_debug_output
        extensions: Vec<String>,
    },

    /// Report the version and extensions a library's exports support
    Scan(ScanSource),
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct ScanSource {
    /// Shared library to read the export table of
    #[arg(long, value_name = "PATH")]
    library: Option<PathBuf>,

    /// Text file listing one exported name per line
    #[arg(long, value_name = "PATH")]
    symbols: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let (api, profile) = parse_api(&cli.api)?;
    let registry = Registry::load(&cli.reg_path, api, profile)?;

    match cli.command {
        Command::Emit { out, platform, allow_unsupported_platform, max_version, extensions } => {
            let platform = platform.unwrap_or_else(host_platform);
            let request = Request::new(max_version, platform, extensions)
                .allow_unsupported_platform(allow_unsupported_platform);

            let output = gl_loader_gen::emit_to_dir(&registry, &request, &out)?;
            for name in output.files.keys().chain(output.dependencies.iter()) {
                println!("{}", out.join(name).display());
            }
        },
        Command::Scan(source) => {
            let observed = match (source.library, source.symbols) {
                (Some(library), _) => symbols::from_library(&library)?,
                (None, Some(list)) => symbols::from_list(&list)?,
                (None, None) => bail!("scan needs --library or --symbols"),
            };
            info!("scanning {} observed names", observed.len());
            print!("{}", gl_loader_gen::scan(&registry, &observed));
        },
    }

    Ok(())
}

/// Unix systems other than macOS load through GLX as well, so they count as Linux.
fn host_platform() -> Platform {
    if cfg!(target_os = "windows") {
        Platform::Windows
    } else if cfg!(target_os = "macos") {
        Platform::MacOs
    } else {
        Platform::Linux
    }
}
