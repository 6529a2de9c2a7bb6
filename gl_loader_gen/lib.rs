////////////////////////////////////////////////////////////////////////////////////
// Copyright (c) 2019 DasEtwas - All Rights Reserved                               /
//      Unauthorized copying of this file, via any medium is strictly prohibited   /
//      Proprietary and confidential                                               /
////////////////////////////////////////////////////////////////////////////////////

//! An OpenGL loader generator. It reads the Khronos XML registry, resolves which enums and
//! commands a given version, profile and extension list make available, and emits a C header
//! plus a loader source which looks up every entry point at runtime.
//!
//! # Example
//!
//! ```no_run
//! extern crate gl_loader_gen;
//!
//! use gl_loader_gen::{Api, Platform, Profile, Registry, Request, Version};
//!
//! fn main() -> gl_loader_gen::Result<()> {
//!     let registry = Registry::load("gl.xml", Api::Gl, Profile::Core)?;
//!     let request = Request::new(Version(3, 3), Platform::Linux, vec!["GL_ARB_debug_output"]);
//!
//!     gl_loader_gen::emit_to_dir(&registry, &request, "generated")?;
//!     Ok(())
//! }
//! ```
//!
//! The output directory then holds `gl_loader.h`, `gl_loader.c`, `gl_platform.h` and
//!  `KHR/khrplatform.h`. The header includes `"gl_platform.h"` and `<KHR/khrplatform.h>`, so
//!  compile with the output directory on the include path, e.g. `cc -I generated -c
//!  generated/gl_loader.c`.
//!
//! Call `glgen_load()` once a context is current. Besides resolving every entry point it sets
//!  `glgen_version` to `GLGEN_VERSION(major, minor)` of the context and `GLGEN_<EXT>` to
//!  nonzero for every requested extension the context advertises, e.g. `GLGEN_ARB_debug_output`.
//!
//! # Extension platforms
//!
//! An `<extension>` may carry a `platform="windows|osx|linux"` attribute. Requesting such an
//!  extension for any other platform fails with `Error::UnsupportedPlatform` unless
//!  `Request::allow_unsupported_platform` is set.

extern crate lazy_static;
#[macro_use]
extern crate log;
extern crate tempfile;
extern crate thiserror;
extern crate xml;

use std::path::Path;

#[cfg(feature = "unstable_generator_utils")]
pub mod generators;
#[cfg(not(feature = "unstable_generator_utils"))]
mod generators;

mod error;
mod output;
mod platform;
mod registry;
mod resolve;
mod scan;

pub use error::{Error, Result};
pub use generators::{c_loader_gen::CLoaderGenerator, static_file, Bindings, Generator, Output, HEADER_FILE, SOURCE_FILE};
pub use output::write_files;
pub use platform::Platform;
pub use registry::*;
pub use resolve::{Request, Resolved};
pub use scan::{scan, ExtensionSupport, ScanReport};

/// Resolves `request` and generates the C loader for it.
pub fn generate(registry: &Registry, request: &Request) -> Result<Output> {
    let resolved = registry.resolve(request)?;
    registry.write_loader(&resolved, CLoaderGenerator)
}

/// Like `generate`, then writes the generated and static files into `dir`. Nothing is written
///  if resolution or generation fails.
pub fn emit_to_dir<P>(registry: &Registry, request: &Request, dir: P) -> Result<Output>
where P: AsRef<Path> {
    let dir = dir.as_ref();
    let output = generate(registry, request)?;
    output.write_to(dir)?;
    info!("wrote {} generated and {} static files to {}", output.files.len(), output.dependencies.len(), dir.display());
    Ok(output)
}
