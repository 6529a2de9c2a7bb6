//! Sources of observed entry point names for `glgen scan`.

use std::{collections::BTreeSet, fs, path::Path};

use anyhow::{Context, Result};
use object::{BinaryFormat, Object};

/// The names a shared library exports, read from its export table.
pub fn from_library(path: &Path) -> Result<BTreeSet<String>> {
    let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file = object::File::parse(&*data).with_context(|| format!("{} is not a recognised library", path.display()))?;
    let exports = file.exports().with_context(|| format!("failed to read the exports of {}", path.display()))?;

    // Mach-O prepends an underscore to every C symbol
    let mangled = file.format() == BinaryFormat::MachO;
    let names = exports
        .iter()
        .filter_map(|export| std::str::from_utf8(export.name()).ok())
        .map(|name| unmangle(name, mangled).to_string())
        .collect::<BTreeSet<_>>();

    debug!("{} exports {} names", path.display(), names.len());
    Ok(names)
}

/// The names listed in a text file, one per line. Blank lines and `#` comments are skipped.
pub fn from_list(path: &Path) -> Result<BTreeSet<String>> {
    let list = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(parse_list(&list))
}

fn parse_list(list: &str) -> BTreeSet<String> {
    list.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn unmangle(name: &str, mangled: bool) -> &str {
    if mangled {
        name.strip_prefix('_').unwrap_or(name)
    } else {
        name
    }
}
