////////////////////////////////////////////////////////////////////////////////////
// Copyright (c) 2020 DasEtwas - All Rights Reserved                               /
//      Unauthorized copying of this file, via any medium is strictly prohibited   /
//      Proprietary and confidential                                               /
////////////////////////////////////////////////////////////////////////////////////

//! Estimates which version and extensions a compiled OpenGL library supports from the names
//! it exports.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use crate::registry::{Registry, Version};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExtensionSupport {
    /// The extension has no commands, so exports say nothing about it.
    ZeroEntryPoints,
    /// Every command is already part of the supported core versions.
    Redundant,
    Unsupported,
    Supported,
}

impl ExtensionSupport {
    fn heading(self) -> &'static str {
        match self {
            ExtensionSupport::Supported => "Supported extensions",
            ExtensionSupport::Unsupported => "Unsupported extensions",
            ExtensionSupport::Redundant => "Redundant extensions",
            ExtensionSupport::ZeroEntryPoints => "Extensions without entry points",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanReport {
    /// The highest version whose commands are all exported.
    pub max_version: Option<Version>,
    pub extensions: BTreeMap<String, ExtensionSupport>,
}

impl ScanReport {
    pub fn with_support(&self, support: ExtensionSupport) -> impl Iterator<Item = &str> {
        self.extensions.iter().filter(move |(_, s)| **s == support).map(|(name, _)| &name[..])
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self.max_version {
            Some(version) => writeln!(fmt, "Version: {}", version)?,
            None => writeln!(fmt, "Version: none")?,
        }

        let order = [
            ExtensionSupport::Supported,
            ExtensionSupport::Unsupported,
            ExtensionSupport::Redundant,
            ExtensionSupport::ZeroEntryPoints,
        ];
        for &support in order.iter() {
            let mut names = self.with_support(support).peekable();
            if names.peek().is_none() {
                continue;
            }
            writeln!(fmt, "{}:", support.heading())?;
            for name in names {
                writeln!(fmt, "    {}", name)?;
            }
        }

        Ok(())
    }
}

/// Classifies the registry against the exported command names in `observed`, for the profile
///  the registry was loaded with. Any mangling prefix must already be stripped from the names.
pub fn scan(registry: &Registry, observed: &BTreeSet<String>) -> ScanReport {
    let profile = registry.profile;
    let mut max_version = None;
    let mut accumulated = BTreeSet::new();

    for version in registry.versions() {
        let iface = registry.core_interface(version, profile);
        if !iface.commands.is_subset(observed) {
            debug!(
                "{} is not supported, missing {}",
                version,
                iface.commands.difference(observed).cloned().collect::<Vec<_>>().join(", ")
            );
            break;
        }
        accumulated.extend(iface.commands);
        max_version = Some(version);
    }

    let extensions = registry
        .extensions
        .values()
        .map(|ext| {
            let cmds = ext.interface(profile).commands;
            let support = if cmds.is_empty() {
                ExtensionSupport::ZeroEntryPoints
            } else if cmds.is_subset(&accumulated) {
                ExtensionSupport::Redundant
            } else if !cmds.is_subset(observed) {
                ExtensionSupport::Unsupported
            } else {
                ExtensionSupport::Supported
            };
            (ext.name.clone(), support)
        })
        .collect();

    ScanReport { max_version, extensions }
}
