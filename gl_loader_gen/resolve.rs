////////////////////////////////////////////////////////////////////////////////////
// Copyright (c) 2020 DasEtwas - All Rights Reserved                               /
//      Unauthorized copying of this file, via any medium is strictly prohibited   /
//      Proprietary and confidential                                               /
////////////////////////////////////////////////////////////////////////////////////

use std::collections::BTreeSet;

use crate::{
    registry::{Api, Interface, Profile, Registry, Version},
    Error, Platform, Result,
};

/// What to generate a loader for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    /// Ceiling, not an exact match: the highest known version at or below it is used.
    pub version: Version,
    pub platform: Platform,
    pub extensions: Vec<String>,
    /// Include extensions that do not support `platform` instead of failing.
    pub allow_unsupported_platform: bool,
}

impl Request {
    pub fn new<I, S>(version: Version, platform: Platform, extensions: I) -> Request
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Request {
            version,
            platform,
            extensions: extensions.into_iter().map(Into::into).collect(),
            allow_unsupported_platform: false,
        }
    }

    pub fn allow_unsupported_platform(mut self, allow: bool) -> Request {
        self.allow_unsupported_platform = allow;
        self
    }
}

/// The outcome of resolving a `Request`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub api: Api,
    pub profile: Profile,
    pub platform: Platform,
    /// The highest version folded in, `None` if the request lies below every known version.
    pub version: Option<Version>,
    /// Names of the folded features, ascending by version.
    pub features: Vec<String>,
    /// Requested extensions, sorted and deduplicated.
    pub extensions: Vec<String>,
    pub interface: Interface,
    /// Commands only extensions provide. They are declared and loaded like every other command,
    ///  but may be absent at runtime.
    pub optional: BTreeSet<String>,
}

impl Resolved {
    pub fn enums(&self) -> impl Iterator<Item = &str> {
        self.interface.enums.iter().map(|s| &s[..])
    }

    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.interface.commands.iter().map(|s| &s[..])
    }

    pub fn is_optional(&self, cmd: &str) -> bool {
        self.optional.contains(cmd)
    }
}

impl Registry {
    /// Resolves `request` into the final interface: the core interface up to the requested
    ///  version plus every requested extension, both for the profile the registry was loaded
    ///  with.
    pub fn resolve(&self, request: &Request) -> Result<Resolved> {
        let version = self.effective_version(request.version);
        let base = match version {
            Some(version) => self.core_interface(version, self.profile),
            None => Interface::default(),
        };
        let features = match version {
            Some(version) => self.features.range(..=version).map(|(_, f)| f.name.clone()).collect(),
            None => Vec::new(),
        };

        let extensions = request.extensions.iter().cloned().collect::<BTreeSet<_>>();
        if let Some(unknown) = extensions.iter().find(|name| !self.extensions.contains_key(*name)) {
            return Err(Error::UnknownExtension { name: unknown.clone() });
        }

        let mut extra = Interface::default();
        for name in &extensions {
            let ext = &self.extensions[name];
            if !ext.supports(request.platform) {
                if !request.allow_unsupported_platform {
                    return Err(Error::UnsupportedPlatform { extension: name.clone(), platform: request.platform });
                }
                warn!("including {} although it is not supported on {}", name, request.platform);
            }
            extra = extra.union(&ext.interface(self.profile));
        }

        let optional = extra.commands.difference(&base.commands).cloned().collect::<BTreeSet<_>>();
        let interface = base.union(&extra);

        info!(
            "resolved {}:{} {} on {} with {} extensions: {} enums, {} commands ({} optional)",
            self.api,
            self.profile,
            version.map_or_else(|| "(no version)".to_string(), |v| v.to_string()),
            request.platform,
            extensions.len(),
            interface.enums.len(),
            interface.commands.len(),
            optional.len()
        );

        Ok(Resolved {
            api: self.api,
            profile: self.profile,
            platform: request.platform,
            version,
            features,
            extensions: extensions.into_iter().collect(),
            interface,
            optional,
        })
    }

    /// The highest known version at or below `requested`.
    fn effective_version(&self, requested: Version) -> Option<Version> {
        let max = self.max_version()?;
        if requested > max {
            warn!("version {} is above the highest known version, resolving {}", requested, max);
            return Some(max);
        }

        let version = self.features.range(..=requested).next_back().map(|(&v, _)| v);
        if version.is_none() {
            warn!("version {} is below every known version, resolving no core interface", requested);
        }
        version
    }
}
