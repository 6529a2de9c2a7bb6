////////////////////////////////////////////////////////////////////////////////////
// Copyright (c) 2020 DasEtwas - All Rights Reserved                               /
//      Unauthorized copying of this file, via any medium is strictly prohibited   /
//      Proprietary and confidential                                               /
////////////////////////////////////////////////////////////////////////////////////

use std::{
    collections::{btree_map::Entry, BTreeMap, BTreeSet},
    fmt,
    fs::File,
    io::{self, BufReader},
    path::Path,
    str::FromStr,
};

use crate::{Error, Platform, Result};

mod parse;

/// Every accepted `--api` selection, see `parse_api`.
pub const API_LIST: [&str; 5] = ["gl:core", "gl:compatibility", "gles1", "gles2", "glsc2"];

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Api {
    Gl,
    Gles1,
    Gles2,
    Glsc2,
}

impl Api {
    pub fn as_str(self) -> &'static str {
        match self {
            Api::Gl => "gl",
            Api::Gles1 => "gles1",
            Api::Gles2 => "gles2",
            Api::Glsc2 => "glsc2",
        }
    }
}

impl fmt::Display for Api {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

impl FromStr for Api {
    type Err = Error;

    fn from_str(s: &str) -> Result<Api> {
        match s {
            "gl" => Ok(Api::Gl),
            "gles1" => Ok(Api::Gles1),
            "gles2" => Ok(Api::Gles2),
            "glsc2" => Ok(Api::Glsc2),
            _ => Err(Error::InvalidValue { kind: "api", value: s.to_string() }),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Profile {
    Core,
    Compatibility,
    /// The only profile of OpenGL ES 1.x.
    Common,
}

impl Profile {
    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Core => "core",
            Profile::Compatibility => "compatibility",
            Profile::Common => "common",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Profile> {
        match s {
            "core" => Ok(Profile::Core),
            "compatibility" => Ok(Profile::Compatibility),
            "common" => Ok(Profile::Common),
            _ => Err(Error::InvalidValue { kind: "profile", value: s.to_string() }),
        }
    }
}

/// Splits an API selection such as `gl:core` or `gles2` into its API and profile.
pub fn parse_api(s: &str) -> Result<(Api, Profile)> {
    match s {
        "gl:core" => Ok((Api::Gl, Profile::Core)),
        "gl:compatibility" => Ok((Api::Gl, Profile::Compatibility)),
        "gles1" => Ok((Api::Gles1, Profile::Common)),
        "gles2" => Ok((Api::Gles2, Profile::Core)),
        "glsc2" => Ok((Api::Glsc2, Profile::Core)),
        _ => Err(Error::InvalidValue { kind: "api", value: s.to_string() }),
    }
}

/// The token an extension's `supported` attribute must contain to be available for the
///  given API and profile.
fn supported_token(api: Api, profile: Profile) -> &'static str {
    match (api, profile) {
        (Api::Gl, Profile::Core) => "glcore",
        (api, _) => api.as_str(),
    }
}

/// An API version, ordered by major then minor number.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(pub u8, pub u8);

impl fmt::Display for Version {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}.{}", self.0, self.1)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Version> {
        let invalid = || Error::InvalidValue { kind: "version", value: s.to_string() };
        let mut parts = s.trim().splitn(2, '.');
        let major = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let minor = match parts.next() {
            Some(p) => p.parse().map_err(|_| invalid())?,
            None => 0,
        };
        Ok(Version(major, minor))
    }
}

/// A C type declaration from the `<types>` section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Type {
    pub name: String,
    /// Another type that must be declared first.
    pub requires: Option<String>,
    /// The complete C text, e.g. `typedef unsigned int GLenum;`.
    pub decl: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Enum {
    pub ident: String,
    /// The literal exactly as the registry spells it, hex or signed decimal.
    pub value: String,
    /// C literal suffix such as `u` or `ull`.
    pub suffix: Option<String>,
    /// The enum's group, e.g. `ClearBufferMask`, noted next to its definition.
    pub group: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub ident: String,
    /// The C type expression, e.g. `const GLchar *`.
    pub ty: String,
    /// The registry type the expression is built on, if any.
    pub ptype: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cmd {
    pub proto: Binding,
    pub params: Vec<Binding>,
    /// An equivalent command, usually the core version of an extension command. Looked up
    ///  when this command itself cannot be found.
    pub alias: Option<String>,
}

impl Cmd {
    /// The registry types this command's signature is built on.
    pub fn ptypes(&self) -> impl Iterator<Item = &str> {
        std::iter::once(&self.proto).chain(self.params.iter()).filter_map(|b| b.ptype.as_deref())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Require,
    Remove,
}

/// A `<require>` or `<remove>` block of a feature or extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub profile: Option<Profile>,
    pub types: Vec<String>,
    pub enums: Vec<String>,
    pub cmds: Vec<String>,
}

impl Block {
    pub fn applies_to(&self, profile: Profile) -> bool {
        self.profile.map_or(true, |p| p == profile)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Feature {
    /// e.g. `GL_VERSION_3_2`
    pub name: String,
    pub version: Version,
    /// In document order.
    pub blocks: Vec<Block>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extension {
    pub name: String,
    /// `None` when the extension does not restrict its platforms.
    pub platforms: Option<BTreeSet<Platform>>,
    pub blocks: Vec<Block>,
}

impl Extension {
    pub fn supports(&self, platform: Platform) -> bool {
        self.platforms.as_ref().map_or(true, |platforms| platforms.contains(&platform))
    }

    /// The symbols this extension contributes for `profile`.
    pub fn interface(&self, profile: Profile) -> Interface {
        self.blocks.iter().filter(|block| block.applies_to(profile)).fold(Interface::default(), Interface::apply)
    }
}

/// A resolved set of active enums and commands, plus the types required by name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Interface {
    pub enums: BTreeSet<String>,
    pub commands: BTreeSet<String>,
    /// Types a block requires directly. Types only reached through command signatures are
    ///  not listed.
    pub types: BTreeSet<String>,
}

impl Interface {
    /// Returns the interface after `block` was applied: a require block adds its symbols, a
    ///  remove block retracts them. Retracting an absent symbol does nothing.
    pub fn apply(mut self, block: &Block) -> Interface {
        match block.kind {
            BlockKind::Require => {
                self.types.extend(block.types.iter().cloned());
                self.enums.extend(block.enums.iter().cloned());
                self.commands.extend(block.cmds.iter().cloned());
            },
            BlockKind::Remove => {
                for ty in &block.types {
                    self.types.remove(ty);
                }
                for enm in &block.enums {
                    self.enums.remove(enm);
                }
                for cmd in &block.cmds {
                    self.commands.remove(cmd);
                }
            },
        }
        self
    }

    pub fn union(mut self, other: &Interface) -> Interface {
        self.types.extend(other.types.iter().cloned());
        self.enums.extend(other.enums.iter().cloned());
        self.commands.extend(other.commands.iter().cloned());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.enums.is_empty() && self.commands.is_empty() && self.types.is_empty()
    }
}

/// The in-memory registry for one API and profile. Loaded once, read-only afterwards.
#[derive(Clone, Debug)]
pub struct Registry {
    pub api: Api,
    pub profile: Profile,
    /// Where the registry was read from, used in diagnostics.
    pub origin: String,
    /// In document order, which is also declaration order.
    pub types: Vec<Type>,
    pub enums: BTreeMap<String, Enum>,
    pub cmds: BTreeMap<String, Cmd>,
    pub features: BTreeMap<Version, Feature>,
    pub extensions: BTreeMap<String, Extension>,
}

impl Registry {
    /// Reads the XML registry at `path` and selects everything belonging to `api` and
    ///  `profile`.
    pub fn load<P>(path: P, api: Api, profile: Profile) -> Result<Registry>
    where P: AsRef<Path> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let file = File::open(path).map_err(|err| Error::load(origin.clone(), err.to_string()))?;
        Registry::from_reader(BufReader::new(file), &origin, api, profile)
    }

    pub fn from_reader<R>(src: R, origin: &str, api: Api, profile: Profile) -> Result<Registry>
    where R: io::Read {
        let raw = parse::from_xml(src).map_err(|reason| Error::load(origin, reason))?;
        let registry = Registry::select(raw, origin, api, profile)?;

        info!(
            "loaded {} ({}:{}): {} features, {} extensions, {} commands, {} enums",
            origin,
            api,
            profile,
            registry.features.len(),
            registry.extensions.len(),
            registry.cmds.len(),
            registry.enums.len()
        );

        Ok(registry)
    }

    fn select(raw: parse::RawRegistry, origin: &str, api: Api, profile: Profile) -> Result<Registry> {
        let fail = |reason: String| Error::load(origin, reason);

        let types = pick_for_api(raw.types, api, |ty| &ty.name)
            .into_iter()
            .map(|ty| Type { name: ty.name, requires: ty.requires, decl: ty.decl })
            .collect::<Vec<_>>();

        let enums = pick_for_api(raw.enums, api, |enm| &enm.ident)
            .into_iter()
            .map(|enm| (enm.ident.clone(), Enum { ident: enm.ident, value: enm.value, suffix: enm.suffix, group: enm.group }))
            .collect::<BTreeMap<_, _>>();

        let mut cmds = BTreeMap::new();
        for cmd in raw.cmds {
            cmds.insert(cmd.proto.ident.clone(), cmd);
        }

        let mut features = BTreeMap::new();
        for feature in raw.features.into_iter().filter(|f| f.api == api.as_str()) {
            let name = feature.name;
            let version = feature.number.parse::<Version>().map_err(|err| fail(format!("feature {}: {}", name, err)))?;
            let blocks = select_blocks(feature.blocks, api).map_err(|err| fail(format!("feature {}: {}", name, err)))?;
            match features.entry(version) {
                Entry::Occupied(previous) => {
                    let previous: &Feature = previous.get();
                    return Err(fail(format!("features {} and {} share version {}", previous.name, name, version)));
                },
                Entry::Vacant(slot) => {
                    slot.insert(Feature { name, version, blocks });
                },
            }
        }

        let token = supported_token(api, profile);
        let mut extensions = BTreeMap::new();
        for ext in raw.extensions.into_iter().filter(|e| e.supported.iter().any(|s| s == token)) {
            let name = ext.name;
            let platforms = match ext.platforms {
                Some(ref platforms) => Some(
                    platforms
                        .iter()
                        .map(|platform| platform.parse::<Platform>())
                        .collect::<Result<BTreeSet<_>>>()
                        .map_err(|err| fail(format!("extension {}: {}", name, err)))?,
                ),
                None => None,
            };
            let blocks = select_blocks(ext.blocks, api).map_err(|err| fail(format!("extension {}: {}", name, err)))?;
            extensions.insert(name.clone(), Extension { name, platforms, blocks });
        }

        let registry = Registry { api, profile, origin: origin.to_string(), types, enums, cmds, features, extensions };
        registry.validate(&raw.type_names)?;
        Ok(registry)
    }

    /// Checks that every block references known types, enums and commands, and that every
    ///  command signature references known types.
    fn validate(&self, type_names: &BTreeSet<String>) -> Result<()> {
        let owners = self
            .features
            .values()
            .map(|f| (&f.name, &f.blocks))
            .chain(self.extensions.values().map(|e| (&e.name, &e.blocks)));

        for (owner, blocks) in owners {
            for block in blocks {
                if let Some(ty) = block.types.iter().find(|t| !type_names.contains(*t)) {
                    return Err(Error::load(&*self.origin, format!("{} references unknown type {}", owner, ty)));
                }
                if let Some(enm) = block.enums.iter().find(|e| !self.enums.contains_key(*e)) {
                    return Err(Error::load(&*self.origin, format!("{} references unknown enum {}", owner, enm)));
                }
                if let Some(cmd) = block.cmds.iter().find(|c| !self.cmds.contains_key(*c)) {
                    return Err(Error::load(&*self.origin, format!("{} references unknown command {}", owner, cmd)));
                }
            }
        }

        for cmd in self.cmds.values() {
            if let Some(ty) = cmd.ptypes().find(|ty| !type_names.contains(*ty)) {
                return Err(Error::load(&*self.origin, format!("command {} uses unknown type {}", cmd.proto.ident, ty)));
            }
        }

        Ok(())
    }

    /// All versions known for the selected API, ascending.
    pub fn versions(&self) -> impl Iterator<Item = Version> + '_ {
        self.features.keys().copied()
    }

    pub fn max_version(&self) -> Option<Version> {
        self.features.keys().next_back().copied()
    }

    pub fn extension_names(&self) -> impl Iterator<Item = &str> {
        self.extensions.keys().map(|name| &name[..])
    }

    /// The cumulative interface of every feature up to and including `version`.
    ///
    /// Features are folded in ascending version order, the blocks of a feature in document
    ///  order, so a remove retracts whatever earlier requires added.
    pub fn core_interface(&self, version: Version, profile: Profile) -> Interface {
        self.features.range(..=version).fold(Interface::default(), |iface, (_, feature)| {
            debug!("folding {} ({})", feature.name, feature.version);
            feature.blocks.iter().filter(|block| block.applies_to(profile)).fold(iface, Interface::apply)
        })
    }

    /// The interface contributed by a single extension, independent of any version.
    pub fn extension_interface(&self, name: &str, profile: Profile) -> Result<Interface> {
        let ext = self.extensions.get(name).ok_or_else(|| Error::UnknownExtension { name: name.to_string() })?;
        Ok(ext.interface(profile))
    }
}

/// Keeps one definition per name: the one specific to `api` if present, else the generic one.
///  Definitions for other APIs are dropped. Document order is preserved.
fn pick_for_api<T, F>(items: Vec<parse::ApiScoped<T>>, api: Api, name: F) -> Vec<T>
where F: Fn(&T) -> &String {
    let mut picked: Vec<T> = Vec::with_capacity(items.len());
    let mut index = BTreeMap::new();
    let mut specific = BTreeSet::new();

    for item in items {
        let is_specific = match item.api.as_deref() {
            None => false,
            Some(a) if a == api.as_str() => true,
            Some(_) => continue,
        };
        let key = name(&item.inner).clone();
        match index.get(&key) {
            Some(&i) => {
                if is_specific || !specific.contains(&key) {
                    picked[i] = item.inner;
                }
            },
            None => {
                index.insert(key.clone(), picked.len());
                picked.push(item.inner);
            },
        }
        if is_specific {
            specific.insert(key);
        }
    }

    picked
}

fn select_blocks(blocks: Vec<parse::RawBlock>, api: Api) -> Result<Vec<Block>> {
    blocks
        .into_iter()
        .filter(|block| block.api.as_deref().map_or(true, |a| a == api.as_str()))
        .map(|block| {
            let profile = block.profile.as_deref().map(str::parse::<Profile>).transpose()?;
            Ok(Block { kind: block.kind, profile, types: block.types, enums: block.enums, cmds: block.cmds })
        })
        .collect()
}
