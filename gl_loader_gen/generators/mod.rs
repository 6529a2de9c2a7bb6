////////////////////////////////////////////////////////////////////////////////////
// Copyright (c) 2019 DasEtwas - All Rights Reserved                               /
//      Unauthorized copying of this file, via any medium is strictly prohibited   /
//      Proprietary and confidential                                               /
////////////////////////////////////////////////////////////////////////////////////

use std::{
    collections::{BTreeMap, BTreeSet},
    io,
    path::Path,
};

use lazy_static::lazy_static;

use crate::{
    output::write_files,
    registry::{Cmd, Enum, Registry, Type},
    resolve::Resolved,
    Error, Result,
};

pub mod c_loader_gen;

/// Name of the generated header.
pub const HEADER_FILE: &str = "gl_loader.h";
/// Name of the generated loader source.
pub const SOURCE_FILE: &str = "gl_loader.c";
/// Prefix of every generated function pointer variable.
pub const SYMBOL_PREFIX: &str = "glgen_";

lazy_static! {
    // files which the generated code includes but which never depend on the interface
    static ref STATIC_FILES: BTreeMap<&'static str, &'static str> = {
        let mut map = BTreeMap::new();
        map.insert("gl_platform.h", include_str!("templates/gl_platform.h"));
        map.insert("KHR/khrplatform.h", include_str!("templates/KHR/khrplatform.h"));
        map
    };
}

/// Returns the content of a static template file by its output name.
pub fn static_file(name: &str) -> Option<&'static str> {
    STATIC_FILES.get(name).copied()
}

pub fn static_file_names() -> impl Iterator<Item = &'static str> {
    STATIC_FILES.keys().copied()
}

/// Trait for a loader generator.
///
/// Both methods must be pure functions of `bindings`: the same input always produces the same
///  bytes.
pub trait Generator {
    /// Writes the header declaring types, enums and entry points.
    fn write_header<W>(&self, bindings: &Bindings, dest: &mut W) -> io::Result<()>
    where W: io::Write;

    /// Writes the source that resolves every entry point declared by the header.
    fn write_source<W>(&self, bindings: &Bindings, dest: &mut W) -> io::Result<()>
    where W: io::Write;
}

/// The registry entries behind a resolved interface, looked up and ordered for emission.
pub struct Bindings<'a> {
    pub resolved: &'a Resolved,
    /// Declaration order.
    pub types: Vec<&'a Type>,
    /// Sorted by name.
    pub enums: Vec<&'a Enum>,
    /// Sorted by name.
    pub cmds: Vec<&'a Cmd>,
}

impl<'a> Bindings<'a> {
    /// Fails with `Error::Generation` if the interface names an enum, command or type the
    ///  registry does not define.
    pub fn collect(registry: &'a Registry, resolved: &'a Resolved) -> Result<Bindings<'a>> {
        let enums = resolved
            .interface
            .enums
            .iter()
            .map(|name| registry.enums.get(name).ok_or_else(|| Error::generation(&name[..], "enum is not defined by the registry")))
            .collect::<Result<Vec<_>>>()?;

        let cmds = resolved
            .interface
            .commands
            .iter()
            .map(|name| registry.cmds.get(name).ok_or_else(|| Error::generation(&name[..], "command is not defined by the registry")))
            .collect::<Result<Vec<_>>>()?;

        let types = type_closure(registry, &resolved.interface.types, &cmds)?;

        Ok(Bindings { resolved, types, enums, cmds })
    }

    /// Optional commands come from extensions only and may be missing at runtime.
    pub fn is_optional(&self, cmd: &Cmd) -> bool {
        self.resolved.optional.contains(&cmd.proto.ident)
    }
}

/// Collects the required types and every type the commands' signatures need, including the
///  types those declarations themselves mention, in registry order.
fn type_closure<'a>(registry: &'a Registry, required: &'a BTreeSet<String>, cmds: &[&'a Cmd]) -> Result<Vec<&'a Type>> {
    let by_name = registry.types.iter().enumerate().map(|(i, ty)| (&ty.name[..], (i, ty))).collect::<BTreeMap<_, _>>();

    let mut pending = required.iter().map(|name| &name[..]).collect::<Vec<_>>();
    for cmd in cmds {
        for ty in cmd.ptypes() {
            if !by_name.contains_key(ty) {
                return Err(Error::generation(&cmd.proto.ident[..], format!("type {} is not defined by the registry", ty)));
            }
            pending.push(ty);
        }
    }

    let mut wanted = BTreeSet::new();
    while let Some(name) = pending.pop() {
        let (index, ty) = match by_name.get(name) {
            Some(&entry) => entry,
            None => return Err(Error::generation(name, "required type is not defined by the registry")),
        };
        if !wanted.insert(index) {
            continue;
        }
        pending.extend(ty.requires.as_deref());
        pending.extend(identifiers(&ty.decl).filter(|id| *id != ty.name && by_name.contains_key(id)));
    }

    Ok(wanted.into_iter().map(|i| &registry.types[i]).collect())
}

fn identifiers(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_')).filter(|s| !s.is_empty())
}

/// The generated files plus the static files they need next to them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Output {
    pub files: BTreeMap<&'static str, Vec<u8>>,
    /// Names accepted by `static_file`.
    pub dependencies: Vec<&'static str>,
}

impl Output {
    pub fn file(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(|bytes| &bytes[..])
    }

    /// Writes the generated and static files into `dir`. Either every file is replaced or, if
    ///  staging fails, none is.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        let statics = self
            .dependencies
            .iter()
            .map(|&name| {
                static_file(name)
                    .map(|content| (name, content.as_bytes()))
                    .ok_or_else(|| Error::generation(name, "no such static file"))
            })
            .collect::<Result<Vec<_>>>()?;

        let generated = self.files.iter().map(|(&name, bytes)| (name, &bytes[..]));
        write_files(dir, generated.chain(statics))
    }
}

impl Registry {
    /// Generates the loader for `resolved` with `generator`.
    pub fn write_loader<G>(&self, resolved: &Resolved, generator: G) -> Result<Output>
    where G: Generator {
        let bindings = Bindings::collect(self, resolved)?;

        let mut header = Vec::new();
        generator.write_header(&bindings, &mut header)?;
        let mut source = Vec::new();
        generator.write_source(&bindings, &mut source)?;

        debug!(
            "generated {} ({} bytes) and {} ({} bytes)",
            HEADER_FILE,
            header.len(),
            SOURCE_FILE,
            source.len()
        );

        let mut files = BTreeMap::new();
        files.insert(HEADER_FILE, header);
        files.insert(SOURCE_FILE, source);

        Ok(Output { files, dependencies: static_file_names().collect() })
    }
}

/// This function generates a `#define name value` line, followed by the enum's group as a
///  comment if it has one.
pub fn gen_enum_item<W>(enm: &Enum, dest: &mut W) -> io::Result<()>
where W: io::Write {
    write!(
        dest,
        "#define {ident} {value}{suffix}",
        ident = enm.ident,
        value = enm.value,
        suffix = enm.suffix.as_deref().unwrap_or(""),
    )?;
    match enm.group {
        Some(ref group) => writeln!(dest, " /* {} */", group),
        None => writeln!(dest),
    }
}

/// Writes the type declarations exactly as the registry spells them.
pub fn gen_types<W>(types: &[&Type], dest: &mut W) -> io::Result<()>
where W: io::Write {
    for ty in types {
        writeln!(dest, "{}", ty.decl)?;
    }
    Ok(())
}

/// Generates the C parameter list of a `Cmd`, `void` if it takes none.
pub fn gen_parameters(cmd: &Cmd) -> String {
    if cmd.params.is_empty() {
        return "void".to_string();
    }

    cmd.params.iter().map(|param| gen_declarator(&param.ty, &param.ident)).collect::<Vec<_>>().join(", ")
}

/// `GLenum` + `mode` gives `GLenum mode`, `const GLchar *` + `label` gives `const GLchar *label`.
pub fn gen_declarator(ty: &str, ident: &str) -> String {
    if ty.ends_with('*') {
        format!("{}{}", ty, ident)
    } else {
        format!("{} {}", ty, ident)
    }
}

/// Example results: `"PFNGLCLEARPROC"`, `"PFNGLGETSTRINGIPROC"`.
pub fn gen_pfn_name(cmd: &str) -> String {
    format!("PFN{}PROC", cmd.to_ascii_uppercase())
}

/// Example results: `"glgen_glClear"`.
pub fn gen_pointer_name(cmd: &str) -> String {
    format!("{}{}", SYMBOL_PREFIX, cmd)
}

/// Example results: `"GLGEN_ARB_debug_output"` for `GL_ARB_debug_output`.
pub fn gen_extension_flag(ext: &str) -> String {
    format!("GLGEN_{}", ext.strip_prefix("GL_").unwrap_or(ext))
}
