////////////////////////////////////////////////////////////////////////////////////
// Copyright (c) 2020 DasEtwas - All Rights Reserved                               /
//      Unauthorized copying of this file, via any medium is strictly prohibited   /
//      Proprietary and confidential                                               /
////////////////////////////////////////////////////////////////////////////////////

use std::io;

use super::{gen_enum_item, gen_extension_flag, gen_parameters, gen_pfn_name, gen_pointer_name, gen_types, Bindings, HEADER_FILE};
use crate::{resolve::Resolved, Platform};

/// Generates a C header and loader source. The way entry points are looked up is chosen from
///  the resolved platform once, when the loader is generated.
#[allow(missing_copy_implementations)]
pub struct CLoaderGenerator;

impl super::Generator for CLoaderGenerator {
    fn write_header<W>(&self, bindings: &Bindings, dest: &mut W) -> io::Result<()>
    where W: io::Write {
        write_banner(bindings.resolved, dest)?;
        write_header_open(dest)?;
        write_types(bindings, dest)?;
        write_feature_macros(bindings.resolved, dest)?;
        write_enums(bindings, dest)?;
        write_pfn_typedefs(bindings, dest)?;
        write_pointer_decls(bindings, dest)?;
        write_detection_decls(bindings.resolved, dest)?;
        write_header_close(dest)
    }

    fn write_source<W>(&self, bindings: &Bindings, dest: &mut W) -> io::Result<()>
    where W: io::Write {
        let platform = bindings.resolved.platform;
        write_banner(bindings.resolved, dest)?;
        write_source_includes(platform, dest)?;
        write_pointer_defs(bindings, dest)?;
        write_detection_defs(bindings.resolved, dest)?;
        write_get_proc(platform, dest)?;
        write_detect_fn(bindings.resolved, dest)?;
        write_load_fn(bindings, dest)
    }
}

fn write_banner<W>(resolved: &Resolved, dest: &mut W) -> io::Result<()>
where W: io::Write {
    writeln!(
        dest,
        "/* Generated by glgen for {api} {profile} {version} on {platform}. Do not edit. */\n",
        api = resolved.api,
        profile = resolved.profile,
        version = resolved.version.map_or_else(|| "(no version)".to_string(), |v| v.to_string()),
        platform = resolved.platform,
    )
}

fn write_header_open<W>(dest: &mut W) -> io::Result<()>
where W: io::Write {
    writeln!(
        dest,
        r#"#ifndef GLGEN_GL_LOADER_H
#define GLGEN_GL_LOADER_H

#include "gl_platform.h"

#ifdef __cplusplus
extern "C" {{
#endif
"#
    )
}

fn write_types<W>(bindings: &Bindings, dest: &mut W) -> io::Result<()>
where W: io::Write {
    if bindings.types.is_empty() {
        return Ok(());
    }
    gen_types(&bindings.types, dest)?;
    writeln!(dest)
}

/// Creates a `#define GL_VERSION_x_y 1` per folded feature and a `#define <extension> 1` per
///  requested extension.
fn write_feature_macros<W>(resolved: &Resolved, dest: &mut W) -> io::Result<()>
where W: io::Write {
    for name in resolved.features.iter().chain(resolved.extensions.iter()) {
        writeln!(dest, "#define {} 1", name)?;
    }
    writeln!(dest)
}

fn write_enums<W>(bindings: &Bindings, dest: &mut W) -> io::Result<()>
where W: io::Write {
    if bindings.enums.is_empty() {
        return Ok(());
    }
    for enm in &bindings.enums {
        gen_enum_item(enm, dest)?;
    }
    writeln!(dest)
}

fn write_pfn_typedefs<W>(bindings: &Bindings, dest: &mut W) -> io::Result<()>
where W: io::Write {
    if bindings.cmds.is_empty() {
        return Ok(());
    }
    for cmd in &bindings.cmds {
        writeln!(
            dest,
            "typedef {ret} (APIENTRYP {pfn})({params});",
            ret = cmd.proto.ty,
            pfn = gen_pfn_name(&cmd.proto.ident),
            params = gen_parameters(cmd),
        )?;
    }
    writeln!(dest)
}

/// Declares one pointer per command and maps the plain GL name onto it.
fn write_pointer_decls<W>(bindings: &Bindings, dest: &mut W) -> io::Result<()>
where W: io::Write {
    for cmd in &bindings.cmds {
        writeln!(
            dest,
            "GLGEN_API {pfn} {ptr};\n#define {name} {ptr}",
            pfn = gen_pfn_name(&cmd.proto.ident),
            ptr = gen_pointer_name(&cmd.proto.ident),
            name = cmd.proto.ident,
        )?;
    }
    if !bindings.cmds.is_empty() {
        writeln!(dest)?;
    }
    Ok(())
}

/// Declares the version and extension flags `glgen_load` fills in from the current context.
fn write_detection_decls<W>(resolved: &Resolved, dest: &mut W) -> io::Result<()>
where W: io::Write {
    writeln!(
        dest,
        r#"/* The context version as GLGEN_VERSION(major, minor), or 0 if unknown. Set by glgen_load. */
#define GLGEN_VERSION(major, minor) ((major) * 16 + (minor))
GLGEN_API int glgen_version;
"#
    )?;

    if resolved.extensions.is_empty() {
        return Ok(());
    }
    writeln!(dest, "/* Nonzero when the context advertises the extension. Set by glgen_load. */")?;
    for ext in &resolved.extensions {
        writeln!(dest, "GLGEN_API int {};", gen_extension_flag(ext))?;
    }
    writeln!(dest)
}

fn write_header_close<W>(dest: &mut W) -> io::Result<()>
where W: io::Write {
    writeln!(
        dest,
        r#"/* Resolves every entry point, then sets glgen_version and the extension flags from the
   current context. Returns the number of required entry points which could not be found,
   or -1 if the OpenGL library could not be opened. */
GLGEN_API int glgen_load(void);

#ifdef __cplusplus
}}
#endif

#endif"#
    )
}

/// Platform headers come first so that they get to define `APIENTRY` themselves.
fn write_source_includes<W>(platform: Platform, dest: &mut W) -> io::Result<()>
where W: io::Write {
    match platform {
        Platform::Windows => writeln!(dest, "#define WIN32_LEAN_AND_MEAN\n#include <windows.h>")?,
        Platform::MacOs => writeln!(dest, "#include <dlfcn.h>")?,
        Platform::Linux => {},
    }
    writeln!(dest, "#include <stdlib.h>\n#include <string.h>\n")?;
    writeln!(dest, "#include \"{}\"\n", HEADER_FILE)
}

fn write_pointer_defs<W>(bindings: &Bindings, dest: &mut W) -> io::Result<()>
where W: io::Write {
    for cmd in &bindings.cmds {
        writeln!(dest, "{} {};", gen_pfn_name(&cmd.proto.ident), gen_pointer_name(&cmd.proto.ident))?;
    }
    if !bindings.cmds.is_empty() {
        writeln!(dest)?;
    }
    Ok(())
}

fn write_detection_defs<W>(resolved: &Resolved, dest: &mut W) -> io::Result<()>
where W: io::Write {
    writeln!(dest, "int glgen_version;")?;
    for ext in &resolved.extensions {
        writeln!(dest, "int {};", gen_extension_flag(ext))?;
    }
    writeln!(dest)
}

/// Creates the static `glgen_get_proc` lookup and, where one is needed, the library handle
///  it resolves against.
fn write_get_proc<W>(platform: Platform, dest: &mut W) -> io::Result<()>
where W: io::Write {
    match platform {
        // wglGetProcAddress only knows entry points added after OpenGL 1.1, the rest are
        //  exported by opengl32.dll itself
        Platform::Windows => writeln!(
            dest,
            r#"static HMODULE glgen_library;

static void *glgen_get_proc(const char *name)
{{
    PROC proc = wglGetProcAddress(name);
    if (proc == NULL || proc == (PROC) 1 || proc == (PROC) 2 || proc == (PROC) 3 || proc == (PROC) -1)
        proc = GetProcAddress(glgen_library, name);
    return (void *) proc;
}}
"#
        ),
        Platform::MacOs => writeln!(
            dest,
            r#"static void *glgen_library;

static void *glgen_get_proc(const char *name)
{{
    return dlsym(glgen_library, name);
}}
"#
        ),
        Platform::Linux => writeln!(
            dest,
            r#"extern void (*glXGetProcAddressARB(const unsigned char *procName))(void);

static void *glgen_get_proc(const char *name)
{{
    return (void *) glXGetProcAddressARB((const unsigned char *) name);
}}
"#
        ),
    }
}

/// Creates `glgen_detect`, which reads the context version from `GL_VERSION`, or from
///  `GL_MAJOR_VERSION` and `GL_MINOR_VERSION` on 3.0 and later, and sets the flag of every
///  requested extension the context advertises.
fn write_detect_fn<W>(resolved: &Resolved, dest: &mut W) -> io::Result<()>
where W: io::Write {
    writeln!(
        dest,
        r#"#define GLGEN_GL_VERSION 0x1F02
#define GLGEN_GL_EXTENSIONS 0x1F03
#define GLGEN_GL_MAJOR_VERSION 0x821B
#define GLGEN_GL_MINOR_VERSION 0x821C
#define GLGEN_GL_NUM_EXTENSIONS 0x821D

typedef const unsigned char *(APIENTRYP glgen_get_string_fn)(unsigned int name);
typedef const unsigned char *(APIENTRYP glgen_get_stringi_fn)(unsigned int name, unsigned int index);
typedef void (APIENTRYP glgen_get_integerv_fn)(unsigned int pname, int *data);

static int glgen_parse_version(const char *text)
{{
    char *end;
    long major, minor;

    while (*text && (*text < '0' || *text > '9'))
        text++;
    major = strtol(text, &end, 10);
    if (end == text || *end != '.')
        return 0;
    text = end + 1;
    minor = strtol(text, &end, 10);
    if (end == text)
        return 0;
    return GLGEN_VERSION((int) major, minor > 15 ? 15 : (int) minor);
}}
"#
    )?;

    if !resolved.extensions.is_empty() {
        write_extension_table(resolved, dest)?;
    }

    writeln!(
        dest,
        r#"static void glgen_detect(void)
{{
    glgen_get_string_fn get_string = (glgen_get_string_fn) glgen_get_proc("glGetString");
    glgen_get_integerv_fn get_integerv = (glgen_get_integerv_fn) glgen_get_proc("glGetIntegerv");
    const char *version;
    int major = 0, minor = 0;

    glgen_version = 0;"#
    )?;
    for ext in &resolved.extensions {
        writeln!(dest, "    {} = 0;", gen_extension_flag(ext))?;
    }
    writeln!(
        dest,
        r#"    if (!get_string || !get_integerv)
        return;
    version = (const char *) get_string(GLGEN_GL_VERSION);
    if (!version)
        return;
    glgen_version = glgen_parse_version(version);
    if (glgen_version >= GLGEN_VERSION(3, 0)) {{
        get_integerv(GLGEN_GL_MAJOR_VERSION, &major);
        get_integerv(GLGEN_GL_MINOR_VERSION, &minor);
        if (major >= 3)
            glgen_version = GLGEN_VERSION(major, minor > 15 ? 15 : minor);
    }}"#
    )?;

    if !resolved.extensions.is_empty() {
        writeln!(
            dest,
            r#"
    if (glgen_version < GLGEN_VERSION(3, 0)) {{
        const char *p = (const char *) get_string(GLGEN_GL_EXTENSIONS);
        const char *q;

        while (p && *p) {{
            q = strchr(p, ' ');
            if (!q)
                q = p + strlen(p);
            glgen_set_extension(p, (size_t) (q - p));
            p = *q ? q + 1 : q;
        }}
    }} else {{
        glgen_get_stringi_fn get_stringi = (glgen_get_stringi_fn) glgen_get_proc("glGetStringi");
        const char *name;
        int count = 0, i;

        if (get_stringi)
            get_integerv(GLGEN_GL_NUM_EXTENSIONS, &count);
        for (i = 0; i < count; i++) {{
            name = (const char *) get_stringi(GLGEN_GL_EXTENSIONS, (unsigned int) i);
            if (name)
                glgen_set_extension(name, strlen(name));
        }}
    }}"#
        )?;
    }

    writeln!(dest, "}}\n")
}

/// The requested extensions' names next to their flags, for matching the names the context
///  reports.
fn write_extension_table<W>(resolved: &Resolved, dest: &mut W) -> io::Result<()>
where W: io::Write {
    writeln!(dest, "static const char *const glgen_extension_names[] = {{")?;
    for ext in &resolved.extensions {
        writeln!(dest, "    \"{}\",", ext)?;
    }
    writeln!(dest, "}};\n\nstatic int *const glgen_extension_flags[] = {{")?;
    for ext in &resolved.extensions {
        writeln!(dest, "    &{},", gen_extension_flag(ext))?;
    }
    writeln!(
        dest,
        r#"}};

static void glgen_set_extension(const char *name, size_t len)
{{
    size_t i;

    for (i = 0; i < sizeof(glgen_extension_names) / sizeof(glgen_extension_names[0]); i++) {{
        if (strlen(glgen_extension_names[i]) == len && !memcmp(glgen_extension_names[i], name, len))
            *glgen_extension_flags[i] = 1;
    }}
}}
"#
    )
}

fn write_library_open<W>(platform: Platform, dest: &mut W) -> io::Result<()>
where W: io::Write {
    let open = match platform {
        Platform::Windows => "LoadLibraryA(\"opengl32.dll\")",
        Platform::MacOs => "dlopen(\"/System/Library/Frameworks/OpenGL.framework/OpenGL\", RTLD_LAZY | RTLD_LOCAL)",
        Platform::Linux => return Ok(()),
    };
    writeln!(
        dest,
        "    if (!glgen_library)\n        glgen_library = {};\n    if (!glgen_library)\n        return -1;\n",
        open
    )
}

/// Creates `glgen_load`, which assigns every pointer and counts the required ones that stayed
///  null.
fn write_load_fn<W>(bindings: &Bindings, dest: &mut W) -> io::Result<()>
where W: io::Write {
    writeln!(dest, "int glgen_load(void)\n{{\n    int missing = 0;\n")?;

    write_library_open(bindings.resolved.platform, dest)?;

    for cmd in &bindings.cmds {
        let ptr = gen_pointer_name(&cmd.proto.ident);
        let pfn = gen_pfn_name(&cmd.proto.ident);
        writeln!(dest, "    {} = ({}) glgen_get_proc(\"{}\");", ptr, pfn, cmd.proto.ident)?;
        if let Some(ref alias) = cmd.alias {
            writeln!(dest, "    if (!{ptr})\n        {ptr} = ({pfn}) glgen_get_proc(\"{alias}\");", ptr = ptr, pfn = pfn, alias = alias)?;
        }
        if !bindings.is_optional(cmd) {
            writeln!(dest, "    if (!{})\n        missing++;", ptr)?;
        }
    }

    writeln!(dest, "\n    glgen_detect();\n    return missing;\n}}")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        generators::Generator,
        registry::{Api, Binding, Cmd, Interface, Profile, Version},
    };

    fn cmd(ret: &str, name: &str, params: &[(&str, &str)]) -> Cmd {
        let binding = |ty: &str, ident: &str| Binding { ident: ident.to_string(), ty: ty.to_string(), ptype: None };
        Cmd { proto: binding(ret, name), params: params.iter().map(|&(ty, ident)| binding(ty, ident)).collect(), alias: None }
    }

    fn resolved(platform: Platform, optional: &[&str]) -> Resolved {
        Resolved {
            api: Api::Gl,
            profile: Profile::Core,
            platform,
            version: Some(Version(1, 0)),
            features: vec!["GL_VERSION_1_0".to_string()],
            extensions: Vec::new(),
            interface: Interface::default(),
            optional: optional.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    fn source(platform: Platform, cmds: &[&Cmd], optional: &[&str]) -> String {
        let resolved = resolved(platform, optional);
        let bindings = Bindings { resolved: &resolved, types: Vec::new(), enums: Vec::new(), cmds: cmds.to_vec() };
        let mut out = Vec::new();
        CLoaderGenerator.write_source(&bindings, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn windows_falls_back_to_opengl32() {
        let clear = cmd("void", "glClear", &[("GLbitfield", "mask")]);
        let src = source(Platform::Windows, &[&clear], &[]);
        assert!(src.starts_with("/* Generated by glgen for gl core 1.0 on windows. Do not edit. */"));
        assert!(src.find("#include <windows.h>").unwrap() < src.find("#include \"gl_loader.h\"").unwrap());
        assert!(src.contains("wglGetProcAddress(name)"));
        assert!(src.contains("GetProcAddress(glgen_library, name)"));
        assert!(src.contains("glgen_library = LoadLibraryA(\"opengl32.dll\");"));
        assert!(!src.contains("dlsym"));
        assert!(!src.contains("glXGetProcAddressARB"));
    }

    #[test]
    fn macos_uses_the_framework() {
        let clear = cmd("void", "glClear", &[("GLbitfield", "mask")]);
        let src = source(Platform::MacOs, &[&clear], &[]);
        assert!(src.contains("#include <dlfcn.h>"));
        assert!(src.contains("dlopen(\"/System/Library/Frameworks/OpenGL.framework/OpenGL\", RTLD_LAZY | RTLD_LOCAL)"));
        assert!(src.contains("return dlsym(glgen_library, name);"));
        assert!(!src.contains("wglGetProcAddress"));
    }

    #[test]
    fn linux_uses_glx() {
        let clear = cmd("void", "glClear", &[("GLbitfield", "mask")]);
        let src = source(Platform::Linux, &[&clear], &[]);
        assert!(src.contains("glXGetProcAddressARB((const unsigned char *) name)"));
        assert!(!src.contains("glgen_library"));
        assert!(!src.contains("return -1;"));
    }

    #[test]
    fn optional_entry_points_are_not_counted() {
        let clear = cmd("void", "glClear", &[("GLbitfield", "mask")]);
        let debug = cmd("void", "glDebugMessageCallbackARB", &[("GLDEBUGPROCARB", "callback"), ("const void *", "userParam")]);
        let src = source(Platform::Linux, &[&clear, &debug], &["glDebugMessageCallbackARB"]);

        let expected = r#"int glgen_load(void)
{
    int missing = 0;

    glgen_glClear = (PFNGLCLEARPROC) glgen_get_proc("glClear");
    if (!glgen_glClear)
        missing++;
    glgen_glDebugMessageCallbackARB = (PFNGLDEBUGMESSAGECALLBACKARBPROC) glgen_get_proc("glDebugMessageCallbackARB");

    glgen_detect();
    return missing;
}
"#;
        assert_eq!(&src[src.find("int glgen_load(void)").unwrap()..], expected);
    }

    #[test]
    fn aliases_are_looked_up_when_the_command_is_missing() {
        let mut debug = cmd("void", "glDebugMessageCallbackARB", &[("GLDEBUGPROCARB", "callback"), ("const void *", "userParam")]);
        debug.alias = Some("glDebugMessageCallback".to_string());
        let src = source(Platform::Linux, &[&debug], &[]);

        let expected = r#"    glgen_glDebugMessageCallbackARB = (PFNGLDEBUGMESSAGECALLBACKARBPROC) glgen_get_proc("glDebugMessageCallbackARB");
    if (!glgen_glDebugMessageCallbackARB)
        glgen_glDebugMessageCallbackARB = (PFNGLDEBUGMESSAGECALLBACKARBPROC) glgen_get_proc("glDebugMessageCallback");
    if (!glgen_glDebugMessageCallbackARB)
        missing++;
"#;
        assert!(src.contains(expected), "{}", src);
    }

    #[test]
    fn detection_reads_the_version_and_sets_extension_flags() {
        let clear = cmd("void", "glClear", &[("GLbitfield", "mask")]);
        let mut resolved = resolved(Platform::Linux, &[]);
        resolved.extensions = vec!["GL_ARB_debug_output".to_string(), "GL_EXT_texture_filter_anisotropic".to_string()];
        let bindings = Bindings { resolved: &resolved, types: Vec::new(), enums: Vec::new(), cmds: vec![&clear] };

        let mut out = Vec::new();
        CLoaderGenerator.write_header(&bindings, &mut out).unwrap();
        let header = String::from_utf8(out).unwrap();
        assert!(header.contains("GLGEN_API int glgen_version;\n"));
        assert!(header.contains("GLGEN_API int GLGEN_ARB_debug_output;\nGLGEN_API int GLGEN_EXT_texture_filter_anisotropic;\n"));

        let mut out = Vec::new();
        CLoaderGenerator.write_source(&bindings, &mut out).unwrap();
        let src = String::from_utf8(out).unwrap();
        assert!(src.contains("int glgen_version;\nint GLGEN_ARB_debug_output;\nint GLGEN_EXT_texture_filter_anisotropic;\n"));
        assert!(src.contains(
            "static const char *const glgen_extension_names[] = {\n    \"GL_ARB_debug_output\",\n    \"GL_EXT_texture_filter_anisotropic\",\n};"
        ));
        assert!(src.contains("    &GLGEN_ARB_debug_output,\n    &GLGEN_EXT_texture_filter_anisotropic,\n};"));
        assert!(src.contains("get_string(GLGEN_GL_EXTENSIONS)"));
        assert!(src.contains("glgen_get_proc(\"glGetStringi\")"));
        assert!(src.contains("get_integerv(GLGEN_GL_MAJOR_VERSION, &major);"));
        assert!(src.find("static void glgen_detect(void)").unwrap() < src.find("int glgen_load(void)").unwrap());

        // without extensions there is nothing to match names against
        let src = source(Platform::Linux, &[&clear], &[]);
        assert!(src.contains("static void glgen_detect(void)"));
        assert!(!src.contains("glgen_extension_names"));
        assert!(!src.contains("glGetStringi"));
    }
}
