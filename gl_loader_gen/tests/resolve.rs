extern crate gl_loader_gen;
extern crate pretty_assertions;

mod common;

use gl_loader_gen::{Api, Error, Platform, Profile, Registry, Version};
use pretty_assertions::assert_eq;

use common::{fixture_path, names, registry, request};

#[test]
fn core_profile_drops_removed_symbols() {
    let core = registry(Profile::Core);

    let before = core.core_interface(Version(3, 0), Profile::Core);
    assert!(before.commands.contains("glAccum"));
    assert!(before.enums.contains("GL_ACCUM_RED_BITS"));

    let after = core.core_interface(Version(3, 2), Profile::Core);
    assert!(!after.commands.contains("glAccum"));
    assert!(!after.enums.contains("GL_ACCUM_RED_BITS"));
    assert!(after.commands.contains("glGetInteger64v"));

    let compat = registry(Profile::Compatibility);
    let kept = compat.core_interface(Version(3, 2), Profile::Compatibility);
    assert!(kept.commands.contains("glAccum"));
    assert!(kept.enums.contains("GL_ACCUM_RED_BITS"));
}

#[test]
fn compatibility_interfaces_only_grow() {
    let registry = registry(Profile::Compatibility);
    let versions = registry.versions().collect::<Vec<_>>();
    assert_eq!(versions, vec![Version(1, 0), Version(1, 1), Version(3, 0), Version(3, 2)]);

    for pair in versions.windows(2) {
        let lower = registry.core_interface(pair[0], Profile::Compatibility);
        let upper = registry.core_interface(pair[1], Profile::Compatibility);
        assert!(lower.commands.is_subset(&upper.commands), "{} -> {}", pair[0], pair[1]);
        assert!(lower.enums.is_subset(&upper.enums), "{} -> {}", pair[0], pair[1]);
    }
}

#[test]
fn resolved_symbols_are_defined() {
    let registry = registry(Profile::Compatibility);
    let extensions = registry.extension_names().collect::<Vec<_>>();
    let req = request(Version(3, 2), Platform::MacOs, &extensions);
    let resolved = registry.resolve(&req).unwrap();

    for cmd in resolved.commands() {
        assert!(registry.cmds.contains_key(cmd), "{}", cmd);
    }
    for enm in resolved.enums() {
        assert!(registry.enums.contains_key(enm), "{}", enm);
    }
    assert!(resolved.commands().any(|c| c == "glWindowPos2iMESA"));
}

#[test]
fn unknown_extensions_fail() {
    let registry = registry(Profile::Core);
    let req = request(Version(3, 2), Platform::Linux, &["GL_ARB_debug_output", "GL_FAKE_ext_does_not_exist"]);
    match registry.resolve(&req) {
        Err(Error::UnknownExtension { name }) => assert_eq!(name, "GL_FAKE_ext_does_not_exist"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn extensions_of_other_profiles_are_unknown() {
    let core = registry(Profile::Core);
    let req = request(Version(3, 2), Platform::Linux, &["GL_MESA_window_pos"]);
    assert!(matches!(core.resolve(&req), Err(Error::UnknownExtension { .. })));

    let compat = registry(Profile::Compatibility);
    let req = request(Version(3, 2), Platform::Linux, &["GL_MESA_window_pos"]);
    let resolved = compat.resolve(&req).unwrap();
    assert_eq!(resolved.optional, names(&["glWindowPos2iMESA"]));
}

#[test]
fn platform_restricted_extensions() {
    let registry = registry(Profile::Core);

    let linux = request(Version(3, 2), Platform::Linux, &["GL_APPLE_flush_render"]);
    match registry.resolve(&linux) {
        Err(Error::UnsupportedPlatform { extension, platform }) => {
            assert_eq!(extension, "GL_APPLE_flush_render");
            assert_eq!(platform, Platform::Linux);
        },
        other => panic!("unexpected {:?}", other),
    }

    let forced = registry.resolve(&linux.clone().allow_unsupported_platform(true)).unwrap();
    assert!(forced.commands().any(|c| c == "glFlushRenderAPPLE"));
    assert!(forced.is_optional("glFlushRenderAPPLE"));

    let osx = request(Version(3, 2), Platform::MacOs, &["GL_APPLE_flush_render"]);
    let native = registry.resolve(&osx).unwrap();
    assert_eq!(native.interface, forced.interface);
}

#[test]
fn extension_commands_in_core_stay_required() {
    let registry = registry(Profile::Core);

    let old = registry.resolve(&request(Version(1, 1), Platform::Linux, &["GL_EXT_string_indexed"])).unwrap();
    assert_eq!(old.optional, names(&["glGetStringi"]));

    let new = registry.resolve(&request(Version(3, 0), Platform::Linux, &["GL_EXT_string_indexed"])).unwrap();
    assert!(new.optional.is_empty());
    assert!(new.commands().any(|c| c == "glGetStringi"));
}

#[test]
fn requested_extensions_are_deduplicated() {
    let registry = registry(Profile::Core);
    let req = request(
        Version(3, 2),
        Platform::Linux,
        &["GL_EXT_texture_filter_anisotropic", "GL_ARB_debug_output", "GL_ARB_debug_output"],
    );

    let resolved = registry.resolve(&req).unwrap();
    assert_eq!(resolved.extensions, vec!["GL_ARB_debug_output".to_string(), "GL_EXT_texture_filter_anisotropic".to_string()]);
    assert_eq!(resolved.optional, names(&["glDebugMessageCallbackARB", "glDebugMessageControlARB"]));
    assert!(resolved.enums().any(|e| e == "GL_TEXTURE_MAX_ANISOTROPY_EXT"));
    assert_eq!(registry.resolve(&req).unwrap(), resolved);
}

#[test]
fn versions_above_the_registry_clamp() {
    let registry = registry(Profile::Core);
    let resolved = registry.resolve(&request(Version(4, 6), Platform::Windows, &[])).unwrap();
    assert_eq!(resolved.version, Some(Version(3, 2)));
    assert_eq!(resolved.features, vec!["GL_VERSION_1_0", "GL_VERSION_1_1", "GL_VERSION_3_0", "GL_VERSION_3_2"]);
    assert_eq!(resolved.interface, registry.core_interface(Version(3, 2), Profile::Core));
}

#[test]
fn embedded_apis_select_their_own_definitions() {
    let registry = Registry::load(fixture_path(), Api::Gles2, Profile::Core).unwrap();
    assert_eq!(registry.versions().collect::<Vec<_>>(), vec![Version(2, 0)]);
    assert_eq!(
        registry.extension_names().collect::<Vec<_>>(),
        vec!["GL_EXT_texture_filter_anisotropic", "GL_OES_fixed_point"]
    );
    assert!(registry.types.iter().any(|ty| ty.name == "GLfixed"));

    let iface = registry.core_interface(Version(2, 0), Profile::Core);
    assert_eq!(iface.commands, names(&["glClear", "glGetString"]));
    assert_eq!(iface.enums, names(&["GL_FALSE", "GL_TEXTURE_MAX_ANISOTROPY"]));

    let desktop = common::registry(Profile::Core);
    assert!(!desktop.enums.contains_key("GL_TEXTURE_MAX_ANISOTROPY"));
    assert!(!desktop.types.iter().any(|ty| ty.name == "GLfixed"));
}
