#![allow(dead_code)]

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use gl_loader_gen::{Api, Platform, Profile, Registry, Request, Version};

pub fn fixture_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join("mini_gl.xml")
}

pub fn registry(profile: Profile) -> Registry {
    Registry::load(fixture_path(), Api::Gl, profile).unwrap()
}

pub fn request(version: Version, platform: Platform, extensions: &[&str]) -> Request {
    Request::new(version, platform, extensions.iter().copied())
}

pub fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn text(bytes: &[u8]) -> String {
    String::from_utf8(bytes.to_vec()).unwrap()
}
