////////////////////////////////////////////////////////////////////////////////////
// Copyright (c) 2020 DasEtwas - All Rights Reserved                               /
//      Unauthorized copying of this file, via any medium is strictly prohibited   /
//      Proprietary and confidential                                               /
////////////////////////////////////////////////////////////////////////////////////

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::{Error, Result};

/// Writes `files` (relative name, content) below `dir`.
///
/// Every file is first written in full to a temporary file next to its destination. Only once
///  all of them are staged are they renamed into place, so a failure while staging leaves the
///  previous outputs untouched and no temporary file behind.
pub fn write_files<'a, I>(dir: &Path, files: I) -> Result<()>
where I: IntoIterator<Item = (&'a str, &'a [u8])> {
    let mut staged: Vec<(NamedTempFile, PathBuf)> = Vec::new();

    for (name, contents) in files {
        let path = dir.join(name);
        let parent = path.parent().unwrap_or(dir);
        let fail = |source| Error::Write { path: path.clone(), source };

        fs::create_dir_all(parent).map_err(fail)?;
        let mut tmp = NamedTempFile::new_in(parent).map_err(fail)?;
        tmp.write_all(contents).map_err(fail)?;
        tmp.as_file().sync_all().map_err(fail)?;

        staged.push((tmp, path));
    }

    for (tmp, path) in staged {
        debug!("writing {}", path.display());
        tmp.persist(&path).map_err(|err| Error::Write { path, source: err.error })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    #[test]
    fn writes_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), vec![("a.h", &b"one"[..]), ("KHR/b.h", &b"two"[..])]).unwrap();

        assert_eq!(fs::read(dir.path().join("a.h")).unwrap(), b"one");
        assert_eq!(fs::read(dir.path().join("KHR/b.h")).unwrap(), b"two");
        assert_eq!(entries(dir.path()), vec!["KHR", "a.h"]);
    }

    #[test]
    fn replaces_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.h"), "stale").unwrap();
        write_files(dir.path(), vec![("a.h", &b"fresh"[..])]).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("a.h")).unwrap(), "fresh");
    }

    #[test]
    fn failed_staging_leaves_previous_outputs_alone() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("gl_loader.h"), "previous").unwrap();
        // a plain file where a directory is needed makes staging fail
        fs::write(dir.path().join("KHR"), "not a directory").unwrap();

        let files = vec![("gl_loader.h", &b"next"[..]), ("KHR/khrplatform.h", &b"khr"[..])];
        match write_files(dir.path(), files) {
            Err(Error::Write { path, .. }) => assert_eq!(path, dir.path().join("KHR/khrplatform.h")),
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(fs::read_to_string(dir.path().join("gl_loader.h")).unwrap(), "previous");
        assert_eq!(entries(dir.path()), vec!["KHR", "gl_loader.h"]);
    }
}
