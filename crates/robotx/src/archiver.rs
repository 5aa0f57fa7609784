use std::{
    ffi::OsStr,
    fs::File,
    io::{self, Seek, Write},
    path::{Path, PathBuf, StripPrefixError},
};

use derive_more::{Display, Error, From};
use walkdir::WalkDir;
use zip::{write::FileOptions, ZipWriter};

/// Directory names that never belong in an uploaded source bundle:
/// version-control metadata, dependency caches, previous build output,
/// and OS metadata. A path is excluded when any segment matches.
const EXCLUDED_SEGMENTS: &[&str] = &[
    "node_modules",
    ".git",
    ".next",
    "dist",
    "build",
    ".DS_Store",
    "__pycache__",
    ".venv",
    "venv",
];

/// Errors that may occur during the archive creation process.
#[derive(Debug, Display, From, Error)]
pub(crate) enum ArchiverError {
    /// [`zip`]-crate specific error.
    Zip(zip::result::ZipError),

    /// [`walkdir`]-crate specific error.
    WalkDir(walkdir::Error),

    /// IO error.
    Io(io::Error),

    /// Unable to strip the bundle root prefix from an entry path.
    StripPrefix(StripPrefixError),

    /// Entry path cannot be represented as an archive name.
    #[display(fmt = "path contains non-unicode symbols: {}", "_0.display()")]
    NonUnicodePath(#[error(not(source))] PathBuf),
}

/// Archive a source tree into `file`, skipping excluded directories.
///
/// Regular files are stored under their path relative to `root`;
/// directories themselves are not stored as entries. Any IO failure
/// aborts the walk, so the caller never observes a partial bundle as a
/// successful result.
pub(crate) fn bundle_source<W: Write + Seek>(root: &Path, file: W) -> Result<W, ArchiverError> {
    write_bundle(root, file, true)
}

/// Archive a directory tree into `file` without filtering.
///
/// Used for build output directories, which are uploaded verbatim.
pub(crate) fn bundle_directory<W: Write + Seek>(root: &Path, file: W) -> Result<W, ArchiverError> {
    write_bundle(root, file, false)
}

/// Shared walk-and-write implementation behind both entry points.
fn write_bundle<W: Write + Seek>(
    root: &Path,
    file: W,
    filtered: bool,
) -> Result<W, ArchiverError> {
    let mut writer = ZipWriter::new(file);

    let entries = WalkDir::new(root).into_iter().filter_entry(move |entry| {
        entry.depth() == 0 || !filtered || !is_excluded(entry.file_name())
    });

    for entry in entries {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root)?;
        let Some(name) = relative.to_str() else {
            return Err(ArchiverError::NonUnicodePath(entry.path().to_owned()));
        };
        writer.start_file(name, FileOptions::default())?;
        io::copy(&mut File::open(entry.path())?, &mut writer)?;
    }

    Ok(writer.finish()?)
}

/// Whether a path segment is on the exclusion denylist.
fn is_excluded(name: &OsStr) -> bool {
    name.to_str()
        .map_or(false, |name| EXCLUDED_SEGMENTS.contains(&name))
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeSet, fs, io::SeekFrom};

    use super::*;

    /// Create a file, including its parent directories, under `root`.
    fn write_file(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    /// Entry names of a finished bundle.
    fn entry_names(mut file: File) -> BTreeSet<String> {
        file.seek(SeekFrom::Start(0)).unwrap();
        let archive = zip::ZipArchive::new(file).unwrap();
        archive.file_names().map(ToOwned::to_owned).collect()
    }

    #[test]
    fn source_bundle_contains_only_non_excluded_files() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "index.html", "<html></html>");
        write_file(dir.path(), "src/app.js", "console.log(1)");
        write_file(dir.path(), "node_modules/pkg/index.js", "skip");
        write_file(dir.path(), "src/node_modules/dep/index.js", "skip nested");
        write_file(dir.path(), ".git/config", "skip");
        write_file(dir.path(), "docs/dist/bundle.js", "skip at depth");

        let file = bundle_source(dir.path(), tempfile::tempfile().unwrap()).unwrap();
        let names = entry_names(file);

        assert_eq!(
            names,
            BTreeSet::from(["index.html".to_owned(), "src/app.js".to_owned()])
        );
    }

    #[test]
    fn directory_bundle_keeps_everything() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "dist-inner/main.css", "body{}");
        write_file(dir.path(), ".git/config", "kept here");

        let file = bundle_directory(dir.path(), tempfile::tempfile().unwrap()).unwrap();
        let names = entry_names(file);

        assert_eq!(
            names,
            BTreeSet::from(["dist-inner/main.css".to_owned(), ".git/config".to_owned()])
        );
    }

    #[test]
    fn source_root_named_like_an_excluded_segment_is_still_bundled() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("build");
        fs::create_dir(&root).unwrap();
        write_file(&root, "output.txt", "kept");

        let file = bundle_source(&root, tempfile::tempfile().unwrap()).unwrap();
        assert_eq!(entry_names(file), BTreeSet::from(["output.txt".to_owned()]));
    }

    #[test]
    fn empty_tree_produces_an_empty_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let file = bundle_source(dir.path(), tempfile::tempfile().unwrap()).unwrap();
        assert!(entry_names(file).is_empty());
    }
}
