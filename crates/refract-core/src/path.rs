use std::ffi::OsString;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A canonicalized absolute path.
///
/// Two identities that refer to the same file on disk compare equal, regardless of whether they
/// were produced from a relative path, a path with `..` segments or a symlink. Files that do not
/// exist (yet) fall back to lexical normalization.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileIdentity(PathBuf);

impl FileIdentity {
    /// Canonicalizes `path`, resolving it against the process working directory when relative.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.is_absolute() {
            return Self::canonicalize(path);
        }
        match std::env::current_dir() {
            Ok(cwd) => Self::canonicalize(&cwd.join(path)),
            Err(_) => Self::canonicalize(path),
        }
    }

    /// Canonicalizes `path`, resolving it against `base` when relative.
    ///
    /// This is how compilation database entries (`directory` + `file`) are turned into
    /// identities.
    pub fn resolve(base: &Path, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.is_absolute() {
            Self::canonicalize(path)
        } else {
            Self::canonicalize(&base.join(path))
        }
    }

    /// Wraps a path that is already known to be canonical without touching the file system.
    pub fn from_canonical(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    fn canonicalize(path: &Path) -> Self {
        match dunce::canonicalize(path) {
            Ok(path) => Self(path),
            Err(_) => Self(normalize_lexically(path)),
        }
    }

    #[inline]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }

    pub fn file_stem(&self) -> Option<&str> {
        self.0.file_stem().and_then(|s| s.to_str())
    }

    pub fn extension(&self) -> Option<&str> {
        self.0.extension().and_then(|s| s.to_str())
    }
}

impl AsRef<Path> for FileIdentity {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.display().fmt(f)
    }
}

/// Lexically normalizes a path: drops `.` segments and folds `..` into its parent.
///
/// This does not hit the file system and does not resolve symlinks.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut prefix: Option<OsString> = None;
    let mut has_root = false;
    let mut stack: Vec<OsString> = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(p) => prefix = Some(p.as_os_str().to_owned()),
            Component::RootDir => has_root = true,
            Component::CurDir => {}
            Component::ParentDir => match stack.last() {
                Some(last) if last != ".." => {
                    stack.pop();
                }
                // `/..` is `/`.
                _ if has_root => {}
                _ => stack.push(OsString::from("..")),
            },
            Component::Normal(segment) => stack.push(segment.to_owned()),
        }
    }

    let mut out = PathBuf::new();
    if let Some(prefix) = prefix {
        out.push(prefix);
    }
    if has_root {
        out.push(std::path::MAIN_SEPARATOR.to_string());
    }
    out.extend(stack);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexical_normalization_folds_dot_segments() {
        assert_eq!(
            normalize_lexically(Path::new("/a/./b/../c")),
            PathBuf::from("/a/c")
        );
        assert_eq!(normalize_lexically(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize_lexically(Path::new("../a")), PathBuf::from("../a"));
    }

    #[test]
    fn relative_and_absolute_spellings_share_an_identity() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("foo.cpp");
        std::fs::write(&file, "int x;").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let direct = FileIdentity::new(&file);
        let dotted = FileIdentity::new(dir.path().join("sub/../foo.cpp"));
        let resolved = FileIdentity::resolve(dir.path(), "./foo.cpp");
        assert_eq!(direct, resolved);
        assert_eq!(direct, dotted);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_share_an_identity() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("real.h");
        std::fs::write(&file, "int x;").unwrap();
        let link = dir.path().join("link.h");
        std::os::unix::fs::symlink(&file, &link).unwrap();

        assert_eq!(FileIdentity::new(&file), FileIdentity::new(&link));
    }

    #[cfg(unix)]
    #[test]
    fn missing_files_fall_back_to_lexical_normalization() {
        let id = FileIdentity::new("/definitely/not/./here/../there.cpp");
        assert_eq!(id.as_path(), Path::new("/definitely/not/there.cpp"));
    }
}
