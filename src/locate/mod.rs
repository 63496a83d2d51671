//! Tool lookup that tolerates an incomplete `PATH`.
//!
//! Live environments often start with a `PATH` that omits the sbin
//! directories, so installed administrative tools look missing. After the
//! regular search the locator checks a fixed list of conventional
//! directories.

use std::{
    env,
    ffi::OsString,
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use tracing::debug;

/// Probed in this order after the search path.
pub const FALLBACK_DIRS: &[&str] = &[
    "/usr/local/sbin",
    "/usr/sbin",
    "/sbin",
    "/usr/local/bin",
    "/usr/bin",
    "/bin",
];

#[derive(Debug, Clone)]
pub struct Locator {
    search_path: Option<OsString>,
    fallback_dirs: Vec<PathBuf>,
}

impl Default for Locator {
    fn default() -> Self {
        Self::from_env()
    }
}

impl Locator {
    pub fn from_env() -> Self {
        Self::new(
            env::var_os("PATH"),
            FALLBACK_DIRS.iter().map(PathBuf::from).collect(),
        )
    }

    pub fn new(search_path: Option<OsString>, fallback_dirs: Vec<PathBuf>) -> Self {
        Self { search_path, fallback_dirs }
    }

    /// Absolute path of `name`, or `None` when it is nowhere to be found.
    /// Not cached: every call looks again.
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));

        if name.contains('/') {
            let candidate = cwd.join(name);
            return is_executable(&candidate).then_some(candidate);
        }

        if let Some(paths) = self.search_path.as_ref().filter(|p| !p.is_empty()) {
            if let Ok(found) = which::which_in(name, Some(paths), &cwd) {
                if is_executable(&found) {
                    debug!(tool = name, path = %found.display(), "found on search path");
                    return Some(found);
                }
            }
        }

        for dir in &self.fallback_dirs {
            let candidate = dir.join(name);
            if is_executable(&candidate) {
                debug!(tool = name, path = %candidate.display(), "found in fallback directory");
                return Some(candidate);
            }
        }

        debug!(tool = name, "not found");
        None
    }
}

/// A regular file (after following symlinks) with any execute bit set.
pub fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn search_path_wins_over_fallback() {
        let bin = tempfile::tempdir().unwrap();
        let sbin = tempfile::tempdir().unwrap();
        let on_path = stub(bin.path(), "memtool", 0o755);
        stub(sbin.path(), "memtool", 0o755);

        let locator = Locator::new(
            Some(bin.path().as_os_str().to_owned()),
            vec![sbin.path().to_path_buf()],
        );
        assert_eq!(locator.locate("memtool"), Some(on_path));
    }

    #[test]
    fn fallback_dirs_checked_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        stub(second.path(), "memtool", 0o755);
        let expected = stub(first.path(), "memtool", 0o755);

        let locator = Locator::new(
            None,
            vec![first.path().to_path_buf(), second.path().to_path_buf()],
        );
        assert_eq!(locator.locate("memtool"), Some(expected));
    }

    #[test]
    fn non_executable_and_directories_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        stub(dir.path(), "plain", 0o644);
        fs::create_dir(dir.path().join("subdir")).unwrap();

        let locator = Locator::new(None, vec![dir.path().to_path_buf()]);
        assert_eq!(locator.locate("plain"), None);
        assert_eq!(locator.locate("subdir"), None);
        assert_eq!(locator.locate("absent"), None);
        assert_eq!(locator.locate(""), None);
    }

    #[test]
    fn explicit_path_is_checked_directly() {
        let dir = tempfile::tempdir().unwrap();
        let tool = stub(dir.path(), "memtool", 0o755);
        let locator = Locator::new(None, Vec::new());
        assert_eq!(locator.locate(tool.to_str().unwrap()), Some(tool));
    }
}
