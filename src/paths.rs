use std::io;
use std::path::{Path, PathBuf};

use dirs_next::home_dir;

/// Replaces a leading `~` with `home`.
///
/// Only the bare `~`, `~/...` and `~\...` forms are expanded. `~user` and every other path
/// come back untouched.
pub fn expand_home_with(path: &Path, home: &Path) -> PathBuf {
    match home_relative(path) {
        Some("") => home.to_path_buf(),
        Some(rest) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// The part after `~`, or `None` when the path does not start with the home shorthand.
fn home_relative(path: &Path) -> Option<&str> {
    let p = path.to_str()?;
    if p == "~" {
        return Some("");
    }
    // `~\` is the Windows-style form
    p.strip_prefix("~/").or_else(|| p.strip_prefix("~\\"))
}

/// Expands `~` against the invoking user's home directory.
///
/// Fails when the path needs a home directory and none can be determined.
pub fn expand_home(path: &Path) -> io::Result<PathBuf> {
    expand_home_in(path, home_dir().as_deref())
}

fn expand_home_in(path: &Path, home: Option<&Path>) -> io::Result<PathBuf> {
    match (home_relative(path), home) {
        (None, _) => Ok(path.to_path_buf()),
        (Some(_), Some(home)) => Ok(expand_home_with(path, home)),
        (Some(_), None) => Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("cannot expand {}: home directory not found", path.display()),
        )),
    }
}

/// Expands `~` and anchors relative paths to the current directory.
pub fn resolve_path(path: &Path) -> io::Result<PathBuf> {
    let expanded = expand_home(path)?;
    if expanded.is_absolute() {
        return Ok(expanded);
    }
    Ok(std::env::current_dir()?.join(expanded))
}

/// True when `value` names exactly one directory level: non-empty, no separators,
/// and neither `.` nor `..`.
pub fn is_single_segment(value: &str) -> bool {
    !value.trim().is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\'])
}
