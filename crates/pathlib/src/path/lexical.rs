//! Lexical path arithmetic. Nothing here touches a filesystem.
//!
//! Cleaning follows the usual rules: repeated separators collapse, `.` segments drop,
//! `..` removes the preceding segment (or is dropped at a root), and an empty
//! result becomes `.`.

use std::ffi::OsStr;
use std::iter;
use std::path::{Component, MAIN_SEPARATOR_STR, Path, PathBuf};

/// Clean a host path.
pub(crate) fn clean_host(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    let mut rooted = false;
    let mut parts: Vec<&OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => cleaned.push(prefix.as_os_str()),
            Component::RootDir => {
                cleaned.push(Component::RootDir.as_os_str());
                rooted = true;
            }
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(last) if *last != OsStr::new("..") => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(OsStr::new("..")),
            },
            Component::Normal(part) => parts.push(part),
        }
    }
    for part in parts {
        cleaned.push(part);
    }
    if cleaned.as_os_str().is_empty() {
        cleaned.push(".");
    }
    cleaned
}

/// Join `base` and `elems` with the host separator, then clean.
/// Empty elements are skipped; if all are empty the result is empty.
pub(crate) fn join_host(base: &str, elems: &[&str]) -> String {
    let parts: Vec<&str> = iter::once(base)
        .chain(elems.iter().copied())
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        return String::new();
    }
    let joined = parts.join(MAIN_SEPARATOR_STR);
    clean_host(Path::new(&joined))
        .to_string_lossy()
        .into_owned()
}

/// All but the last segment of a host path, cleaned.
pub(crate) fn dir_host(path: &str) -> String {
    let cleaned = clean_host(Path::new(path));
    match cleaned.parent() {
        Some(parent) if parent.as_os_str().is_empty() => ".".to_string(),
        Some(parent) => parent.to_string_lossy().into_owned(),
        None => cleaned.to_string_lossy().into_owned(),
    }
}

/// Clean a `/`-separated path.
pub(crate) fn clean_slash(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if rooted {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Join `base` and `elems` with `/`, then clean.
pub(crate) fn join_slash(base: &str, elems: &[&str]) -> String {
    let parts: Vec<&str> = iter::once(base)
        .chain(elems.iter().copied())
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        return String::new();
    }
    clean_slash(&parts.join("/"))
}

/// All but the last segment of a `/`-separated path, cleaned.
pub(crate) fn dir_slash(path: &str) -> String {
    let cleaned = clean_slash(path);
    match cleaned.rfind('/') {
        None => ".".to_string(),
        Some(0) => "/".to_string(),
        Some(idx) => cleaned[..idx].to_string(),
    }
}
