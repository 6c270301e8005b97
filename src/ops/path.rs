use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};

use crate::errors::OperationError;

lazy_static! {
    static ref FILE_PATH_RE: Regex = RegexBuilder::new(r"^/?([-_~.a-z0-9]+/)*([-_~.a-z0-9]+)/?$")
        .case_insensitive(true)
        .build()
        .unwrap();
}

/// Home directory of a backend user.
pub fn home_directory(user: &str) -> String {
    format!("/user/{}/", user)
}

/// Resolves `path` against the home directory of `user`.
///
/// Absolute paths are returned unchanged. Relative paths are appended to `/user/{user}/`
/// with runs of slashes collapsed. `..` is not interpreted.
pub fn resolve(user: &str, path: &str) -> String {
    if path.starts_with('/') {
        return path.to_owned();
    }

    let joined = home_directory(user) + path;
    let mut resolved = String::with_capacity(joined.len());
    let mut prev_slash = false;
    for c in joined.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        resolved.push(c);
    }
    resolved
}

pub fn is_valid_file_path(path: &str) -> bool {
    path == "/" || FILE_PATH_RE.is_match(path)
}

/// Checks the syntax of a path given by a caller.
///
/// An empty path is only accepted when `allow_empty` is set (e.g. it stands for the home directory).
pub fn check_file_path(path: &str, allow_empty: bool) -> Result<(), OperationError> {
    if path.is_empty() {
        if allow_empty {
            return Ok(());
        }
        return Err(OperationError::InvalidArgument(
            "expected a non-empty path".to_owned(),
        ));
    }
    if !is_valid_file_path(path) {
        return Err(OperationError::InvalidArgument(format!(
            "the path has invalid name components: {}",
            path
        )));
    }
    Ok(())
}

/// Parent directory of a path, ignoring a trailing slash.
pub fn parent_directory(path: &str) -> &str {
    let path = path.trim_end_matches('/');
    match path.rfind('/') {
        Some(0) => "/",
        Some(i) => &path[..i],
        None => "",
    }
}
