use std::path::*;
use path_absolutize::Absolutize;

pub fn extract_file_name(path: &Path) -> &str {
    path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("")
}

pub fn path_to_str(path: &Path) -> &str {
    path
        .to_str()
        .unwrap_or("")
}

/// Expand `path` against the default root named by the environment
/// variable `env_name`. Returns `None` only when neither the variable
/// nor a path is given.
pub fn fix_path(env_name: &str, path: Option<&Path>) -> Option<PathBuf> {
    let absolutized = |p: &Path| {
        p.absolutize()
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| p.to_path_buf())
    };
    match (std::env::var_os(env_name), path) {
        (None, None) =>
            None,

        (None, Some(p)) =>
            Some(absolutized(p)),

        (Some(root), p) =>
            Some(absolutized(&Path::new(&root).join(p.unwrap_or(Path::new(""))))),
    }
}
