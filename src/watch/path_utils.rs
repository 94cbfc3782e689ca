// src/watch/path_utils.rs

//! Path helpers shared by the watcher, source resolution and clean tasks.

use std::path::Path;

/// `path` relative to `root`, with forward slashes, as glob patterns expect.
///
/// Falls back to comparing canonical paths when the plain prefix does not
/// match (symlinked roots, `/private/var` vs `/var` on macOS). Returns `None`
/// for paths outside `root` and for `root` itself.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = match path.strip_prefix(root) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => {
            let root_canon = root.canonicalize().ok()?;
            let path_canon = path.canonicalize().ok()?;
            path_canon.strip_prefix(&root_canon).ok()?.to_path_buf()
        }
    };

    let s = rel.to_string_lossy().replace('\\', "/");
    if s.is_empty() { None } else { Some(s) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_root_and_normalises_separators() {
        assert_eq!(
            relative_str(Path::new("/p"), Path::new("/p/src/a.scss")).as_deref(),
            Some("src/a.scss")
        );
        assert_eq!(relative_str(Path::new("/p"), Path::new("/p")), None);
        assert_eq!(relative_str(Path::new("/p/a"), Path::new("/elsewhere/x")), None);
    }
}
