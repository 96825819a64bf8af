use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};

use crate::error::Result;

/// Default pattern for archive documents.
pub const DEFAULT_GLOB: &str = "**/*.txt";

/// A discovered document file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Path relative to the archive root directory.
    pub relative_path: PathBuf,
    /// The archive root as configured, joined with the relative path.
    /// This is the document's identity throughout the pipeline.
    pub source: PathBuf,
}

/// Compile a glob that is matched against paths relative to the root.
///
/// `*` does not cross directory separators; use `**` for that.
pub fn compile_glob(pattern: &str) -> Result<GlobMatcher> {
    Ok(GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}

/// Recursively walk a directory and discover files matching `glob`.
///
/// Skips hidden files/directories (names starting with `.`). Results are
/// sorted by relative path.
pub fn discover_files(
    root: &Path,
    glob: &GlobMatcher,
) -> Result<Vec<DiscoveredFile>> {
    let canonical_root = root.canonicalize()?;
    let mut results = Vec::new();
    walk_dir(root, &canonical_root, &canonical_root, glob, &mut results)?;
    results.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(results)
}

fn walk_dir(
    display_root: &Path,
    root: &Path,
    current: &Path,
    glob: &GlobMatcher,
    results: &mut Vec<DiscoveredFile>,
) -> Result<()> {
    let entries = std::fs::read_dir(current)?;

    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();

        // Skip hidden files and directories.
        if name.starts_with('.') {
            continue;
        }

        let file_type = entry.file_type()?;
        let path = entry.path();

        if file_type.is_dir() {
            walk_dir(display_root, root, &path, glob, results)?;
        } else if file_type.is_symlink() {
            let resolved = match path.canonicalize() {
                Ok(p) => p,
                Err(_) => continue, // Skip broken symlinks
            };
            // Directory symlinks are not followed (cycle prevention).
            if resolved.is_file() {
                push_if_matching(display_root, root, &path, glob, results);
            }
        } else if file_type.is_file() {
            push_if_matching(display_root, root, &path, glob, results);
        }
    }

    Ok(())
}

fn push_if_matching(
    display_root: &Path,
    root: &Path,
    path: &Path,
    glob: &GlobMatcher,
    results: &mut Vec<DiscoveredFile>,
) {
    let relative_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    if glob.is_match(&relative_path) {
        results.push(DiscoveredFile {
            source: display_root.join(&relative_path),
            relative_path,
        });
    }
}
