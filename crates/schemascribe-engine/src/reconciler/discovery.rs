//! Documentation file discovery

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

fn project_stem(project_file: &str) -> &str {
    Path::new(project_file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(project_file)
}

/// Find YAML documentation files under `project_dir`'s `doc_dirs`
///
/// Directories that do not exist are skipped. Files sharing the stem of
/// `project_file` (normally `dbt_project`) are excluded. The result is
/// sorted, which fixes the index order for duplicate names.
pub(crate) fn discover_doc_files(project_dir: &Path, doc_dirs: &[String], project_file: &str) -> Vec<PathBuf> {
    let project_stem = project_stem(project_file);

    let mut files = Vec::new();
    for dir in doc_dirs {
        let root = project_dir.join(dir);
        if !root.is_dir() {
            tracing::debug!(dir = %root.display(), "documentation directory absent, skipping");
            continue;
        }

        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable path during discovery");
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || !is_yaml(path) {
                continue;
            }
            if path.file_stem().and_then(|s| s.to_str()) == Some(project_stem) {
                continue;
            }
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    files.dedup();
    tracing::info!(count = files.len(), "found documentation files");
    files
}

/// YAML files directly inside `dir`, sorted; subdirectories are not entered
pub(crate) fn doc_files_in(dir: &Path, project_file: &str) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let project_stem = project_stem(project_file);

    WalkDir::new(dir)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_yaml(entry.path()))
        .filter(|entry| entry.path().file_stem().and_then(|s| s.to_str()) != Some(project_stem))
        .map(|entry| entry.into_path())
        .collect()
}
