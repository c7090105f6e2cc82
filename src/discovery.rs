use crate::{HarvestError, Result, SourceDocument};
use std::path::Path;

/// List the PDFs directly inside `source_dir`, sorted by file name and
/// numbered from 1.
///
/// Subfolders are not searched. A missing or unreadable folder is a
/// [`HarvestError::Discovery`]; a folder without PDFs is
/// [`HarvestError::NoDocuments`].
pub fn discover_documents(source_dir: &Path) -> Result<Vec<SourceDocument>> {
    let discovery_error = |reason: String| HarvestError::Discovery {
        path: source_dir.to_path_buf(),
        reason,
    };

    if !source_dir.exists() {
        return Err(discovery_error("folder does not exist".into()));
    }
    if !source_dir.is_dir() {
        return Err(discovery_error("not a directory".into()));
    }

    let entries = std::fs::read_dir(source_dir).map_err(|e| discovery_error(e.to_string()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| discovery_error(e.to_string()))?;
        let path = entry.path();
        if path.is_file() && SourceDocument::is_pdf_path(&path) {
            paths.push(path);
        }
    }

    if paths.is_empty() {
        return Err(HarvestError::NoDocuments(source_dir.to_path_buf()));
    }

    paths.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(i, path)| SourceDocument::new(i + 1, path))
        .collect())
}
