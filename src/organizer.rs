use crate::{naming, SourceDocument};
use log::{info, warn};
use std::io;
use std::path::{Path, PathBuf};

/// Where a document's attachments ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizedFolder {
    /// The folder to report: the renamed folder on success, otherwise the
    /// original working folder.
    pub path: PathBuf,

    /// `true` when the folder was moved to a new name.
    pub renamed: bool,
}

/// Renames per-document working folders (`pdf_<n>`) after their document.
pub struct FolderOrganizer<'a> {
    dest_root: &'a Path,
    max_name_len: usize,
}

impl<'a> FolderOrganizer<'a> {
    pub fn new(dest_root: &'a Path, max_name_len: usize) -> Self {
        Self {
            dest_root,
            max_name_len,
        }
    }

    /// Create a fresh working folder for `document`: `pdf_<n>`, or
    /// `pdf_<n>_1`, `pdf_<n>_2`, … when that name is already taken by an
    /// earlier document or an earlier run. Never reuses an existing folder.
    pub fn create_working_folder(&self, document: &SourceDocument) -> io::Result<PathBuf> {
        let name = document.working_folder_name();
        let mut n = 0;
        loop {
            let path = self.dest_root.join(naming::numbered_name(&name, n));
            match std::fs::create_dir(&path) {
                Ok(()) => return Ok(path),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(e),
            }
        }
    }

    /// The folder name a document's attachments should end up in: the
    /// sanitized, truncated stem, or the working folder name when nothing
    /// usable is left.
    pub fn target_name(&self, document: &SourceDocument) -> String {
        let name = naming::sanitize_folder_name(&document.stem(), self.max_name_len);
        if name.trim().is_empty() || name.chars().all(|c| c == '.') {
            document.working_folder_name()
        } else {
            name
        }
    }

    /// Rename `working` after `document`.
    ///
    /// An existing folder with the target name is never reused: `_1`, `_2`, …
    /// are appended until the name is free. If `working` does not exist or the
    /// rename fails, the original path is returned so failure records still
    /// point at real files.
    pub fn organize(&self, document: &SourceDocument, working: &Path) -> OrganizedFolder {
        let unchanged = OrganizedFolder {
            path: working.to_path_buf(),
            renamed: false,
        };

        if !working.is_dir() {
            return unchanged;
        }

        let base = self.dest_root.join(self.target_name(document));
        let target = naming::unique_dir_path(&base, working);
        if target == working {
            info!("Keeping folder name: '{}'", working.display());
            return unchanged;
        }

        match std::fs::rename(working, &target) {
            Ok(()) => {
                info!("Renamed folder: '{}' -> '{}'", working.display(), target.display());
                OrganizedFolder {
                    path: target,
                    renamed: true,
                }
            }
            Err(e) => {
                warn!(
                    "Could not rename folder for {}: {e}; keeping '{}'",
                    document.file_name(),
                    working.display()
                );
                unchanged
            }
        }
    }
}
