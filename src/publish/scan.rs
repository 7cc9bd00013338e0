//! Source directory scanning.
//!
//! Walks the built site and yields each file with the path it will have on
//! the hosting branch. Entries are visited in sorted order so the generated
//! commit is reproducible.

use super::PublishError;
use crate::debug;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Git file mode for an imported blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Regular,
    Executable,
}

impl FileMode {
    /// Octal mode as written in a fast-import `M` command.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "100644",
            Self::Executable => "100755",
        }
    }

    #[cfg(unix)]
    fn from_metadata(meta: &fs::Metadata) -> Self {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 != 0 {
            Self::Executable
        } else {
            Self::Regular
        }
    }

    #[cfg(not(unix))]
    fn from_metadata(_meta: &fs::Metadata) -> Self {
        Self::Regular
    }
}

/// A file to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path on the hosting branch, `/`-separated.
    pub path: String,
    /// Location on disk.
    pub source: PathBuf,
    pub mode: FileMode,
}

/// Collect every file under `dir`, skipping `.git` entries at any depth.
///
/// `prefix` is prepended to every branch path. Symlinks to files publish the
/// file contents; symlinked directories are only entered with `follow_links`,
/// and never when they point back at a directory being walked.
pub fn scan_dir(
    dir: &Path,
    prefix: Option<&str>,
    follow_links: bool,
) -> Result<Vec<SourceFile>, PublishError> {
    let mut scanner = Scanner {
        follow_links,
        ancestors: Vec::new(),
        files: Vec::new(),
    };
    let base = prefix.map(|p| p.trim_matches('/')).unwrap_or_default();
    scanner.walk(dir, base)?;
    Ok(scanner.files)
}

struct Scanner {
    follow_links: bool,
    /// Canonical paths of the directories being walked, outermost first.
    ancestors: Vec<PathBuf>,
    files: Vec<SourceFile>,
}

impl Scanner {
    fn walk(&mut self, dir: &Path, base: &str) -> Result<(), PublishError> {
        let io_err = |e| PublishError::Io(dir.to_path_buf(), e);

        let real = fs::canonicalize(dir).map_err(io_err)?;
        if self.ancestors.contains(&real) {
            debug!("scan"; "skipping {}: link cycle", dir.display());
            return Ok(());
        }

        let mut entries = fs::read_dir(dir)
            .map_err(io_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(io_err)?;
        entries.sort_by_key(|entry| entry.file_name());

        self.ancestors.push(real);
        for entry in entries {
            self.visit(&entry, base)?;
        }
        self.ancestors.pop();

        Ok(())
    }

    fn visit(&mut self, entry: &fs::DirEntry, base: &str) -> Result<(), PublishError> {
        let path = entry.path();
        let name = entry
            .file_name()
            .into_string()
            .map_err(|_| PublishError::InvalidFileName(path.clone()))?;

        if name == ".git" {
            return Ok(());
        }

        let io_err = |e| PublishError::Io(path.clone(), e);
        let is_link = entry.file_type().map_err(io_err)?.is_symlink();
        let meta = fs::metadata(&path).map_err(io_err)?;

        let branch_path = if base.is_empty() {
            name
        } else {
            format!("{base}/{name}")
        };

        if meta.is_dir() {
            if is_link && !self.follow_links {
                debug!("scan"; "skipping linked directory {}", path.display());
                return Ok(());
            }
            self.walk(&path, &branch_path)?;
        } else if meta.is_file() {
            self.files.push(SourceFile {
                path: branch_path,
                mode: FileMode::from_metadata(&meta),
                source: path,
            });
        }

        Ok(())
    }
}
