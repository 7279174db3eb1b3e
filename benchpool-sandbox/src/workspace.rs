//! Per-execution scratch directories

use crate::entry::EntryMode;
use crate::error::SandboxError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Module file written next to every snippet so module-mode toolchains
/// accept the directory.
pub const GO_MOD: &str = "module sandbox\n\ngo 1.21\n";

/// A freshly created directory holding one snippet. Removed when dropped,
/// whichever way the execution ends.
pub struct Workspace {
    dir: TempDir,
    source_file: PathBuf,
}

impl Workspace {
    pub async fn create(code: &str, mode: EntryMode) -> Result<Self, SandboxError> {
        let dir = tokio::task::spawn_blocking(|| {
            tempfile::Builder::new().prefix("benchpool-").tempdir()
        })
        .await
        .map_err(|e| SandboxError::Workspace(std::io::Error::new(std::io::ErrorKind::Other, e)))?
        .map_err(SandboxError::Workspace)?;

        let go_mod = dir.path().join("go.mod");
        tokio::fs::write(&go_mod, GO_MOD)
            .await
            .map_err(|source| SandboxError::WriteSource {
                path: go_mod.clone(),
                source,
            })?;

        let source_file = dir.path().join(mode.file_name());
        tokio::fs::write(&source_file, code)
            .await
            .map_err(|source| SandboxError::WriteSource {
                path: source_file.clone(),
                source,
            })?;

        Ok(Self { dir, source_file })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn source_file(&self) -> &Path {
        &self.source_file
    }
}
