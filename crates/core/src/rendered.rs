//! Scoped on-disk copy of the rendered settings
//!
//! The file holds live credentials, so it is created owner-only (0600 on
//! Unix) and removed when the [`RenderedConfig`] is dropped, on success,
//! error and panic alike.

use crate::{Error, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// A rendered settings document materialized in a temporary file
#[derive(Debug)]
pub struct RenderedConfig {
    file: NamedTempFile,
}

impl RenderedConfig {
    /// Write `contents` to a fresh temporary file.
    ///
    /// The file lands in `dir` when given, otherwise in the system temp
    /// directory. If writing fails, the partially written file is removed
    /// before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or written.
    pub fn write(dir: Option<&Path>, contents: &str) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("settings-").suffix(".xml");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(std::fs::Permissions::from_mode(0o600));
        }

        let created = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        let mut file = created
            .map_err(|e| Error::io(e, dir.map(Path::to_path_buf), "create rendered settings"))?;

        let path = file.path().to_path_buf();
        file.write_all(contents.as_bytes())
            .and_then(|()| file.flush())
            .and_then(|()| file.as_file().sync_all())
            .map_err(|e| Error::io(e, Some(path.clone()), "write rendered settings"))?;

        tracing::debug!(path = %path.display(), bytes = contents.len(), "Rendered settings written");

        Ok(Self { file })
    }

    /// Location of the rendered settings file
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Remove the file now, surfacing any removal error.
    ///
    /// Dropping the value also removes the file, but silently.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file could not be deleted.
    pub fn close(self) -> Result<()> {
        let path = self.file.path().to_path_buf();
        self.file
            .close()
            .map_err(|e| Error::io(e, Some(path.clone()), "remove rendered settings"))?;
        tracing::debug!(path = %path.display(), "Rendered settings removed");
        Ok(())
    }
}
