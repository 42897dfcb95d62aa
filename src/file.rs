use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("empty file path")]
    EmptyPath,
    #[error("file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
    #[error("failed to create {}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to open {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn check_path(path: &Path) -> Result<(), FileError> {
    if path.as_os_str().is_empty() {
        return Err(FileError::EmptyPath);
    }
    Ok(())
}

/// Creates a new table file for reading and writing. Fails if the path
/// already exists.
pub fn create_file<P: AsRef<Path>>(path: P) -> Result<File, FileError> {
    let path = path.as_ref();
    check_path(path)?;

    OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|source| {
            if source.kind() == io::ErrorKind::AlreadyExists {
                FileError::AlreadyExists(path.to_path_buf())
            } else {
                FileError::Create {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })
}

/// Opens an existing table file for reading and writing.
pub fn open_file<P: AsRef<Path>>(path: P) -> Result<File, FileError> {
    let path = path.as_ref();
    check_path(path)?;

    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|source| FileError::Open {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_then_open() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("people.rfk");

        create_file(&path)?;
        assert!(path.exists());
        open_file(&path)?;
        Ok(())
    }

    #[test]
    fn create_refuses_existing_file() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("people.rfk");
        create_file(&path)?;

        let err = create_file(&path).unwrap_err();
        assert!(matches!(err, FileError::AlreadyExists(_)));
        Ok(())
    }

    #[test]
    fn open_requires_existing_file() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let err = open_file(dir.path().join("missing.rfk")).unwrap_err();
        assert!(matches!(err, FileError::Open { .. }));
        Ok(())
    }

    #[test]
    fn empty_path_is_rejected() {
        assert!(matches!(create_file(""), Err(FileError::EmptyPath)));
        assert!(matches!(open_file(""), Err(FileError::EmptyPath)));
    }
}
