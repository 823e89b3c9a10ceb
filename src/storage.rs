// src/storage.rs

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

use crate::part::PartError;

/// Destination of share `part` out of `parts` for an output prefix
pub fn part_file_path(prefix: &str, part: u8, parts: u8) -> PathBuf {
    PathBuf::from(format!("{prefix}{part}of{parts}.json"))
}

/// Open a file for reading
pub fn open_input_file(path: &Path) -> Result<File, PartError> {
    File::open(path).map_err(|e| PartError::io(path, e))
}

/// Open (or create) a file for writing.
///
/// A file that already has content is truncated when `truncate` is set and
/// rejected otherwise.
pub fn open_output_file(path: &Path, truncate: bool) -> Result<File, PartError> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .open(path)
        .map_err(|e| PartError::io(path, e))?;

    let size = file.metadata().map_err(|e| PartError::io(path, e))?.len();
    if size > 0 {
        if !truncate {
            return Err(PartError::OutputNotEmpty(path.to_path_buf()));
        }
        file.set_len(0).map_err(|e| PartError::io(path, e))?;
        info!(path = %path.display(), "truncated output file");
    }

    Ok(file)
}

/// Output handles of one split run, keyed by path.
///
/// Each destination is opened once; writers share the handle through
/// `&File` so the lock only covers lookup and insert.
pub struct OutputRegistry {
    files: Mutex<HashMap<PathBuf, Arc<File>>>,
    truncate: bool,
}

impl OutputRegistry {
    pub fn new(truncate: bool) -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            truncate,
        }
    }

    /// Handle for `path`, opening it on first use
    pub fn open(&self, path: &Path) -> Result<Arc<File>, PartError> {
        let mut files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(file) = files.get(path) {
            return Ok(Arc::clone(file));
        }

        let file = Arc::new(open_output_file(path, self.truncate)?);
        files.insert(path.to_path_buf(), Arc::clone(&file));
        debug!(path = %path.display(), "opened part file");
        Ok(file)
    }

    /// Number of open handles
    pub(crate) fn len(&self) -> usize {
        self.files.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flush and release every handle.
    ///
    /// All handles are dropped even if syncing one of them fails; the first
    /// failure is returned.
    pub fn close_all(&self) -> Result<(), PartError> {
        let drained: Vec<(PathBuf, Arc<File>)> = self
            .files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        let mut first_error = None;
        for (path, file) in drained {
            if let Err(e) = file.sync_all() {
                first_error.get_or_insert(PartError::io(&path, e));
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_part_file_path() {
        assert_eq!(part_file_path("out/secret-", 2, 5), PathBuf::from("out/secret-2of5.json"));
    }

    #[test]
    fn test_open_output_file_refuses_non_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        std::fs::write(&path, b"existing").unwrap();

        assert!(matches!(
            open_output_file(&path, false),
            Err(PartError::OutputNotEmpty(_))
        ));
        assert_eq!(std::fs::read(&path).unwrap(), b"existing");

        let mut file = open_output_file(&path, true).unwrap();
        file.write_all(b"new").unwrap();
        drop(file);
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn test_open_input_file_reports_path() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.json");

        let err = open_input_file(&missing).unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn test_registry_opens_each_path_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("p-1of2.json");
        let registry = OutputRegistry::new(false);

        let first = registry.open(&path).unwrap();
        (&*first).write_all(b"one").unwrap();

        // A second lookup must reuse the handle rather than failing the
        // non-empty check
        let second = registry.open(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        (&*second).write_all(b"two").unwrap();
        assert_eq!(registry.len(), 1);

        drop((first, second));
        registry.close_all().unwrap();
        assert!(registry.is_empty());
        assert_eq!(std::fs::read(&path).unwrap(), b"onetwo");
    }
}
