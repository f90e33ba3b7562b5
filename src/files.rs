//! Whole-file reads and atomic writes.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::SystemTime;

use crate::error::{JoinError, JoinResult};

pub fn read_trimmed(path: &Path) -> JoinResult<String> {
    let contents = fs::read_to_string(path).map_err(|e| JoinError::io(path, e))?;
    Ok(contents.trim().to_string())
}

/// Lines of a file without their terminators. An empty file has no lines.
pub fn read_lines(path: &Path) -> JoinResult<Vec<String>> {
    let contents = fs::read_to_string(path).map_err(|e| JoinError::io(path, e))?;
    Ok(contents.lines().map(|l| l.to_string()).collect())
}

/// Write through a temporary sibling so readers never see a partial file.
pub fn write_atomic(path: &Path, contents: &str) -> JoinResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| JoinError::Config(format!("no parent directory for {}", path.display())))?;
    fs::create_dir_all(dir).map_err(|e| JoinError::io(dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| JoinError::io(dir, e))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| JoinError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| JoinError::io(path, e.error))?;
    Ok(())
}

pub fn modified(path: &Path) -> JoinResult<SystemTime> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| JoinError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/out.js");
        write_atomic(&target, "x").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "x");

        write_atomic(&target, "y").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "y");
        assert_eq!(fs::read_dir(dir.path().join("a/b")).unwrap().count(), 1);
    }

    #[test]
    fn test_read_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("t.html");
        fs::write(&file, "  <p>\n</p>\n\n").unwrap();
        assert_eq!(read_trimmed(&file).unwrap(), "<p>\n</p>");
        assert_eq!(read_lines(&file).unwrap(), vec!["  <p>", "</p>", ""]);

        fs::write(&file, "").unwrap();
        assert!(read_lines(&file).unwrap().is_empty());

        let missing = dir.path().join("missing.js");
        match read_trimmed(&missing) {
            Err(JoinError::Io { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected io error, got {:?}", other),
        }
    }
}
